// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The scalar value codec: encodes each schema scalar kind as a symbol sequence against the
//! entropy coder.

use std::io;

use crate::coder::{Decoder, Encoder};
use crate::errors::{decode_corrupt_error, Result};
use crate::model::{Model, Uniform};
use crate::reflect::EnumDescriptor;
use crate::text::{decode_text, encode_text, TextOrder};
use crate::varint::{zigzag_decode, zigzag_decode32, zigzag_encode, zigzag_encode32, MAX_VARINT_LEN};

/// The pair of models a varint uses: one for its first byte, one for every continuation byte.
/// `V-type`/`V-adaptive`/`V-contextual` use the same model for both slots; `V-bitpacked` supplies
/// distinct ones.
pub struct VarintModels<'a> {
    first: &'a dyn Model,
    rest: &'a dyn Model,
}

impl<'a> VarintModels<'a> {
    pub fn uniform(model: &'a dyn Model) -> Self {
        VarintModels { first: model, rest: model }
    }

    pub fn split(first: &'a dyn Model, rest: &'a dyn Model) -> Self {
        VarintModels { first, rest }
    }

    fn for_position(&self, position: usize) -> &dyn Model {
        if position == 0 {
            self.first
        }
        else {
            self.rest
        }
    }
}

fn byte_model() -> Uniform {
    Uniform::new(256).expect("uniform-256 is always well-formed")
}

/// Encodes `value` as a varint, one byte per symbol against `models`.
pub fn encode_varint_value<W: io::Write>(
    enc: &mut Encoder<W>,
    mut value: u64,
    models: &VarintModels<'_>,
) -> Result<()> {
    let mut position = 0usize;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
            enc.encode(models.for_position(position), byte as usize)?;
        }
        else {
            enc.encode(models.for_position(position), byte as usize)?;
            break;
        }
        position += 1;
    }
    Ok(())
}

/// Decodes a varint written by [`encode_varint_value`].
pub fn decode_varint_value<R: io::Read>(
    dec: &mut Decoder<R>,
    models: &VarintModels<'_>,
) -> Result<u64> {
    let mut value: u64 = 0;
    let mut position = 0usize;

    loop {
        if position == MAX_VARINT_LEN {
            return decode_corrupt_error("varint longer than 10 bytes");
        }

        let byte = dec.decode(models.for_position(position))? as u8;
        value |= u64::from(byte & 0x7f) << (7 * position);
        position += 1;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

/// Encodes a boolean as a single symbol over alphabet 2.
pub fn encode_bool<W: io::Write>(enc: &mut Encoder<W>, model: &dyn Model, value: bool) -> Result<()> {
    enc.encode(model, value as usize)
}

pub fn decode_bool<R: io::Read>(dec: &mut Decoder<R>, model: &dyn Model) -> Result<bool> {
    Ok(dec.decode(model)? != 0)
}

/// Encodes an enum value as its declaration index, over an alphabet sized to the enum's value
/// count.
pub fn encode_enum<W: io::Write>(
    enc: &mut Encoder<W>,
    model: &dyn Model,
    enum_desc: &EnumDescriptor,
    number: i32,
) -> Result<()> {
    let index = match enum_desc.index_of(number) {
        Some(i) => i,
        None => {
            return Err(crate::errors::CodecError::InvalidSymbol { symbol: 0, alphabet: enum_desc.values.len() })
        }
    };
    enc.encode(model, index)
}

/// Decodes an enum value, returning its declared numeric value.
///
/// Returns [`crate::errors::CodecError::DecodeCorrupt`] if the decoded index has no corresponding
/// declared value.
pub fn decode_enum<R: io::Read>(
    dec: &mut Decoder<R>,
    model: &dyn Model,
    enum_desc: &EnumDescriptor,
) -> Result<i32> {
    let index = dec.decode(model)?;
    match enum_desc.number_at(index) {
        Some(number) => Ok(number),
        None => decode_corrupt_error("decoded enum index past the declared values count"),
    }
}

/// Encodes `value` cast to unsigned (wrapping) as a varint (`int32`/`int64`/`uint32`/`uint64`).
pub fn encode_unsigned<W: io::Write>(
    enc: &mut Encoder<W>,
    models: &VarintModels<'_>,
    value: u64,
) -> Result<()> {
    encode_varint_value(enc, value, models)
}

pub fn decode_unsigned<R: io::Read>(dec: &mut Decoder<R>, models: &VarintModels<'_>) -> Result<u64> {
    decode_varint_value(dec, models)
}

/// Encodes a signed 64-bit value via zig-zag then varint (`sint64`).
pub fn encode_sint64<W: io::Write>(
    enc: &mut Encoder<W>,
    models: &VarintModels<'_>,
    value: i64,
) -> Result<()> {
    encode_varint_value(enc, zigzag_encode(value), models)
}

pub fn decode_sint64<R: io::Read>(dec: &mut Decoder<R>, models: &VarintModels<'_>) -> Result<i64> {
    Ok(zigzag_decode(decode_varint_value(dec, models)?))
}

/// Encodes a signed 32-bit value via zig-zag then varint (`sint32`).
pub fn encode_sint32<W: io::Write>(
    enc: &mut Encoder<W>,
    models: &VarintModels<'_>,
    value: i32,
) -> Result<()> {
    encode_varint_value(enc, u64::from(zigzag_encode32(value)), models)
}

pub fn decode_sint32<R: io::Read>(dec: &mut Decoder<R>, models: &VarintModels<'_>) -> Result<i32> {
    let z = decode_varint_value(dec, models)?;
    if z > u32::MAX as u64 {
        return decode_corrupt_error("sint32 varint decoded a value wider than 32 bits");
    }
    Ok(zigzag_decode32(z as u32))
}

/// Encodes `bytes` (already little-endian) one byte per symbol against `model`. Used by every
/// fixed-width kind (`fixed32`, `sfixed32`, `float`, `fixed64`, `sfixed64`, `double`).
fn encode_fixed_bytes<W: io::Write>(enc: &mut Encoder<W>, model: &dyn Model, bytes: &[u8]) -> Result<()> {
    for &b in bytes {
        enc.encode(model, b as usize)?;
    }
    Ok(())
}

fn decode_fixed_bytes<R: io::Read, const N: usize>(
    dec: &mut Decoder<R>,
    model: &dyn Model,
) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    for slot in out.iter_mut() {
        *slot = dec.decode(model)? as u8;
    }
    Ok(out)
}

pub fn encode_fixed32<W: io::Write>(enc: &mut Encoder<W>, model: &dyn Model, value: u32) -> Result<()> {
    encode_fixed_bytes(enc, model, &value.to_le_bytes())
}

pub fn decode_fixed32<R: io::Read>(dec: &mut Decoder<R>, model: &dyn Model) -> Result<u32> {
    Ok(u32::from_le_bytes(decode_fixed_bytes(dec, model)?))
}

pub fn encode_fixed64<W: io::Write>(enc: &mut Encoder<W>, model: &dyn Model, value: u64) -> Result<()> {
    encode_fixed_bytes(enc, model, &value.to_le_bytes())
}

pub fn decode_fixed64<R: io::Read>(dec: &mut Decoder<R>, model: &dyn Model) -> Result<u64> {
    Ok(u64::from_le_bytes(decode_fixed_bytes(dec, model)?))
}

pub fn encode_float<W: io::Write>(enc: &mut Encoder<W>, model: &dyn Model, value: f32) -> Result<()> {
    encode_fixed_bytes(enc, model, &value.to_le_bytes())
}

pub fn decode_float<R: io::Read>(dec: &mut Decoder<R>, model: &dyn Model) -> Result<f32> {
    Ok(f32::from_le_bytes(decode_fixed_bytes(dec, model)?))
}

pub fn encode_double<W: io::Write>(enc: &mut Encoder<W>, model: &dyn Model, value: f64) -> Result<()> {
    encode_fixed_bytes(enc, model, &value.to_le_bytes())
}

pub fn decode_double<R: io::Read>(dec: &mut Decoder<R>, model: &dyn Model) -> Result<f64> {
    Ok(f64::from_le_bytes(decode_fixed_bytes(dec, model)?))
}

/// Encodes a string: the text codec's output, itself a varint-length-prefixed byte run. The text
/// codec's own code-point count already serves as that length prefix, so no outer framing is
/// added here.
pub fn encode_string<W: io::Write>(enc: &mut Encoder<W>, s: &str, order: TextOrder) -> Result<()> {
    encode_text(enc, s, order)
}

pub fn decode_string<R: io::Read>(dec: &mut Decoder<R>, order: TextOrder) -> Result<String> {
    decode_text(dec, order)
}

/// Encodes opaque bytes as a varint length prefix followed by a raw byte run.
pub fn encode_bytes<W: io::Write>(
    enc: &mut Encoder<W>,
    length_models: &VarintModels<'_>,
    byte_model: &dyn Model,
    bytes: &[u8],
) -> Result<()> {
    encode_varint_value(enc, bytes.len() as u64, length_models)?;
    encode_fixed_bytes(enc, byte_model, bytes)
}

/// The largest byte-run length this codec will attempt to decode in one call. Well past any
/// payload a real schema field would declare; exists purely to turn a corrupt or adversarial
/// declared length into a prompt [`crate::errors::CodecError::DecodeCorrupt`] instead of an
/// effectively unbounded decode loop.
pub const MAX_DECODE_LEN: u64 = 1 << 20;

pub fn decode_bytes<R: io::Read>(
    dec: &mut Decoder<R>,
    length_models: &VarintModels<'_>,
    byte_model: &dyn Model,
) -> Result<Vec<u8>> {
    let len = decode_varint_value(dec, length_models)?;
    if len > MAX_DECODE_LEN {
        return decode_corrupt_error("declared byte length exceeds the maximum supported payload size");
    }
    let mut out = Vec::with_capacity(len as usize);
    for _ in 0..len {
        out.push(dec.decode(byte_model)? as u8);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Uniform;
    use crate::reflect::EnumValue;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn bool_roundtrips() {
        let model = Uniform::new(2).unwrap();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_bool(&mut enc, &model, true).unwrap();
            encode_bool(&mut enc, &model, false).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert_eq!(decode_bool(&mut dec, &model).unwrap(), true);
        assert_eq!(decode_bool(&mut dec, &model).unwrap(), false);
    }

    const COLORS: EnumDescriptor = EnumDescriptor {
        full_name: "test.Color",
        values: &[
            EnumValue { name: "RED", number: 0, index: 0 },
            EnumValue { name: "GREEN", number: 5, index: 1 },
            EnumValue { name: "BLUE", number: 9, index: 2 },
        ],
    };

    #[test]
    fn enum_roundtrips_nonconsecutive_numbers() {
        let model = Uniform::new(COLORS.values.len()).unwrap();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_enum(&mut enc, &model, &COLORS, 9).unwrap();
            encode_enum(&mut enc, &model, &COLORS, 0).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert_eq!(decode_enum(&mut dec, &model, &COLORS).unwrap(), 9);
        assert_eq!(decode_enum(&mut dec, &model, &COLORS).unwrap(), 0);
    }

    #[test]
    fn varint_value_roundtrips_random_u64() {
        let byte_model = byte_model();
        let models = VarintModels::uniform(&byte_model);
        let mut rng = SmallRng::seed_from_u64(7);

        let values: Vec<u64> = (0..500).map(|_| rng.gen()).collect();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            for &v in &values {
                encode_unsigned(&mut enc, &models, v).unwrap();
            }
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        for &v in &values {
            assert_eq!(decode_unsigned(&mut dec, &models).unwrap(), v);
        }
    }

    #[test]
    fn sint_roundtrips_negative_and_positive() {
        let byte_model = byte_model();
        let models = VarintModels::uniform(&byte_model);
        let values = [0i64, -1, 1, i64::MIN, i64::MAX, -12345, 12345];

        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            for &v in &values {
                encode_sint64(&mut enc, &models, v).unwrap();
            }
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        for &v in &values {
            assert_eq!(decode_sint64(&mut dec, &models).unwrap(), v);
        }
    }

    #[test]
    fn fixed32_and_float_roundtrip() {
        let model = byte_model();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_fixed32(&mut enc, &model, 0xdead_beef).unwrap();
            encode_float(&mut enc, &model, std::f32::consts::PI).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert_eq!(decode_fixed32(&mut dec, &model).unwrap(), 0xdead_beef);
        assert_eq!(decode_float(&mut dec, &model).unwrap(), std::f32::consts::PI);
    }

    #[test]
    fn fixed64_and_double_roundtrip() {
        let model = byte_model();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_fixed64(&mut enc, &model, 0x1122_3344_5566_7788).unwrap();
            encode_double(&mut enc, &model, std::f64::consts::E).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert_eq!(decode_fixed64(&mut dec, &model).unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(decode_double(&mut dec, &model).unwrap(), std::f64::consts::E);
    }

    #[test]
    fn bytes_roundtrips() {
        let byte_model = byte_model();
        let models = VarintModels::uniform(&byte_model);
        let payload = b"\x00\x01\xffhello\x80";

        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_bytes(&mut enc, &models, &byte_model, payload).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert_eq!(decode_bytes(&mut dec, &models, &byte_model).unwrap(), payload);
    }

    #[test]
    fn decode_bytes_rejects_declared_length_past_the_sanity_bound() {
        let byte_model = byte_model();
        let models = VarintModels::uniform(&byte_model);

        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_varint_value(&mut enc, MAX_DECODE_LEN + 1, &models).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert!(decode_bytes(&mut dec, &models, &byte_model).is_err());
    }

    #[test]
    fn string_roundtrips_via_text_codec() {
        let byte_model = byte_model();
        let models = VarintModels::uniform(&byte_model);

        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_string(&mut enc, "Alice", TextOrder::Order0).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        assert_eq!(decode_string(&mut dec, TextOrder::Order0).unwrap(), "Alice");
    }
}
