// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The text-stream codec. Frames a Unicode string as a varint code-point count followed by one
//! symbol per code point against an English character model, escaping to raw UTF-8 bytes for
//! anything outside the model's alphabet.

use std::io;

use crate::coder::{Decoder, Encoder};
use crate::errors::{decode_corrupt_error, Result};
use crate::model::{CharContext, EnglishOrder0, EnglishOrder1, EnglishOrder2, Model, Uniform, OTHER_SYMBOL};
use crate::varint::{decode_varint, encode_varint};

/// Which English character model backs a text stream: all three are variants of the same framing;
/// a policy picks one per string field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextOrder {
    Order0,
    Order1,
    Order2,
}

enum Context {
    Order0(EnglishOrder0),
    Order1(EnglishOrder1),
    Order2(EnglishOrder2),
}

impl Context {
    fn new(order: TextOrder) -> Self {
        match order {
            TextOrder::Order0 => Context::Order0(EnglishOrder0),
            TextOrder::Order1 => Context::Order1(EnglishOrder1::new()),
            TextOrder::Order2 => Context::Order2(EnglishOrder2::new()),
        }
    }

    fn model(&self) -> &dyn Model {
        match self {
            Context::Order0(m) => m,
            Context::Order1(m) => m,
            Context::Order2(m) => m,
        }
    }

    fn advance(&mut self, symbol: usize) {
        match self {
            Context::Order0(m) => m.advance(symbol),
            Context::Order1(m) => m.advance(symbol),
            Context::Order2(m) => m.advance(symbol),
        }
    }
}

fn byte_model() -> Uniform {
    Uniform::new(256).expect("uniform-256 is always well-formed")
}

fn utf8_len_model() -> Uniform {
    Uniform::new(5).expect("uniform-5 is always well-formed")
}

/// Encodes `s` into `enc`: a varint code-point count (each byte against uniform-256), then one
/// symbol per code point against the `order` character model, with raw-byte escapes for code
/// points outside the table.
pub fn encode_text<W: io::Write>(enc: &mut Encoder<W>, s: &str, order: TextOrder) -> Result<()> {
    let byte_model = byte_model();
    let len_model = utf8_len_model();

    let count = s.chars().count() as u64;
    for byte in encode_varint(count) {
        enc.encode(&byte_model, byte as usize)?;
    }

    let mut ctx = Context::new(order);
    for c in s.chars() {
        let symbol = EnglishOrder0::symbol_for(c);
        enc.encode(ctx.model(), symbol)?;

        if symbol == OTHER_SYMBOL {
            let mut utf8 = [0u8; 4];
            let encoded = c.encode_utf8(&mut utf8);
            enc.encode(&len_model, encoded.len())?;
            for &b in encoded.as_bytes() {
                enc.encode(&byte_model, b as usize)?;
            }
        }

        ctx.advance(symbol);
    }

    Ok(())
}

/// Decodes a string previously written by [`encode_text`] with the same `order`.
pub fn decode_text<R: io::Read>(dec: &mut Decoder<R>, order: TextOrder) -> Result<String> {
    let byte_model = byte_model();
    let len_model = utf8_len_model();

    let mut varint_bytes = Vec::with_capacity(crate::varint::MAX_VARINT_LEN);
    let count = loop {
        let byte = dec.decode(&byte_model)? as u8;
        varint_bytes.push(byte);
        if byte & 0x80 == 0 {
            break decode_varint(varint_bytes.iter().map(|&b| Ok(b)))?.0;
        }
        if varint_bytes.len() > crate::varint::MAX_VARINT_LEN {
            return decode_corrupt_error("text length varint longer than 10 bytes");
        }
    };

    if count > crate::scalar::MAX_DECODE_LEN {
        return decode_corrupt_error("declared code-point count exceeds the maximum supported payload size");
    }

    let mut ctx = Context::new(order);
    let mut out = String::with_capacity(count as usize);

    for _ in 0..count {
        let symbol = dec.decode(ctx.model())?;

        if symbol == OTHER_SYMBOL {
            let len = dec.decode(&len_model)?;
            if !(1..=4).contains(&len) {
                return decode_corrupt_error("text escape declared an impossible UTF-8 length");
            }
            let mut bytes = Vec::with_capacity(len);
            for _ in 0..len {
                bytes.push(dec.decode(&byte_model)? as u8);
            }
            let ch = std::str::from_utf8(&bytes).ok().and_then(|s| s.chars().next());
            let ch = match ch {
                Some(c) => c,
                None => return decode_corrupt_error("text escape was not valid UTF-8"),
            };
            out.push(ch);
            ctx.advance(symbol);
        }
        else {
            out.push(EnglishOrder0::char_for(symbol));
            ctx.advance(symbol);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str, order: TextOrder) -> usize {
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            encode_text(&mut enc, s, order).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        let decoded = decode_text(&mut dec, order).unwrap();
        assert_eq!(decoded, s);
        buf.len()
    }

    #[test]
    fn order0_roundtrips_hello_world() {
        roundtrip("Hello, World!", TextOrder::Order0);
    }

    #[test]
    fn order1_compresses_better_than_order0_on_prose() {
        let prose = "The quick brown fox jumps over the lazy dog.";
        let order0_len = roundtrip(prose, TextOrder::Order0);
        let order1_len = roundtrip(prose, TextOrder::Order1);
        log::info!("order0={order0_len} bytes order1={order1_len} bytes for {prose:?}");
        assert!(order1_len <= order0_len);
    }

    #[test]
    fn order2_roundtrips_prose() {
        roundtrip("The quick brown fox jumps over the lazy dog.", TextOrder::Order2);
    }

    #[test]
    fn empty_string_roundtrips() {
        for order in [TextOrder::Order0, TextOrder::Order1, TextOrder::Order2] {
            roundtrip("", order);
        }
    }

    #[test]
    fn out_of_table_code_points_escape_and_roundtrip() {
        for order in [TextOrder::Order0, TextOrder::Order1, TextOrder::Order2] {
            roundtrip("café — 日本語 — €100", order);
        }
    }

    #[test]
    fn arbitrary_unicode_roundtrips_all_orders() {
        let samples = ["", "a", "    ", "🎉🎉🎉", "\u{0}\u{1}\u{7f}", "mixed Ünïcödé 文字"];
        for order in [TextOrder::Order0, TextOrder::Order1, TextOrder::Order2] {
            for s in samples {
                roundtrip(s, order);
            }
        }
    }
}
