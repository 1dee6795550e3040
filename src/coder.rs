// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The E3-style arithmetic coder: a 32-bit-precision range coder with underflow-safe
//! renormalisation, driving a [`BitWriter`]/[`BitReader`] with symbols drawn from a [`Model`].

use std::io;

use log::trace;

use crate::errors::Result;
use crate::io::{BitReader, BitWriter};
use crate::model::Model;

const STATE_BITS: u32 = 32;
const STATE_MAX: u32 = u32::MAX;
const HALF: u32 = 1 << 31;
const QUARTER: u32 = 1 << 30;
const THREE_QUARTER: u32 = HALF + QUARTER;

/// Encodes a sequence of symbols against a sequence of models into a bit stream.
///
/// The interval `[low, high]` (both inclusive) narrows with every symbol; `pending` counts
/// deferred underflow bits accrued while the interval straddles the midpoint without fully
/// committing to either half ("E3 underflow").
pub struct Encoder<W> {
    writer: BitWriter<W>,
    low: u32,
    high: u32,
    pending: u32,
}

impl<W: io::Write> Encoder<W> {
    pub fn new(sink: W) -> Self {
        Encoder { writer: BitWriter::new(sink), low: 0, high: STATE_MAX, pending: 0 }
    }

    /// Encodes one symbol against `model`. The caller is responsible for `symbol` being a valid
    /// index into `model`'s alphabet; this is a programmer error, not a recoverable one, matching
    /// the probability model contract.
    pub fn encode(&mut self, model: &dyn Model, symbol: usize) -> Result<()> {
        let total = u64::from(model.total());
        let range_span = model.range(symbol);
        let range = u64::from(self.high - self.low + 1);

        self.high = self.low + ((range * u64::from(range_span.hi)) / total) as u32 - 1;
        self.low += ((range * u64::from(range_span.lo)) / total) as u32;

        self.renormalise()?;
        Ok(())
    }

    fn renormalise(&mut self) -> Result<()> {
        loop {
            if self.high < HALF {
                self.emit_with_pending(false)?;
            }
            else if self.low >= HALF {
                self.emit_with_pending(true)?;
                self.low -= HALF;
                self.high -= HALF;
            }
            else if self.low >= QUARTER && self.high < THREE_QUARTER {
                self.pending += 1;
                self.low -= QUARTER;
                self.high -= QUARTER;
            }
            else {
                break;
            }

            self.low = (self.low << 1) & STATE_MAX;
            self.high = ((self.high << 1) & STATE_MAX) | 1;
        }
        Ok(())
    }

    fn emit_with_pending(&mut self, bit: bool) -> Result<()> {
        trace!("renormalise: emitting bit {} plus {} pending underflow bit(s)", bit as u8, self.pending);
        self.writer.write_bit(bit)?;
        self.writer.write_bits(!bit, self.pending)?;
        self.pending = 0;
        Ok(())
    }

    /// Closes the encoder: emits enough bits to uniquely identify `low`'s half of the final
    /// interval, then flushes the bit writer's trailing partial byte.
    ///
    /// Must be called exactly once after the last symbol.
    pub fn close(mut self) -> Result<W> {
        self.pending += 1;
        if self.low < QUARTER {
            self.emit_with_pending(false)?;
        }
        else {
            self.emit_with_pending(true)?;
        }
        self.writer.flush()
    }
}

/// Decodes a sequence of symbols from a bit stream, primed from its first 32 bits.
///
/// Has no intrinsic termination: the caller must stop requesting symbols when the surrounding
/// structure (the walker) says the stream has ended.
pub struct Decoder<R> {
    reader: BitReader<R>,
    low: u32,
    high: u32,
    value: u32,
}

impl<R: io::Read> Decoder<R> {
    pub fn new(source: R) -> Result<Self> {
        let mut reader = BitReader::new(source);
        let mut value: u32 = 0;
        for _ in 0..STATE_BITS {
            value = (value << 1) | (reader.read_bit()? as u32);
        }
        Ok(Decoder { reader, low: 0, high: STATE_MAX, value })
    }

    /// Decodes one symbol against `model`.
    pub fn decode(&mut self, model: &dyn Model) -> Result<usize> {
        let total = u64::from(model.total());
        let range = u64::from(self.high - self.low + 1);

        let cf_unclamped =
            ((u64::from(self.value - self.low) + 1) * total - 1) / range;
        let cf = cf_unclamped.min(total - 1) as u32;

        let symbol = model.find(cf);
        let range_span = model.range(symbol);

        self.high = self.low + ((range * u64::from(range_span.hi)) / total) as u32 - 1;
        self.low += ((range * u64::from(range_span.lo)) / total) as u32;

        self.renormalise()?;
        Ok(symbol)
    }

    fn renormalise(&mut self) -> Result<()> {
        let mut shifts = 0u32;
        loop {
            if self.high < HALF {
                // no bit emitted in the decoder; just shift.
            }
            else if self.low >= HALF {
                self.low -= HALF;
                self.high -= HALF;
                self.value -= HALF;
            }
            else if self.low >= QUARTER && self.high < THREE_QUARTER {
                self.low -= QUARTER;
                self.high -= QUARTER;
                self.value -= QUARTER;
            }
            else {
                break;
            }

            self.low = (self.low << 1) & STATE_MAX;
            self.high = ((self.high << 1) & STATE_MAX) | 1;
            self.value = ((self.value << 1) & STATE_MAX) | (self.reader.read_bit()? as u32);
            shifts += 1;
        }
        if shifts > 0 {
            trace!("renormalise: consumed {} bit(s)", shifts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FrequencyTable, Uniform};

    fn roundtrip(model: &dyn Model, symbols: &[usize]) {
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            for &s in symbols {
                enc.encode(model, s).unwrap();
            }
            enc.close().unwrap();
        }

        let mut dec = Decoder::new(&buf[..]).unwrap();
        for &expect in symbols {
            assert_eq!(dec.decode(model).unwrap(), expect);
        }
    }

    #[test]
    fn uniform_256_scenario_roundtrips() {
        let model = Uniform::new(256).unwrap();
        let symbols = [0, 1, 2, 255, 128, 64, 32, 16, 8, 4, 2, 1, 0];
        roundtrip(&model, &symbols);
    }

    #[test]
    fn frequency_table_scenario_roundtrips() {
        let model = FrequencyTable::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        let symbols = [0, 9, 5, 3, 7, 1, 8, 2, 4, 6, 0, 0, 9, 9];
        roundtrip(&model, &symbols);
    }

    #[test]
    fn long_uniform_stream_roundtrips() {
        let model = Uniform::new(16).unwrap();
        let symbols: Vec<usize> = (0..2000).map(|i| i % 16).collect();
        roundtrip(&model, &symbols);
    }

    #[test]
    fn skewed_frequency_table_roundtrips_and_compresses() {
        // Heavily skewed toward symbol 0; a long run should compress to well under one byte per
        // symbol.
        let model = FrequencyTable::new(&[1000, 1, 1, 1]).unwrap();
        let symbols: Vec<usize> = std::iter::repeat(0usize).take(500).collect();

        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            for &s in &symbols {
                enc.encode(&model, s).unwrap();
            }
            enc.close().unwrap();
        }
        assert!(buf.len() < 500 / 4, "expected substantial compression, got {} bytes", buf.len());

        let mut dec = Decoder::new(&buf[..]).unwrap();
        for &expect in &symbols {
            assert_eq!(dec.decode(&model).unwrap(), expect);
        }
    }

    #[test]
    fn empty_symbol_stream_roundtrips() {
        let model = Uniform::new(2).unwrap();
        roundtrip(&model, &[]);
    }
}
