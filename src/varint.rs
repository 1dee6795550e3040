// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Varint and zig-zag integer encoding.
//!
//! These are pure byte-vector transforms; the scalar codec feeds the resulting bytes through the
//! entropy coder one 256-alphabet symbol at a time.

/// Maximum varint length for a 64-bit value: `ceil(64 / 7) == 10` bytes.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes `value` as a little-endian base-128 varint: 7 bits per byte, MSB set on every byte but
/// the last.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
            out.push(byte);
        }
        else {
            out.push(byte);
            break;
        }
    }
    out
}

/// Decodes a varint from `bytes`, consuming bytes from the front of the iterator one at a time.
///
/// Returns the decoded value and the number of bytes consumed. Errors with
/// [`crate::errors::CodecError::DecodeCorrupt`] if more than [`MAX_VARINT_LEN`] bytes are
/// consumed without terminating.
pub fn decode_varint<I: Iterator<Item = crate::errors::Result<u8>>>(
    mut bytes: I,
) -> crate::errors::Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut count = 0usize;

    loop {
        if count == MAX_VARINT_LEN {
            return crate::errors::decode_corrupt_error("varint longer than 10 bytes");
        }

        let byte = match bytes.next() {
            Some(b) => b?,
            None => return crate::errors::decode_corrupt_error("varint truncated by end of stream"),
        };
        count += 1;

        value |= u64::from(byte & 0x7f) << (7 * (count - 1));

        if byte & 0x80 == 0 {
            return Ok((value, count));
        }
    }
}

/// Zig-zag encodes a signed 64-bit value so small-magnitude values map to small unsigned ones.
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

/// Zig-zag encodes a signed 32-bit value.
pub fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`].
pub fn zigzag_decode32(z: u32) -> i32 {
    ((z >> 1) as i32) ^ -((z & 1) as i32)
}
