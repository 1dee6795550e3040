// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type returned by every fallible
//! operation in this crate.

use std::fmt;
use std::io;

/// The bit offset into a stream at which an I/O failure was observed, for diagnostics.
pub type BitOffset = u64;

/// `CodecError` enumerates every externally distinguishable failure this crate can report:
/// an I/O failure, an ill-formed model, an out-of-range symbol, a corrupt decoded stream, or
/// an unsupported field kind.
#[derive(Debug)]
pub enum CodecError {
    /// The underlying byte source or sink failed. Carries the bit offset at which the failure was
    /// observed, for diagnostics.
    Io { source: io::Error, bit_offset: BitOffset },
    /// A caller constructed an ill-formed probability model: empty alphabet, a zero-frequency
    /// symbol, or a total exceeding `2^30`.
    InvalidModel(&'static str),
    /// A caller asked to encode a symbol outside a model's alphabet.
    InvalidSymbol { symbol: usize, alphabet: usize },
    /// The decoded stream violates a schema invariant: an out-of-range enum index, an overlong
    /// varint, an impossible declared length, or invalid UTF-8 under a text-tagged payload.
    DecodeCorrupt(&'static str),
    /// A schema field kind appeared that the scalar codec does not cover.
    UnsupportedKind(&'static str),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io { source, bit_offset } => {
                write!(f, "io error at bit offset {}: {}", bit_offset, source)
            }
            CodecError::InvalidModel(msg) => write!(f, "invalid model: {}", msg),
            CodecError::InvalidSymbol { symbol, alphabet } => {
                write!(f, "symbol {} is out of range for alphabet of size {}", symbol, alphabet)
            }
            CodecError::DecodeCorrupt(msg) => write!(f, "corrupt stream: {}", msg),
            CodecError::UnsupportedKind(msg) => write!(f, "unsupported field kind: {}", msg),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Convenience constructor for [`CodecError::InvalidModel`].
pub fn invalid_model_error<T>(msg: &'static str) -> Result<T> {
    log::warn!("rejecting model: {}", msg);
    Err(CodecError::InvalidModel(msg))
}

/// Convenience constructor for [`CodecError::InvalidSymbol`].
pub fn invalid_symbol_error<T>(symbol: usize, alphabet: usize) -> Result<T> {
    Err(CodecError::InvalidSymbol { symbol, alphabet })
}

/// Convenience constructor for [`CodecError::DecodeCorrupt`].
pub fn decode_corrupt_error<T>(msg: &'static str) -> Result<T> {
    log::warn!("corrupt stream: {}", msg);
    Err(CodecError::DecodeCorrupt(msg))
}

/// Convenience constructor for [`CodecError::UnsupportedKind`].
pub fn unsupported_kind_error<T>(msg: &'static str) -> Result<T> {
    Err(CodecError::UnsupportedKind(msg))
}

/// Wraps a `std::io::Error` observed at the given bit offset into a [`CodecError::Io`].
pub fn io_error_at<T>(source: io::Error, bit_offset: BitOffset) -> Result<T> {
    Err(CodecError::Io { source, bit_offset })
}
