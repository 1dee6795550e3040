// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements the bit-level I/O primitives the arithmetic coder is built on.
//!
//! Unlike a cache-based multi-bit reader (useful when a format wants to pull fixed-width fields
//! off the wire), the coder in this crate renormalises one bit at a time under its own control, so
//! [`BitWriter`] and [`BitReader`] expose `write_bit`/`read_bit` rather than `read_bits_leq32`.

mod bitio;

pub use bitio::{BitReader, BitWriter};
