// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `structpress`: a schema-directed record compressor built on a range/arithmetic entropy codec.
//!
//! A record's declared fields are walked in schema order by [`walker`], each field's payload fed
//! to the [`coder`]'s arithmetic encoder/decoder against a probability [`model`] chosen by the
//! active [`policy::Policy`]. The schema itself is supplied through the external reflection
//! contract in [`reflect`] — this crate never generates message types, only compresses instances
//! of them.
//!
//! ```ignore
//! use structpress::{compress, decompress, policy::Policy};
//!
//! let bytes = compress(&my_record, Policy::bitpacked())?;
//! let mut restored = MyRecord::default();
//! decompress(&bytes, Policy::bitpacked(), &mut restored)?;
//! ```

pub mod coder;
pub mod errors;
pub mod io;
pub mod model;
pub mod policy;
pub mod reflect;
pub mod scalar;
pub mod text;
pub mod varint;
pub mod walker;

use errors::Result;
use policy::{ModelHub, Policy};
use reflect::ReflectMessage;

/// Compresses `msg` under `policy`, returning the complete wire-format byte stream: a
/// presence-bit-prefixed field traversal followed by the arithmetic coder's final flush.
///
/// A record produced by one [`Policy`] cannot be decoded under a different one — the model
/// registry each policy builds is not part of the wire format.
pub fn compress(msg: &dyn ReflectMessage, policy: Policy) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut enc = coder::Encoder::new(&mut buf);
        let mut hub = ModelHub::new(policy);
        walker::compress_message(&mut enc, &mut hub, msg, "")?;
        enc.close()?;
    }
    log::debug!(
        "compress: message={} policy={:?} bytes={}",
        msg.descriptor().full_name,
        policy,
        buf.len()
    );
    Ok(buf)
}

/// Decompresses `bytes` into `msg`, mirroring [`compress`] under the same `policy`.
///
/// `msg` should be a default-valued instance; decoded fields are set on top of whatever is
/// already present, exactly the way [`reflect::ReflectMessage::set_scalar`] and friends are
/// specified to behave.
pub fn decompress(bytes: &[u8], policy: Policy, msg: &mut dyn ReflectMessage) -> Result<()> {
    log::debug!(
        "decompress: message={} policy={:?} bytes={}",
        msg.descriptor().full_name,
        policy,
        bytes.len()
    );
    let mut dec = coder::Decoder::new(bytes)?;
    let mut hub = ModelHub::new(policy);
    walker::decompress_message(&mut dec, &mut hub, msg, "")
}
