// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model-selection policies: four stacked variants, each a distinct `model_for(path, field)`
//! strategy layered over the same walker skeleton.
//!
//! Each policy produces a distinct wire format — a file produced by one policy is not decodable
//! by another; [`Policy`] is the closed, compile-time-enumerable set a caller picks from, in the
//! spirit of the teacher's `CodecParameters`/registry split but collapsed to a plain enum since
//! this crate has no need for third-party policy plugins.

mod hub;
mod names;

pub use hub::ModelHub;

use bitflags::bitflags;

bitflags! {
    /// The optional V-bitpacked transforms. Each bit is independently toggleable;
    /// [`BitpackFeatures::all`] (every transform present) is used as this crate's `Default`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct BitpackFeatures: u8 {
        /// Pack consecutive singular `bool` fields (cluster size 2..=8) into one presence byte
        /// and one value byte instead of per-field presence + value symbols.
        const BOOLEAN_CLUSTERING = 1 << 0;
        /// Use distinct models for a varint's first byte vs. its continuation bytes.
        const VARINT_BYTE_POSITION = 1 << 1;
        /// Emit a 1-bit "matches the common value" flag ahead of select enum fields.
        const ENUM_PREDICTION = 1 << 2;
    }
}

impl Default for BitpackFeatures {
    fn default() -> Self {
        BitpackFeatures::all()
    }
}

/// Which of the four model-selection policies drives a compress/decompress call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// V-type: one shared model per field kind (and per enum type), independent of field path.
    Type,
    /// V-adaptive: a model cached per dotted field path, seeded from simple field-name heuristics.
    Adaptive,
    /// V-contextual: V-adaptive plus a closed set of recognised domain field names and the
    /// port-number/payload text-escape contract point.
    Contextual,
    /// V-contextual plus the optional bit-level transforms.
    Bitpacked(BitpackFeatures),
}

impl Policy {
    /// The default, fully-featured bitpacked policy — every transform enabled.
    pub fn bitpacked() -> Self {
        Policy::Bitpacked(BitpackFeatures::default())
    }

    pub(crate) fn bitpack_features(self) -> BitpackFeatures {
        match self {
            Policy::Bitpacked(f) => f,
            _ => BitpackFeatures::empty(),
        }
    }

    /// Whether this policy recognises the closed set of domain field names and the
    /// port-number/payload text escape (V-contextual and above).
    pub(crate) fn is_contextual_or_above(self) -> bool {
        matches!(self, Policy::Contextual | Policy::Bitpacked(_))
    }

    /// Whether this policy caches models per field path rather than sharing one per kind
    /// (everything except V-type).
    pub(crate) fn is_path_keyed(self) -> bool {
        !matches!(self, Policy::Type)
    }
}
