// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Field-name priors for V-contextual and V-bitpacked: a closed set of recognised field names,
//! each biasing its byte-level distribution towards the value ranges typical of that domain
//! concept (battery levels cluster high, hop counts are small, RSSI is a zig-zagged mid-range
//! negative dBm figure, and so on).

use smallvec::SmallVec;

use crate::model::FrequencyTable;

/// Case-insensitive substring match against a closed list, in priority order (first match wins).
fn matches_any(name: &str, needles: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// The recognised domain shapes a varint byte can take.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DomainShape {
    /// Battery level: a percentage that is usually high (50-100).
    Battery,
    /// Hop count: usually 0-7.
    HopCount,
    /// Channel number: usually 0.
    Channel,
    /// Dilution-of-precision style quality figure: usually small.
    SmallMagnitude,
    /// RSSI or similar signal strength, zig-zagged: favours a mid-range negative dBm value.
    SignalStrength,
    /// A monotonically increasing identifier or counter: favours small values, grows over time.
    IdOrCount,
    /// A timestamp: no strong low-byte bias (treated close to uniform with a gentle skew).
    Timestamp,
    /// Nothing recognised; caller falls back to the generic adaptive table.
    Generic,
}

/// Classifies a field name against the closed set of recognised domain shapes: coordinate,
/// altitude, node-id, RSSI, battery, hops, channel, temperature, humidity, pressure, and so on.
pub fn classify(field_name: &str) -> DomainShape {
    if matches_any(field_name, &["battery"]) {
        DomainShape::Battery
    }
    else if matches_any(field_name, &["hop"]) {
        DomainShape::HopCount
    }
    else if matches_any(field_name, &["channel"]) {
        DomainShape::Channel
    }
    else if matches_any(field_name, &["dop", "accuracy", "precision"]) {
        DomainShape::SmallMagnitude
    }
    else if matches_any(field_name, &["rssi", "signal_strength", "signal"]) {
        DomainShape::SignalStrength
    }
    else if matches_any(field_name, &["node_id", "nodeid", "id", "count", "hops_remaining"]) {
        DomainShape::IdOrCount
    }
    else if matches_any(field_name, &["timestamp", "time", "ts"]) {
        DomainShape::Timestamp
    }
    else if matches_any(
        field_name,
        &["coordinate", "altitude", "latitude", "longitude", "temperature", "humidity", "pressure"],
    ) {
        DomainShape::SmallMagnitude
    }
    else {
        DomainShape::Generic
    }
}

/// Builds a 256-symbol frequency table over varint bytes for `shape`. Every table keeps a floor of
/// 1 so every byte value remains representable; the bias favours the value range the domain
/// concept typically produces.
pub fn table_for_shape(shape: DomainShape) -> FrequencyTable {
    let mut freqs: SmallVec<[u32; 256]> = SmallVec::from_elem(4, 256);

    match shape {
        DomainShape::Battery => {
            // Percentages in [50, 100] dominate; low battery is rarer but not negligible.
            for (i, f) in freqs.iter_mut().enumerate().take(101) {
                *f = if (50..=100).contains(&i) { 200 } else { 20 };
            }
        }
        DomainShape::HopCount => {
            for (i, f) in freqs.iter_mut().enumerate().take(8) {
                *f = 600 - (i as u32) * 60;
            }
        }
        DomainShape::Channel => {
            freqs[0] = 900;
            for f in freqs.iter_mut().take(16).skip(1) {
                *f = 60;
            }
        }
        DomainShape::SmallMagnitude => {
            for (i, f) in freqs.iter_mut().enumerate().take(32) {
                *f = 400 - (i as u32) * 10;
            }
        }
        DomainShape::SignalStrength => {
            // Zig-zagged, so small unsigned values correspond to small-magnitude signed dBm
            // figures clustered around a typical -60..-90 dBm range once unwound; bias the low
            // continuation-byte range generously.
            for (i, f) in freqs.iter_mut().enumerate().take(200) {
                *f = 300 - (i as u32).min(250);
            }
        }
        DomainShape::IdOrCount => {
            for (i, f) in freqs.iter_mut().enumerate().take(64) {
                *f = 300 - (i as u32) * 4;
            }
        }
        DomainShape::Timestamp => {
            // Timestamps vary across their full width; keep close to uniform with a mild bias
            // towards continuation (values rarely terminate in the first byte).
            for f in freqs.iter_mut() {
                *f = 10;
            }
        }
        DomainShape::Generic => {
            // The V-adaptive default: skew gently toward small byte values, typical of varint
            // payloads in practice.
            for (i, f) in freqs.iter_mut().enumerate().take(48) {
                *f = 120 - (i as u32) * 2;
            }
        }
    }

    FrequencyTable::new(&freqs).expect("domain-shaped frequency table must be well-formed")
}

/// Simple name heuristics: `id`/`count`/`timestamp` substrings steer the initial distribution.
/// Used by V-adaptive directly (V-contextual supersedes it with [`classify`]/[`table_for_shape`]).
pub fn adaptive_table_for(field_name: &str) -> FrequencyTable {
    if matches_any(field_name, &["id", "count"]) {
        table_for_shape(DomainShape::IdOrCount)
    }
    else if matches_any(field_name, &["timestamp", "time"]) {
        table_for_shape(DomainShape::Timestamp)
    }
    else {
        table_for_shape(DomainShape::Generic)
    }
}

/// V-type's varint table: skewed toward small byte values, one shared table regardless of field
/// identity.
pub fn type_varint_table() -> FrequencyTable {
    table_for_shape(DomainShape::Generic)
}

/// Field names for which V-bitpacked's enum-prediction transform declares a "common value" prior.
/// The prior is always the enum's first declared value (index 0) — the common case for
/// status/kind/type-shaped enums, whose default variant is declared first.
const ENUM_PREDICTION_FIELDS: &[&str] = &["status", "type", "kind", "mode", "state"];

pub fn has_enum_prediction_prior(field_name: &str) -> bool {
    let lower = field_name.to_ascii_lowercase();
    ENUM_PREDICTION_FIELDS.iter().any(|&n| lower == n || lower.ends_with(&format!("_{n}")))
}

/// The distinguished field name V-contextual's port-number/text-payload contract point keys off
/// of.
pub const PORT_NUMBER_FIELD: &str = "port_number";
/// The bytes field V-contextual's text escape applies to when a sibling [`PORT_NUMBER_FIELD`]
/// indicates a text payload.
pub const PAYLOAD_FIELD: &str = "payload";

/// Whether an enum value's name marks the "text payload" convention for [`PORT_NUMBER_FIELD`].
pub fn is_text_payload_value_name(name: &str) -> bool {
    name.to_ascii_uppercase().contains("TEXT")
}

/// The encoder-side heuristic for an *untagged* payload: UTF-8-valid and more than 80% printable
/// ASCII.
pub fn looks_like_text(bytes: &[u8]) -> bool {
    let Ok(s) = std::str::from_utf8(bytes) else {
        return false;
    };
    if s.is_empty() {
        return false;
    }
    let printable = s.chars().filter(|c| c.is_ascii_graphic() || *c == ' ').count();
    (printable as f64) / (s.chars().count() as f64) > 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::assert_model_consistent;

    #[test]
    fn every_domain_shape_table_is_consistent() {
        for shape in [
            DomainShape::Battery,
            DomainShape::HopCount,
            DomainShape::Channel,
            DomainShape::SmallMagnitude,
            DomainShape::SignalStrength,
            DomainShape::IdOrCount,
            DomainShape::Timestamp,
            DomainShape::Generic,
        ] {
            assert_model_consistent(&table_for_shape(shape));
        }
    }

    #[test]
    fn classify_recognises_named_fields() {
        assert_eq!(classify("battery_level"), DomainShape::Battery);
        assert_eq!(classify("hop_count"), DomainShape::HopCount);
        assert_eq!(classify("channel"), DomainShape::Channel);
        assert_eq!(classify("rssi"), DomainShape::SignalStrength);
        assert_eq!(classify("node_id"), DomainShape::IdOrCount);
        assert_eq!(classify("altitude"), DomainShape::SmallMagnitude);
        assert_eq!(classify("unrelated_field"), DomainShape::Generic);
    }

    #[test]
    fn looks_like_text_recognises_prose_and_rejects_binary() {
        assert!(looks_like_text(b"Hello from the mesh network!"));
        assert!(!looks_like_text(&[0u8, 1, 2, 255, 254, 253]));
    }

    #[test]
    fn enum_prediction_fields_are_recognised() {
        assert!(has_enum_prediction_prior("status"));
        assert!(has_enum_prediction_prior("link_status"));
        assert!(!has_enum_prediction_prior("altitude"));
    }
}
