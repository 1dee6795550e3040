// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The walker-local model registry: given a field path and descriptor, produces the [`Model`] the
//! active [`Policy`] selects for it, caching path-keyed models for V-adaptive and above.

use hashbrown::HashMap;

use crate::model::{FrequencyTable, Model, Uniform};
use crate::policy::{names, BitpackFeatures, Policy};
use crate::reflect::EnumDescriptor;
use crate::scalar::VarintModels;
use crate::text::TextOrder;

/// Picks the active [`Policy`]'s model for every symbol the walker and scalar codec need, caching
/// per-path models as they are first requested. Scoped to a single compress/decompress call:
/// created lazily, per record.
pub struct ModelHub {
    policy: Policy,
    presence: Uniform,
    bool_shared: Uniform,
    byte_shared: Uniform,
    varint_shared: FrequencyTable,
    path_models: HashMap<String, Box<dyn Model>>,
    enum_models: HashMap<&'static str, Box<dyn Model>>,
}

impl ModelHub {
    pub fn new(policy: Policy) -> Self {
        ModelHub {
            policy,
            presence: Uniform::new(2).expect("uniform-2 is always well-formed"),
            bool_shared: Uniform::new(2).expect("uniform-2 is always well-formed"),
            byte_shared: Uniform::new(256).expect("uniform-256 is always well-formed"),
            varint_shared: names::type_varint_table(),
            path_models: HashMap::new(),
            enum_models: HashMap::new(),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn bitpack_features(&self) -> BitpackFeatures {
        self.policy.bitpack_features()
    }

    /// The presence symbol's model: always `Uniform(2)`, independent of policy. The canonical
    /// wire format fixes this regardless of which policy selects payload models.
    pub fn presence_model(&self) -> &dyn Model {
        &self.presence
    }

    /// A throwaway `Uniform(2)` for one-off flag bits (is-text, enum-prediction, dense/sparse
    /// strategy) that are not cached per path — they are cheap to construct and never reused
    /// across calls.
    pub fn flag_model(&self) -> Uniform {
        Uniform::new(2).expect("uniform-2 is always well-formed")
    }

    pub fn bool_model(&mut self, path: &str) -> &dyn Model {
        if self.policy.is_path_keyed() {
            self.path_models
                .entry(path.to_string())
                .or_insert_with(|| Box::new(Uniform::new(2).expect("uniform-2 is always well-formed")))
                .as_ref()
        }
        else {
            &self.bool_shared
        }
    }

    pub fn enum_model(&mut self, path: &str, desc: &EnumDescriptor) -> &dyn Model {
        let n = desc.values.len().max(1);
        if self.policy.is_path_keyed() {
            self.path_models
                .entry(path.to_string())
                .or_insert_with(|| Box::new(Uniform::new(n).expect("enum alphabet is non-empty")))
                .as_ref()
        }
        else {
            self.enum_models
                .entry(desc.full_name)
                .or_insert_with(|| Box::new(Uniform::new(n).expect("enum alphabet is non-empty")))
                .as_ref()
        }
    }

    pub fn fixed_byte_model(&mut self, path: &str) -> &dyn Model {
        if self.policy.is_path_keyed() {
            self.path_models
                .entry(path.to_string())
                .or_insert_with(|| Box::new(Uniform::new(256).expect("uniform-256 is always well-formed")))
                .as_ref()
        }
        else {
            &self.byte_shared
        }
    }

    fn varint_table(&self, field_name: &str) -> FrequencyTable {
        match self.policy {
            Policy::Type => self.varint_shared.clone(),
            Policy::Adaptive => names::adaptive_table_for(field_name),
            Policy::Contextual | Policy::Bitpacked(_) => names::table_for_shape(names::classify(field_name)),
        }
    }

    /// The pair of models a varint encodes against: V-bitpacked's varint-byte-position split when
    /// that transform is enabled, otherwise one shared model for every byte position.
    pub fn varint_models(&mut self, path: &str, field_name: &str) -> VarintModels<'_> {
        if matches!(self.policy, Policy::Type) {
            return VarintModels::uniform(&self.varint_shared);
        }

        if self.bitpack_features().contains(BitpackFeatures::VARINT_BYTE_POSITION) {
            // First bytes skew even smaller than the domain table already suggests: a varint's
            // first byte is the one most likely to be terminal for small values. Continuation
            // bytes are biased toward being terminal too, but less strongly.
            let first_table = self.varint_table(field_name);
            let rest_table = names::table_for_shape(names::DomainShape::Timestamp);
            let first_key = format!("{path}#first");
            let rest_key = format!("{path}#rest");
            self.path_models.entry(first_key.clone()).or_insert_with(|| Box::new(first_table));
            self.path_models.entry(rest_key.clone()).or_insert_with(|| Box::new(rest_table));
            let first = self.path_models.get(&first_key).unwrap().as_ref();
            let rest = self.path_models.get(&rest_key).unwrap().as_ref();
            VarintModels::split(first, rest)
        }
        else {
            let table = self.varint_table(field_name);
            let key = path.to_string();
            let model = self.path_models.entry(key).or_insert_with(|| Box::new(table)).as_ref();
            VarintModels::uniform(model)
        }
    }

    pub fn length_models(&mut self, path: &str) -> VarintModels<'_> {
        self.varint_models(path, "count")
    }

    /// Which English character model order backs a string field's text codec, per simple
    /// field-name heuristics, extending the same adaptive-policy name heuristics to text.
    pub fn text_order(&self, field_name: &str) -> TextOrder {
        if matches!(self.policy, Policy::Type) {
            return TextOrder::Order0;
        }
        let lower = field_name.to_ascii_lowercase();
        if lower.contains("payload") || lower.contains("body") || lower.contains("message") {
            TextOrder::Order2
        }
        else if lower.contains("name") || lower.contains("text") || lower.contains("description") {
            TextOrder::Order1
        }
        else {
            TextOrder::Order0
        }
    }

    /// V-bitpacked's enum-prediction declared prior, when `field_name` is one of the recognised
    /// names and the transform is enabled.
    pub fn enum_prediction_prior(&self, field_name: &str) -> Option<usize> {
        if self.bitpack_features().contains(BitpackFeatures::ENUM_PREDICTION)
            && names::has_enum_prediction_prior(field_name)
        {
            Some(0)
        }
        else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::EnumValue;

    const COLORS: EnumDescriptor = EnumDescriptor {
        full_name: "test.Color",
        values: &[
            EnumValue { name: "RED", number: 0, index: 0 },
            EnumValue { name: "GREEN", number: 1, index: 1 },
        ],
    };

    #[test]
    fn type_policy_shares_enum_model_by_name_not_path() {
        let mut hub = ModelHub::new(Policy::Type);
        let a = hub.enum_model("a.color", &COLORS).total();
        let b = hub.enum_model("b.color", &COLORS).total();
        assert_eq!(a, b);
        assert_eq!(hub.enum_models.len(), 1);
    }

    #[test]
    fn adaptive_policy_caches_per_path() {
        let mut hub = ModelHub::new(Policy::Adaptive);
        hub.bool_model("a.flag");
        hub.bool_model("b.flag");
        assert_eq!(hub.path_models.len(), 2);
    }

    #[test]
    fn bitpacked_varint_byte_position_caches_two_models_per_path() {
        let mut hub = ModelHub::new(Policy::bitpacked());
        hub.varint_models("m.count", "count");
        assert_eq!(hub.path_models.len(), 2);
    }

    #[test]
    fn enum_prediction_prior_only_for_recognised_names_when_enabled() {
        let hub = ModelHub::new(Policy::bitpacked());
        assert_eq!(hub.enum_prediction_prior("status"), Some(0));
        assert_eq!(hub.enum_prediction_prior("altitude"), None);

        let hub_off = ModelHub::new(Policy::Contextual);
        assert_eq!(hub_off.enum_prediction_prior("status"), None);
    }
}
