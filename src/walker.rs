// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The schema walker: a paired compress/decompress traversal over a declared record, driven by
//! the [`reflect`](crate::reflect) interface and a [`ModelHub`].
//!
//! Traversal is depth-first, left-to-right over declared fields in schema order; the decoder
//! mirrors the encoder exactly, field by field, so no delimiter is ever needed between them.

use std::io;

use crate::coder::{Decoder, Encoder};
use crate::errors::{decode_corrupt_error, unsupported_kind_error, Result};
use crate::model::Uniform;
use crate::policy::{names, BitpackFeatures, ModelHub};
use crate::reflect::{
    Cardinality, FieldDescriptor, FieldKind, MessageDescriptor, ReflectMessage, ScalarOwned,
    ScalarRef,
};
use crate::scalar;

fn byte_model() -> Uniform {
    Uniform::new(256).expect("uniform-256 is always well-formed")
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    }
    else {
        format!("{path}.{name}")
    }
}

/// Resolves whether a sibling `port_number` enum field declares the `payload` bytes field on this
/// message as text. Returns `None` when no such field is present or set, in which case the
/// encoder falls back to a content heuristic.
fn resolve_port_number_text_hint(
    desc: &MessageDescriptor,
    msg: &dyn ReflectMessage,
) -> Option<bool> {
    let port_field = desc
        .fields
        .iter()
        .find(|f| f.name == names::PORT_NUMBER_FIELD && f.kind == FieldKind::Enum)?;
    if !msg.has(port_field) {
        return None;
    }
    let enum_desc = port_field.enum_descriptor?;
    let ScalarRef::Enum(number) = msg.get_scalar(port_field)
    else {
        return None;
    };
    let index = enum_desc.index_of(number)?;
    Some(names::is_text_payload_value_name(enum_desc.values[index].name))
}

// ---------------------------------------------------------------------------------------------
// Compress
// ---------------------------------------------------------------------------------------------

/// Encodes `msg` into `enc` following its descriptor's field order. `path` is the dotted field
/// path of `msg` itself (empty for the root message).
pub fn compress_message<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    msg: &dyn ReflectMessage,
    path: &str,
) -> Result<()> {
    let desc = msg.descriptor();
    let text_hint = resolve_port_number_text_hint(desc, msg);

    if matches!(hub.policy(), crate::policy::Policy::Bitpacked(_)) {
        compress_bitpacked_body(enc, hub, msg, desc, path, text_hint)
    }
    else {
        compress_dense_body(enc, hub, msg, desc, path, text_hint)
    }
}

/// The plain per-field presence + payload traversal shared by V-type/V-adaptive/V-contextual.
fn compress_dense_body<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    msg: &dyn ReflectMessage,
    desc: &MessageDescriptor,
    path: &str,
    text_hint: Option<bool>,
) -> Result<()> {
    for field in desc.fields {
        let present = msg.has(field);
        let presence_model = hub.presence_model();
        enc.encode(presence_model, present as usize)?;
        if present {
            compress_field(enc, hub, msg, field, path, text_hint)?;
        }
    }
    Ok(())
}

/// V-bitpacked's dense/sparse strategy: a 1-bit flag chosen by comparing the *bit* cost of dense
/// per-field presence against sparse `(delta, value)` pairs, followed by optional boolean-field
/// clustering within the dense branch.
fn compress_bitpacked_body<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    msg: &dyn ReflectMessage,
    desc: &MessageDescriptor,
    path: &str,
    text_hint: Option<bool>,
) -> Result<()> {
    let n = desc.fields.len();
    let present = desc.fields.iter().filter(|f| msg.has(f)).count();

    // Dense costs one presence bit per declared field. Sparse costs one bit for the varint
    // field-present count plus, per present field, an 8-bit field-number delta and no presence
    // bit at all — an explicit bit-level comparison, not a byte-size estimate.
    let dense_bits = n as u64;
    let sparse_bits = 8 + (present as u64) * 8;
    let use_sparse = sparse_bits < dense_bits;

    let strategy_model = hub.flag_model();
    enc.encode(&strategy_model, use_sparse as usize)?;

    if use_sparse {
        let length_models = hub.length_models(&child_path(path, "_present_count"));
        scalar::encode_varint_value(enc, present as u64, &length_models)?;

        let mut last_number = 0u32;
        for field in desc.fields.iter().filter(|f| msg.has(f)) {
            let delta_models = hub.length_models(&child_path(path, "_field_delta"));
            scalar::encode_varint_value(enc, u64::from(field.number - last_number), &delta_models)?;
            last_number = field.number;
            compress_field(enc, hub, msg, field, path, text_hint)?;
        }
        Ok(())
    }
    else {
        compress_dense_clustered(enc, hub, msg, desc, path, text_hint)
    }
}

/// Dense traversal with boolean-cluster packing: runs of 2..=8 consecutive singular `bool` fields
/// are packed into one presence byte and one value byte instead of per-field presence + value
/// symbols.
fn compress_dense_clustered<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    msg: &dyn ReflectMessage,
    desc: &MessageDescriptor,
    path: &str,
    text_hint: Option<bool>,
) -> Result<()> {
    let cluster_on = hub.bitpack_features().contains(BitpackFeatures::BOOLEAN_CLUSTERING);
    let fields = desc.fields;
    let mut i = 0;
    while i < fields.len() {
        let run_end = if cluster_on { bool_run_end(fields, i) } else { i };
        if run_end - i >= 2 {
            compress_bool_cluster(enc, msg, &fields[i..run_end])?;
            i = run_end;
        }
        else {
            let field = &fields[i];
            let present = msg.has(field);
            let presence_model = hub.presence_model();
            enc.encode(presence_model, present as usize)?;
            if present {
                compress_field(enc, hub, msg, field, path, text_hint)?;
            }
            i += 1;
        }
    }
    Ok(())
}

/// Finds the end (exclusive) of the run of consecutive singular `bool` fields starting at `from`,
/// capped at a cluster size of 8.
fn bool_run_end(fields: &[FieldDescriptor], from: usize) -> usize {
    let mut end = from;
    while end < fields.len()
        && end - from < 8
        && fields[end].kind == FieldKind::Bool
        && fields[end].cardinality == Cardinality::Singular
    {
        end += 1;
    }
    end
}

fn compress_bool_cluster<W: io::Write>(
    enc: &mut Encoder<W>,
    msg: &dyn ReflectMessage,
    cluster: &[FieldDescriptor],
) -> Result<()> {
    let byte_model = byte_model();
    let mut presence_byte: u8 = 0;
    let mut value_byte: u8 = 0;
    for (i, field) in cluster.iter().enumerate() {
        let present = msg.has(field);
        if present {
            presence_byte |= 1 << i;
            if let ScalarRef::Bool(true) = msg.get_scalar(field) {
                value_byte |= 1 << i;
            }
        }
    }
    enc.encode(&byte_model, presence_byte as usize)?;
    enc.encode(&byte_model, value_byte as usize)
}

/// Dispatches one present field's payload by cardinality.
fn compress_field<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    msg: &dyn ReflectMessage,
    field: &FieldDescriptor,
    path: &str,
    text_hint: Option<bool>,
) -> Result<()> {
    let fpath = child_path(path, field.name);
    match field.cardinality {
        Cardinality::Singular => {
            if field.kind == FieldKind::Message {
                compress_message(enc, hub, msg.get_message(field), &fpath)
            }
            else {
                compress_scalar(enc, hub, field, &fpath, msg.get_scalar(field), text_hint)
            }
        }
        Cardinality::List => {
            let list = msg.get_list(field);
            let length_path = format!("{fpath}._length");
            let length_models = hub.length_models(&length_path);
            scalar::encode_varint_value(enc, list.len() as u64, &length_models)?;

            let element_path = format!("{fpath}[]");
            for i in 0..list.len() {
                if field.kind == FieldKind::Message {
                    compress_message(enc, hub, list.get_message(i), &element_path)?;
                }
                else {
                    compress_scalar(enc, hub, field, &element_path, list.get_scalar(i), None)?;
                }
            }
            Ok(())
        }
        Cardinality::Map => {
            let map = msg.get_map(field);
            let length_path = format!("{fpath}._length");
            let length_models = hub.length_models(&length_path);
            scalar::encode_varint_value(enc, map.len() as u64, &length_models)?;

            let key_path = format!("{fpath}._key");
            let value_path = format!("{fpath}._value");
            let key_kind = field.map_key_kind.ok_or(crate::errors::CodecError::UnsupportedKind(
                "map field missing key kind",
            ))?;
            for (key, value) in map.iter() {
                compress_map_scalar(enc, hub, key_kind, &key_path, key)?;
                match value {
                    crate::reflect::MapValueRef::Scalar(v) => {
                        let value_kind = field.map_value_kind.ok_or(
                            crate::errors::CodecError::UnsupportedKind("map field missing value kind"),
                        )?;
                        compress_map_scalar(enc, hub, value_kind, &value_path, v)?;
                    }
                    crate::reflect::MapValueRef::Message(m) => {
                        compress_message(enc, hub, m, &value_path)?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Encodes a map key or scalar-valued map entry, for which there is no [`FieldDescriptor`] (only
/// a bare [`FieldKind`]) — built on the same scalar dispatch as a regular field, using a synthetic
/// descriptor-free path.
fn compress_map_scalar<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    kind: FieldKind,
    path: &str,
    value: ScalarRef<'_>,
) -> Result<()> {
    compress_scalar_kind(enc, hub, kind, None, "", path, value, None)
}

fn compress_scalar<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    field: &FieldDescriptor,
    path: &str,
    value: ScalarRef<'_>,
    text_hint: Option<bool>,
) -> Result<()> {
    compress_scalar_kind(enc, hub, field.kind, field.enum_descriptor, field.name, path, value, text_hint)
}

#[allow(clippy::too_many_arguments)]
fn compress_scalar_kind<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    kind: FieldKind,
    enum_desc: Option<&crate::reflect::EnumDescriptor>,
    field_name: &str,
    path: &str,
    value: ScalarRef<'_>,
    text_hint: Option<bool>,
) -> Result<()> {
    match (kind, value) {
        (FieldKind::Bool, ScalarRef::Bool(b)) => {
            let model = hub.bool_model(path);
            scalar::encode_bool(enc, model, b)
        }
        (FieldKind::Enum, ScalarRef::Enum(number)) => {
            let desc = enum_desc
                .ok_or(crate::errors::CodecError::UnsupportedKind("enum field missing its descriptor"))?;
            if let Some(prior_idx) = hub.enum_prediction_prior(field_name) {
                let predicted = desc.number_at(prior_idx);
                let matches_prior = predicted == Some(number);
                let flag_model = hub.flag_model();
                enc.encode(&flag_model, matches_prior as usize)?;
                if matches_prior {
                    return Ok(());
                }
            }
            let model = hub.enum_model(path, desc);
            scalar::encode_enum(enc, model, desc, number)
        }
        (FieldKind::Int32, ScalarRef::I32(v)) => {
            let models = hub.varint_models(path, field_name);
            scalar::encode_unsigned(enc, &models, v as u32 as u64)
        }
        (FieldKind::Int64, ScalarRef::I64(v)) => {
            let models = hub.varint_models(path, field_name);
            scalar::encode_unsigned(enc, &models, v as u64)
        }
        (FieldKind::UInt32, ScalarRef::U32(v)) => {
            let models = hub.varint_models(path, field_name);
            scalar::encode_unsigned(enc, &models, u64::from(v))
        }
        (FieldKind::UInt64, ScalarRef::U64(v)) => {
            let models = hub.varint_models(path, field_name);
            scalar::encode_unsigned(enc, &models, v)
        }
        (FieldKind::SInt32, ScalarRef::I32(v)) => {
            let models = hub.varint_models(path, field_name);
            scalar::encode_sint32(enc, &models, v)
        }
        (FieldKind::SInt64, ScalarRef::I64(v)) => {
            let models = hub.varint_models(path, field_name);
            scalar::encode_sint64(enc, &models, v)
        }
        (FieldKind::Fixed32, ScalarRef::U32(v)) => {
            let model = hub.fixed_byte_model(path);
            scalar::encode_fixed32(enc, model, v)
        }
        (FieldKind::SFixed32, ScalarRef::I32(v)) => {
            let model = hub.fixed_byte_model(path);
            scalar::encode_fixed32(enc, model, v as u32)
        }
        (FieldKind::Float, ScalarRef::F32(v)) => {
            let model = hub.fixed_byte_model(path);
            scalar::encode_float(enc, model, v)
        }
        (FieldKind::Fixed64, ScalarRef::U64(v)) => {
            let model = hub.fixed_byte_model(path);
            scalar::encode_fixed64(enc, model, v)
        }
        (FieldKind::SFixed64, ScalarRef::I64(v)) => {
            let model = hub.fixed_byte_model(path);
            scalar::encode_fixed64(enc, model, v as u64)
        }
        (FieldKind::Double, ScalarRef::F64(v)) => {
            let model = hub.fixed_byte_model(path);
            scalar::encode_double(enc, model, v)
        }
        (FieldKind::String, ScalarRef::Str(s)) => {
            let order = hub.text_order(field_name);
            scalar::encode_string(enc, s, order)
        }
        (FieldKind::Bytes, ScalarRef::Bytes(b)) => {
            compress_bytes(enc, hub, field_name, path, b, text_hint)
        }
        (FieldKind::Message, _) => {
            unsupported_kind_error("nested message handled outside the scalar codec")
        }
        _ => unsupported_kind_error("field kind and value representation disagree"),
    }
}

fn compress_bytes<W: io::Write>(
    enc: &mut Encoder<W>,
    hub: &mut ModelHub,
    field_name: &str,
    path: &str,
    bytes: &[u8],
    text_hint: Option<bool>,
) -> Result<()> {
    if field_name == names::PAYLOAD_FIELD && hub.policy().is_contextual_or_above() {
        // The port_number hint only inspects the enum variant's declared name; it says nothing
        // about whether these particular bytes are actually valid UTF-8. Re-check here so the
        // flag written to the wire always matches what was actually encoded.
        let wants_text = text_hint.unwrap_or_else(|| names::looks_like_text(bytes));
        let as_str = if wants_text { std::str::from_utf8(bytes).ok() } else { None };
        let flag_model = hub.flag_model();
        enc.encode(&flag_model, as_str.is_some() as usize)?;
        if let Some(s) = as_str {
            let order = hub.text_order(field_name);
            return scalar::encode_string(enc, s, order);
        }
    }

    let length_path = format!("{path}._length");
    let length_models = hub.length_models(&length_path);
    let byte_model = byte_model();
    scalar::encode_bytes(enc, &length_models, &byte_model, bytes)
}

// ---------------------------------------------------------------------------------------------
// Decompress
// ---------------------------------------------------------------------------------------------

/// Decodes into `msg`, mirroring [`compress_message`] exactly field-by-field.
pub fn decompress_message<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    msg: &mut dyn ReflectMessage,
    path: &str,
) -> Result<()> {
    if matches!(hub.policy(), crate::policy::Policy::Bitpacked(_)) {
        decompress_bitpacked_body(dec, hub, msg, path)
    }
    else {
        decompress_dense_body(dec, hub, msg, path)
    }
}

fn decompress_dense_body<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    msg: &mut dyn ReflectMessage,
    path: &str,
) -> Result<()> {
    let desc = msg.descriptor();
    for field in desc.fields {
        let presence_model = hub.presence_model();
        let present = dec.decode(presence_model)? != 0;
        if present {
            let text_hint = resolve_port_number_text_hint(desc, &*msg);
            decompress_field(dec, hub, msg, field, path, text_hint)?;
        }
    }
    Ok(())
}

fn decompress_bitpacked_body<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    msg: &mut dyn ReflectMessage,
    path: &str,
) -> Result<()> {
    let strategy_model = hub.flag_model();
    let use_sparse = dec.decode(&strategy_model)? != 0;

    if use_sparse {
        let length_models = hub.length_models(&child_path(path, "_present_count"));
        let present = scalar::decode_varint_value(dec, &length_models)?;
        if present > scalar::MAX_DECODE_LEN {
            return decode_corrupt_error("declared sparse field count exceeds the maximum supported field count");
        }

        let desc = msg.descriptor();
        let mut last_number = 0u32;
        for _ in 0..present {
            let delta_models = hub.length_models(&child_path(path, "_field_delta"));
            let delta = scalar::decode_varint_value(dec, &delta_models)?;
            let number = last_number
                + u32::try_from(delta)
                    .map_err(|_| crate::errors::CodecError::DecodeCorrupt("field number delta overflowed u32"))?;
            last_number = number;

            let field = desc
                .fields
                .iter()
                .find(|f| f.number == number)
                .ok_or(crate::errors::CodecError::DecodeCorrupt(
                    "sparse field number has no matching declared field",
                ))?;
            let text_hint = resolve_port_number_text_hint(desc, &*msg);
            decompress_field(dec, hub, msg, field, path, text_hint)?;
        }
        Ok(())
    }
    else {
        decompress_dense_clustered(dec, hub, msg, path)
    }
}

fn decompress_dense_clustered<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    msg: &mut dyn ReflectMessage,
    path: &str,
) -> Result<()> {
    let cluster_on = hub.bitpack_features().contains(BitpackFeatures::BOOLEAN_CLUSTERING);
    let desc = msg.descriptor();
    let fields = desc.fields;

    let mut i = 0;
    while i < fields.len() {
        let run_end = if cluster_on { bool_run_end(fields, i) } else { i };
        if run_end - i >= 2 {
            decompress_bool_cluster(dec, msg, &fields[i..run_end])?;
            i = run_end;
        }
        else {
            let field = &fields[i];
            let presence_model = hub.presence_model();
            let present = dec.decode(presence_model)? != 0;
            if present {
                let text_hint = resolve_port_number_text_hint(desc, &*msg);
                decompress_field(dec, hub, msg, field, path, text_hint)?;
            }
            i += 1;
        }
    }
    Ok(())
}

fn decompress_bool_cluster<R: io::Read>(
    dec: &mut Decoder<R>,
    msg: &mut dyn ReflectMessage,
    cluster: &[FieldDescriptor],
) -> Result<()> {
    let byte_model = byte_model();
    let presence_byte = dec.decode(&byte_model)? as u8;
    let value_byte = dec.decode(&byte_model)? as u8;
    for (i, field) in cluster.iter().enumerate() {
        if presence_byte & (1 << i) != 0 {
            let value = value_byte & (1 << i) != 0;
            msg.set_scalar(field, ScalarOwned::Bool(value));
        }
    }
    Ok(())
}

fn decompress_field<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    msg: &mut dyn ReflectMessage,
    field: &FieldDescriptor,
    path: &str,
    text_hint: Option<bool>,
) -> Result<()> {
    let fpath = child_path(path, field.name);
    match field.cardinality {
        Cardinality::Singular => {
            if field.kind == FieldKind::Message {
                decompress_message(dec, hub, msg.mutable_message(field), &fpath)
            }
            else {
                let value = decompress_scalar(dec, hub, field, &fpath, text_hint)?;
                msg.set_scalar(field, value);
                Ok(())
            }
        }
        Cardinality::List => {
            let length_path = format!("{fpath}._length");
            let length_models = hub.length_models(&length_path);
            let len = scalar::decode_varint_value(dec, &length_models)?;
            if len > scalar::MAX_DECODE_LEN {
                return decode_corrupt_error("declared list length exceeds the maximum supported element count");
            }

            let element_path = format!("{fpath}[]");
            let list = msg.mutable_list(field);
            for _ in 0..len {
                if field.kind == FieldKind::Message {
                    decompress_message(dec, hub, list.push_message(), &element_path)?;
                }
                else {
                    let value =
                        decompress_scalar_kind(dec, hub, field.kind, field.enum_descriptor, field.name, &element_path, None)?;
                    list.push_scalar(value);
                }
            }
            Ok(())
        }
        Cardinality::Map => {
            let length_path = format!("{fpath}._length");
            let length_models = hub.length_models(&length_path);
            let len = scalar::decode_varint_value(dec, &length_models)?;
            if len > scalar::MAX_DECODE_LEN {
                return decode_corrupt_error("declared map length exceeds the maximum supported entry count");
            }

            let key_path = format!("{fpath}._key");
            let value_path = format!("{fpath}._value");
            let key_kind = field
                .map_key_kind
                .ok_or(crate::errors::CodecError::UnsupportedKind("map field missing key kind"))?;
            let value_kind = field.map_value_kind;

            for _ in 0..len {
                let key = decompress_scalar_kind(dec, hub, key_kind, None, "", &key_path, None)?;
                if field.kind == FieldKind::Message {
                    let map = msg.mutable_map(field);
                    let handle = map.insert_message(key);
                    decompress_message(dec, hub, handle, &value_path)?;
                }
                else {
                    let value_kind = value_kind.ok_or(crate::errors::CodecError::UnsupportedKind(
                        "map field missing value kind",
                    ))?;
                    let value = decompress_scalar_kind(dec, hub, value_kind, None, "", &value_path, None)?;
                    msg.mutable_map(field).insert_scalar(key, value);
                }
            }
            Ok(())
        }
    }
}

fn decompress_scalar<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    field: &FieldDescriptor,
    path: &str,
    text_hint: Option<bool>,
) -> Result<ScalarOwned> {
    decompress_scalar_kind(dec, hub, field.kind, field.enum_descriptor, field.name, path, text_hint)
}

#[allow(clippy::too_many_arguments)]
fn decompress_scalar_kind<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    kind: FieldKind,
    enum_desc: Option<&crate::reflect::EnumDescriptor>,
    field_name: &str,
    path: &str,
    text_hint: Option<bool>,
) -> Result<ScalarOwned> {
    match kind {
        FieldKind::Bool => {
            let model = hub.bool_model(path);
            Ok(ScalarOwned::Bool(scalar::decode_bool(dec, model)?))
        }
        FieldKind::Enum => {
            let desc = enum_desc
                .ok_or(crate::errors::CodecError::UnsupportedKind("enum field missing its descriptor"))?;
            if let Some(prior_idx) = hub.enum_prediction_prior(field_name) {
                let flag_model = hub.flag_model();
                let matches_prior = dec.decode(&flag_model)? != 0;
                if matches_prior {
                    let number = desc
                        .number_at(prior_idx)
                        .ok_or(crate::errors::CodecError::DecodeCorrupt("enum prediction prior index is out of range"))?;
                    return Ok(ScalarOwned::Enum(number));
                }
            }
            let model = hub.enum_model(path, desc);
            Ok(ScalarOwned::Enum(scalar::decode_enum(dec, model, desc)?))
        }
        FieldKind::Int32 => {
            let models = hub.varint_models(path, field_name);
            Ok(ScalarOwned::I32(scalar::decode_unsigned(dec, &models)? as u32 as i32))
        }
        FieldKind::Int64 => {
            let models = hub.varint_models(path, field_name);
            Ok(ScalarOwned::I64(scalar::decode_unsigned(dec, &models)? as i64))
        }
        FieldKind::UInt32 => {
            let models = hub.varint_models(path, field_name);
            let v = scalar::decode_unsigned(dec, &models)?;
            if v > u64::from(u32::MAX) {
                return decode_corrupt_error("uint32 varint decoded a value wider than 32 bits");
            }
            Ok(ScalarOwned::U32(v as u32))
        }
        FieldKind::UInt64 => {
            let models = hub.varint_models(path, field_name);
            Ok(ScalarOwned::U64(scalar::decode_unsigned(dec, &models)?))
        }
        FieldKind::SInt32 => {
            let models = hub.varint_models(path, field_name);
            Ok(ScalarOwned::I32(scalar::decode_sint32(dec, &models)?))
        }
        FieldKind::SInt64 => {
            let models = hub.varint_models(path, field_name);
            Ok(ScalarOwned::I64(scalar::decode_sint64(dec, &models)?))
        }
        FieldKind::Fixed32 => {
            let model = hub.fixed_byte_model(path);
            Ok(ScalarOwned::U32(scalar::decode_fixed32(dec, model)?))
        }
        FieldKind::SFixed32 => {
            let model = hub.fixed_byte_model(path);
            Ok(ScalarOwned::I32(scalar::decode_fixed32(dec, model)? as i32))
        }
        FieldKind::Float => {
            let model = hub.fixed_byte_model(path);
            Ok(ScalarOwned::F32(scalar::decode_float(dec, model)?))
        }
        FieldKind::Fixed64 => {
            let model = hub.fixed_byte_model(path);
            Ok(ScalarOwned::U64(scalar::decode_fixed64(dec, model)?))
        }
        FieldKind::SFixed64 => {
            let model = hub.fixed_byte_model(path);
            Ok(ScalarOwned::I64(scalar::decode_fixed64(dec, model)? as i64))
        }
        FieldKind::Double => {
            let model = hub.fixed_byte_model(path);
            Ok(ScalarOwned::F64(scalar::decode_double(dec, model)?))
        }
        FieldKind::String => {
            let order = hub.text_order(field_name);
            Ok(ScalarOwned::Str(scalar::decode_string(dec, order)?))
        }
        FieldKind::Bytes => Ok(ScalarOwned::Bytes(decompress_bytes(dec, hub, field_name, path, text_hint)?)),
        FieldKind::Message => unsupported_kind_error("nested message handled outside the scalar codec"),
    }
}

fn decompress_bytes<R: io::Read>(
    dec: &mut Decoder<R>,
    hub: &mut ModelHub,
    field_name: &str,
    path: &str,
    text_hint: Option<bool>,
) -> Result<Vec<u8>> {
    if field_name == names::PAYLOAD_FIELD && hub.policy().is_contextual_or_above() {
        let flag_model = hub.flag_model();
        let is_text = dec.decode(&flag_model)? != 0;
        let _ = text_hint; // the flag on the wire is authoritative; the hint only guided the encoder
        if is_text {
            let order = hub.text_order(field_name);
            let s = scalar::decode_string(dec, order)?;
            return Ok(s.into_bytes());
        }
    }

    let length_path = format!("{path}._length");
    let length_models = hub.length_models(&length_path);
    let byte_model = byte_model();
    scalar::decode_bytes(dec, &length_models, &byte_model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CodecError;
    use crate::policy::Policy;
    use crate::reflect::*;
    use hashbrown::HashMap as HbMap;

    // A small hand-rolled reflective message used to exercise the walker end-to-end without a
    // real generated-message runtime; these tests stand in for it.
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Record {
        id: Option<i32>,
        name: Option<String>,
        active: Option<bool>,
        tags: Vec<String>,
        props: HbMap<String, String>,
        child: Option<Box<Record>>,
    }

    enum Slot {
        Id,
        Name,
        Active,
        Tags,
        Props,
        Child,
    }

    fn slot_for(field: &FieldDescriptor) -> Slot {
        match field.name {
            "id" => Slot::Id,
            "name" => Slot::Name,
            "active" => Slot::Active,
            "tags" => Slot::Tags,
            "props" => Slot::Props,
            "child" => Slot::Child,
            other => panic!("unexpected field {other}"),
        }
    }

    static RECORD_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor {
            name: "id",
            number: 1,
            kind: FieldKind::Int32,
            cardinality: Cardinality::Singular,
            enum_descriptor: None,
            message_descriptor: None,
            map_key_kind: None,
            map_value_kind: None,
        },
        FieldDescriptor {
            name: "name",
            number: 2,
            kind: FieldKind::String,
            cardinality: Cardinality::Singular,
            enum_descriptor: None,
            message_descriptor: None,
            map_key_kind: None,
            map_value_kind: None,
        },
        FieldDescriptor {
            name: "active",
            number: 3,
            kind: FieldKind::Bool,
            cardinality: Cardinality::Singular,
            enum_descriptor: None,
            message_descriptor: None,
            map_key_kind: None,
            map_value_kind: None,
        },
        FieldDescriptor {
            name: "tags",
            number: 4,
            kind: FieldKind::String,
            cardinality: Cardinality::List,
            enum_descriptor: None,
            message_descriptor: None,
            map_key_kind: None,
            map_value_kind: None,
        },
        FieldDescriptor {
            name: "props",
            number: 5,
            kind: FieldKind::String,
            cardinality: Cardinality::Map,
            enum_descriptor: None,
            message_descriptor: None,
            map_key_kind: Some(FieldKind::String),
            map_value_kind: Some(FieldKind::String),
        },
        FieldDescriptor {
            name: "child",
            number: 6,
            kind: FieldKind::Message,
            cardinality: Cardinality::Singular,
            enum_descriptor: None,
            message_descriptor: Some(record_descriptor),
            map_key_kind: None,
            map_value_kind: None,
        },
    ];

    static RECORD_DESCRIPTOR: MessageDescriptor =
        MessageDescriptor { full_name: "test.Record", fields: RECORD_FIELDS };

    fn record_descriptor() -> &'static MessageDescriptor {
        &RECORD_DESCRIPTOR
    }

    // `Vec<String>`/`HbMap<String, String>` implement the collection traits directly so
    // `get_list`/`get_map` can hand out a reference borrowed straight from `&self`.
    impl ReflectList for Vec<String> {
        fn len(&self) -> usize {
            Vec::len(self)
        }
        fn get_scalar(&self, index: usize) -> ScalarRef<'_> {
            ScalarRef::Str(&self[index])
        }
        fn get_message(&self, _index: usize) -> &dyn ReflectMessage {
            unreachable!("no message-typed list in this fixture")
        }
        fn push_scalar(&mut self, value: ScalarOwned) {
            if let ScalarOwned::Str(s) = value {
                self.push(s);
            }
        }
        fn push_message(&mut self) -> &mut dyn ReflectMessage {
            unreachable!("no message-typed list in this fixture")
        }
    }

    impl ReflectMap for HbMap<String, String> {
        fn len(&self) -> usize {
            HbMap::len(self)
        }
        fn iter(&self) -> Box<dyn Iterator<Item = (ScalarRef<'_>, MapValueRef<'_>)> + '_> {
            Box::new(HbMap::iter(self).map(|(k, v)| (ScalarRef::Str(k), MapValueRef::Scalar(ScalarRef::Str(v)))))
        }
        fn insert_scalar(&mut self, key: ScalarOwned, value: ScalarOwned) {
            if let (ScalarOwned::Str(k), ScalarOwned::Str(v)) = (key, value) {
                self.insert(k, v);
            }
        }
        fn insert_message(&mut self, _key: ScalarOwned) -> &mut dyn ReflectMessage {
            unreachable!("no message-typed map in this fixture")
        }
    }

    impl ReflectMessage for Record {
        fn descriptor(&self) -> &'static MessageDescriptor {
            &RECORD_DESCRIPTOR
        }

        fn has(&self, field: &FieldDescriptor) -> bool {
            match slot_for(field) {
                Slot::Id => self.id.is_some(),
                Slot::Name => self.name.is_some(),
                Slot::Active => self.active.is_some(),
                Slot::Tags => !self.tags.is_empty(),
                Slot::Props => !self.props.is_empty(),
                Slot::Child => self.child.is_some(),
            }
        }

        fn get_scalar(&self, field: &FieldDescriptor) -> ScalarRef<'_> {
            match slot_for(field) {
                Slot::Id => ScalarRef::I32(self.id.unwrap()),
                Slot::Name => ScalarRef::Str(self.name.as_deref().unwrap()),
                Slot::Active => ScalarRef::Bool(self.active.unwrap()),
                _ => panic!("not a scalar field"),
            }
        }

        fn get_message(&self, field: &FieldDescriptor) -> &dyn ReflectMessage {
            match slot_for(field) {
                Slot::Child => self.child.as_deref().unwrap(),
                _ => panic!("not a message field"),
            }
        }

        fn get_list(&self, field: &FieldDescriptor) -> &dyn ReflectList {
            match slot_for(field) {
                Slot::Tags => &self.tags,
                _ => panic!("not a list field"),
            }
        }

        fn get_map(&self, field: &FieldDescriptor) -> &dyn ReflectMap {
            match slot_for(field) {
                Slot::Props => &self.props,
                _ => panic!("not a map field"),
            }
        }

        fn set_scalar(&mut self, field: &FieldDescriptor, value: ScalarOwned) {
            match (slot_for(field), value) {
                (Slot::Id, ScalarOwned::I32(v)) => self.id = Some(v),
                (Slot::Name, ScalarOwned::Str(v)) => self.name = Some(v),
                (Slot::Active, ScalarOwned::Bool(v)) => self.active = Some(v),
                _ => panic!("scalar kind/value mismatch in test fixture"),
            }
        }

        fn mutable_message(&mut self, field: &FieldDescriptor) -> &mut dyn ReflectMessage {
            match slot_for(field) {
                Slot::Child => self.child.get_or_insert_with(Default::default).as_mut(),
                _ => panic!("not a message field"),
            }
        }

        fn mutable_list(&mut self, field: &FieldDescriptor) -> &mut dyn ReflectList {
            match slot_for(field) {
                Slot::Tags => &mut self.tags,
                _ => panic!("not a list field"),
            }
        }

        fn mutable_map(&mut self, field: &FieldDescriptor) -> &mut dyn ReflectMap {
            match slot_for(field) {
                Slot::Props => &mut self.props,
                _ => panic!("not a map field"),
            }
        }
    }

    fn sample_record() -> Record {
        let mut props = HbMap::new();
        props.insert("theme".to_string(), "dark".to_string());
        props.insert("lang".to_string(), "en".to_string());
        Record {
            id: Some(12345),
            name: Some("Alice".to_string()),
            active: Some(true),
            tags: vec!["golang".to_string(), "protobuf".to_string(), "compression".to_string()],
            props,
            child: None,
        }
    }

    fn roundtrip_basic(policy: Policy) -> (Record, Record) {
        let original = Record { id: Some(12345), name: Some("Alice".to_string()), active: Some(true), ..Default::default() };

        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            let mut hub = ModelHub::new(policy);
            compress_message(&mut enc, &mut hub, &original, "").unwrap();
            enc.close().unwrap();
        }

        let mut decoded = Record::default();
        {
            let mut dec = Decoder::new(&buf[..]).unwrap();
            let mut hub = ModelHub::new(policy);
            decompress_message(&mut dec, &mut hub, &mut decoded, "").unwrap();
        }

        (original, decoded)
    }

    #[test]
    fn basic_scalar_record_roundtrips_under_every_policy() {
        for policy in [Policy::Type, Policy::Adaptive, Policy::Contextual, Policy::bitpacked()] {
            let (original, decoded) = roundtrip_basic(policy);
            assert_eq!(original, decoded, "policy {policy:?} failed to roundtrip");
        }
    }

    #[test]
    fn empty_record_produces_constant_length_stream_and_defaults() {
        let empty = Record::default();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            let mut hub = ModelHub::new(Policy::Type);
            compress_message(&mut enc, &mut hub, &empty, "").unwrap();
            enc.close().unwrap();
        }
        // All six presence bits false: constant length regardless of *which* empty record.
        let mut buf2 = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf2);
            let mut hub = ModelHub::new(Policy::Type);
            compress_message(&mut enc, &mut hub, &Record::default(), "").unwrap();
            enc.close().unwrap();
        }
        assert_eq!(buf.len(), buf2.len());

        let mut decoded = Record { id: Some(1), ..Default::default() };
        let mut dec = Decoder::new(&buf[..]).unwrap();
        let mut hub = ModelHub::new(Policy::Type);
        decompress_message(&mut dec, &mut hub, &mut decoded, "").unwrap();
        assert_eq!(decoded, Record::default());
    }

    #[test]
    fn list_map_and_nested_message_roundtrip_under_every_policy() {
        for policy in [Policy::Type, Policy::Adaptive, Policy::Contextual, Policy::bitpacked()] {
            let mut original = sample_record();
            original.child = Some(Box::new(Record {
                id: Some(9),
                name: Some("child".to_string()),
                ..Default::default()
            }));

            let mut buf = Vec::new();
            {
                let mut enc = Encoder::new(&mut buf);
                let mut hub = ModelHub::new(policy);
                compress_message(&mut enc, &mut hub, &original, "").unwrap();
                enc.close().unwrap();
            }

            let mut decoded = Record::default();
            {
                let mut dec = Decoder::new(&buf[..]).unwrap();
                let mut hub = ModelHub::new(policy);
                decompress_message(&mut dec, &mut hub, &mut decoded, "").unwrap();
            }

            assert_eq!(original, decoded, "policy {policy:?} failed to roundtrip");
        }
    }

    #[test]
    fn corrupt_enum_index_surfaces_decode_corrupt() {
        let desc = crate::reflect::EnumDescriptor {
            full_name: "test.E",
            values: &[crate::reflect::EnumValue { name: "A", number: 0, index: 0 }],
        };
        let model = crate::model::Uniform::new(4).unwrap();
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            enc.encode(&model, 3).unwrap();
            enc.close().unwrap();
        }
        let mut dec = Decoder::new(&buf[..]).unwrap();
        let err = scalar::decode_enum(&mut dec, &model, &desc).unwrap_err();
        assert!(matches!(err, CodecError::DecodeCorrupt(_)));
    }
}
