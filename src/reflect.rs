// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reflection surface the walker is driven by.
//!
//! The schema/reflection runtime itself — a library that would hand out these descriptors and
//! implement these traits for generated message types — is an external collaborator and out of
//! scope here. This module only fixes the abstract contract: field descriptors, the scalar value
//! representation, and the `has`/`get`/`set`/`mutable` accessors a generated message type must
//! provide for the walker to traverse it.

/// The scalar kinds a field may declare. Several (e.g. `Int32`/`SInt32`/`Fixed32`) share the same
/// Rust storage type but differ in wire encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Enum,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    SFixed32,
    Float,
    Fixed64,
    SFixed64,
    Double,
    String,
    Bytes,
    Message,
}

/// Whether a field is singular, repeated, or a map.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    List,
    Map,
}

/// One named, numbered value of an enum type, in declaration order.
#[derive(Copy, Clone, Debug)]
pub struct EnumValue {
    pub name: &'static str,
    pub number: i32,
    pub index: usize,
}

/// An enum type's full, ordered value list.
#[derive(Copy, Clone, Debug)]
pub struct EnumDescriptor {
    pub full_name: &'static str,
    pub values: &'static [EnumValue],
}

impl EnumDescriptor {
    /// Looks up a value's declaration index by its numeric value. Used to map a decoded index
    /// back to the `number` a generated setter expects.
    pub fn index_of(&self, number: i32) -> Option<usize> {
        self.values.iter().position(|v| v.number == number)
    }

    pub fn number_at(&self, index: usize) -> Option<i32> {
        self.values.get(index).map(|v| v.number)
    }
}

/// One declared field of a message type.
///
/// `message_descriptor` is a function pointer rather than a direct `&'static` reference so that
/// mutually recursive message types (message A containing message B containing A) can refer to
/// each other without a const-evaluation cycle; each generated descriptor resolves its nested
/// descriptor lazily, by calling through.
#[derive(Copy, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub number: u32,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    pub enum_descriptor: Option<&'static EnumDescriptor>,
    pub message_descriptor: Option<fn() -> &'static MessageDescriptor>,
    pub map_key_kind: Option<FieldKind>,
    pub map_value_kind: Option<FieldKind>,
}

impl FieldDescriptor {
    pub fn message_descriptor(&self) -> Option<&'static MessageDescriptor> {
        self.message_descriptor.map(|f| f())
    }
}

/// A message type's ordered field list.
#[derive(Copy, Clone)]
pub struct MessageDescriptor {
    pub full_name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

/// A scalar value borrowed out of a message for encoding. Borrowing avoids requiring `Clone` (or
/// `dyn`-safe cloning) on message trait objects merely to read one field.
#[derive(Copy, Clone, Debug)]
pub enum ScalarRef<'a> {
    Bool(bool),
    /// An enum's numeric value (resolved against its `EnumDescriptor` by the scalar codec).
    Enum(i32),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
}

/// A scalar value owned by the caller, for writing back into a message during decode.
#[derive(Clone, Debug)]
pub enum ScalarOwned {
    Bool(bool),
    Enum(i32),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// A map entry's value half: either a scalar or a nested message.
pub enum MapValueRef<'a> {
    Scalar(ScalarRef<'a>),
    Message(&'a dyn ReflectMessage),
}

/// Reflective access to one message instance.
///
/// A generated message type implements this (and, where it has list/map fields,
/// [`ReflectList`]/[`ReflectMap`]) so the walker can traverse it without knowing its concrete
/// Rust type.
pub trait ReflectMessage {
    fn descriptor(&self) -> &'static MessageDescriptor;

    /// Whether `field` is set on this instance.
    fn has(&self, field: &FieldDescriptor) -> bool;

    /// Reads a singular scalar or enum field. Only valid when `field.cardinality ==
    /// Cardinality::Singular` and `field.kind != FieldKind::Message`.
    fn get_scalar(&self, field: &FieldDescriptor) -> ScalarRef<'_>;

    /// Reads a singular nested-message field.
    fn get_message(&self, field: &FieldDescriptor) -> &dyn ReflectMessage;

    /// Reads a repeated field's list handle.
    fn get_list(&self, field: &FieldDescriptor) -> &dyn ReflectList;

    /// Reads a map field's handle.
    fn get_map(&self, field: &FieldDescriptor) -> &dyn ReflectMap;

    /// Sets a singular scalar or enum field, constructing it if absent.
    fn set_scalar(&mut self, field: &FieldDescriptor, value: ScalarOwned);

    /// Returns a mutable handle to a singular nested-message field, constructing a default
    /// instance first if absent.
    fn mutable_message(&mut self, field: &FieldDescriptor) -> &mut dyn ReflectMessage;

    /// Returns a mutable handle to a repeated field's list, constructing an empty one first if
    /// absent.
    fn mutable_list(&mut self, field: &FieldDescriptor) -> &mut dyn ReflectList;

    /// Returns a mutable handle to a map field, constructing an empty one first if absent.
    fn mutable_map(&mut self, field: &FieldDescriptor) -> &mut dyn ReflectMap;
}

/// Reflective access to one repeated field's elements.
pub trait ReflectList {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_scalar(&self, index: usize) -> ScalarRef<'_>;
    fn get_message(&self, index: usize) -> &dyn ReflectMessage;

    fn push_scalar(&mut self, value: ScalarOwned);

    /// Appends a new default-valued message element and returns a handle to it for the walker to
    /// decode into.
    fn push_message(&mut self) -> &mut dyn ReflectMessage;
}

/// Reflective access to one map field's entries.
///
/// Round-trip equality over maps is defined by set equality of entries; this trait does not
/// promise iteration order is stable across instances.
pub trait ReflectMap {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (ScalarRef<'_>, MapValueRef<'_>)> + '_>;

    fn insert_scalar(&mut self, key: ScalarOwned, value: ScalarOwned);

    /// Inserts an entry with a default-valued message value and returns a handle to it for the
    /// walker to decode into.
    fn insert_message(&mut self, key: ScalarOwned) -> &mut dyn ReflectMessage;
}
