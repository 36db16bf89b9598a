//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Schema derivation from serde's data model.
//!
//! A type's schema is read off the first call its serde impl makes:
//!
//! - On the encode side, [`ShapeSerializer`] receives `serialize_struct` and the
//!   field keys that follow, without serializing any field value.
//! - On the decode side, [`ShapeDeserializer`] receives `deserialize_struct`
//!   with the full field list and stops immediately.
//!
//! Both sides describe the same derived type identically, so the fingerprint
//! computed from either one matches.

use serde::de::{self, Visitor};
use serde::ser::{self, Serialize};
use std::fmt;

/// What kind of type a [`Schema`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// A struct with named fields.
    Struct,
    /// A struct with positional fields.
    TupleStruct,
    /// A single-field wrapper struct.
    NewtypeStruct,
    /// A struct with no fields.
    UnitStruct,
    /// An enum; variants are not part of the schema.
    Enum,
    /// A primitive, sequence, map, tuple or option.
    Anonymous,
}

impl SchemaKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::TupleStruct => "tuple_struct",
            Self::NewtypeStruct => "newtype_struct",
            Self::UnitStruct => "unit_struct",
            Self::Enum => "enum",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Structural description of a type, with a 32-bit fingerprint.
///
/// Named types are identified by their serde name and, for structs, their field
/// names in declaration order. Anonymous types are identified by their serde
/// data-model kind (`"u32"`, `"str"`, `"seq"`, `"map"` ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    kind: SchemaKind,
    name: &'static str,
    fields: Vec<&'static str>,
    fingerprint: u32,
}

impl Schema {
    pub(crate) fn new(kind: SchemaKind, name: &'static str, fields: Vec<&'static str>) -> Self {
        let mut hash = Fnv1a::new();
        hash.write(kind.tag().as_bytes());
        hash.write(&[0]);
        hash.write(name.as_bytes());
        for field in &fields {
            hash.write(&[0]);
            hash.write(field.as_bytes());
        }
        Self {
            kind,
            name,
            fields,
            fingerprint: hash.finish(),
        }
    }

    fn anonymous(name: &'static str) -> Self {
        Self::new(SchemaKind::Anonymous, name, Vec::new())
    }

    /// The kind of type described.
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// The serde name, or the data-model kind for anonymous types.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Field names in declaration order; empty unless the kind is `Struct`.
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// The fingerprint written ahead of every payload.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Derives the schema of `value`'s type from its `Serialize` impl.
    pub(crate) fn of_value<T: Serialize + ?Sized>(value: &T) -> Self {
        value
            .serialize(ShapeSerializer)
            .unwrap_or_else(|_| Self::anonymous("any"))
    }

    /// Derives the schema of `T` from its `Deserialize` impl.
    pub(crate) fn of_type<T: de::DeserializeOwned>() -> Self {
        match T::deserialize(ShapeDeserializer) {
            Err(ProbeError::Captured(schema)) => schema,
            _ => Self::anonymous("any"),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({:#010x})", self.kind.tag(), self.name, self.fingerprint)
    }
}

/// 32-bit FNV-1a.
struct Fnv1a(u32);

impl Fnv1a {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u32::from(byte);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn finish(&self) -> u32 {
        self.0
    }
}

/// Error type of both probes. `Captured` is how the deserializer side stops.
#[derive(Debug)]
pub(crate) enum ProbeError {
    Captured(Schema),
    Custom(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captured(schema) => write!(f, "captured {schema}"),
            Self::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ProbeError {}

impl ser::Error for ProbeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl de::Error for ProbeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Serializer that returns the value's schema without visiting field values.
pub(crate) struct ShapeSerializer;

/// Compound state for [`ShapeSerializer`]; collects struct field keys.
pub(crate) struct ShapeCompound {
    kind: SchemaKind,
    name: &'static str,
    fields: Vec<&'static str>,
}

impl ShapeCompound {
    fn named(kind: SchemaKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            fields: Vec::new(),
        }
    }

    fn anonymous(name: &'static str) -> Self {
        Self::named(SchemaKind::Anonymous, name)
    }

    fn finish(self) -> Result<Schema, ProbeError> {
        Ok(Schema::new(self.kind, self.name, self.fields))
    }
}

macro_rules! shape_scalars {
    ($($method:ident: $ty:ty => $name:literal),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<Schema, ProbeError> {
                Ok(Schema::anonymous($name))
            }
        )*
    };
}

impl ser::Serializer for ShapeSerializer {
    type Ok = Schema;
    type Error = ProbeError;
    type SerializeSeq = ShapeCompound;
    type SerializeTuple = ShapeCompound;
    type SerializeTupleStruct = ShapeCompound;
    type SerializeTupleVariant = ShapeCompound;
    type SerializeMap = ShapeCompound;
    type SerializeStruct = ShapeCompound;
    type SerializeStructVariant = ShapeCompound;

    shape_scalars! {
        serialize_bool: bool => "bool",
        serialize_i8: i8 => "i8",
        serialize_i16: i16 => "i16",
        serialize_i32: i32 => "i32",
        serialize_i64: i64 => "i64",
        serialize_i128: i128 => "i128",
        serialize_u8: u8 => "u8",
        serialize_u16: u16 => "u16",
        serialize_u32: u32 => "u32",
        serialize_u64: u64 => "u64",
        serialize_u128: u128 => "u128",
        serialize_f32: f32 => "f32",
        serialize_f64: f64 => "f64",
        serialize_char: char => "char",
        serialize_str: &str => "str",
        serialize_bytes: &[u8] => "bytes",
    }

    fn serialize_none(self) -> Result<Schema, ProbeError> {
        Ok(Schema::anonymous("option"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<Schema, ProbeError> {
        Ok(Schema::anonymous("option"))
    }

    fn serialize_unit(self) -> Result<Schema, ProbeError> {
        Ok(Schema::anonymous("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Schema, ProbeError> {
        Ok(Schema::new(SchemaKind::UnitStruct, name, Vec::new()))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<Schema, ProbeError> {
        Ok(Schema::new(SchemaKind::Enum, name, Vec::new()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _value: &T,
    ) -> Result<Schema, ProbeError> {
        Ok(Schema::new(SchemaKind::NewtypeStruct, name, Vec::new()))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Schema, ProbeError> {
        Ok(Schema::new(SchemaKind::Enum, name, Vec::new()))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::anonymous("seq"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::anonymous("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::named(SchemaKind::TupleStruct, name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::named(SchemaKind::Enum, name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::anonymous("map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::named(SchemaKind::Struct, name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ShapeCompound, ProbeError> {
        Ok(ShapeCompound::named(SchemaKind::Enum, name))
    }

    // Must agree with `ShapeDeserializer` and postcard, or types with
    // format-dependent impls (uuid, ip addresses) fingerprint differently.
    fn is_human_readable(&self) -> bool {
        false
    }
}

impl ser::SerializeSeq for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ProbeError> {
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeTuple for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ProbeError> {
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ProbeError> {
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ProbeError> {
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeMap for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, _key: &T) -> Result<(), ProbeError> {
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ProbeError> {
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeStruct for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        _value: &T,
    ) -> Result<(), ProbeError> {
        self.fields.push(key);
        Ok(())
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), ProbeError> {
        self.fields.push(key);
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for ShapeCompound {
    type Ok = Schema;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), ProbeError> {
        Ok(())
    }

    fn end(self) -> Result<Schema, ProbeError> {
        self.finish()
    }
}

/// Deserializer that fails with [`ProbeError::Captured`] on the first request.
pub(crate) struct ShapeDeserializer;

macro_rules! capture_anonymous {
    ($($method:ident => $name:literal),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ProbeError> {
                Err(ProbeError::Captured(Schema::anonymous($name)))
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ShapeDeserializer {
    type Error = ProbeError;

    capture_anonymous! {
        deserialize_any => "any",
        deserialize_bool => "bool",
        deserialize_i8 => "i8",
        deserialize_i16 => "i16",
        deserialize_i32 => "i32",
        deserialize_i64 => "i64",
        deserialize_i128 => "i128",
        deserialize_u8 => "u8",
        deserialize_u16 => "u16",
        deserialize_u32 => "u32",
        deserialize_u64 => "u64",
        deserialize_u128 => "u128",
        deserialize_f32 => "f32",
        deserialize_f64 => "f64",
        deserialize_char => "char",
        deserialize_str => "str",
        deserialize_string => "str",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "bytes",
        deserialize_option => "option",
        deserialize_unit => "unit",
        deserialize_seq => "seq",
        deserialize_map => "map",
        deserialize_identifier => "any",
        deserialize_ignored_any => "any",
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        Err(ProbeError::Captured(Schema::new(SchemaKind::UnitStruct, name, Vec::new())))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        Err(ProbeError::Captured(Schema::new(SchemaKind::NewtypeStruct, name, Vec::new())))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        Err(ProbeError::Captured(Schema::anonymous("tuple")))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        Err(ProbeError::Captured(Schema::new(SchemaKind::TupleStruct, name, Vec::new())))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        Err(ProbeError::Captured(Schema::new(SchemaKind::Struct, name, fields.to_vec())))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        Err(ProbeError::Captured(Schema::new(SchemaKind::Enum, name, Vec::new())))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}
