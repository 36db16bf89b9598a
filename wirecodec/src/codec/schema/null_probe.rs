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

//! Walker that finds `None` elements inside sequences.

use serde::ser::{self, Serialize};
use std::fmt;

/// Outcome of a failed walk.
#[derive(Debug)]
pub(crate) enum NullError {
    /// A sequence element at `index` was `None`.
    NullElement { index: usize },
    /// The value's own `Serialize` impl failed.
    Custom(String),
}

impl fmt::Display for NullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullElement { index } => write!(f, "null element at index {index}"),
            Self::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for NullError {}

impl ser::Error for NullError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Walks `value` and fails on the first `None` that is a direct element of a
/// sequence.
pub(crate) fn find_null_element<T: Serialize + ?Sized>(value: &T) -> Result<(), NullError> {
    value.serialize(NullProbe { element: None })
}

/// `element` is the index of the sequence slot being serialized, if any.
struct NullProbe {
    element: Option<usize>,
}

const TOP: NullProbe = NullProbe { element: None };

struct Walk {
    next_index: Option<usize>,
}

impl Walk {
    fn seq() -> Self {
        Self {
            next_index: Some(0),
        }
    }

    fn other() -> Self {
        Self { next_index: None }
    }

    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NullError> {
        let element = self.next_index;
        if let Some(index) = self.next_index.as_mut() {
            *index += 1;
        }
        value.serialize(NullProbe { element })
    }
}

macro_rules! pass_scalars {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<(), NullError> {
                Ok(())
            }
        )*
    };
}

impl ser::Serializer for NullProbe {
    type Ok = ();
    type Error = NullError;
    type SerializeSeq = Walk;
    type SerializeTuple = Walk;
    type SerializeTupleStruct = Walk;
    type SerializeTupleVariant = Walk;
    type SerializeMap = Walk;
    type SerializeStruct = Walk;
    type SerializeStructVariant = Walk;

    pass_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_none(self) -> Result<(), NullError> {
        match self.element {
            Some(index) => Err(NullError::NullElement { index }),
            None => Ok(()),
        }
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), NullError> {
        value.serialize(TOP)
    }

    fn serialize_unit(self) -> Result<(), NullError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), NullError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), NullError> {
        Ok(())
    }

    // Wrappers are transparent: a wrapped `None` in a sequence is still a null element.
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NullError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), NullError> {
        value.serialize(TOP)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Walk, NullError> {
        Ok(Walk::seq())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Walk, NullError> {
        Ok(Walk::other())
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Walk, NullError> {
        Ok(Walk::other())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Walk, NullError> {
        Ok(Walk::other())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Walk, NullError> {
        Ok(Walk::other())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Walk, NullError> {
        Ok(Walk::other())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Walk, NullError> {
        Ok(Walk::other())
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl ser::SerializeSeq for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NullError> {
        self.element(value)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

impl ser::SerializeTuple for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NullError> {
        self.element(value)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NullError> {
        self.element(value)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NullError> {
        self.element(value)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

impl ser::SerializeMap for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NullError> {
        key.serialize(TOP)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NullError> {
        value.serialize(TOP)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

impl ser::SerializeStruct for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NullError> {
        self.element(value)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Walk {
    type Ok = ();
    type Error = NullError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NullError> {
        self.element(value)
    }

    fn end(self) -> Result<(), NullError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Batch {
        label: Option<String>,
        items: Vec<Option<u32>>,
    }

    #[derive(Serialize)]
    struct Slot(Option<u8>);

    #[test]
    fn test_null_in_sequence_is_found() {
        let batch = Batch {
            label: None,
            items: vec![Some(1), None, Some(3)],
        };
        let error = find_null_element(&batch).unwrap_err();
        assert!(matches!(error, NullError::NullElement { index: 1 }));
    }

    #[test]
    fn test_optional_fields_are_allowed() {
        let batch = Batch {
            label: None,
            items: vec![Some(1)],
        };
        assert!(find_null_element(&batch).is_ok());
        assert!(find_null_element(&(None::<u8>, 1u8)).is_ok());
    }

    #[test]
    fn test_map_values_are_allowed() {
        let mut map = HashMap::new();
        map.insert("k", None::<u8>);
        assert!(find_null_element(&map).is_ok());
    }

    #[test]
    fn test_wrapped_null_element_is_found() {
        let slots = vec![Slot(Some(1)), Slot(None)];
        assert!(matches!(
            find_null_element(&slots),
            Err(NullError::NullElement { index: 1 })
        ));
    }

    #[test]
    fn test_nested_sequences() {
        let nested = vec![vec![Some(1u8)], vec![Some(2), None]];
        assert!(matches!(
            find_null_element(&nested),
            Err(NullError::NullElement { index: 1 })
        ));
    }
}
