//! Top-level shape check for parameter values.
//!
//! `serde_json::to_value` turns integer and bool map keys into strings, so a
//! `HashMap<u32, _>` would silently become an object. [`check`] walks only
//! the outermost value and rejects maps whose keys are not serialized as
//! strings.

use std::fmt;

use serde::Serialize;
use serde::ser::{self, Impossible};

#[derive(Debug)]
pub(crate) struct ShapeError(String);

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ShapeError {}

impl ser::Error for ShapeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Fail if `value` is a map with non-string keys.
pub(crate) fn check<T: Serialize + ?Sized>(value: &T) -> Result<(), ShapeError> {
    value.serialize(Outer)
}

/// Serializer for the outermost value: accepts everything, inspects map keys.
struct Outer;

/// Ignores the elements of any compound value.
struct Skip;

/// Checks every key of a top-level map.
struct Keys;

/// Serializer for one map key: only string-like keys pass.
struct KeyName;

macro_rules! accept {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(fn $name(self, _v: $ty) -> Result<(), ShapeError> { Ok(()) })*
    };
}

macro_rules! reject_key {
    ($($name:ident: $ty:ty => $kind:literal),* $(,)?) => {
        $(fn $name(self, _v: $ty) -> Result<(), ShapeError> {
            Err(ShapeError(format!("map with {} keys", $kind)))
        })*
    };
}

impl ser::Serializer for Outer {
    type Ok = ();
    type Error = ShapeError;
    type SerializeSeq = Skip;
    type SerializeTuple = Skip;
    type SerializeTupleStruct = Skip;
    type SerializeTupleVariant = Skip;
    type SerializeMap = Keys;
    type SerializeStruct = Skip;
    type SerializeStructVariant = Skip;

    accept! {
        serialize_bool: bool, serialize_i8: i8, serialize_i16: i16, serialize_i32: i32,
        serialize_i64: i64, serialize_u8: u8, serialize_u16: u16, serialize_u32: u32,
        serialize_u64: u64, serialize_i128: i128, serialize_u128: u128, serialize_f32: f32,
        serialize_f64: f64, serialize_char: char, serialize_str: &str, serialize_bytes: &[u8],
    }

    fn serialize_none(self) -> Result<(), ShapeError> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), ShapeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), ShapeError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), ShapeError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), ShapeError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ShapeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), ShapeError> {
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Skip, ShapeError> {
        Ok(Skip)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Skip, ShapeError> {
        Ok(Skip)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Skip, ShapeError> {
        Ok(Skip)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Skip, ShapeError> {
        Ok(Skip)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Keys, ShapeError> {
        Ok(Keys)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Skip, ShapeError> {
        Ok(Skip)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Skip, ShapeError> {
        Ok(Skip)
    }
}

impl ser::SerializeSeq for Skip {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::SerializeTuple for Skip {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Skip {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Skip {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::SerializeStruct for Skip {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Skip {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::SerializeMap for Keys {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ShapeError> {
        key.serialize(KeyName)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ShapeError> {
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        Ok(())
    }
}

impl ser::Serializer for KeyName {
    type Ok = ();
    type Error = ShapeError;
    type SerializeSeq = Impossible<(), ShapeError>;
    type SerializeTuple = Impossible<(), ShapeError>;
    type SerializeTupleStruct = Impossible<(), ShapeError>;
    type SerializeTupleVariant = Impossible<(), ShapeError>;
    type SerializeMap = Impossible<(), ShapeError>;
    type SerializeStruct = Impossible<(), ShapeError>;
    type SerializeStructVariant = Impossible<(), ShapeError>;

    accept! { serialize_char: char, serialize_str: &str }

    reject_key! {
        serialize_bool: bool => "bool",
        serialize_i8: i8 => "i8",
        serialize_i16: i16 => "i16",
        serialize_i32: i32 => "i32",
        serialize_i64: i64 => "i64",
        serialize_u8: u8 => "u8",
        serialize_u16: u16 => "u16",
        serialize_u32: u32 => "u32",
        serialize_u64: u64 => "u64",
        serialize_f32: f32 => "f32",
        serialize_f64: f64 => "f64",
        serialize_bytes: &[u8] => "bytes",
    }

    fn serialize_i128(self, _v: i128) -> Result<(), ShapeError> {
        Err(ShapeError("map with i128 keys".into()))
    }

    fn serialize_u128(self, _v: u128) -> Result<(), ShapeError> {
        Err(ShapeError("map with u128 keys".into()))
    }

    fn serialize_none(self) -> Result<(), ShapeError> {
        Err(non_string("option"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<(), ShapeError> {
        Err(non_string("option"))
    }

    fn serialize_unit(self) -> Result<(), ShapeError> {
        Err(non_string("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<(), ShapeError> {
        Err(non_string(name))
    }

    // Unit enum variants are written as their name.
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), ShapeError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ShapeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), ShapeError> {
        Err(non_string(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ShapeError> {
        Err(non_string("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ShapeError> {
        Err(non_string("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ShapeError> {
        Err(non_string(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ShapeError> {
        Err(non_string(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ShapeError> {
        Err(non_string("map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ShapeError> {
        Err(non_string(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ShapeError> {
        Err(non_string(name))
    }
}

fn non_string(kind: &str) -> ShapeError {
    ShapeError(format!("map with {kind} keys"))
}
