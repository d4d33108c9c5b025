//! Rejects values containing NaN or infinite floats
//!
//! JSON has no representation for non-finite floats and serde_json writes them
//! as `null`, which would make `Some(f64::NAN)` indistinguishable from `None`.
//! Keys and payloads are checked with [`check_finite`] before they are rendered.

use std::fmt::Display;

use serde::ser::{self, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct NonFiniteFloat(String);

impl ser::Error for NonFiniteFloat {
    fn custom<T: Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Walks `value` and fails on the first NaN or infinite float
pub(crate) fn check_finite<T: Serialize + ?Sized>(value: &T) -> Result<(), NonFiniteFloat> {
    value.serialize(FloatGuard)
}

struct FloatGuard;

fn guard_float(v: f64) -> Result<(), NonFiniteFloat> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(NonFiniteFloat(format!("non-finite float {v} has no lossless rendering")))
    }
}

macro_rules! accept {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(fn $method(self, _v: $ty) -> Result<(), NonFiniteFloat> {
            Ok(())
        })*
    };
}

impl ser::Serializer for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept!(
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
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    );

    fn serialize_f32(self, v: f32) -> Result<(), NonFiniteFloat> {
        guard_float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), NonFiniteFloat> {
        guard_float(v)
    }

    fn serialize_none(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), NonFiniteFloat> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

impl ser::SerializeTuple for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

impl ser::SerializeMap for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NonFiniteFloat> {
        key.serialize(FloatGuard)
    }

    fn serialize_value<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

impl ser::SerializeStruct for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FloatGuard {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(FloatGuard)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}
