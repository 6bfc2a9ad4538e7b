//! Non-finite float detection
//!
//! `serde_json` silently writes `NaN` and the infinities as `null`. The
//! platform treats such results as unencodable, so results are walked with
//! [`ensure_finite`] before they are placed into an envelope.

use std::fmt::Display;

use serde::ser::{self, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct NonFinite(String);

impl ser::Error for NonFinite {
    fn custom<T: Display>(msg: T) -> Self {
        NonFinite(msg.to_string())
    }
}

/// Fail if `value` contains a float JSON cannot represent.
pub fn ensure_finite<T: ?Sized + Serialize>(value: &T) -> Result<(), NonFinite> {
    value.serialize(Probe)
}

/// Serializer that produces nothing and only inspects floats.
struct Probe;

type Probed = Result<(), NonFinite>;

impl Serializer for Probe {
    type Ok = ();
    type Error = NonFinite;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Probed {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> Probed {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Probed {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> Probed {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> Probed {
        Ok(())
    }

    fn serialize_i128(self, _v: i128) -> Probed {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> Probed {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Probed {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> Probed {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> Probed {
        Ok(())
    }

    fn serialize_u128(self, _v: u128) -> Probed {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Probed {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Probed {
        if v.is_finite() {
            Ok(())
        } else {
            Err(NonFinite(format!("unsupported value: {}", v)))
        }
    }

    fn serialize_char(self, _v: char) -> Probed {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> Probed {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Probed {
        Ok(())
    }

    fn serialize_none(self) -> Probed {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Probed {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Probed {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Probed {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Probed {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Probed {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Probed {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}

impl ser::SerializeTuple for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}

impl ser::SerializeMap for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Probed {
        key.serialize(Probe)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}

impl ser::SerializeStruct for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Probed {
        value.serialize(Probe)
    }

    fn end(self) -> Probed {
        Ok(())
    }
}
