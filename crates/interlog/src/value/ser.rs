//! `serde::Serializer` that captures any `Serialize` type into a [`Value`].

use super::{Record, Value};
use serde::ser::{self, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

/// Error raised when a type refuses to serialize.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CaptureError(String);

impl ser::Error for CaptureError {
    fn custom<T: Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

type CaptureResult = Result<Value, CaptureError>;

pub(crate) struct ValueSerializer;

fn integer<N: Into<serde_json::Number>>(n: N) -> CaptureResult {
    Ok(Value::Number(n.into()))
}

fn map_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn tagged(variant: &'static str, inner: Value) -> Value {
    let mut map = BTreeMap::new();
    map.insert(variant.to_string(), inner);
    Value::Map(map)
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = CaptureError;

    type SerializeSeq = SeqCollector;
    type SerializeTuple = SeqCollector;
    type SerializeTupleStruct = SeqCollector;
    type SerializeTupleVariant = TupleVariantCollector;
    type SerializeMap = MapCollector;
    type SerializeStruct = RecordCollector;
    type SerializeStructVariant = StructVariantCollector;

    fn serialize_bool(self, v: bool) -> CaptureResult {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> CaptureResult {
        integer(v)
    }

    fn serialize_i16(self, v: i16) -> CaptureResult {
        integer(v)
    }

    fn serialize_i32(self, v: i32) -> CaptureResult {
        integer(v)
    }

    fn serialize_i64(self, v: i64) -> CaptureResult {
        integer(v)
    }

    fn serialize_i128(self, v: i128) -> CaptureResult {
        match i64::try_from(v) {
            Ok(small) => integer(small),
            Err(_) => Ok(Value::String(v.to_string())),
        }
    }

    fn serialize_u8(self, v: u8) -> CaptureResult {
        integer(v)
    }

    fn serialize_u16(self, v: u16) -> CaptureResult {
        integer(v)
    }

    fn serialize_u32(self, v: u32) -> CaptureResult {
        integer(v)
    }

    fn serialize_u64(self, v: u64) -> CaptureResult {
        integer(v)
    }

    fn serialize_u128(self, v: u128) -> CaptureResult {
        match u64::try_from(v) {
            Ok(small) => integer(small),
            Err(_) => Ok(Value::String(v.to_string())),
        }
    }

    fn serialize_f32(self, v: f32) -> CaptureResult {
        Ok(Value::from_f64(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> CaptureResult {
        Ok(Value::from_f64(v))
    }

    fn serialize_char(self, v: char) -> CaptureResult {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> CaptureResult {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> CaptureResult {
        Ok(Value::List(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> CaptureResult {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> CaptureResult {
        value.serialize(self)
    }

    fn serialize_unit(self) -> CaptureResult {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> CaptureResult {
        Ok(Value::Object(Record::new(name)))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> CaptureResult {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> CaptureResult {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> CaptureResult {
        Ok(tagged(variant, value.serialize(ValueSerializer)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqCollector, CaptureError> {
        Ok(SeqCollector {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqCollector, CaptureError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqCollector, CaptureError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantCollector, CaptureError> {
        Ok(TupleVariantCollector {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapCollector, CaptureError> {
        Ok(MapCollector {
            entries: BTreeMap::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<RecordCollector, CaptureError> {
        Ok(RecordCollector {
            record: Record {
                type_name: name.into(),
                fields: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructVariantCollector, CaptureError> {
        Ok(StructVariantCollector {
            variant,
            record: Record {
                type_name: variant.into(),
                fields: Vec::with_capacity(len),
            },
        })
    }
}

// =============================================================================
// Collectors
// =============================================================================

pub(crate) struct SeqCollector {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CaptureResult {
        Ok(Value::List(self.items))
    }
}

impl ser::SerializeTuple for SeqCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> CaptureResult {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> CaptureResult {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct TupleVariantCollector {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for TupleVariantCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CaptureResult {
        Ok(tagged(self.variant, Value::List(self.items)))
    }
}

pub(crate) struct MapCollector {
    entries: BTreeMap<String, Value>,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CaptureError> {
        self.pending_key = Some(map_key(key.serialize(ValueSerializer)?));
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <CaptureError as ser::Error>::custom("map value without a key"))?;
        self.entries.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CaptureResult {
        Ok(Value::Map(self.entries))
    }
}

pub(crate) struct RecordCollector {
    record: Record,
}

impl ser::SerializeStruct for RecordCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.record
            .fields
            .push((key.to_string(), value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> CaptureResult {
        Ok(Value::Object(self.record))
    }
}

pub(crate) struct StructVariantCollector {
    variant: &'static str,
    record: Record,
}

impl ser::SerializeStructVariant for StructVariantCollector {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.record
            .fields
            .push((key.to_string(), value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> CaptureResult {
        Ok(tagged(self.variant, Value::Object(self.record)))
    }
}
