use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::tags::TypeTag;
use crate::core::error::{Error, ErrorKind, Result};

/// Dynamic value model the codec serializes. Object graphs are recursive
/// field-name/value lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::ULong(_) => TypeTag::ULong,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::Bytes(_) => TypeTag::Bytes,
            Value::IntArray(_) => TypeTag::IntArray,
            Value::LongArray(_) => TypeTag::LongArray,
            Value::List(_) => TypeTag::List,
            Value::Object(_) => TypeTag::Object,
        }
    }

    /// Look up a field on an object value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replace or append a field on an object value.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match self {
            Value::Object(fields) => {
                if let Some(slot) = fields.iter_mut().find(|(n, _)| n == name) {
                    slot.1 = value;
                } else {
                    fields.push((name.to_string(), value));
                }
                Ok(())
            }
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("cannot set field on {:?} value", other.tag()),
            )),
        }
    }

    fn mismatch(&self, wanted: TypeTag) -> Error {
        Error::new(
            ErrorKind::AttributeMismatch,
            format!("stored type is {:?}, requested {:?}", self.tag(), wanted),
        )
    }

    pub fn as_long(&self) -> Result<i64> {
        match self {
            Value::Long(v) => Ok(*v),
            Value::Int(v) => Ok(*v as i64),
            other => Err(other.mismatch(TypeTag::Long)),
        }
    }

    pub fn as_ulong(&self) -> Result<u64> {
        match self {
            Value::ULong(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::ULong)),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.mismatch(TypeTag::String)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Bool)),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self {
            Value::Double(v) => Ok(*v),
            Value::Float(v) => Ok(*v as f64),
            other => Err(other.mismatch(TypeTag::Double)),
        }
    }

    /// Build a value from any serde-serializable type. This is the
    /// derive-based stand-in for field reflection: the type's own derive
    /// decides the field walk at compile time.
    pub fn from_serde<T: Serialize>(entity: &T) -> Result<Value> {
        let json = serde_json::to_value(entity)?;
        Ok(Value::from_json(json))
    }

    pub fn to_serde<T: DeserializeOwned>(&self) -> Result<T> {
        let json = self.to_json();
        Ok(serde_json::from_value(json)?)
    }

    fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Value::ULong(v)
                } else if let Some(v) = n.as_i64() {
                    Value::Long(v)
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(name, v)| (name, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Long(v) => serde_json::Value::from(*v),
            Value::ULong(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Value::from(*v),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                serde_json::Value::Array(b.iter().map(|v| serde_json::Value::from(*v)).collect())
            }
            Value::IntArray(items) => {
                serde_json::Value::Array(items.iter().map(|v| serde_json::Value::from(*v)).collect())
            }
            Value::LongArray(items) => {
                serde_json::Value::Array(items.iter().map(|v| serde_json::Value::from(*v)).collect())
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.to_json()).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Entity ⇄ record bridge. The default implementations route through the
/// type's serde derives, so any `Serialize + DeserializeOwned` entity
/// works without a hand-written codec.
pub trait Streamable: Serialize + DeserializeOwned {
    fn to_record(&self) -> Result<Value> {
        Value::from_serde(self)
    }

    fn from_record(record: &Value) -> Result<Self> {
        record.to_serde()
    }
}

impl<T: Serialize + DeserializeOwned> Streamable for T {}
