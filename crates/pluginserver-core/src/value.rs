//! Schema-less values carried over the wire.
//!
//! Plugin schemas, RPC parameters and RPC results are all arbitrary nested
//! maps, sequences and scalars. [`DynamicValue`] is the one type used for all
//! of them, with conversions to and from MessagePack (`rmpv`) and JSON.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AppError;
use crate::result::AppResult;

/// A dynamically typed value: null, scalar, sequence, or string-keyed map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DynamicValue {
    /// Absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number. Unsigned integers above `i64::MAX` land here.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence.
    Array(Vec<DynamicValue>),
    /// A string-keyed mapping. Key order is not significant.
    Map(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    /// Builds a map from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, DynamicValue)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the elements if this is an array.
    pub fn as_array(&self) -> Option<&[DynamicValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a key if this is a map.
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Converts a decoded MessagePack value.
    ///
    /// Binary payloads decode as text, map keys must be strings, and
    /// extension types are rejected.
    pub fn from_msgpack(value: rmpv::Value) -> AppResult<Self> {
        Ok(match value {
            rmpv::Value::Nil => Self::Null,
            rmpv::Value::Boolean(b) => Self::Bool(b),
            rmpv::Value::Integer(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            rmpv::Value::F32(f) => Self::Float(f64::from(f)),
            rmpv::Value::F64(f) => Self::Float(f),
            rmpv::Value::String(s) => Self::String(utf8_string(s.into_bytes())?),
            rmpv::Value::Binary(bytes) => Self::String(utf8_string(bytes)?),
            rmpv::Value::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::from_msgpack)
                    .collect::<AppResult<_>>()?,
            ),
            rmpv::Value::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match key {
                        rmpv::Value::String(s) => utf8_string(s.into_bytes())?,
                        rmpv::Value::Binary(bytes) => utf8_string(bytes)?,
                        other => {
                            return Err(AppError::encoding(format!(
                                "map keys must be strings, got {other}"
                            )));
                        }
                    };
                    map.insert(key, Self::from_msgpack(value)?);
                }
                Self::Map(map)
            }
            rmpv::Value::Ext(tag, _) => {
                return Err(AppError::encoding(format!(
                    "unsupported extension type {tag}"
                )));
            }
        })
    }

    /// Converts into a MessagePack value for encoding.
    pub fn into_msgpack(self) -> rmpv::Value {
        match self {
            Self::Null => rmpv::Value::Nil,
            Self::Bool(b) => rmpv::Value::Boolean(b),
            Self::Integer(i) => rmpv::Value::from(i),
            Self::Float(f) => rmpv::Value::F64(f),
            Self::String(s) => rmpv::Value::from(s),
            Self::Array(items) => {
                rmpv::Value::Array(items.into_iter().map(Self::into_msgpack).collect())
            }
            Self::Map(map) => rmpv::Value::Map(
                map.into_iter()
                    .map(|(k, v)| (rmpv::Value::from(k), v.into_msgpack()))
                    .collect(),
            ),
        }
    }
}

fn utf8_string(bytes: Vec<u8>) -> AppResult<String> {
    String::from_utf8(bytes)
        .map_err(|e| AppError::encoding(format!("byte string is not valid UTF-8: {e}")))
}

impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for DynamicValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<DynamicValue>> From<Vec<T>> for DynamicValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_decodes_as_text() {
        let value = DynamicValue::from_msgpack(rmpv::Value::Binary(b"access".to_vec()))
            .expect("valid utf-8");
        assert_eq!(value, DynamicValue::String("access".to_string()));
    }

    #[test]
    fn test_invalid_utf8_binary_is_rejected() {
        let err = DynamicValue::from_msgpack(rmpv::Value::Binary(vec![0xff, 0xfe]))
            .expect_err("invalid utf-8");
        assert_eq!(err.kind, crate::ErrorKind::Encoding);
    }

    #[test]
    fn test_binary_map_keys_become_strings() {
        let raw = rmpv::Value::Map(vec![(
            rmpv::Value::Binary(b"minute".to_vec()),
            rmpv::Value::from(60),
        )]);
        let value = DynamicValue::from_msgpack(raw).expect("convert");
        assert_eq!(value.get("minute"), Some(&DynamicValue::Integer(60)));
    }

    #[test]
    fn test_non_string_map_key_is_rejected() {
        let raw = rmpv::Value::Map(vec![(rmpv::Value::from(1), rmpv::Value::Nil)]);
        assert!(DynamicValue::from_msgpack(raw).is_err());
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let value = DynamicValue::from_msgpack(rmpv::Value::from(u64::MAX)).expect("convert");
        assert!(matches!(value, DynamicValue::Float(_)));
    }

    #[test]
    fn test_json_conversion_keeps_nesting() {
        let value = DynamicValue::from(json!({
            "fields": [{"limit": {"type": "integer", "default": 10}}],
            "strict": true,
            "ratio": 0.5,
        }));
        let fields = value.get("fields").and_then(DynamicValue::as_array).expect("fields");
        let limit = fields[0].get("limit").expect("limit");
        assert_eq!(limit.get("default").and_then(DynamicValue::as_i64), Some(10));
        assert_eq!(value.get("strict"), Some(&DynamicValue::Bool(true)));
        assert_eq!(value.get("ratio"), Some(&DynamicValue::Float(0.5)));
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let value = DynamicValue::map([
            ("name", DynamicValue::from("auth")),
            ("phases", DynamicValue::from(vec!["access", "log"])),
            ("extra", DynamicValue::Null),
        ]);
        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(
            json,
            json!({"name": "auth", "phases": ["access", "log"], "extra": null})
        );
    }

    #[test]
    fn test_msgpack_conversion_preserves_structure() {
        let value = DynamicValue::map([
            ("a", DynamicValue::Integer(-3)),
            ("b", DynamicValue::from(vec![DynamicValue::Bool(false), DynamicValue::Null])),
        ]);
        let back = DynamicValue::from_msgpack(value.clone().into_msgpack()).expect("convert");
        assert_eq!(back, value);
    }
}
