//! Scalar column values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A decoded column value.
///
/// Binary-protocol integers keep their full width: signed columns decode to
/// `Int`, unsigned `BIGINT` decodes to `UInt` so values above `i64::MAX`
/// survive exactly. Temporal columns are rendered to their canonical text
/// form (`YYYY-MM-DD HH:MM:SS.ffffff`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Signed integer (any width up to 64 bits)
    Int(i64),

    /// Unsigned 64-bit integer
    UInt(u64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// Raw bytes (strings, decimals, blobs, JSON)
    Bytes(Vec<u8>),

    /// Text rendering of a temporal value
    Text(String),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "INTEGER",
            Value::UInt(_) => "UNSIGNED",
            Value::Float(_) => "FLOAT",
            Value::Double(_) => "DOUBLE",
            Value::Bytes(_) => "BYTES",
            Value::Text(_) => "TEXT",
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to convert this value to a u64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    ///
    /// Byte values are returned only when they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(v.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_max_is_exact() {
        let v = Value::UInt(u64::MAX);
        assert_eq!(v.to_string(), "18446744073709551615");
        assert_eq!(v.as_u64(), Some(u64::MAX));
        assert_eq!(v.as_i64(), None);
    }

    #[test]
    fn test_signed_conversions() {
        assert_eq!(Value::Int(-56).as_i64(), Some(-56));
        assert_eq!(Value::Int(-56).as_u64(), None);
        assert_eq!(Value::Int(7).as_u64(), Some(7));
    }

    #[test]
    fn test_as_str_on_bytes() {
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::Bytes(vec![0xFF, 0xFE]).as_str(), None);
        assert_eq!(
            Value::Text("2024-01-01".to_string()).as_bytes(),
            Some(&b"2024-01-01"[..])
        );
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<i64> = None;
        assert!(Value::from(none).is_null());
        assert_eq!(Value::from(Some(5_i64)), Value::Int(5));
    }

    #[test]
    fn test_serde_roundtrip_keeps_variant() {
        let json = serde_json::to_string(&Value::UInt(u64::MAX)).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::UInt(u64::MAX));
    }
}
