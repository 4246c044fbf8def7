//! The raw database value shared by bound arguments and scanned columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Layout used when a timestamp has to travel as text.
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout used when a date has to travel as text.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value as a backend delivers it for one column, or as a caller binds it
/// to one `?` placeholder.
///
/// Backends disagree on the wire shape of the same logical value (MySQL-style
/// drivers hand most columns back as bytes, SQLite returns native integers),
/// so the set is kept small and closed. Conversion into a declared Rust type
/// happens in [`crate::coerce`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bytes(Vec<u8>),
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the value as text when it is `Text` or UTF-8 `Bytes`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Whether the value counts as "unset" for an auto-generated key:
    /// NULL, zero, or an empty string.
    pub fn is_empty_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(0) | Value::UInt(0) => true,
            Value::Text(s) => s.is_empty() || s == "0",
            Value::Bytes(b) => b.is_empty() || b.as_slice() == b"0",
            _ => false,
        }
    }

    /// Short type label used in log output and decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

/// Renders the value the way it appears in SQL log lines: strings quoted,
/// everything else bare.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{s:?}"),
                Err(_) => write!(f, "<{} bytes>", b.len()),
            },
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(DATETIME_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => serializer.serialize_bytes(b),
            },
            Value::Text(s) => serializer.serialize_str(s),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Timestamp(ts) => {
                serializer.collect_str(&ts.format(DATETIME_FORMAT))
            }
        }
    }
}

/// Render bound arguments as `1:"alice" 2:42` for log output.
pub fn format_args_for_log(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{}:{}", i + 1, arg));
    }
    out
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(u64::from(v))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Timestamp(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.naive_utc())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            other => Value::Text(other.to_string()),
        }
    }
}

#[cfg(feature = "rust_decimal")]
impl From<rust_decimal::Decimal> for Value {
    fn from(v: rust_decimal::Decimal) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Build a `Vec<Value>` of bound arguments.
///
/// ```ignore
/// db.table("users").and_where("age > ? AND status = ?", args![18, "active"]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_is_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(5i32)), Value::Int(5));
    }

    #[test]
    fn args_macro_converts_each_item() {
        let args = crate::args![1, "x", true];
        assert_eq!(
            args,
            vec![Value::Int(1), Value::Text("x".into()), Value::Bool(true)]
        );
    }

    #[test]
    fn log_format_quotes_strings() {
        let rendered = format_args_for_log(&[Value::from("alice"), Value::from(42i64)]);
        assert_eq!(rendered, r#"1:"alice" 2:42"#);
    }

    #[test]
    fn empty_key_detection() {
        assert!(Value::Int(0).is_empty_key());
        assert!(Value::Null.is_empty_key());
        assert!(Value::Text(String::new()).is_empty_key());
        assert!(!Value::Int(7).is_empty_key());
    }

    #[test]
    fn serializes_to_json_scalars() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Int(3),
            Value::Bytes(b"hi".to_vec()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,"hi"]"#);
    }
}
