//! Value coercion: turning a raw scanned [`Value`] into the shape a declared
//! field expects.
//!
//! The rules run in a fixed priority order:
//!
//! 1. `NULL` never converts; the destination is left untouched.
//! 2. Timestamp targets accept native timestamps or text in one of the
//!    [`TIMESTAMP_LAYOUTS`], tried in order.
//! 3. A `decimal` hint keeps the original textual representation for text
//!    and opaque targets. Numeric targets ignore it and parse as usual.
//! 4. Float targets accept native floats or parse text.
//! 5. Integer targets accept native integers that fit the width, or parse text.
//! 6. Bool targets accept native bools, or `1`/`true` and `0`/`false` text.
//! 7. Text targets accept text or UTF-8 bytes.
//! 8. Anything else falls back to a representational conversion
//!    ([`fallback`]).
//!
//! Bytes are treated as text throughout because that is the common
//! denominator most drivers fall back to.

use crate::value::{DATE_FORMAT, DATETIME_FORMAT, Value};
use chrono::{NaiveDate, NaiveDateTime};

/// Accepted text layouts for timestamp columns, in the order they are tried.
pub const TIMESTAMP_LAYOUTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%Y-%m-%d %H:%M:%S%.f"];

/// Integer width and signedness of a declared integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    pub fn is_signed(self) -> bool {
        matches!(self, IntWidth::I8 | IntWidth::I16 | IntWidth::I32 | IntWidth::I64)
    }

    fn signed_range(self) -> (i64, i64) {
        match self {
            IntWidth::I8 => (i8::MIN.into(), i8::MAX.into()),
            IntWidth::I16 => (i16::MIN.into(), i16::MAX.into()),
            IntWidth::I32 => (i32::MIN.into(), i32::MAX.into()),
            _ => (i64::MIN, i64::MAX),
        }
    }

    fn unsigned_max(self) -> u64 {
        match self {
            IntWidth::U8 => u8::MAX.into(),
            IntWidth::U16 => u16::MAX.into(),
            IntWidth::U32 => u32::MAX.into(),
            _ => u64::MAX,
        }
    }
}

/// The destination type of one field, independent of its concrete Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Text,
    Bool,
    Int(IntWidth),
    Float32,
    Float64,
    Timestamp,
    /// No conversion; the raw value is handed to the field as-is.
    Opaque,
}

/// Per-field hint carried by `#[record(hint = "...")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Date,
    DateTime,
    Decimal,
}

impl TypeHint {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(TypeHint::Date),
            "datetime" => Some(TypeHint::DateTime),
            "decimal" => Some(TypeHint::Decimal),
            _ => None,
        }
    }
}

/// Convert `raw` into the canonical value for `target`.
///
/// Returns `None` when no rule accepts the value. The canonical shapes are:
/// `Text` for text, `Bool` for bool, `Int` for signed widths, `UInt` for
/// unsigned widths, `Float` for both float widths, `Timestamp` for
/// timestamps, and the raw value itself for opaque targets.
pub fn coerce(raw: &Value, target: SemanticType, hint: Option<TypeHint>) -> Option<Value> {
    if raw.is_null() {
        return None;
    }

    if target == SemanticType::Timestamp {
        return match raw {
            Value::Timestamp(ts) => Some(Value::Timestamp(*ts)),
            other => other.as_text().and_then(parse_timestamp).map(Value::Timestamp),
        };
    }

    if hint == Some(TypeHint::Decimal)
        && matches!(target, SemanticType::Text | SemanticType::Opaque)
    {
        match raw {
            Value::Text(s) => return Some(Value::Text(s.clone())),
            Value::Bytes(b) => {
                return std::str::from_utf8(b).ok().map(|s| Value::Text(s.to_string()));
            }
            _ => {}
        }
    }

    match target {
        SemanticType::Float32 | SemanticType::Float64 => coerce_float(raw, target),
        SemanticType::Int(width) => coerce_int(raw, width),
        SemanticType::Bool => coerce_bool(raw),
        SemanticType::Text => match raw {
            Value::Text(s) => Some(Value::Text(s.clone())),
            Value::Bytes(b) => String::from_utf8(b.clone()).ok().map(Value::Text),
            other => fallback(other, target),
        },
        SemanticType::Timestamp | SemanticType::Opaque => fallback(raw, target),
    }
}

fn coerce_float(raw: &Value, target: SemanticType) -> Option<Value> {
    let v = match raw {
        Value::Float(f) => *f,
        Value::Text(_) | Value::Bytes(_) => raw.as_text()?.parse::<f64>().ok()?,
        other => return fallback(other, target),
    };
    narrow_float(v, target)
}

fn narrow_float(v: f64, target: SemanticType) -> Option<Value> {
    if target == SemanticType::Float32 && v.is_finite() && (v as f32).is_infinite() {
        return None;
    }
    Some(Value::Float(v))
}

fn coerce_int(raw: &Value, width: IntWidth) -> Option<Value> {
    match raw {
        Value::Int(v) => fit_signed(*v, width),
        Value::UInt(v) => fit_unsigned(*v, width),
        Value::Text(_) | Value::Bytes(_) => {
            let s = raw.as_text()?;
            if width.is_signed() {
                fit_signed(s.parse::<i64>().ok()?, width)
            } else {
                fit_unsigned(s.parse::<u64>().ok()?, width)
            }
        }
        other => fallback(other, SemanticType::Int(width)),
    }
}

fn fit_signed(v: i64, width: IntWidth) -> Option<Value> {
    if width.is_signed() {
        let (min, max) = width.signed_range();
        (min..=max).contains(&v).then_some(Value::Int(v))
    } else {
        let v = u64::try_from(v).ok()?;
        (v <= width.unsigned_max()).then_some(Value::UInt(v))
    }
}

fn fit_unsigned(v: u64, width: IntWidth) -> Option<Value> {
    if width.is_signed() {
        // u64 -> i64 (or narrower) must not wrap into negative territory.
        let v = i64::try_from(v).ok()?;
        fit_signed(v, width)
    } else {
        (v <= width.unsigned_max()).then_some(Value::UInt(v))
    }
}

fn coerce_bool(raw: &Value) -> Option<Value> {
    match raw {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Text(_) | Value::Bytes(_) => parse_bool(raw.as_text()?).map(Value::Bool),
        other => fallback(other, SemanticType::Bool),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s == "1" || s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s == "0" || s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Representational conversions between native shapes that the typed rules
/// above do not cover: integers to floats, integral floats to integers,
/// integers to bools (non-zero is true), and numbers, bools or timestamps
/// rendered as text. Opaque targets take the raw value unchanged.
pub fn fallback(raw: &Value, target: SemanticType) -> Option<Value> {
    match (target, raw) {
        (_, Value::Null) => None,
        (SemanticType::Opaque, other) => Some(other.clone()),
        (SemanticType::Float32 | SemanticType::Float64, Value::Int(v)) => {
            narrow_float(*v as f64, target)
        }
        (SemanticType::Float32 | SemanticType::Float64, Value::UInt(v)) => {
            narrow_float(*v as f64, target)
        }
        (SemanticType::Int(width), Value::Float(f)) => {
            if f.fract() != 0.0 || !f.is_finite() {
                return None;
            }
            // `as` saturates; reject anything outside the 64-bit range first.
            if *f < 0.0 {
                if *f < i64::MIN as f64 {
                    return None;
                }
                fit_signed(*f as i64, width)
            } else {
                if *f >= u64::MAX as f64 {
                    return None;
                }
                fit_unsigned(*f as u64, width)
            }
        }
        (SemanticType::Int(width), Value::Bool(b)) => fit_signed(i64::from(*b), width),
        (SemanticType::Bool, Value::Int(v)) => Some(Value::Bool(*v != 0)),
        (SemanticType::Bool, Value::UInt(v)) => Some(Value::Bool(*v != 0)),
        (SemanticType::Text, Value::Int(v)) => Some(Value::Text(v.to_string())),
        (SemanticType::Text, Value::UInt(v)) => Some(Value::Text(v.to_string())),
        (SemanticType::Text, Value::Float(v)) => Some(Value::Text(v.to_string())),
        (SemanticType::Text, Value::Bool(v)) => Some(Value::Text(v.to_string())),
        (SemanticType::Text, Value::Timestamp(ts)) => {
            Some(Value::Text(ts.format(DATETIME_FORMAT).to_string()))
        }
        _ => None,
    }
}

/// Parse a timestamp using [`TIMESTAMP_LAYOUTS`], first match wins.
///
/// Date-only input resolves to midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_LAYOUTS.iter().find_map(|layout| {
        if *layout == DATE_FORMAT {
            NaiveDate::parse_from_str(s, layout)
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        } else {
            NaiveDateTime::parse_from_str(s, layout).ok()
        }
    })
}

/// Best-effort typing for map rows, where no declared type exists.
///
/// Text and bytes that look like `0`/`1` become bools, numeric-looking text
/// becomes an integer or float, timestamp-looking text becomes a timestamp;
/// everything else stays text. Non-UTF-8 bytes and native values pass through.
pub fn infer(raw: Value) -> Value {
    let text = match &raw {
        Value::Text(s) => s.as_str(),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => s,
            Err(_) => return raw,
        },
        _ => return raw,
    };

    if text == "0" || text == "1" {
        return Value::Bool(text == "1");
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    if let Some(ts) = parse_timestamp(text) {
        return Value::Timestamp(ts);
    }
    match raw {
        Value::Bytes(b) => Value::Text(String::from_utf8(b).unwrap_or_default()),
        other => other,
    }
}

/// Render a value for a `date` / `datetime` hinted column on write.
///
/// Returns `None` when the value cannot be rendered in the hinted layout; the
/// caller skips the column in that case. NULL and values without a date hint
/// pass through unchanged.
pub fn format_for_hint(value: Value, hint: Option<TypeHint>) -> Option<Value> {
    let layout = match hint {
        Some(TypeHint::Date) => DATE_FORMAT,
        Some(TypeHint::DateTime) => DATETIME_FORMAT,
        _ => return Some(value),
    };
    if value.is_null() {
        return Some(value);
    }
    let ts = match &value {
        Value::Timestamp(ts) => *ts,
        other => parse_timestamp(other.as_text()?)?,
    };
    Some(Value::Text(ts.format(layout).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn null_never_converts() {
        for target in [
            SemanticType::Text,
            SemanticType::Bool,
            SemanticType::Int(IntWidth::I64),
            SemanticType::Float64,
            SemanticType::Timestamp,
            SemanticType::Opaque,
        ] {
            assert_eq!(coerce(&Value::Null, target, None), None);
        }
    }

    #[test]
    fn timestamp_layouts_in_order() {
        let full = Value::Bytes(b"2024-03-01 12:30:45".to_vec());
        assert_eq!(
            coerce(&full, SemanticType::Timestamp, None),
            Some(Value::Timestamp(ts(2024, 3, 1, 12, 30, 45)))
        );

        let date = Value::Text("2024-03-01".into());
        assert_eq!(
            coerce(&date, SemanticType::Timestamp, None),
            Some(Value::Timestamp(ts(2024, 3, 1, 0, 0, 0)))
        );

        let frac = Value::Text("2024-03-01 12:30:45.123456".into());
        let parsed = coerce(&frac, SemanticType::Timestamp, None).unwrap();
        let Value::Timestamp(parsed) = parsed else {
            panic!("expected timestamp");
        };
        assert_eq!(parsed.and_utc().timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn timestamp_garbage_fails() {
        let raw = Value::Text("yesterday".into());
        assert_eq!(coerce(&raw, SemanticType::Timestamp, None), None);
        assert_eq!(coerce(&Value::Int(5), SemanticType::Timestamp, None), None);
    }

    #[test]
    fn decimal_hint_keeps_text() {
        let raw = Value::Bytes(b"12345678901234567890.123456789".to_vec());
        assert_eq!(
            coerce(&raw, SemanticType::Text, Some(TypeHint::Decimal)),
            Some(Value::Text("12345678901234567890.123456789".into()))
        );
    }

    #[test]
    fn decimal_hint_on_numeric_targets_parses() {
        let raw = Value::Text("19.99".into());
        assert_eq!(
            coerce(&raw, SemanticType::Float64, Some(TypeHint::Decimal)),
            Some(Value::Float(19.99))
        );
        assert_eq!(
            coerce(&Value::Bytes(b"42".to_vec()), SemanticType::Int(IntWidth::I64), Some(TypeHint::Decimal)),
            Some(Value::Int(42))
        );
        assert_eq!(
            coerce(&raw, SemanticType::Opaque, Some(TypeHint::Decimal)),
            Some(Value::Text("19.99".into()))
        );
    }

    #[test]
    fn float_from_bytes_and_native() {
        assert_eq!(
            coerce(&Value::Bytes(b"3.5".to_vec()), SemanticType::Float64, None),
            Some(Value::Float(3.5))
        );
        assert_eq!(
            coerce(&Value::Float(1.25), SemanticType::Float32, None),
            Some(Value::Float(1.25))
        );
        assert_eq!(
            coerce(&Value::Text("abc".into()), SemanticType::Float64, None),
            None
        );
        assert_eq!(
            coerce(&Value::Float(1e300), SemanticType::Float32, None),
            None
        );
    }

    #[test]
    fn integer_widths_and_overflow() {
        let i32_t = SemanticType::Int(IntWidth::I32);
        assert_eq!(coerce(&Value::Int(42), i32_t, None), Some(Value::Int(42)));
        assert_eq!(coerce(&Value::Int(i64::MAX), i32_t, None), None);
        assert_eq!(
            coerce(&Value::Bytes(b"-7".to_vec()), i32_t, None),
            Some(Value::Int(-7))
        );

        let i64_t = SemanticType::Int(IntWidth::I64);
        assert_eq!(coerce(&Value::UInt(u64::MAX), i64_t, None), None);
        assert_eq!(coerce(&Value::UInt(9), i64_t, None), Some(Value::Int(9)));

        let u8_t = SemanticType::Int(IntWidth::U8);
        assert_eq!(coerce(&Value::Int(-1), u8_t, None), None);
        assert_eq!(coerce(&Value::Int(255), u8_t, None), Some(Value::UInt(255)));
        assert_eq!(coerce(&Value::Text("256".into()), u8_t, None), None);
    }

    #[test]
    fn bool_text_forms() {
        let t = SemanticType::Bool;
        assert_eq!(coerce(&Value::Bytes(b"1".to_vec()), t, None), Some(Value::Bool(true)));
        assert_eq!(coerce(&Value::Text("TRUE".into()), t, None), Some(Value::Bool(true)));
        assert_eq!(coerce(&Value::Text("False".into()), t, None), Some(Value::Bool(false)));
        assert_eq!(coerce(&Value::Text("0".into()), t, None), Some(Value::Bool(false)));
        assert_eq!(coerce(&Value::Text("yes".into()), t, None), None);
        assert_eq!(coerce(&Value::Int(2), t, None), Some(Value::Bool(true)));
    }

    #[test]
    fn text_from_bytes() {
        assert_eq!(
            coerce(&Value::Bytes(b"hello".to_vec()), SemanticType::Text, None),
            Some(Value::Text("hello".into()))
        );
        assert_eq!(
            coerce(&Value::Bytes(vec![0xff, 0xfe]), SemanticType::Text, None),
            None
        );
    }

    #[test]
    fn fallback_conversions() {
        assert_eq!(
            coerce(&Value::Int(3), SemanticType::Float64, None),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            coerce(&Value::Float(4.0), SemanticType::Int(IntWidth::I16), None),
            Some(Value::Int(4))
        );
        assert_eq!(
            coerce(&Value::Float(4.5), SemanticType::Int(IntWidth::I16), None),
            None
        );
        assert_eq!(
            coerce(&Value::Float(-1e20), SemanticType::Int(IntWidth::I64), None),
            None
        );
        assert_eq!(
            coerce(&Value::Float(1e20), SemanticType::Int(IntWidth::U64), None),
            None
        );
        assert_eq!(
            coerce(&Value::Float(1e19), SemanticType::Int(IntWidth::I64), None),
            None
        );
        assert_eq!(
            coerce(&Value::Float(-9.0e18), SemanticType::Int(IntWidth::I64), None),
            Some(Value::Int(-9_000_000_000_000_000_000))
        );
        assert_eq!(
            coerce(&Value::Int(10), SemanticType::Text, None),
            Some(Value::Text("10".into()))
        );
        assert_eq!(
            coerce(&Value::Bytes(vec![1, 2]), SemanticType::Opaque, None),
            Some(Value::Bytes(vec![1, 2]))
        );
    }

    #[test]
    fn infer_upgrades_text() {
        assert_eq!(infer(Value::Bytes(b"1".to_vec())), Value::Bool(true));
        assert_eq!(infer(Value::Bytes(b"42".to_vec())), Value::Int(42));
        assert_eq!(infer(Value::Text("2.5".into())), Value::Float(2.5));
        assert_eq!(
            infer(Value::Text("2024-01-02".into())),
            Value::Timestamp(ts(2024, 1, 2, 0, 0, 0))
        );
        assert_eq!(infer(Value::Bytes(b"alice".to_vec())), Value::Text("alice".into()));
        assert_eq!(infer(Value::Int(7)), Value::Int(7));
        assert_eq!(infer(Value::Null), Value::Null);
    }

    #[test]
    fn hint_formatting_for_writes() {
        let when = Value::Timestamp(ts(2024, 5, 6, 7, 8, 9));
        assert_eq!(
            format_for_hint(when.clone(), Some(TypeHint::Date)),
            Some(Value::Text("2024-05-06".into()))
        );
        assert_eq!(
            format_for_hint(when, Some(TypeHint::DateTime)),
            Some(Value::Text("2024-05-06 07:08:09".into()))
        );
        assert_eq!(
            format_for_hint(Value::Text(String::new()), Some(TypeHint::Date)),
            None
        );
        assert_eq!(
            format_for_hint(Value::Int(1), None),
            Some(Value::Int(1))
        );
        assert_eq!(
            format_for_hint(Value::Null, Some(TypeHint::DateTime)),
            Some(Value::Null)
        );
    }
}
