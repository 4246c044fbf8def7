//! Self-describing records.
//!
//! A [`Record`] lists its fields once through [`Record::declared_fields`] and
//! exposes path-based accessors, so the mapper can read and write fields
//! without knowing the concrete type. `#[derive(Record)]` generates all of it.
//!
//! ```ignore
//! use sqlgom::Record;
//!
//! #[derive(Debug, Default, Record)]
//! struct Common {
//!     #[record(key)]
//!     id: i64,
//!     #[record(column, hint = "datetime")]
//!     created_at: Option<chrono::NaiveDateTime>,
//! }
//!
//! // Every field is read by name; only tagged fields are written back.
//! #[derive(Debug, Default, Record)]
//! #[record(table = "users")]
//! struct User {
//!     #[record(embed)]
//!     common: Common,
//!     #[record(column = "user_name")]
//!     name: String,
//!     #[record(ignore)]
//!     scratch: Vec<String>,
//! }
//! ```

use crate::coerce::{IntWidth, SemanticType, TypeHint};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// One declared field, in declaration order.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Rust field name.
    pub name: &'static str,
    /// Explicit column-name tag, if any.
    pub column: Option<&'static str>,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A column-backed field.
    Scalar {
        semantic: SemanticType,
        nullable: bool,
        hint: Option<TypeHint>,
        /// Auto-generated key; skipped on INSERT while empty.
        key: bool,
    },
    /// An embedded record whose fields flatten into the outer one.
    Embedded(fn() -> Vec<FieldDecl>),
    /// Excluded from mapping entirely.
    Ignored,
}

impl FieldDecl {
    /// Shorthand used by generated code for a column-backed field of type `F`.
    pub fn scalar<F: FieldValue>(
        name: &'static str,
        column: Option<&'static str>,
        hint: Option<TypeHint>,
        key: bool,
    ) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::Scalar {
                semantic: F::SEMANTIC,
                nullable: F::NULLABLE,
                hint,
                key,
            },
        }
    }

    pub fn embedded<R: Record>(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            kind: FieldKind::Embedded(R::declared_fields),
        }
    }

    pub fn ignored(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            kind: FieldKind::Ignored,
        }
    }
}

/// A type the mapper can populate from rows and read back for writes.
///
/// Field paths are indices into [`declared_fields`](Record::declared_fields);
/// a path longer than one descends into embedded records.
pub trait Record: Default + 'static {
    /// Table name from `#[record(table = "...")]`.
    const TABLE: Option<&'static str> = None;

    fn declared_fields() -> Vec<FieldDecl>;

    /// Store an already-coerced value at `path`. Returns `false` when the path
    /// does not name a scalar field or the value has the wrong shape.
    fn set_field(&mut self, path: &[usize], value: Value) -> bool;

    /// Read the value at `path` for INSERT/UPDATE.
    fn field_value(&self, path: &[usize]) -> Option<Value>;

    fn before_insert(&mut self) {}

    fn before_update(&mut self) {}
}

/// Lifecycle callbacks, wired into [`Record`] with `#[record(hooks)]`.
///
/// ```ignore
/// #[derive(Default, Record)]
/// #[record(table = "posts", hooks)]
/// struct Post { #[record(key)] id: i64, title: String, updated_at: Option<NaiveDateTime> }
///
/// impl RecordHooks for Post {
///     fn before_update(&mut self) {
///         self.updated_at = Some(chrono::Utc::now().naive_utc());
///     }
/// }
/// ```
pub trait RecordHooks {
    /// Runs before the record is inserted.
    fn before_insert(&mut self) {}

    /// Runs before the record is written back by `flush`.
    fn before_update(&mut self) {}
}

/// Conversion between one Rust field type and the canonical [`Value`] shape
/// produced by [`crate::coerce::coerce`].
pub trait FieldValue: Sized {
    const SEMANTIC: SemanticType;
    const NULLABLE: bool = false;

    fn from_value(value: Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

/// Assign a coerced value into `slot`, leaving it untouched on a shape
/// mismatch. Used by generated `set_field` bodies.
pub fn assign<F: FieldValue>(slot: &mut F, value: Value) -> bool {
    match F::from_value(value) {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

macro_rules! impl_int_field {
    ($($t:ty => $width:ident),* $(,)?) => {
        $(impl FieldValue for $t {
            const SEMANTIC: SemanticType = SemanticType::Int(IntWidth::$width);

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Int(v) => <$t>::try_from(v).ok(),
                    Value::UInt(v) => <$t>::try_from(v).ok(),
                    _ => None,
                }
            }

            fn to_value(&self) -> Value {
                Value::from(*self)
            }
        })*
    };
}

impl_int_field!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
);

impl FieldValue for f32 {
    const SEMANTIC: SemanticType = SemanticType::Float32;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f as f32),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for f64 {
    const SEMANTIC: SemanticType = SemanticType::Float64;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FieldValue for bool {
    const SEMANTIC: SemanticType = SemanticType::Bool;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FieldValue for NaiveDateTime {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FieldValue for NaiveDate {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for DateTime<Utc> {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Timestamp(ts) => Some(ts.and_utc()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }
}

impl FieldValue for Vec<u8> {
    const SEMANTIC: SemanticType = SemanticType::Opaque;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.into_bytes()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

/// Raw passthrough: the field receives whatever the backend delivered.
impl FieldValue for Value {
    const SEMANTIC: SemanticType = SemanticType::Opaque;

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// JSON columns travel as text.
impl FieldValue for serde_json::Value {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => serde_json::from_str(&s).ok(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl FieldValue for uuid::Uuid {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => uuid::Uuid::parse_str(&s).ok(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

/// Decimals keep their textual form end to end; pair with
/// `#[record(hint = "decimal")]` so native numbers are never routed through
/// binary floating point.
#[cfg(feature = "rust_decimal")]
impl FieldValue for rust_decimal::Decimal {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const SEMANTIC: SemanticType = T::SEMANTIC;
    const NULLABLE: bool = true;

    fn from_value(value: Value) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_value(value).map(Some)
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }
}

/// Registration entry submitted by `#[derive(Record)]` for non-generic types.
///
/// Used to pre-populate the field index cache at startup with
/// [`crate::describe::prewarm`].
pub struct RecordRegistration {
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub warm: fn(),
}

inventory::collect!(RecordRegistration);

/// Iterate over every record type registered through the derive.
pub fn registered_records() -> impl Iterator<Item = &'static RecordRegistration> {
    inventory::iter::<RecordRegistration>.into_iter()
}
