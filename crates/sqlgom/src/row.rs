//! Row materialization: cursors into records, maps or scalars.

use crate::client::Cursor;
use crate::coerce::{coerce, infer};
use crate::describe::{FieldDescriptor, describe};
use crate::error::{OrmError, OrmResult};
use crate::record::{FieldValue, Record};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

/// One result row as ordered `(column, value)` pairs.
///
/// Values have been through best-effort type inference; there is no declared
/// target type for a map row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap {
    entries: Vec<(String, Value)>,
}

impl RowMap {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    /// Look up a column, exact match first, then ignoring ASCII case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(c, _)| c.eq_ignore_ascii_case(column))
            })
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

/// Serialises as a JSON-style object. Repeated column names (a join
/// returning two `id` columns) keep only the first entry, matching [`RowMap::get`].
impl Serialize for RowMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let unique: Vec<_> = self
            .entries
            .iter()
            .filter(|(column, _)| seen.insert(column.as_str()))
            .collect();
        let mut map = serializer.serialize_map(Some(unique.len()))?;
        for (column, value) in unique {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

fn finish<T>(cursor: &mut dyn Cursor, result: OrmResult<T>) -> OrmResult<T> {
    let closed = cursor.close();
    let value = result?;
    closed?;
    Ok(value)
}

fn populate<T: Record>(
    slots: &[Option<&FieldDescriptor>],
    columns: &[String],
    values: Vec<Value>,
    out: &mut T,
) {
    for ((slot, column), raw) in slots.iter().zip(columns).zip(values) {
        let Some(field) = slot else {
            continue;
        };
        let Some(value) = coerce(&raw, field.semantic, field.hint) else {
            if !raw.is_null() {
                tracing::trace!(
                    target: "sqlgom.mapper",
                    column = %column,
                    raw_kind = raw.kind(),
                    target_type = ?field.semantic,
                    "skipped unconvertible column"
                );
            }
            continue;
        };
        if !out.set_field(&field.path, value) {
            tracing::trace!(
                target: "sqlgom.mapper",
                column = %column,
                "field rejected coerced value"
            );
        }
    }
}

/// Fill `out` from the first row. Columns with no matching field are ignored;
/// NULL or unconvertible columns leave the field as it was.
pub fn scan_one_into<T: Record>(cursor: &mut dyn Cursor, out: &mut T) -> OrmResult<()> {
    let result = (|| -> OrmResult<_> {
        if !cursor.next()? {
            return Err(OrmError::not_found(format!(
                "no rows for {}",
                std::any::type_name::<T>()
            )));
        }
        let map = describe::<T>();
        let columns = cursor.columns().to_vec();
        let slots: Vec<_> = columns.iter().map(|c| map.get(c)).collect();
        let values = cursor.scan()?;
        populate(&slots, &columns, values, out);
        Ok(())
    })();
    finish(cursor, result)
}

/// Materialize the first row as a fresh `T`.
pub fn scan_one<T: Record>(cursor: &mut dyn Cursor) -> OrmResult<T> {
    let mut out = T::default();
    scan_one_into(cursor, &mut out)?;
    Ok(out)
}

/// Materialize every row. An empty result is an empty `Vec`.
pub fn scan_all<T: Record>(cursor: &mut dyn Cursor) -> OrmResult<Vec<T>> {
    let result = (|| -> OrmResult<_> {
        let map = describe::<T>();
        let columns = cursor.columns().to_vec();
        let slots: Vec<_> = columns.iter().map(|c| map.get(c)).collect();
        let mut out = Vec::new();
        while cursor.next()? {
            let mut record = T::default();
            populate(&slots, &columns, cursor.scan()?, &mut record);
            out.push(record);
        }
        Ok(out)
    })();
    finish(cursor, result)
}

fn to_map(columns: &[String], values: Vec<Value>) -> RowMap {
    RowMap::new(
        columns
            .iter()
            .cloned()
            .zip(values.into_iter().map(infer))
            .collect(),
    )
}

/// The first row as a map; `NotFound` when there is none.
pub fn scan_row(cursor: &mut dyn Cursor) -> OrmResult<RowMap> {
    let result = (|| -> OrmResult<_> {
        if !cursor.next()? {
            return Err(OrmError::not_found("no rows in result set"));
        }
        let columns = cursor.columns().to_vec();
        Ok(to_map(&columns, cursor.scan()?))
    })();
    finish(cursor, result)
}

/// Every row as a map.
pub fn scan_rows(cursor: &mut dyn Cursor) -> OrmResult<Vec<RowMap>> {
    let result = (|| -> OrmResult<_> {
        let columns = cursor.columns().to_vec();
        let mut out = Vec::new();
        while cursor.next()? {
            out.push(to_map(&columns, cursor.scan()?));
        }
        Ok(out)
    })();
    finish(cursor, result)
}

/// First column of the first row, converted to `V`.
///
/// Unlike record scans, a value that cannot be converted is an error here:
/// there is no field to leave untouched. NULL is accepted only when `V` is
/// an `Option`.
pub fn scan_value<V: FieldValue>(cursor: &mut dyn Cursor) -> OrmResult<V> {
    let result = (|| -> OrmResult<_> {
        if !cursor.next()? {
            return Err(OrmError::not_found("no rows in result set"));
        }
        let column = cursor.columns().first().cloned().unwrap_or_default();
        let raw = cursor.scan()?.into_iter().next().unwrap_or_default();
        if raw.is_null() {
            let decoded = if V::NULLABLE {
                V::from_value(Value::Null)
            } else {
                None
            };
            return decoded.ok_or_else(|| OrmError::decode(&column, "unexpected NULL"));
        }
        let kind = raw.kind();
        coerce(&raw, V::SEMANTIC, None)
            .and_then(V::from_value)
            .ok_or_else(|| {
                OrmError::decode(
                    &column,
                    format!("cannot convert {kind} into {:?}", V::SEMANTIC),
                )
            })
    })();
    finish(cursor, result)
}
