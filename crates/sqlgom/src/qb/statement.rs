//! Statement builder: renders accumulated builder state into SQL text plus
//! the matching argument list.

use crate::coerce::format_for_hint;
use crate::describe::{FieldMap, describe};
use crate::error::{OrmError, OrmResult};
use crate::qb::clause::ClauseList;
use crate::record::Record;
use crate::value::Value;

/// Rendered SQL and its positional arguments.
pub type Statement = (String, Vec<Value>);

/// Accumulated, not-yet-rendered query.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderState {
    pub table: Option<String>,
    /// Projection, comma-joined. `*` unless set.
    pub fields: String,
    pub clauses: ClauseList,
    pub group_by: Option<String>,
    pub order_by: Option<String>,
    /// `(offset, count)`.
    pub limit: Option<(i64, i64)>,
}

impl Default for BuilderState {
    fn default() -> Self {
        Self {
            table: None,
            fields: "*".to_string(),
            clauses: ClauseList::new(),
            group_by: None,
            order_by: None,
            limit: None,
        }
    }
}

enum Limit {
    Paged,
    First,
}

impl BuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> OrmResult<&str> {
        match self.table.as_deref() {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(OrmError::config("no table set for query")),
        }
    }

    /// Offset for a 1-based page; non-positive pages clamp to offset zero.
    pub fn page_offset(page: i64, size: i64) -> i64 {
        page.saturating_sub(1).saturating_mul(size).max(0)
    }

    fn select(&self, fields: &str, limit: Limit, suffix: &str) -> OrmResult<Statement> {
        let table = self.table()?;
        let mut sql = format!("SELECT {fields} FROM {table}");
        let mut args = Vec::with_capacity(self.clauses.arg_count());
        self.clauses.render(&mut sql, &mut args);
        if let Some(group) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        match (limit, self.limit) {
            (Limit::Paged, Some((offset, count))) => {
                sql.push_str(&format!(" LIMIT {count} OFFSET {offset}"));
            }
            (Limit::First, _) => sql.push_str(" LIMIT 1"),
            _ => {}
        }
        sql.push_str(suffix);
        Ok((sql, args))
    }

    /// `SELECT fields FROM table [WHERE ..] [GROUP BY ..] [ORDER BY ..] [LIMIT .. OFFSET ..]`
    pub fn build_select(&self) -> OrmResult<Statement> {
        self.select(&self.fields, Limit::Paged, "")
    }

    /// Like [`build_select`](Self::build_select) but limited to one row,
    /// ignoring any page window.
    pub fn build_first(&self) -> OrmResult<Statement> {
        self.select(&self.fields, Limit::First, "")
    }

    /// Single-row select with a row lock.
    pub fn build_first_for_update(&self) -> OrmResult<Statement> {
        self.select(&self.fields, Limit::First, " FOR UPDATE")
    }

    /// `SELECT count(..)` over the filters; grouping, ordering and paging are
    /// left out.
    pub fn build_count(&self) -> OrmResult<Statement> {
        let table = self.table()?;
        let mut sql = format!("SELECT count({}) FROM {table}", self.fields);
        let mut args = Vec::with_capacity(self.clauses.arg_count());
        self.clauses.render(&mut sql, &mut args);
        Ok((sql, args))
    }

    /// `SELECT 1 FROM table [WHERE ..] LIMIT 1`
    pub fn build_exists(&self) -> OrmResult<Statement> {
        let table = self.table()?;
        let mut sql = format!("SELECT 1 FROM {table}");
        let mut args = Vec::with_capacity(self.clauses.arg_count());
        self.clauses.render(&mut sql, &mut args);
        sql.push_str(" LIMIT 1");
        Ok((sql, args))
    }

    /// `UPDATE table SET <set> WHERE ..`; the SET arguments come first.
    ///
    /// An UPDATE without any filter is refused.
    pub fn build_update(&self, set: &str, set_args: Vec<Value>) -> OrmResult<Statement> {
        let table = self.table()?;
        if set.trim().is_empty() {
            return Err(OrmError::validation("UPDATE requires at least one assignment"));
        }
        if self.clauses.is_empty() {
            return Err(OrmError::validation("UPDATE without WHERE is not allowed"));
        }
        let mut sql = format!("UPDATE {table} SET {set}");
        let mut args = set_args;
        self.clauses.render(&mut sql, &mut args);
        Ok((sql, args))
    }

    /// `UPDATE table SET a = ?, b = ? WHERE ..` from column/value pairs, in
    /// the order given.
    pub fn build_update_pairs(&self, pairs: Vec<(String, Value)>) -> OrmResult<Statement> {
        let (set, args) = assignments(pairs);
        self.build_update(&set, args)
    }

    /// `DELETE FROM table WHERE ..`; a DELETE without any filter is refused.
    pub fn build_delete(&self) -> OrmResult<Statement> {
        let table = self.table()?;
        if self.clauses.is_empty() {
            return Err(OrmError::validation("DELETE without WHERE is not allowed"));
        }
        let mut sql = format!("DELETE FROM {table}");
        let mut args = Vec::with_capacity(self.clauses.arg_count());
        self.clauses.render(&mut sql, &mut args);
        Ok((sql, args))
    }

    /// `INSERT INTO table (a, b) VALUES (?, ?)`
    pub fn build_insert(&self, columns: &[String], args: Vec<Value>) -> OrmResult<Statement> {
        let table = self.table()?;
        if columns.is_empty() {
            return Err(OrmError::validation("INSERT requires at least one column"));
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(columns.len())
        );
        Ok((sql, args))
    }
}

/// `?, ?, ?`
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Split a raw `"a, b ,c"` column list into trimmed names.
pub fn split_columns(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// `a = ?, b = ?` plus the values in the same order.
pub fn assignments(pairs: Vec<(String, Value)>) -> (String, Vec<Value>) {
    let mut set = Vec::with_capacity(pairs.len());
    let mut args = Vec::with_capacity(pairs.len());
    for (column, value) in pairs {
        set.push(format!("{column} = ?"));
        args.push(value);
    }
    (set.join(", "), args)
}

/// Read every writable column of `record` in declaration order, applying
/// date/datetime hints. Only the key and fields with an explicit column tag
/// are written; untagged fields are read-only. A hinted value that cannot be
/// rendered drops its column.
fn column_values<'m, T: Record>(
    map: &'m FieldMap,
    record: &T,
) -> impl Iterator<Item = (&'m crate::describe::FieldDescriptor, Value)> {
    map.iter().filter(|field| field.tagged || field.key).filter_map(move |field| {
        let value = record.field_value(&field.path)?;
        let value = format_for_hint(value, field.hint)?;
        Some((field, value))
    })
}

/// Columns and values for INSERT. The key column is skipped while it is
/// still unset (NULL, zero or empty) so the backend can generate it.
pub fn insert_parts<T: Record>(record: &T) -> (Vec<String>, Vec<Value>) {
    let map = describe::<T>();
    let key = map.key().map(|k| k.column.clone());
    let mut columns = Vec::new();
    let mut args = Vec::new();
    for (field, value) in column_values(&map, record) {
        if key.as_deref() == Some(field.column.as_str()) && value.is_empty_key() {
            continue;
        }
        columns.push(field.column.clone());
        args.push(value);
    }
    (columns, args)
}

/// `column = ?` pairs for every non-key column, for writing a whole record
/// back.
pub fn assignment_parts<T: Record>(record: &T) -> Vec<(String, Value)> {
    let map = describe::<T>();
    let key = map.key().map(|k| k.column.clone());
    column_values(&map, record)
        .filter(|(field, _)| key.as_deref() != Some(field.column.as_str()))
        .map(|(field, value)| (field.column.clone(), value))
        .collect()
}

/// Key column and its current value.
pub fn key_value<T: Record>(record: &T) -> OrmResult<(String, Value)> {
    let map = describe::<T>();
    let key = map.key().ok_or_else(|| {
        OrmError::validation(format!(
            "{} has no key field",
            std::any::type_name::<T>()
        ))
    })?;
    let value = record.field_value(&key.path).unwrap_or_default();
    Ok((key.column.clone(), value))
}
