//! The owned, refining query builder.

use crate::client::{Cursor, ExecResult, Executor};
use crate::coerce::coerce;
use crate::config::DbConfig;
use crate::describe::describe;
use crate::error::{OrmError, OrmResult};
use crate::monitor::{HookChain, InstrumentedExecutor};
use crate::qb::clause::ClauseKind;
use crate::qb::statement::{
    BuilderState, Statement, assignment_parts, insert_parts, key_value,
};
use crate::record::{FieldValue, Record};
use crate::row::{RowMap, scan_all, scan_one, scan_row, scan_rows, scan_value};
use crate::value::Value;
use std::sync::Arc;

/// Number of pages needed for `total` rows, `page_size` per page.
///
/// A non-positive page size yields zero pages.
pub fn total_pages(page_size: i64, total: i64) -> i64 {
    if page_size <= 0 || total <= 0 {
        return 0;
    }
    if total % page_size == 0 {
        total / page_size
    } else {
        total / page_size + 1
    }
}

/// A query under construction.
///
/// Refining methods take and return `self`, so a builder is always owned by
/// exactly one scope. Execution methods borrow it and can be called more than
/// once, e.g. `count()` followed by `find()`.
#[derive(Clone)]
pub struct QueryBuilder<'e> {
    executor: &'e dyn Executor,
    tx: Option<&'e dyn Executor>,
    config: Arc<DbConfig>,
    hooks: HookChain,
    state: BuilderState,
}

impl std::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("state", &self.state)
            .field("in_tx", &self.tx.is_some())
            .finish_non_exhaustive()
    }
}

impl<'e> QueryBuilder<'e> {
    pub(crate) fn from_parts(
        executor: &'e dyn Executor,
        config: Arc<DbConfig>,
        hooks: HookChain,
        state: BuilderState,
    ) -> Self {
        Self {
            executor,
            tx: None,
            config,
            hooks,
            state,
        }
    }

    /// The accumulated state.
    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    // ==================== Refinement ====================

    pub fn table(mut self, name: &str) -> Self {
        self.state.table = Some(name.to_string());
        self
    }

    /// Projection, as a raw comma-joined list.
    pub fn select(mut self, fields: &str) -> Self {
        self.state.fields = fields.to_string();
        self
    }

    /// Alias of [`select`](Self::select).
    pub fn field(self, fields: &str) -> Self {
        self.select(fields)
    }

    /// Add a clause joined with `AND`.
    pub fn and_where(mut self, fragment: &str, args: Vec<Value>) -> Self {
        self.state.clauses.push_where(fragment, args);
        self
    }

    /// Add a clause joined with `OR`.
    pub fn or_where(mut self, fragment: &str, args: Vec<Value>) -> Self {
        self.state.clauses.push_or(fragment, args);
        self
    }

    /// `column IN (?, ...)`; an empty list is ignored.
    pub fn in_list<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.state.clauses.push_in(column, values);
        self
    }

    /// One `column = ?` clause per pair, in iteration order. Pairs whose value
    /// is an empty string are skipped.
    pub fn maps<K, V, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in pairs {
            let value = value.into();
            if matches!(&value, Value::Text(s) if s.is_empty()) {
                continue;
            }
            self.state.clauses.push(
                ClauseKind::Where,
                format!("{} = ?", column.as_ref()),
                vec![value],
            );
        }
        self
    }

    pub fn group_by(mut self, expr: &str) -> Self {
        self.state.group_by = Some(expr.to_string());
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.state.order_by = Some(expr.to_string());
        self
    }

    /// `ORDER BY key dir`.
    pub fn sort(self, key: &str, dir: &str) -> Self {
        let order = format!("{key} {dir}");
        self.order_by(order.trim())
    }

    /// 1-based page window: offset `(cur - 1) * size`, never negative.
    ///
    /// A non-positive `size` clears the window.
    pub fn page(self, cur: i64, size: i64) -> Self {
        let offset = BuilderState::page_offset(cur, size);
        self.limit(offset, size)
    }

    /// `LIMIT count OFFSET offset`; a non-positive `count` clears the window.
    pub fn limit(mut self, offset: i64, count: i64) -> Self {
        self.state.limit = (count > 0).then_some((offset.max(0), count));
        self
    }

    /// Run against `tx` instead of the source's executor.
    pub fn tx(mut self, tx: &'e dyn Executor) -> Self {
        self.tx = Some(tx);
        self
    }

    // ==================== Rendering ====================

    /// Render the SELECT statement.
    pub fn build(&self) -> OrmResult<Statement> {
        self.state.build_select()
    }

    /// SELECT text only, for logging and tests.
    pub fn to_sql(&self) -> OrmResult<String> {
        Ok(self.build()?.0)
    }

    // ==================== Execution plumbing ====================

    fn target(&self) -> &'e dyn Executor {
        self.tx.unwrap_or(self.executor)
    }

    fn instrumented(&self) -> InstrumentedExecutor<'_> {
        InstrumentedExecutor::new(self.target(), &self.hooks)
    }

    fn open(&self, (sql, args): &Statement) -> OrmResult<Box<dyn Cursor + '_>> {
        self.instrumented().open(sql, args)
    }

    fn run(&self, (sql, args): &Statement) -> OrmResult<ExecResult> {
        self.instrumented().exec(sql, args)
    }

    /// State with `T`'s declared table filled in when none was set.
    fn state_for<T: Record>(&self) -> BuilderState {
        let mut state = self.state.clone();
        if state.table.is_none() {
            state.table = T::TABLE.map(str::to_string);
        }
        state
    }

    // ==================== Typed reads ====================

    /// All matching rows as records.
    pub fn find<T: Record>(&self) -> OrmResult<Vec<T>> {
        let stmt = self.state_for::<T>().build_select()?;
        let mut cursor = self.open(&stmt)?;
        scan_all(cursor.as_mut())
    }

    /// The first matching row; `NotFound` when there is none.
    pub fn get<T: Record>(&self) -> OrmResult<T> {
        let stmt = self.state_for::<T>().build_first()?;
        let mut cursor = self.open(&stmt)?;
        scan_one(cursor.as_mut())
    }

    /// The first matching row, locked with `FOR UPDATE`. Requires a
    /// transaction set through [`tx`](Self::tx).
    pub fn get_for_update<T: Record>(&self) -> OrmResult<T> {
        if self.tx.is_none() {
            return Err(OrmError::config(
                "get_for_update requires a transaction; call .tx(..) first",
            ));
        }
        let stmt = self.state_for::<T>().build_first_for_update()?;
        let mut cursor = self.open(&stmt)?;
        scan_one(cursor.as_mut())
    }

    /// The row whose key column equals `id`, on top of any clauses already
    /// added.
    pub fn find_by_id<T: Record>(&self, id: impl Into<Value>) -> OrmResult<T> {
        let map = describe::<T>();
        let key = map.key().map_or("id", |k| k.column.as_str());
        let mut state = self.state_for::<T>();
        state.clauses.push_where(format!("{key} = ?"), vec![id.into()]);
        let stmt = state.build_first()?;
        let mut cursor = self.open(&stmt)?;
        scan_one(cursor.as_mut())
    }

    // ==================== Map and scalar reads ====================

    /// The first matching row as a map.
    pub fn query(&self) -> OrmResult<RowMap> {
        let stmt = self.state.build_first()?;
        let mut cursor = self.open(&stmt)?;
        scan_row(cursor.as_mut())
    }

    /// All matching rows as maps.
    pub fn list(&self) -> OrmResult<Vec<RowMap>> {
        let stmt = self.state.build_select()?;
        let mut cursor = self.open(&stmt)?;
        scan_rows(cursor.as_mut())
    }

    /// `count(..)` over the current projection.
    pub fn count(&self) -> OrmResult<i64> {
        let stmt = self.state.build_count()?;
        let mut cursor = self.open(&stmt)?;
        Ok(scan_value::<Option<i64>>(cursor.as_mut())?.unwrap_or(0))
    }

    /// A single column of the first matching row.
    pub fn value<V: FieldValue>(&self, field: &str) -> OrmResult<V> {
        let mut state = self.state.clone();
        state.fields = field.to_string();
        let stmt = state.build_first()?;
        let mut cursor = self.open(&stmt)?;
        scan_value(cursor.as_mut())
    }

    /// Integer column of the first row; NULL reads as 0.
    pub fn select_int(&self, field: &str) -> OrmResult<i64> {
        Ok(self.value::<Option<i64>>(field)?.unwrap_or(0))
    }

    /// Text column of the first row; NULL reads as an empty string.
    pub fn select_str(&self, field: &str) -> OrmResult<String> {
        Ok(self.value::<Option<String>>(field)?.unwrap_or_default())
    }

    /// Whether any row matches.
    pub fn exists(&self) -> OrmResult<bool> {
        let stmt = self.state.build_exists()?;
        let mut cursor = self.open(&stmt)?;
        let found = cursor.next()?;
        cursor.close()?;
        Ok(found)
    }

    // ==================== Pagination ====================

    /// Number of pages of `size` rows. A non-positive size falls back to the
    /// configured default page size.
    pub fn page_count(&self, size: i64) -> OrmResult<i64> {
        let size = if size > 0 {
            size
        } else {
            self.config.default_page_size
        };
        let total = self.count()?;
        Ok(total_pages(size, total))
    }

    /// Apply a page window and work out the page count.
    ///
    /// The count query only runs on the first page or when the caller does
    /// not already know the total (`known_total_pages == 0`); otherwise the
    /// known total is returned as-is. When nothing matches, the result is
    /// zero pages and no window is applied.
    pub fn paginate(self, current: i64, size: i64, known_total_pages: i64) -> OrmResult<(Self, i64)> {
        let size = if size > 0 {
            size
        } else {
            self.config.default_page_size
        };
        let current = current.max(1);

        let pages = if known_total_pages == 0 || current == 1 {
            let total = self.count()?;
            if total <= 0 {
                tracing::debug!(target: "sqlgom.sql", "pagination found no rows");
                return Ok((self, 0));
            }
            total_pages(size, total)
        } else {
            known_total_pages
        };

        Ok((self.page(current, size), pages))
    }

    // ==================== Writes ====================

    /// `UPDATE table SET <set> WHERE ..`. Returns rows affected.
    pub fn update(&self, set: &str, args: Vec<Value>) -> OrmResult<u64> {
        let stmt = self.state.build_update(set, args)?;
        Ok(self.run(&stmt)?.rows_affected)
    }

    /// `UPDATE table SET a = ?, b = ? WHERE ..`, with assignments in the
    /// iteration order of `pairs`. Pass a `Vec` or `BTreeMap` for
    /// deterministic SQL text.
    pub fn update_map<K, V, I>(&self, pairs: I) -> OrmResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let pairs: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if pairs.is_empty() {
            return Err(OrmError::validation("update_map requires at least one column"));
        }
        let stmt = self.state.build_update_pairs(pairs)?;
        Ok(self.run(&stmt)?.rows_affected)
    }

    /// `DELETE FROM table WHERE ..`. Returns rows affected.
    pub fn delete(&self) -> OrmResult<u64> {
        let stmt = self.state.build_delete()?;
        Ok(self.run(&stmt)?.rows_affected)
    }

    /// Delete the row identified by `record`'s key.
    pub fn delete_record<T: Record>(&self, record: &T) -> OrmResult<u64> {
        let (key, value) = key_value(record)?;
        if value.is_empty_key() {
            return Err(OrmError::validation(format!("cannot delete: `{key}` is unset")));
        }
        let mut state = self.state_for::<T>();
        state.clauses.push_where(format!("{key} = ?"), vec![value]);
        let stmt = state.build_delete()?;
        Ok(self.run(&stmt)?.rows_affected)
    }

    /// Insert `record`, then write the backend-generated key back into it
    /// when the key was unset.
    pub fn insert<T: Record>(&self, record: &mut T) -> OrmResult<ExecResult> {
        record.before_insert();
        let state = self.state_for::<T>();
        let (columns, args) = insert_parts(record);
        let stmt = state.build_insert(&columns, args)?;
        let result = self.run(&stmt)?;

        let map = describe::<T>();
        if let (Some(key), Some(id)) = (map.key(), result.last_insert_id) {
            let unset = record
                .field_value(&key.path)
                .is_none_or(|v| v.is_empty_key());
            if unset {
                if let Some(value) = coerce(&Value::Int(id), key.semantic, None) {
                    record.set_field(&key.path, value);
                }
            }
        }
        Ok(result)
    }

    /// Write every non-key column of `record` back to its row.
    pub fn flush<T: Record>(&self, record: &mut T) -> OrmResult<u64> {
        record.before_update();
        let (key, value) = key_value(record)?;
        if value.is_empty_key() {
            return Err(OrmError::validation(format!("cannot flush: `{key}` is unset")));
        }
        let pairs = assignment_parts(record);
        if pairs.is_empty() {
            return Err(OrmError::validation("flush found no columns to write"));
        }
        let mut state = self.state_for::<T>();
        state.clauses.push_where(format!("{key} = ?"), vec![value]);
        let stmt = state.build_update_pairs(pairs)?;
        Ok(self.run(&stmt)?.rows_affected)
    }
}
