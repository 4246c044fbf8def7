//! Reusable entry point for building queries.

use crate::client::{Cursor, ExecResult, Executor};
use crate::config::DbConfig;
use crate::error::OrmResult;
use crate::monitor::{HookChain, InstrumentedExecutor, QueryHook};
use crate::qb::builder::QueryBuilder;
use crate::qb::statement::{BuilderState, placeholders, split_columns};
use crate::record::Record;
use crate::row::{RowMap, scan_row, scan_rows};
use crate::value::Value;
use std::sync::Arc;

/// An immutable handle over an executor.
///
/// Every chain-starting method returns a brand-new [`QueryBuilder`], so one
/// source can be shared and reused to start any number of unrelated queries.
#[derive(Clone)]
pub struct QuerySource<'e> {
    executor: &'e dyn Executor,
    config: Arc<DbConfig>,
    hooks: HookChain,
}

impl std::fmt::Debug for QuerySource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySource")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl<'e> QuerySource<'e> {
    /// Source with the default configuration (SQL tracing on).
    pub fn new(executor: &'e dyn Executor) -> Self {
        Self::with_config(executor, DbConfig::default())
    }

    pub fn with_config(executor: &'e dyn Executor, config: DbConfig) -> Self {
        let mut hooks = HookChain::new();
        if let Some(hook) = config.tracing_hook() {
            hooks.push(Arc::new(hook));
        }
        Self {
            executor,
            config: Arc::new(config),
            hooks,
        }
    }

    /// Register an additional hook; it runs after those already installed.
    pub fn with_hook(mut self, hook: impl QueryHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Same configuration and hooks over another executor, typically an open
    /// transaction.
    pub fn using<'t>(&self, executor: &'t dyn Executor) -> QuerySource<'t>
    where
        'e: 't,
    {
        QuerySource {
            executor,
            config: Arc::clone(&self.config),
            hooks: self.hooks.clone(),
        }
    }

    fn instrumented(&self) -> InstrumentedExecutor<'_> {
        InstrumentedExecutor::new(self.executor, &self.hooks)
    }

    /// A fresh builder with no table and no clauses.
    pub fn builder(&self) -> QueryBuilder<'e> {
        QueryBuilder::from_parts(
            self.executor,
            Arc::clone(&self.config),
            self.hooks.clone(),
            BuilderState::new(),
        )
    }

    // ==================== Chain starters ====================

    pub fn table(&self, name: &str) -> QueryBuilder<'e> {
        self.builder().table(name)
    }

    /// Start from `T`'s declared `#[record(table = "...")]`. Without one the
    /// builder has no table and fails when built.
    pub fn model<T: Record>(&self) -> QueryBuilder<'e> {
        match T::TABLE {
            Some(table) => self.table(table),
            None => self.builder(),
        }
    }

    pub fn select(&self, fields: &str) -> QueryBuilder<'e> {
        self.builder().select(fields)
    }

    pub fn and_where(&self, fragment: &str, args: Vec<Value>) -> QueryBuilder<'e> {
        self.builder().and_where(fragment, args)
    }

    pub fn maps<K, V, I>(&self, pairs: I) -> QueryBuilder<'e>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.builder().maps(pairs)
    }

    /// Start a builder that runs against `tx` instead of the source's executor.
    pub fn tx(&self, tx: &'e dyn Executor) -> QueryBuilder<'e> {
        self.builder().tx(tx)
    }

    // ==================== Raw SQL ====================

    pub fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.instrumented().exec(sql, args)
    }

    /// Run a query and hand back the cursor unread.
    pub fn query_rows(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + '_>> {
        self.instrumented().open(sql, args)
    }

    pub fn query_map(&self, sql: &str, args: &[Value]) -> OrmResult<RowMap> {
        let mut cursor = self.query_rows(sql, args)?;
        scan_row(cursor.as_mut())
    }

    pub fn query_maps(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<RowMap>> {
        let mut cursor = self.query_rows(sql, args)?;
        scan_rows(cursor.as_mut())
    }

    /// `INSERT INTO table (a, b) VALUES (?, ?)` from a raw column list.
    pub fn add(&self, table: &str, columns: &str, args: Vec<Value>) -> OrmResult<ExecResult> {
        let columns = split_columns(columns);
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(columns.len())
        );
        self.exec(&sql, &args)
    }

    /// `UPDATE table SET a = ?, b = ? WHERE id = ?` from a raw column list.
    pub fn save(
        &self,
        table: &str,
        columns: &str,
        key: impl Into<Value>,
        args: Vec<Value>,
    ) -> OrmResult<u64> {
        let set: Vec<String> = split_columns(columns)
            .into_iter()
            .map(|c| format!("{c} = ?"))
            .collect();
        let sql = format!("UPDATE {table} SET {} WHERE id = ?", set.join(", "));
        let mut args = args;
        args.push(key.into());
        Ok(self.exec(&sql, &args)?.rows_affected)
    }

    // ==================== Record shortcuts ====================

    pub fn insert<T: Record>(&self, record: &mut T) -> OrmResult<ExecResult> {
        self.builder().insert(record)
    }

    pub fn find_by_id<T: Record>(&self, id: impl Into<Value>) -> OrmResult<T> {
        self.builder().find_by_id(id)
    }

    pub fn delete_record<T: Record>(&self, record: &T) -> OrmResult<u64> {
        self.builder().delete_record(record)
    }

    pub fn flush<T: Record>(&self, record: &mut T) -> OrmResult<u64> {
        self.builder().flush(record)
    }
}
