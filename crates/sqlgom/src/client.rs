//! Execution capability consumed by the builder and mapper.
//!
//! Any backend that can run a `?`-placeholder statement implements
//! [`Executor`]. A transaction handle implements the same trait, so every
//! operation can be pointed at either one without changing how statements are
//! built.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::VecDeque;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key reported by the backend, when it has one.
    pub last_insert_id: Option<i64>,
}

/// A forward-only result set.
pub trait Cursor {
    /// Column names of the active result, in select-list order.
    fn columns(&self) -> &[String];

    /// Advance to the next row. Returns `false` once exhausted.
    fn next(&mut self) -> OrmResult<bool>;

    /// Raw values of the current row, one per column.
    fn scan(&mut self) -> OrmResult<Vec<Value>>;

    /// Release the result. Called once scanning is done.
    fn close(&mut self) -> OrmResult<()> {
        Ok(())
    }
}

/// Runs parameterized statements.
pub trait Executor {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult>;

    fn query<'a>(&'a self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>>;

    /// Whether statements run inside an open transaction.
    fn in_transaction(&self) -> bool {
        false
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        (**self).exec(sql, args)
    }

    fn query<'a>(&'a self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>> {
        (**self).query(sql, args)
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }
}

/// An open transaction. Dropping it without committing is a rollback for
/// every backend shipped here.
pub trait Transaction: Executor {
    fn commit(self) -> OrmResult<()>;

    fn rollback(self) -> OrmResult<()>;
}

/// A backend that can open transactions.
pub trait Transactional {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn begin(&self) -> OrmResult<Self::Tx<'_>>;
}

/// A cursor over rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            current: None,
        }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> OrmResult<bool> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&mut self) -> OrmResult<Vec<Value>> {
        self.current
            .take()
            .ok_or_else(|| OrmError::Other("scan called without a current row".to_string()))
    }

    fn close(&mut self) -> OrmResult<()> {
        self.rows.clear();
        self.current = None;
        Ok(())
    }
}
