//! Scripted in-memory backend.
//!
//! [`MemoryBackend`] answers statements from a queue of canned responses and
//! records everything it was asked to run. It is meant for exercising the
//! builder and mapper without a database:
//!
//! ```ignore
//! let db = MemoryBackend::new();
//! db.push_rows(&["id", "name"], vec![args![1, "alice"]]);
//! let users: Vec<User> = QuerySource::new(&db).table("users").find()?;
//! assert_eq!(db.statements()[0].0, "SELECT * FROM users");
//! ```

use crate::client::{BufferedCursor, Cursor, ExecResult, Executor, Transaction, Transactional};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Response {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Exec(ExecResult),
    Fail(String),
}

/// A statement the backend was asked to run.
pub type LoggedStatement = (String, Vec<Value>);

#[derive(Debug, Default)]
pub struct MemoryBackend {
    responses: Mutex<VecDeque<Response>>,
    log: Mutex<Vec<LoggedStatement>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set for the next `query`.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) -> &Self {
        self.push(Response::Rows {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        })
    }

    /// Queue an outcome for the next `exec`.
    pub fn push_exec(&self, rows_affected: u64, last_insert_id: Option<i64>) -> &Self {
        self.push(Response::Exec(ExecResult {
            rows_affected,
            last_insert_id,
        }))
    }

    /// Queue a backend failure for the next statement of either kind.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.push(Response::Fail(message.into()))
    }

    fn push(&self, response: Response) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Every statement run so far, in order.
    pub fn statements(&self) -> Vec<LoggedStatement> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// SQL text of the most recent statement.
    pub fn last_sql(&self) -> Option<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|(sql, _)| sql.clone())
    }

    fn record(&self, sql: &str, args: &[Value]) -> Option<Response> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((sql.to_string(), args.to_vec()));
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

fn failure(message: String) -> OrmError {
    OrmError::backend(std::io::Error::other(message))
}

impl Executor for MemoryBackend {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        match self.record(sql, args) {
            None => Ok(ExecResult::default()),
            Some(Response::Exec(result)) => Ok(result),
            Some(Response::Fail(message)) => Err(failure(message)),
            Some(Response::Rows { .. }) => Err(OrmError::Other(format!(
                "memory backend: queued rows but `{sql}` was executed"
            ))),
        }
    }

    fn query<'a>(&'a self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>> {
        match self.record(sql, args) {
            None => Ok(Box::new(BufferedCursor::default())),
            Some(Response::Rows { columns, rows }) => {
                Ok(Box::new(BufferedCursor::new(columns, rows)))
            }
            Some(Response::Fail(message)) => Err(failure(message)),
            Some(Response::Exec(_)) => Err(OrmError::Other(format!(
                "memory backend: queued an exec result but `{sql}` was queried"
            ))),
        }
    }
}

/// Transaction handle over a [`MemoryBackend`]; logs `BEGIN`, `COMMIT` and
/// `ROLLBACK` alongside the statements run through it.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    backend: &'a MemoryBackend,
}

impl Executor for MemoryTransaction<'_> {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.backend.exec(sql, args)
    }

    fn query<'a>(&'a self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>> {
        self.backend.query(sql, args)
    }

    fn in_transaction(&self) -> bool {
        true
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(self) -> OrmResult<()> {
        self.backend.log_marker("COMMIT");
        Ok(())
    }

    fn rollback(self) -> OrmResult<()> {
        self.backend.log_marker("ROLLBACK");
        Ok(())
    }
}

impl MemoryBackend {
    fn log_marker(&self, marker: &str) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((marker.to_string(), Vec::new()));
    }
}

impl Transactional for MemoryBackend {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> OrmResult<Self::Tx<'_>> {
        self.log_marker("BEGIN");
        Ok(MemoryTransaction { backend: self })
    }
}
