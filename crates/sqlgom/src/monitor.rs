//! Query hooks and SQL tracing.
//!
//! Every statement issued through a [`crate::QuerySource`] runs through an
//! [`InstrumentedExecutor`], which calls each registered [`QueryHook`] before
//! and after execution. [`TracingSqlHook`] is installed by default and emits
//! the statement and its bound arguments as `tracing` events under the
//! `sqlgom.sql` target.

use crate::client::{Cursor, ExecResult, Executor};
use crate::error::{OrmError, OrmResult};
use crate::value::{Value, format_args_for_log};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// Other SQL (e.g., DDL, custom)
    Other,
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        && sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
}

impl QueryType {
    /// Detect query type from the leading keyword.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if starts_with_keyword(trimmed, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

/// Context information about the statement being executed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub sql: String,
    /// Bound arguments as rendered for logs (`1:"alice" 2:42`).
    pub args: String,
    pub param_count: usize,
    pub query_type: QueryType,
    pub in_transaction: bool,
}

impl QueryContext {
    pub fn new(sql: &str, args: &[Value], in_transaction: bool) -> Self {
        Self {
            sql: sql.to_string(),
            args: format_args_for_log(args),
            param_count: args.len(),
            query_type: QueryType::from_sql(sql),
            in_transaction,
        }
    }
}

/// Maximum length for error messages in `QueryOutcome::Error`.
const MAX_ERROR_LEN: usize = 512;

/// How a statement ended, as reported to [`QueryHook::after_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// A query whose cursor yielded this many rows before it was closed.
    Rows(usize),
    /// A statement that affected rows.
    Affected {
        rows: u64,
        last_insert_id: Option<i64>,
    },
    /// Failed; message truncated to 512 bytes.
    Error(String),
}

impl QueryOutcome {
    pub fn error(msg: String) -> Self {
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Rows(n) => write!(f, "{n} rows"),
            QueryOutcome::Affected {
                rows,
                last_insert_id: Some(id),
            } => write!(f, "{rows} affected, insert id {id}"),
            QueryOutcome::Affected { rows, .. } => write!(f, "{rows} affected"),
            QueryOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Action to take after a hook inspects a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Continue with the statement.
    Continue,
    /// Abort the statement with an error.
    Abort(String),
}

/// Trait for observing or vetoing statements.
pub trait QueryHook: Send + Sync {
    /// Called before a statement is executed.
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let _ = ctx;
        HookAction::Continue
    }

    /// Called once the statement has finished; for queries, when the cursor
    /// is closed or dropped.
    fn after_query(&self, _ctx: &QueryContext, _duration: Duration, _outcome: &QueryOutcome) {}
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// A `tracing`-based hook that logs each statement with its arguments.
#[derive(Debug, Clone)]
pub struct TracingSqlHook {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes, on a char boundary). `None` means
    /// no truncation.
    pub max_sql_length: Option<usize>,
    /// Recorded as the `prefix` field of every event.
    pub prefix: Option<String>,
}

impl Default for TracingSqlHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            prefix: None,
        }
    }
}

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

impl TracingSqlHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryHook for TracingSqlHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let sql = self.truncate_sql(&ctx.sql);
        let prefix = self.prefix.as_deref().unwrap_or("-");
        emit_at_level!(
            self.level,
            target: "sqlgom.sql",
            prefix,
            query_type = ?ctx.query_type,
            in_transaction = ctx.in_transaction,
            param_count = ctx.param_count,
            sql = %sql,
            args = %ctx.args,
        );
        HookAction::Continue
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        let prefix = self.prefix.as_deref().unwrap_or("-");
        emit_at_level!(
            self.level,
            target: "sqlgom.sql",
            prefix,
            query_type = ?ctx.query_type,
            elapsed_us = duration.as_micros() as u64,
            outcome = %outcome,
        );
    }
}

/// Ordered set of hooks shared by every builder derived from one source.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn QueryHook>>,
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn QueryHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn before(&self, ctx: &QueryContext) -> OrmResult<()> {
        for hook in &self.hooks {
            if let HookAction::Abort(reason) = hook.before_query(ctx) {
                return Err(OrmError::Aborted(reason));
            }
        }
        Ok(())
    }

    fn after(&self, ctx: &QueryContext, started: Instant, outcome: &QueryOutcome) {
        let elapsed = started.elapsed();
        for hook in &self.hooks {
            hook.after_query(ctx, elapsed, outcome);
        }
    }
}

/// Wraps an executor so every statement passes through a [`HookChain`].
pub struct InstrumentedExecutor<'a> {
    inner: &'a dyn Executor,
    hooks: &'a HookChain,
}

impl<'a> InstrumentedExecutor<'a> {
    pub fn new(inner: &'a dyn Executor, hooks: &'a HookChain) -> Self {
        Self { inner, hooks }
    }

    /// Open a cursor that borrows the wrapped executor rather than this
    /// wrapper, so the wrapper itself can be a temporary.
    pub fn open(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>> {
        let inner: &'a dyn Executor = self.inner;
        let hooks: &'a HookChain = self.hooks;
        if hooks.is_empty() {
            return inner.query(sql, args);
        }
        let ctx = QueryContext::new(sql, args, inner.in_transaction());
        hooks.before(&ctx)?;
        let started = Instant::now();
        match inner.query(sql, args) {
            Ok(cursor) => Ok(Box::new(ObservedCursor {
                inner: cursor,
                hooks,
                ctx,
                started,
                rows: 0,
                failure: None,
                reported: false,
            })),
            Err(e) => {
                hooks.after(&ctx, started, &QueryOutcome::error(e.to_string()));
                Err(e)
            }
        }
    }
}

impl Executor for InstrumentedExecutor<'_> {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        if self.hooks.is_empty() {
            return self.inner.exec(sql, args);
        }
        let ctx = QueryContext::new(sql, args, self.inner.in_transaction());
        self.hooks.before(&ctx)?;
        let started = Instant::now();
        let result = self.inner.exec(sql, args);
        let outcome = match &result {
            Ok(res) => QueryOutcome::Affected {
                rows: res.rows_affected,
                last_insert_id: res.last_insert_id,
            },
            Err(e) => QueryOutcome::error(e.to_string()),
        };
        self.hooks.after(&ctx, started, &outcome);
        result
    }

    fn query<'b>(&'b self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'b>> {
        self.open(sql, args)
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

/// Counts rows as they are read and reports once on close or drop.
struct ObservedCursor<'a> {
    inner: Box<dyn Cursor + 'a>,
    hooks: &'a HookChain,
    ctx: QueryContext,
    started: Instant,
    rows: usize,
    failure: Option<String>,
    reported: bool,
}

impl ObservedCursor<'_> {
    fn report(&mut self) {
        if self.reported {
            return;
        }
        self.reported = true;
        let outcome = match self.failure.take() {
            Some(msg) => QueryOutcome::error(msg),
            None => QueryOutcome::Rows(self.rows),
        };
        self.hooks.after(&self.ctx, self.started, &outcome);
    }
}

impl Cursor for ObservedCursor<'_> {
    fn columns(&self) -> &[String] {
        self.inner.columns()
    }

    fn next(&mut self) -> OrmResult<bool> {
        match self.inner.next() {
            Ok(true) => {
                self.rows += 1;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn scan(&mut self) -> OrmResult<Vec<Value>> {
        self.inner.scan().inspect_err(|e| {
            self.failure = Some(e.to_string());
        })
    }

    fn close(&mut self) -> OrmResult<()> {
        let result = self.inner.close();
        self.report();
        result
    }
}

impl Drop for ObservedCursor<'_> {
    fn drop(&mut self) {
        self.report();
    }
}
