//! # sqlgom
//!
//! A fluent query builder and record mapper for `?`-placeholder SQL backends.
//!
//! ## Features
//!
//! - **Fluent builder**: clauses, projection, grouping, ordering and paging
//!   accumulate into one parameterized statement; arguments travel with their
//!   clause, so placeholders and values always line up
//! - **Reusable roots**: a [`QuerySource`] never mutates; every chain starts a
//!   fresh [`QueryBuilder`]
//! - **Record mapping**: `#[derive(Record)]` describes a struct once,
//!   embedded records included; the field table is cached per type
//! - **Tolerant decoding**: columns arriving as bytes, text or native values
//!   are coerced into the declared field type; one bad column never fails a row
//! - **Query hooks**: every statement is traced through `tracing` and can be
//!   observed or vetoed by a [`QueryHook`]
//!
//! ## Example
//!
//! ```ignore
//! use sqlgom::{args, QuerySource, Record};
//!
//! #[derive(Debug, Default, Record)]
//! #[record(table = "users")]
//! struct User {
//!     #[record(key)]
//!     id: i64,
//!     #[record(column)]
//!     name: String,
//!     #[record(column, hint = "datetime")]
//!     created_at: Option<chrono::NaiveDateTime>,
//! }
//!
//! let conn = rusqlite::Connection::open_in_memory()?;
//! let db = QuerySource::new(&conn);
//!
//! let mut user = User { name: "alice".into(), ..Default::default() };
//! db.insert(&mut user)?;
//!
//! let found: User = db.find_by_id(user.id)?;
//! let recent: Vec<User> = db
//!     .model::<User>()
//!     .and_where("created_at > ?", args!["2024-01-01"])
//!     .order_by("id DESC")
//!     .page(1, 20)
//!     .find()?;
//! ```

// Lets `#[derive(Record)]` output, which names `::sqlgom`, compile inside
// this crate's own tests.
extern crate self as sqlgom;

pub mod client;
pub mod coerce;
pub mod config;
pub mod describe;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod prelude;
pub mod qb;
pub mod record;
pub mod row;
pub mod transaction;
pub mod value;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use client::{BufferedCursor, Cursor, ExecResult, Executor, Transaction, Transactional};
pub use coerce::{IntWidth, SemanticType, TypeHint, coerce, format_for_hint, infer, parse_timestamp};
pub use config::DbConfig;
pub use describe::{FieldDescriptor, FieldMap, describe, prewarm};
pub use error::{BackendError, OrmError, OrmResult};
pub use monitor::{
    HookAction, HookChain, InstrumentedExecutor, QueryContext, QueryHook, QueryOutcome,
    QueryType, TracingSqlHook,
};
pub use qb::{BuilderState, QueryBuilder, QuerySource, total_pages};
pub use record::{
    FieldDecl, FieldKind, FieldValue, Record, RecordHooks, RecordRegistration, assign,
    registered_records,
};
pub use row::{RowMap, scan_all, scan_one, scan_one_into, scan_row, scan_rows, scan_value};
pub use memory::MemoryBackend;
pub use value::{Value, format_args_for_log};

#[cfg(feature = "derive")]
pub use sqlgom_derive::Record;

// Re-export inventory for use by derive macros
pub use inventory;
