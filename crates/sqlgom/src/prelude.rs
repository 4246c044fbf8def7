//! Convenient imports for typical `sqlgom` usage.
//!
//! ```ignore
//! use sqlgom::prelude::*;
//! ```

pub use crate::{
    Cursor, ExecResult, Executor, OrmError, OrmResult, QueryBuilder, QuerySource, RowMap,
    Transaction, Transactional, Value, args,
};

// Brings in both the `Record` trait and, with `derive`, the derive macro.
pub use crate::{FieldValue, Record, RecordHooks};

pub use crate::{DbConfig, QueryHook, TracingSqlHook};
