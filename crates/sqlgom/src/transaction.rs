//! Transaction helpers.
//!
//! Statements are built the same way inside and outside a transaction; only
//! the executor changes. Either hand the transaction to a builder with
//! [`QueryBuilder::tx`](crate::QueryBuilder::tx), or derive a whole source
//! over it with [`QuerySource::using`](crate::QuerySource::using).
//!
//! For commit/rollback handling, use the [`transaction!`] macro.
//!
//! # Example
//!
//! ```ignore
//! use sqlgom::{args, OrmResult, QuerySource};
//!
//! # fn demo(conn: &rusqlite::Connection) -> OrmResult<()> {
//! let db = QuerySource::new(conn);
//! sqlgom::transaction!(conn, tx, {
//!     let db = db.using(&tx);
//!     db.table("accounts")
//!         .and_where("id = ?", args![1])
//!         .update("balance = balance - ?", args![100])?;
//!     db.table("accounts")
//!         .and_where("id = ?", args![2])
//!         .update("balance = balance + ?", args![100])?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via [`Transactional::begin`](crate::Transactional::begin).
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `sqlgom::OrmResult<T>`; `?` inside it returns
/// from the block, not from the enclosing function.
#[macro_export]
macro_rules! transaction {
    ($db:expr, $tx:ident, $body:block) => {{
        let $tx = $crate::Transactional::begin($db)?;

        let __sqlgom_tx_body_result = (|| -> $crate::OrmResult<_> { $body })();
        match __sqlgom_tx_body_result {
            Ok(value) => {
                $crate::Transaction::commit($tx)?;
                Ok(value)
            }
            Err(error) => match $crate::Transaction::rollback($tx) {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
