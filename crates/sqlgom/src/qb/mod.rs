//! Fluent query building.
//!
//! A [`QuerySource`] is the reusable root: every chain-starting call on it
//! returns a new, independent [`QueryBuilder`]. A builder accumulates clauses
//! by value and renders one statement with `?` placeholders whose arguments
//! line up with the text by construction.
//!
//! ```ignore
//! use sqlgom::{args, QuerySource};
//!
//! let db = QuerySource::new(&conn);
//!
//! let adults: Vec<User> = db
//!     .table("users")
//!     .and_where("age >= ?", args![18])
//!     .in_list("status", ["active", "trial"])
//!     .order_by("created_at DESC")
//!     .page(2, 20)
//!     .find()?;
//!
//! let (query, pages) = db.model::<User>().paginate(3, 20, 0)?;
//! let rows = query.list()?;
//!
//! db.table("users")
//!     .and_where("id = ?", args![7])
//!     .update_map([("status", "inactive")])?;
//! ```

mod builder;
mod clause;
mod source;
mod statement;

pub use builder::{QueryBuilder, total_pages};
pub use clause::{Clause, ClauseKind, ClauseList};
pub use source::QuerySource;
pub use statement::{
    BuilderState, Statement, assignment_parts, assignments, insert_parts, placeholders,
    split_columns,
};

#[cfg(test)]
mod tests;
