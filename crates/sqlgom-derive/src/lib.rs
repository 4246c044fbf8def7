//! Derive macros for sqlgom
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `Record` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use sqlgom::Record;
///
/// #[derive(Default, Record)]
/// #[record(table = "users")]
/// struct User {
///     #[record(key)]
///     id: i64,
///     #[record(column = "user_name")]
///     name: String,
///     #[record(column, hint = "date")]
///     birthday: Option<chrono::NaiveDate>,
///     #[record(embed)]
///     audit: Audit,
///     #[record(ignore)]
///     scratch: Vec<String>,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[record(table = "name")]` - Default table for `model::<T>()` and record writes
/// - `#[record(hooks)]` - Route `before_insert`/`before_update` to the type's `RecordHooks` impl
///
/// Field level:
/// - `#[record(column = "name")]` - Map field to a different column name
/// - `#[record(column)]` - Tag the field under its own name
///
/// Untagged fields are read by name but only tagged fields (and the key) are
/// written by `insert` and `flush`.
/// - `#[record(key)]` - Auto-generated key column
/// - `#[record(hint = "date" | "datetime" | "decimal")]` - Storage format hint
/// - `#[record(embed)]` - Flatten a nested record's fields into this one
/// - `#[record(ignore)]` - Exclude the field from mapping
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
