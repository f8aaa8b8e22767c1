//! Core traits that connect domain types to the query layer.
//!
//! These traits define the contract for:
//! - Converting result rows into Rust types (`FromRow`)
//! - Describing where a type lives in the store (`Entity`)

use std::sync::Arc;

use crate::{row::Row, schema::Schema};

/// A trait for types that can be hydrated from a single result row.
///
/// Returning `None` signals that the row lacks data the type requires; such
/// rows are skipped during materialization.
///
/// # Example
///
/// ```rust
/// use rowset_db::{FromRow, Row};
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> Option<Self> {
///         Some(User {
///             id: row.get("id").ok()?,
///             name: row.get("name").ok()?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Option<Self>;
}

/// A domain type with a fixed table layout.
///
/// The schema is built once per type, usually through
/// [`define_schema!`](crate::define_schema).
pub trait Entity: FromRow {
    fn schema() -> Arc<Schema>;
}
