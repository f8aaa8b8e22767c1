//! Lazy, composable queries over a relational row store.
//!
//! Rules collected in a [`Filter`] are compiled by the [`StatementBuilder`]
//! into a [`Select`] tree, executed through an [`ExecutionBridge`] and
//! hydrated into domain values by a [`QuerySet`].

pub mod builder;
pub mod connection;
pub mod error;
pub mod execution;
pub mod filter;
pub mod macros;
pub mod query_set;
pub mod record;
pub mod row;
pub mod schema;
pub mod sqlite;
pub mod statement;
pub mod traits;

pub use builder::{StatementBuilder, DEFAULT_MAX_DEPTH};
pub use connection::{ConnectionGuard, Cursor, RowStore, StoreConnection};
pub use error::{DbError, Result};
pub use execution::ExecutionBridge;
pub use filter::{Filter, FilterOp, FilterValue, LogicalOp, Rule, LOOKUP_SEPARATOR};
pub use query_set::{QuerySet, QueryState};
pub use record::Record;
pub use row::{FromValue, Row, Value};
pub use schema::{Field, Relation, Schema};
pub use sqlite::SqliteStore;
pub use statement::{
    Comparison, Condition, Join, Limit, OrderBy, Projection, Select, SortDirection, Source,
    COUNT_COLUMN,
};
pub use traits::{Entity, FromRow};
