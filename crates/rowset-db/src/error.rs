//! Error types for rowset-db.

use miette::Diagnostic;
use thiserror::Error;

/// Error type for query composition and execution.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Field '{field}' does not exist on table '{table}'")]
    #[diagnostic(
        code(rowset_db::schema_field),
        help("Check the field names used in the filter against the entity schema")
    )]
    SchemaField { table: String, field: String },

    #[error("Filter nesting depth {depth} exceeds the maximum of {max}")]
    #[diagnostic(
        code(rowset_db::filter_too_deep),
        help("Reduce the number of related-field hops in the lookup or raise `max_filter_depth`")
    )]
    FilterTooDeep { depth: usize, max: usize },

    #[error("Invalid rule for field '{field}': {reason}")]
    #[diagnostic(
        code(rowset_db::invalid_rule),
        help("The operator and the value kind of a rule must agree")
    )]
    InvalidRule { field: String, reason: String },

    #[error("Incomplete statement: {0}")]
    #[diagnostic(
        code(rowset_db::invalid_statement),
        help("Every select needs a source and every join needs key columns")
    )]
    InvalidStatement(String),

    #[error("Statement execution failed: {0}")]
    #[diagnostic(
        code(rowset_db::execution),
        help("Check that the tables and columns referenced by the query exist")
    )]
    Execution(String),

    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(rowset_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    Connection(String),

    #[error("Column not found in row: {0}")]
    #[diagnostic(code(rowset_db::column_not_found))]
    ColumnNotFound(String),

    #[error("Column '{column}' does not hold a value of type {expected}")]
    #[diagnostic(code(rowset_db::type_mismatch))]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("Query set has already been materialized")]
    #[diagnostic(
        code(rowset_db::materialized),
        help("Create a new query set to compose a different query")
    )]
    Materialized,
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(message)) => DbError::Execution(message),
            other => DbError::Execution(other.to_string()),
        }
    }
}

/// Result type alias for rowset-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
