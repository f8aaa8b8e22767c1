//! Runs statements against a row store.

use std::sync::Arc;

use tracing::trace;

use crate::{
    connection::{ConnectionGuard, Cursor, RowStore, StoreConnection},
    error::Result,
    row::Row,
    statement::Select,
};

/// Executes statements with connection-per-call semantics.
///
/// Every call opens a connection, runs one statement, lets the caller
/// consume the cursor and closes the connection before returning, whether
/// or not an error occurred.
pub struct ExecutionBridge<S> {
    store: Arc<S>,
}

impl<S> Clone for ExecutionBridge<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RowStore> ExecutionBridge<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `select` and passes the open cursor to `consume`.
    pub fn execute<R, F>(&self, select: &Select, consume: F) -> Result<R>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<R>,
    {
        let mut guard = ConnectionGuard::new(self.store.open()?);

        let result = {
            let mut cursor = guard.connection().query(select)?;
            let result = consume(cursor.as_mut());
            cursor.close();
            result
        }?;

        guard.close()?;
        Ok(result)
    }

    /// Runs `select` and collects every row.
    pub fn fetch_rows(&self, select: &Select) -> Result<Vec<Row>> {
        self.execute(select, |cursor| {
            let mut rows = Vec::new();
            while cursor.advance()? {
                if let Some(row) = cursor.row() {
                    rows.push(row.clone());
                }
            }
            trace!(rows = rows.len(), "fetched rows");
            Ok(rows)
        })
    }
}
