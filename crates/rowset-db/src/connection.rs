//! Row-store contracts.
//!
//! The query layer talks to storage only through these traits:
//!
//! - [`RowStore`]: opens a fresh connection per terminal operation.
//! - [`StoreConnection`]: executes a [`Select`] and hands back a cursor.
//! - [`Cursor`]: forward-only access to result rows.
//!
//! [`ConnectionGuard`] ties a connection's lifetime to a scope so it is
//! closed on every exit path.

use tracing::{debug, warn};

use crate::{error::Result, row::Row, statement::Select};

/// Sequential, forward-only access to the rows of one statement.
pub trait Cursor {
    /// Moves to the next row; `false` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// The row the cursor currently points at.
    fn row(&self) -> Option<&Row>;

    /// Releases resources held by the cursor.
    fn close(&mut self) {}
}

pub trait StoreConnection {
    fn query(&mut self, select: &Select) -> Result<Box<dyn Cursor + '_>>;

    fn close(self) -> Result<()>;
}

pub trait RowStore {
    type Connection: StoreConnection;

    fn open(&self) -> Result<Self::Connection>;
}

/// Closes the wrapped connection when dropped.
///
/// Use [`ConnectionGuard::close`] on the success path to observe close
/// errors; a drop only logs them.
pub struct ConnectionGuard<C: StoreConnection> {
    conn: Option<C>,
}

impl<C: StoreConnection> ConnectionGuard<C> {
    pub fn new(conn: C) -> Self {
        debug!("connection opened");
        Self { conn: Some(conn) }
    }

    pub fn connection(&mut self) -> &mut C {
        // Only `close` and `drop` take the connection, both consume the guard.
        self.conn
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection taken before guard was consumed"))
    }

    pub fn close(mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                debug!("connection closed");
                conn.close()
            }
            None => Ok(()),
        }
    }
}

impl<C: StoreConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("connection closed on early exit");
            if let Err(err) = conn.close() {
                warn!("failed to close connection: {err}");
            }
        }
    }
}
