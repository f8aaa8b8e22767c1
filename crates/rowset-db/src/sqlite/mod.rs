//! SQLite row store.
//!
//! [`SqliteStore`] opens a new `rusqlite` connection for each terminal
//! operation. Results are read eagerly into a [`BufferedCursor`] so the
//! prepared statement is finalized before the cursor is handed out.

pub mod render;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use rusqlite::{
    types::{ToSqlOutput, ValueRef},
    Connection, ToSql,
};
use tracing::{debug, trace};

use crate::{
    connection::{Cursor, RowStore, StoreConnection},
    error::{DbError, Result},
    row::{Row, Value},
    schema::{Schema, ROWID},
    statement::Select,
};

pub use render::render;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        }
    }
}

/// A SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
    case_sensitive_like: bool,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_millis(5000),
            case_sensitive_like: true,
        }
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn case_sensitive_like(mut self, enabled: bool) -> Self {
        self.case_sensitive_like = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn =
            Connection::open(&self.path).map_err(|e| DbError::Connection(e.to_string()))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        if self.case_sensitive_like {
            conn.execute_batch("PRAGMA case_sensitive_like = ON;")
                .map_err(|e| DbError::Connection(e.to_string()))?;
        }

        Ok(conn)
    }

    /// Runs raw SQL, typically schema setup or fixtures.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(sql)?;
        conn.close().map_err(|(_, e)| DbError::from(e))
    }

    /// Builds a schema for `table` from its column list.
    ///
    /// Every column becomes a field of the same name. The first primary key
    /// column identifies rows, falling back to `rowid`.
    pub fn introspect(&self, table: &str) -> Result<Schema> {
        self.introspect_with_id(table, ROWID)
    }

    /// Like [`introspect`](Self::introspect), but tables without a primary
    /// key use `fallback_id` when they have such a column.
    pub fn introspect_with_id(&self, table: &str, fallback_id: &str) -> Result<Schema> {
        let conn = self.connect()?;
        let columns = {
            let mut stmt =
                conn.prepare("SELECT name, pk FROM pragma_table_info(?1) ORDER BY cid")?;
            let rows = stmt.query_map([table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let columns = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            columns
        };
        conn.close().map_err(|(_, e)| DbError::from(e))?;

        if columns.is_empty() {
            return Err(DbError::Execution(format!("no such table: {table}")));
        }

        let id_column = columns
            .iter()
            .find(|(_, pk)| *pk == 1)
            .or_else(|| columns.iter().find(|(name, _)| name == fallback_id))
            .map_or(ROWID, |(name, _)| name.as_str());

        let schema = columns
            .iter()
            .fold(Schema::new(table, id_column), |schema, (name, _)| {
                schema.field(name.as_str(), name.as_str())
            });
        debug!(table, columns = columns.len(), "introspected table");
        Ok(schema)
    }
}

impl RowStore for SqliteStore {
    type Connection = SqliteConnection;

    fn open(&self) -> Result<SqliteConnection> {
        trace!(path = %self.path.display(), "opening sqlite connection");
        Ok(SqliteConnection {
            conn: self.connect()?,
        })
    }
}

pub struct SqliteConnection {
    conn: Connection,
}

impl StoreConnection for SqliteConnection {
    fn query(&mut self, select: &Select) -> Result<Box<dyn Cursor + '_>> {
        let (sql, params) = render(select)?;
        debug!(%sql, params = params.len(), "executing statement");

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut buffer = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|idx| row.get_ref(idx).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            buffer.push(Row::new(Arc::clone(&columns), values));
        }
        trace!(rows = buffer.len(), "statement returned");

        Ok(Box::new(BufferedCursor::new(buffer)))
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| DbError::from(e))
    }
}

/// A cursor over rows that were already read from the store.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
}

impl BufferedCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
            current: None,
        }
    }
}

impl Cursor for BufferedCursor {
    fn advance(&mut self) -> Result<bool> {
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    fn close(&mut self) {
        self.current = None;
        self.rows = Vec::new().into_iter();
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{execution::ExecutionBridge, statement::Condition};

    fn setup_store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db"));
        store
            .execute_batch(
                "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, bio BLOB);
                 INSERT INTO people (id, name, bio) VALUES (1, 'Ann', NULL), (2, 'Bo', x'0102');",
            )
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_query_reads_all_storage_classes() {
        let (_dir, store) = setup_store();
        let bridge = ExecutionBridge::new(store);

        let mut select = Select::from_table("people");
        select.order_by(["id"]);
        let rows = bridge.fetch_rows(&select).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), &["id", "name", "bio"]);
        assert_eq!(rows[0].value("bio"), Some(&Value::Null));
        assert_eq!(rows[1].value("bio"), Some(&Value::Blob(vec![1, 2])));
        assert_eq!(rows[1].get::<String>("name").unwrap(), "Bo");
    }

    #[test]
    fn test_cursor_advances_forward_only() {
        let (_dir, store) = setup_store();
        let mut conn = store.open().unwrap();

        let mut select = Select::from_table("people");
        select.and_where(Condition::eq("name", "Bo"));
        let mut cursor = conn.query(&select).unwrap();

        assert!(cursor.row().is_none());
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.row().unwrap().get::<i64>("id").unwrap(), 2);
        assert!(!cursor.advance().unwrap());
        assert!(cursor.row().is_none());
        drop(cursor);
        conn.close().unwrap();
    }

    #[test]
    fn test_execution_error() {
        let (_dir, store) = setup_store();
        let bridge = ExecutionBridge::new(store);

        let err = bridge
            .fetch_rows(&Select::from_table("missing"))
            .unwrap_err();
        assert!(matches!(err, DbError::Execution(msg) if msg.contains("missing")));
    }

    #[test]
    fn test_introspect() {
        let (_dir, store) = setup_store();
        let schema = store.introspect("people").unwrap();

        assert_eq!(schema.table(), "people");
        assert_eq!(schema.id_column(), "id");
        assert_eq!(schema.column("name"), Some("name"));
        assert!(store.introspect("nope").is_err());
    }

    #[test]
    fn test_introspect_without_primary_key() {
        let (_dir, store) = setup_store();
        store.execute_batch("CREATE TABLE tags (label TEXT)").unwrap();

        let schema = store.introspect("tags").unwrap();
        assert_eq!(schema.id_column(), "rowid");
    }

    #[test]
    fn test_introspect_with_fallback_id() {
        let (_dir, store) = setup_store();
        store
            .execute_batch("CREATE TABLE tags (tag_id INTEGER, label TEXT)")
            .unwrap();

        let schema = store.introspect_with_id("tags", "tag_id").unwrap();
        assert_eq!(schema.id_column(), "tag_id");

        let schema = store.introspect_with_id("people", "name").unwrap();
        assert_eq!(schema.id_column(), "id");

        let schema = store.introspect_with_id("tags", "missing").unwrap();
        assert_eq!(schema.id_column(), "rowid");
    }
}
