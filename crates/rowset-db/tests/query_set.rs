use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use rowset_db::{
    define_schema, sqlite::SqliteConnection, Cursor, DbError, Entity, ExecutionBridge, Filter,
    FromRow, QuerySet, QueryState, Record, Result, Row, RowStore, Schema, Select, SqliteStore,
    StatementBuilder, StoreConnection, Value,
};
use tempfile::TempDir;

define_schema!(
    people {
        table: "people",
        id: "id",
        fields: {
            name => "name",
            age => "age"
        }
    }
);

define_schema!(
    books {
        table: "books",
        id: "id",
        fields: {
            title => "title"
        },
        relations: {
            author => "author_id": people::schema
        }
    }
);

#[derive(Debug, Clone, PartialEq)]
struct Person {
    id: i64,
    name: String,
    age: Option<i64>,
}

impl FromRow for Person {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: row.get("id").ok()?,
            name: row.get("name").ok()?,
            age: row.get("age").ok()?,
        })
    }
}

impl Entity for Person {
    fn schema() -> Arc<Schema> {
        people::schema()
    }
}

/// A person whose age is known; rows without one do not hydrate.
#[derive(Debug)]
struct Aged {
    name: String,
}

impl FromRow for Aged {
    fn from_row(row: &Row) -> Option<Self> {
        row.get::<Option<i64>>("age").ok()??;
        Some(Self {
            name: row.get("name").ok()?,
        })
    }
}

#[derive(Debug)]
struct Book {
    title: String,
}

impl FromRow for Book {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            title: row.get("title").ok()?,
        })
    }
}

impl Entity for Book {
    fn schema() -> Arc<Schema> {
        books::schema()
    }
}

/// Counts how many connections the query layer opens and closes.
struct CountingStore {
    inner: SqliteStore,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl CountingStore {
    fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            opens: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct CountingConnection {
    inner: SqliteConnection,
    closes: Arc<AtomicUsize>,
}

impl StoreConnection for CountingConnection {
    fn query(&mut self, select: &Select) -> Result<Box<dyn Cursor + '_>> {
        self.inner.query(select)
    }

    fn close(self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

impl RowStore for CountingStore {
    type Connection = CountingConnection;

    fn open(&self) -> Result<CountingConnection> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(CountingConnection {
            inner: self.inner.open()?,
            closes: Arc::clone(&self.closes),
        })
    }
}

fn setup() -> (TempDir, ExecutionBridge<CountingStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("rowset.db"));
    store
        .execute_batch(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER);
             INSERT INTO people (id, name, age) VALUES (1, 'Ann', 30), (2, 'Bo', 25), (3, 'Cy', NULL);
             CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author_id INTEGER);
             INSERT INTO books (id, title, author_id) VALUES (1, 'Rust', 1), (2, 'Zig', 2), (3, 'Go', 1);
             CREATE TABLE tags (label TEXT, n INTEGER);
             INSERT INTO tags (label, n) VALUES ('a', 1), ('b', 2), ('c', 3), ('d', 4);",
        )
        .unwrap();

    (dir, ExecutionBridge::new(CountingStore::new(store)))
}

fn names<S: RowStore>(set: &mut QuerySet<Person, S>) -> Vec<String> {
    set.iter().unwrap().map(|p| p.name.clone()).collect()
}

#[test]
fn test_ordered_page() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    people.all().order_by(["name"]).limit_offset(1, 1);

    assert_eq!(names(&mut people), ["Bo"]);
}

#[test]
fn test_descending_order() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    people.all().order_by(["-name"]);

    assert_eq!(names(&mut people), ["Cy", "Bo", "Ann"]);
}

#[test]
fn test_get_by_id() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    let bo = people.get(2).unwrap().unwrap();
    assert_eq!(
        bo,
        Person {
            id: 2,
            name: "Bo".into(),
            age: Some(25)
        }
    );
    assert_eq!(people.state(), QueryState::Composed);
    assert!(people.get(42).unwrap().is_none());
}

#[test]
fn test_get_overwrites_identifier() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    assert_eq!(people.get(1).unwrap().unwrap().name, "Ann");
    assert_eq!(people.get(2).unwrap().unwrap().name, "Bo");
    assert_eq!(people.statement().unwrap().conditions().len(), 1);
}

#[test]
fn test_count_and_is_empty() {
    let (_dir, bridge) = setup();

    let mut named_bo = QuerySet::<Person, _>::new(bridge.clone());
    assert_eq!(
        named_bo
            .filter(&Filter::new().is("name", "Bo"))
            .unwrap()
            .count()
            .unwrap(),
        1
    );

    let mut nobody = QuerySet::<Person, _>::new(bridge.clone());
    nobody.filter(&Filter::new().is("name", "Zz")).unwrap();
    assert!(nobody.is_empty().unwrap());

    let everyone = QuerySet::<Person, _>::new(bridge);
    assert_eq!(everyone.count().unwrap(), 3);
    assert_eq!(everyone.state(), QueryState::Empty);
}

#[test]
fn test_count_ignores_page() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    people.all().order_by(["name"]).limit_to(1);

    assert_eq!(people.count().unwrap(), 3);
}

#[test]
fn test_chained_filters_intersect() {
    let (_dir, bridge) = setup();

    let mut chained = QuerySet::<Person, _>::new(bridge.clone());
    chained
        .filter(&Filter::new().gte("age", 20))
        .unwrap()
        .filter(&Filter::new().is_not("name", "Ann"))
        .unwrap();

    let mut combined = QuerySet::<Person, _>::new(bridge);
    combined
        .filter(&Filter::new().gte("age", 20).is_not("name", "Ann"))
        .unwrap();

    assert_eq!(names(&mut chained), ["Bo"]);
    assert_eq!(names(&mut chained), names(&mut combined));
    assert_eq!(chained.count().unwrap(), 1);
}

#[test]
fn test_ordering_after_chained_filters() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    people
        .filter(&Filter::new().is_not_null("age"))
        .unwrap()
        .filter(&Filter::new().lt("age", 100))
        .unwrap()
        .order_by(["-age"]);

    assert_eq!(names(&mut people), ["Ann", "Bo"]);
    assert_eq!(people.get(2).unwrap().unwrap().name, "Bo");
}

#[test]
fn test_or_rules() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);

    people
        .filter(&Filter::new().is("name", "Ann").or_is("name", "Cy"))
        .unwrap()
        .order_by(["name"]);

    assert_eq!(names(&mut people), ["Ann", "Cy"]);
}

#[test]
fn test_iteration_executes_once() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge.clone());
    people.all();

    assert_eq!(people.iter().unwrap().count(), 3);
    assert_eq!(people.iter().unwrap().count(), 3);
    assert!(people.first().unwrap().is_some());

    assert_eq!(bridge.store().opens(), 1);
    assert_eq!(people.state(), QueryState::Materialized);
}

#[test]
fn test_count_executes_every_time() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge.clone());
    people.all();

    people.count().unwrap();
    people.count().unwrap();

    assert_eq!(bridge.store().opens(), 2);
}

#[test]
fn test_empty_iteration_skips_store() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge.clone());

    people.order_by(["name"]).distinct().limit_to(1);

    assert!(people.items().unwrap().is_empty());
    assert_eq!(people.state(), QueryState::Materialized);
    assert_eq!(bridge.store().opens(), 0);
}

#[test]
fn test_materialized_set_is_frozen() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);
    people.all().order_by(["name"]);
    assert_eq!(names(&mut people), ["Ann", "Bo", "Cy"]);

    assert!(matches!(
        people.filter(&Filter::new().is("name", "Bo")),
        Err(DbError::Materialized)
    ));

    people.order_by(["-name"]).limit_to(1);
    assert_eq!(names(&mut people), ["Ann", "Bo", "Cy"]);

    assert_eq!(people.get(3).unwrap().unwrap().name, "Cy");
    assert_eq!(names(&mut people), ["Ann", "Bo", "Cy"]);
}

#[test]
fn test_failed_filter_keeps_statement() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);
    people.filter(&Filter::new().is("name", "Bo")).unwrap();

    let err = people
        .filter(&Filter::new().is("nickname", "B"))
        .err()
        .unwrap();

    assert!(matches!(err, DbError::SchemaField { ref field, .. } if field == "nickname"));
    assert_eq!(people.state(), QueryState::Composed);
    assert_eq!(people.count().unwrap(), 1);
}

#[test]
fn test_related_lookup() {
    let (_dir, bridge) = setup();
    let mut books = QuerySet::<Book, _>::new(bridge);

    books
        .filter(&Filter::new().is("author__name", "Ann"))
        .unwrap()
        .order_by(["title"]);

    let titles: Vec<_> = books.iter().unwrap().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Go", "Rust"]);
}

#[test]
fn test_lookup_depth_bound() {
    let (_dir, bridge) = setup();
    let mut books = QuerySet::<Book, _>::new(bridge).with_builder(StatementBuilder::new(0));

    let err = books
        .filter(&Filter::new().is("author__name", "Ann"))
        .err()
        .unwrap();

    assert!(matches!(err, DbError::FilterTooDeep { depth: 1, max: 0 }));
    assert_eq!(books.state(), QueryState::Empty);
}

#[test]
fn test_unhydratable_rows_are_skipped() {
    let (_dir, bridge) = setup();
    let mut aged = QuerySet::<Aged, _>::with_schema(bridge, people::schema());
    aged.all().order_by(["name"]);

    let names: Vec<_> = aged.iter().unwrap().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Ann", "Bo"]);
    assert_eq!(aged.count().unwrap(), 3);
}

#[test]
fn test_membership() {
    let (_dir, bridge) = setup();
    let mut adults = QuerySet::<Person, _>::new(bridge.clone());
    adults.filter(&Filter::new().gte("age", 18)).unwrap();

    let mut lookup = QuerySet::<Person, _>::new(bridge);
    let ann = lookup.get(1).unwrap().unwrap();
    let cy = lookup.get(3).unwrap().unwrap();

    assert!(adults.contains(&ann).unwrap());
    assert!(!adults.contains(&cy).unwrap());
    assert!(adults.contains_all([&ann]).unwrap());
    assert!(!adults.contains_all([&ann, &cy]).unwrap());
}

#[test]
fn test_into_vec() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge);
    people.filter(&Filter::new().in_("id", [1, 3])).unwrap();

    let people = people.into_vec().unwrap();
    assert_eq!(people.len(), 2);
}

#[test]
fn test_records_from_introspected_schema() {
    let (_dir, bridge) = setup();
    let schema = bridge.store().inner.introspect("books").unwrap();
    let mut records = QuerySet::<Record, _>::with_schema(bridge, Arc::new(schema));

    records
        .filter(&Filter::new().contains("title", "u"))
        .unwrap()
        .order_by(["id"]);

    let titles: Vec<_> = records
        .iter()
        .unwrap()
        .filter_map(|r| r.get("title").cloned())
        .collect();
    assert_eq!(titles, [Value::from("Rust")]);
}

#[test]
fn test_execution_error_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = ExecutionBridge::new(SqliteStore::new(dir.path().join("empty.db")));
    let mut people = QuerySet::<Person>::new(bridge);
    people.all();

    assert!(matches!(people.items(), Err(DbError::Execution(_))));
    assert_eq!(people.state(), QueryState::Composed);
}

#[test]
fn test_chained_filters_on_rowid_table() {
    let (_dir, bridge) = setup();
    let schema = bridge.store().inner.introspect("tags").unwrap();
    assert_eq!(schema.id_column(), "rowid");

    let mut tags = QuerySet::<Record, _>::with_schema(bridge, Arc::new(schema));
    tags.filter(&Filter::new().gte("n", 2))
        .unwrap()
        .filter(&Filter::new().is_not("label", "c"))
        .unwrap()
        .order_by(["n"]);

    assert_eq!(tags.count().unwrap(), 2);
    let labels: Vec<_> = tags
        .iter()
        .unwrap()
        .filter_map(|r| r.get("label").cloned())
        .collect();
    assert_eq!(labels, [Value::from("b"), Value::from("d")]);

    let tag = tags.get(4).unwrap().unwrap();
    assert_eq!(tag.get("label"), Some(&Value::from("d")));
}

#[test]
fn test_connections_closed_after_success() {
    let (_dir, bridge) = setup();
    let mut people = QuerySet::<Person, _>::new(bridge.clone());
    people.all();

    people.count().unwrap();
    people.get(1).unwrap();
    people.items().unwrap();

    assert_eq!(bridge.store().opens(), 3);
    assert_eq!(bridge.store().closes(), 3);
}

#[test]
fn test_connection_closed_after_query_error() {
    let (_dir, bridge) = setup();

    let err = bridge
        .execute(&Select::from_table("missing"), |_| Ok(()))
        .unwrap_err();

    assert!(matches!(err, DbError::Execution(_)));
    assert_eq!(bridge.store().opens(), 1);
    assert_eq!(bridge.store().closes(), 1);
}

#[test]
fn test_connection_closed_after_consumer_error() {
    let (_dir, bridge) = setup();

    let err = bridge
        .execute(&Select::from_table("people"), |cursor| {
            cursor.advance()?;
            Err::<(), _>(DbError::Materialized)
        })
        .unwrap_err();

    assert!(matches!(err, DbError::Materialized));
    assert_eq!(bridge.store().opens(), 1);
    assert_eq!(bridge.store().closes(), 1);
}
