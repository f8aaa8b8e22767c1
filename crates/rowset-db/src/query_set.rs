//! Lazily evaluated, chainable query sets.
//!
//! A [`QuerySet`] composes a [`Select`] as builder calls are chained and
//! only touches the store when a result is needed. It moves through three
//! states:
//!
//! - **Empty**: no statement yet. `order_by`, `distinct` and `limit` are
//!   ignored until `all`, `filter` or `get` creates one.
//! - **Composed**: a pending statement exists.
//! - **Materialized**: the rows have been read and hydrated once; iteration
//!   and membership tests reuse them. Composition calls are ignored from
//!   here on, and `filter` fails with [`DbError::Materialized`].
//!
//! `count` and `get` run a fresh statement on every call.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut people = QuerySet::<Person>::new(bridge.clone());
//! people.all().order_by(["name"]).limit_offset(1, 1);
//! let second: Vec<&Person> = people.iter()?.collect();
//!
//! let mut named_bo = QuerySet::<Person>::new(bridge);
//! assert_eq!(named_bo.filter(&Filter::new().is("name", "Bo"))?.count()?, 1);
//! ```

use std::{mem, sync::Arc};

use tracing::{debug, warn};

use crate::{
    builder::StatementBuilder,
    connection::RowStore,
    error::{DbError, Result},
    execution::ExecutionBridge,
    filter::Filter,
    row::Value,
    schema::Schema,
    sqlite::SqliteStore,
    statement::{Join, Limit, OrderBy, Select, COUNT_COLUMN},
    traits::{Entity, FromRow},
};

/// Observable lifecycle state of a [`QuerySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Empty,
    Composed,
    Materialized,
}

#[derive(Default)]
enum Pending<T> {
    #[default]
    Empty,
    Composed(Select),
    Materialized {
        statement: Option<Select>,
        items: Vec<T>,
    },
}

/// A deferred query over the rows of one table, hydrated into `T`.
pub struct QuerySet<T, S = SqliteStore> {
    bridge: ExecutionBridge<S>,
    schema: Arc<Schema>,
    builder: StatementBuilder,
    state: Pending<T>,
}

impl<T: Entity, S: RowStore> QuerySet<T, S> {
    /// Creates an empty query set over `T`'s table.
    pub fn new(bridge: ExecutionBridge<S>) -> Self {
        Self::with_schema(bridge, T::schema())
    }
}

impl<T: FromRow, S: RowStore> QuerySet<T, S> {
    /// Creates an empty query set over an explicitly supplied schema.
    pub fn with_schema(bridge: ExecutionBridge<S>, schema: Arc<Schema>) -> Self {
        Self {
            bridge,
            schema,
            builder: StatementBuilder::default(),
            state: Pending::Empty,
        }
    }

    /// Replaces the statement builder, e.g. to change the lookup depth bound.
    pub fn with_builder(mut self, builder: StatementBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state(&self) -> QueryState {
        match self.state {
            Pending::Empty => QueryState::Empty,
            Pending::Composed(_) => QueryState::Composed,
            Pending::Materialized { .. } => QueryState::Materialized,
        }
    }

    /// The pending statement, if one has been composed.
    pub fn statement(&self) -> Option<&Select> {
        match &self.state {
            Pending::Empty => None,
            Pending::Composed(select) => Some(select),
            Pending::Materialized { statement, .. } => statement.as_ref(),
        }
    }

    fn base_select(&self) -> Select {
        self.schema.select_all()
    }

    fn pending_mut(&mut self, operation: &str) -> Option<&mut Select> {
        match &mut self.state {
            Pending::Composed(select) => Some(select),
            Pending::Empty => {
                debug!("{operation} ignored: query set has no statement yet");
                None
            }
            Pending::Materialized { .. } => {
                warn!("{operation} ignored: query set is already materialized");
                None
            }
        }
    }

    /// Selects every row of the table unless a statement already exists.
    pub fn all(&mut self) -> &mut Self {
        if let Pending::Empty = self.state {
            self.state = Pending::Composed(self.base_select());
        }
        self
    }

    /// Narrows the query set to rows matching `filter`.
    ///
    /// A second filter is intersected with the first through a join on the
    /// row identifier. On error the query set is left as it was.
    pub fn filter(&mut self, filter: &Filter) -> Result<&mut Self> {
        if let Pending::Materialized { .. } = self.state {
            return Err(DbError::Materialized);
        }

        let candidate = self.builder.build(&self.schema, filter.rules(), 0)?;

        self.state = match mem::take(&mut self.state) {
            Pending::Composed(pending) => {
                let id = self.schema.id_column();
                debug!(table = self.schema.table(), "intersecting filters on {id}");
                let join = Join::new(pending, candidate).on(id, id);
                Pending::Composed(Select::over(join))
            }
            _ => Pending::Composed(candidate),
        };

        Ok(self)
    }

    /// Sets the ordering; prefix a column with `-` to sort descending.
    pub fn order_by<I, O>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderBy>,
    {
        if let Some(select) = self.pending_mut("order_by") {
            select.order_by(columns);
        }
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        if let Some(select) = self.pending_mut("distinct") {
            select.distinct();
        }
        self
    }

    pub fn limit(&mut self, limit: Limit) -> &mut Self {
        if let Some(select) = self.pending_mut("limit") {
            select.limit(limit);
        }
        self
    }

    /// Keeps at most `count` rows.
    pub fn limit_to(&mut self, count: u64) -> &mut Self {
        self.limit(Limit::new(count))
    }

    /// Skips `offset` rows, then keeps at most `count`.
    pub fn limit_offset(&mut self, offset: u64, count: u64) -> &mut Self {
        self.limit(Limit::with_offset(offset, count))
    }

    /// Fetches the row whose identifier equals `id`.
    ///
    /// The identifier constraint replaces any earlier one on the pending
    /// statement. Once materialized, the lookup runs against a copy of the
    /// frozen statement instead.
    pub fn get(&mut self, id: impl Into<Value>) -> Result<Option<T>> {
        let id = id.into();
        let id_column = self.schema.id_column().to_string();
        let base = self.base_select();

        let select = match &mut self.state {
            Pending::Empty => {
                let mut select = base;
                select.replace_equality(&id_column, id);
                self.state = Pending::Composed(select.clone());
                select
            }
            Pending::Composed(select) => {
                select.replace_equality(&id_column, id);
                select.clone()
            }
            Pending::Materialized { statement, .. } => {
                let mut select = statement.clone().unwrap_or(base);
                select.replace_equality(&id_column, id);
                select
            }
        };

        self.bridge.execute(&select, |cursor| {
            if cursor.advance()? {
                Ok(cursor.row().and_then(T::from_row))
            } else {
                Ok(None)
            }
        })
    }

    /// Counts the matching rows with a fresh query.
    pub fn count(&self) -> Result<u64> {
        let inner = self
            .statement()
            .cloned()
            .unwrap_or_else(|| self.base_select());
        let mut select = Select::over(inner);
        select.count();

        self.bridge.execute(&select, |cursor| {
            if !cursor.advance()? {
                return Ok(0);
            }
            match cursor.row() {
                Some(row) => row.get::<u64>(COUNT_COLUMN),
                None => Ok(0),
            }
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    fn fetch(&self, select: &Select) -> Result<Vec<T>> {
        self.bridge.execute(select, |cursor| {
            let mut items = Vec::new();
            let mut skipped = 0usize;
            while cursor.advance()? {
                match cursor.row().and_then(T::from_row) {
                    Some(item) => items.push(item),
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                warn!(
                    table = self.schema.table(),
                    skipped, "rows could not be hydrated and were dropped"
                );
            }
            Ok(items)
        })
    }

    /// Runs the pending statement once and caches the hydrated objects.
    pub fn items(&mut self) -> Result<&[T]> {
        if !matches!(self.state, Pending::Materialized { .. }) {
            let items = match &self.state {
                Pending::Composed(select) => self.fetch(select)?,
                _ => Vec::new(),
            };
            let statement = match mem::take(&mut self.state) {
                Pending::Composed(select) => Some(select),
                _ => None,
            };
            debug!(
                table = self.schema.table(),
                items = items.len(),
                "query set materialized"
            );
            self.state = Pending::Materialized { statement, items };
        }

        match &self.state {
            Pending::Materialized { items, .. } => Ok(items),
            _ => Ok(&[]),
        }
    }

    pub fn iter(&mut self) -> Result<std::slice::Iter<'_, T>> {
        Ok(self.items()?.iter())
    }

    pub fn first(&mut self) -> Result<Option<&T>> {
        Ok(self.items()?.first())
    }

    pub fn into_vec(mut self) -> Result<Vec<T>> {
        self.items()?;
        match self.state {
            Pending::Materialized { items, .. } => Ok(items),
            _ => Ok(Vec::new()),
        }
    }
}

impl<T: FromRow + PartialEq, S: RowStore> QuerySet<T, S> {
    /// Materializes the query set and tests whether it holds `object`.
    pub fn contains(&mut self, object: &T) -> Result<bool> {
        Ok(self.items()?.contains(object))
    }

    pub fn contains_all<'a, I>(&mut self, objects: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let items = self.items()?;
        Ok(objects.into_iter().all(|object| items.contains(object)))
    }
}
