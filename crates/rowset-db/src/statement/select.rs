//! The SELECT node of the statement tree.

use tracing::debug;

use crate::{
    row::Value,
    statement::{
        clause::{Condition, Limit, OrderBy, Projection},
        join::Join,
    },
};

/// Name of the synthetic column produced by a count-mode select.
pub const COUNT_COLUMN: &str = "item_count";

/// What a select reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table(String),
    Select(Box<Select>),
    Join(Box<Join>),
}

impl From<&str> for Source {
    fn from(table: &str) -> Self {
        Source::Table(table.to_string())
    }
}

impl From<String> for Source {
    fn from(table: String) -> Self {
        Source::Table(table)
    }
}

impl From<Select> for Source {
    fn from(select: Select) -> Self {
        Source::Select(Box::new(select))
    }
}

impl From<Join> for Source {
    fn from(join: Join) -> Self {
        Source::Join(Box::new(join))
    }
}

/// A SELECT statement.
///
/// Mutators return `&mut Self` so calls can be chained on an owned value:
///
/// ```rust
/// use rowset_db::statement::{Condition, Limit, Select};
///
/// let mut select = Select::from_table("people");
/// select
///     .and_where(Condition::eq("name", "Bo"))
///     .order_by(["-age"])
///     .limit(Limit::new(10));
///
/// assert_eq!(select.conditions().len(), 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Select {
    source: Option<Source>,
    projection: Projection,
    conditions: Vec<Condition>,
    ordering: Vec<OrderBy>,
    limit: Option<Limit>,
    distinct: bool,
    count: bool,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a select over `table` with no conditions.
    pub fn from_table(table: impl Into<String>) -> Self {
        let mut select = Self::new();
        select.from(Source::Table(table.into()));
        select
    }

    /// Shorthand for a select wrapping `source`.
    pub fn over(source: impl Into<Source>) -> Self {
        let mut select = Self::new();
        select.from(source);
        select
    }

    /// Sets the source. A second call replaces the first.
    pub fn from(&mut self, source: impl Into<Source>) -> &mut Self {
        if self.source.is_some() {
            debug!("replacing the source of a select");
        }
        self.source = Some(source.into());
        self
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Projection::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Appends a condition; all conditions are ANDed.
    pub fn and_where(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    /// Drops every equality test on `column`, then adds `column = value`.
    pub fn replace_equality(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.conditions.retain(|c| !c.is_equality_on(column));
        self.conditions.push(Condition::eq(column, value));
        self
    }

    /// Sets the ordering; earlier entries take precedence.
    pub fn order_by<I, O>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderBy>,
    {
        self.ordering = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    pub fn limit(&mut self, limit: Limit) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Switches to count mode: the select yields one [`COUNT_COLUMN`] row
    /// and its projection, ordering, distinct flag and limit are ignored.
    pub fn count(&mut self) -> &mut Self {
        self.count = true;
        self
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.ordering
    }

    pub fn get_limit(&self) -> Option<Limit> {
        self.limit
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_count(&self) -> bool {
        self.count
    }
}
