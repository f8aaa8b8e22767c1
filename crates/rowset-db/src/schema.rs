//! Table descriptors used to resolve filter fields into columns.
//!
//! A [`Schema`] is built once per domain type and maps the logical field
//! names used in filters to the physical columns of a table. Relations name
//! a foreign-key column holding the row identifier of another table, which
//! lets filters reach into that table (`author__name`).

use std::{fmt, sync::Arc};

use crate::statement::Select;

/// SQLite's implicit row identifier, used for tables without a primary key.
pub const ROWID: &str = "rowid";

/// A logical field and the column that stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub column: String,
}

/// A foreign key pointing at the row identifier of another table.
#[derive(Clone)]
pub struct Relation {
    pub field: String,
    pub column: String,
    pub target: fn() -> Arc<Schema>,
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("field", &self.field)
            .field("column", &self.column)
            .field("target", &(self.target)().table())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    id_column: String,
    fields: Vec<Field>,
    relations: Vec<Relation>,
}

impl Schema {
    /// Creates a schema for `table` whose rows are identified by `id_column`.
    ///
    /// The identifier is registered as a field of the same name.
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        let id_column = id_column.into();
        Self {
            table: table.into(),
            fields: vec![Field {
                name: id_column.clone(),
                column: id_column.clone(),
            }],
            id_column,
            relations: Vec::new(),
        }
    }

    /// Adds or replaces a field mapping.
    pub fn field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        let field = Field {
            name: name.into(),
            column: column.into(),
        };
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Adds a relation; its column also becomes filterable under the
    /// relation's field name.
    pub fn relation(
        mut self,
        field: impl Into<String>,
        column: impl Into<String>,
        target: fn() -> Arc<Schema>,
    ) -> Self {
        let relation = Relation {
            field: field.into(),
            column: column.into(),
            target,
        };
        self = self.field(relation.field.clone(), relation.column.clone());
        self.relations.push(relation);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// A select over every row of the table.
    ///
    /// `SELECT *` never yields the implicit `rowid`, so schemas identified
    /// by it project the identifier explicitly.
    pub fn select_all(&self) -> Select {
        let mut select = Select::from_table(self.table.as_str());
        if self.id_column.eq_ignore_ascii_case(ROWID) {
            select.columns([self.id_column.as_str(), "*"]);
        }
        select
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Resolves a logical field name to its column.
    pub fn column(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.column.as_str())
    }

    pub fn relation_for(&self, field: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.field == field)
    }
}
