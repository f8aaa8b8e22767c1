//! Schemaless rows for ad-hoc queries.

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    row::{Row, Value},
    traits::FromRow,
};

/// A row kept as an ordered list of column/value pairs.
///
/// Useful when the shape of a table is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl FromRow for Record {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            fields: row
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        })
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
