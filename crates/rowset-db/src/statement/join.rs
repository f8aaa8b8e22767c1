//! Equality joins between two selects.

use crate::statement::Select;

pub const LEFT_ALIAS: &str = "left";
pub const RIGHT_ALIAS: &str = "right";

/// An inner join of two selects on `left.<key> = right.<key>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    left: Select,
    left_alias: String,
    right: Select,
    right_alias: String,
    on: (String, String),
}

impl Join {
    /// Joins `left` and `right` aliased as `"left"` and `"right"`.
    pub fn new(left: Select, right: Select) -> Self {
        Self {
            left,
            left_alias: LEFT_ALIAS.to_string(),
            right,
            right_alias: RIGHT_ALIAS.to_string(),
            on: (String::new(), String::new()),
        }
    }

    pub fn aliases(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.left_alias = left.into();
        self.right_alias = right.into();
        self
    }

    pub fn on(mut self, left_column: impl Into<String>, right_column: impl Into<String>) -> Self {
        self.on = (left_column.into(), right_column.into());
        self
    }

    pub fn left(&self) -> (&Select, &str) {
        (&self.left, &self.left_alias)
    }

    pub fn right(&self) -> (&Select, &str) {
        (&self.right, &self.right_alias)
    }

    pub fn keys(&self) -> (&str, &str) {
        (&self.on.0, &self.on.1)
    }
}
