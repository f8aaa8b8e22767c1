//! Clause types shared by statements.

use std::fmt;

use crate::{row::Value, statement::Select};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }
}

/// A WHERE condition.
///
/// Columns are plain names; a qualified name (`alias.column`) is kept as is
/// when rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Comparison,
        value: Value,
    },
    Like {
        column: String,
        pattern: String,
        case_insensitive: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column IN (SELECT ...)`, used for related-field lookups.
    InSelect {
        column: String,
        select: Box<Select>,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    Null {
        column: String,
        is_null: bool,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn compare(column: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Eq, value)
    }

    /// True when this is an equality test on `column`.
    pub fn is_equality_on(&self, column: &str) -> bool {
        matches!(
            self,
            Condition::Compare { column: c, op: Comparison::Eq, .. } if c == column
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses `name` as ascending and `-name` as descending.
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(column) => Self::desc(column),
            None => Self::asc(key),
        }
    }
}

impl From<&str> for OrderBy {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl From<String> for OrderBy {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.column),
            SortDirection::Desc => write!(f, "-{}", self.column),
        }
    }
}

/// Row window: skip `offset` rows, then return at most `count`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: u64,
}

impl Limit {
    pub fn new(count: u64) -> Self {
        Self { offset: 0, count }
    }

    pub fn with_offset(offset: u64, count: u64) -> Self {
        Self { offset, count }
    }
}

/// Columns produced by a select.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Columns(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_parse() {
        assert_eq!(OrderBy::parse("name"), OrderBy::asc("name"));
        assert_eq!(OrderBy::parse("-name"), OrderBy::desc("name"));
        assert_eq!(OrderBy::desc("age").to_string(), "-age");
    }


    #[test]
    fn test_equality_detection() {
        assert!(Condition::eq("id", 1).is_equality_on("id"));
        assert!(!Condition::eq("id", 1).is_equality_on("name"));
        assert!(!Condition::compare("id", Comparison::Gt, 1).is_equality_on("id"));
    }
}
