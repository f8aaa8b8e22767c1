//! Caller-side filter criteria.
//!
//! A [`Filter`] accumulates [`Rule`]s in the order they are added. Rules are
//! joined with `AND` unless added through [`Filter::or_rule`]; `AND` binds
//! tighter than `OR`. Field names are not checked here, resolution happens
//! when the filter is compiled against a schema.

use std::fmt;

use crate::row::Value;

/// Separator between hops of a related-field lookup (`author__name`).
pub const LOOKUP_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Contains,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
            FilterOp::ILike => "ILIKE",
            FilterOp::Contains => "CONTAINS",
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT IN",
            FilterOp::Between => "BETWEEN",
            FilterOp::IsNull => "IS NULL",
            FilterOp::IsNotNull => "IS NOT NULL",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    None,
    Single(Value),
    Multiple(Vec<Value>),
    Range(Value, Value),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    field: String,
    op: FilterOp,
    value: FilterValue,
    connector: LogicalOp,
}

impl Rule {
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
            connector: LogicalOp::And,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// How this rule joins the rule before it.
    pub fn connector(&self) -> LogicalOp {
        self.connector
    }

    /// Splits a related lookup into its first hop and the remainder.
    pub(crate) fn split_lookup(&self) -> Option<(&str, &str)> {
        self.field.split_once(LOOKUP_SEPARATOR)
    }

    /// The same rule addressed at `field`, with an `AND` connector.
    pub(crate) fn retarget(&self, field: &str) -> Rule {
        Rule::new(field, self.op, self.value.clone())
    }
}

/// An ordered set of rules.
///
/// # Example
///
/// ```rust
/// use rowset_db::{Filter, FilterOp};
///
/// let filter = Filter::new()
///     .is("name", "Bo")
///     .gt("age", 18)
///     .or_is("name", "Cy");
///
/// assert_eq!(filter.rules().len(), 3);
/// assert_eq!(filter.rules()[1].op(), FilterOp::Gt);
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filter {
    rules: Vec<Rule>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule joined to the previous ones with `AND`.
    pub fn add_rule(mut self, field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        self.rules.push(Rule::new(field, op, value));
        self
    }

    /// Appends a rule joined to the previous one with `OR`.
    pub fn or_rule(mut self, field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        let mut rule = Rule::new(field, op, value);
        rule.connector = LogicalOp::Or;
        self.rules.push(rule);
        self
    }

    pub fn push(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_rule(field, FilterOp::Eq, FilterValue::Single(value.into()))
    }

    pub fn or_is(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.or_rule(field, FilterOp::Eq, FilterValue::Single(value.into()))
    }

    pub fn is_not(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_rule(field, FilterOp::Ne, FilterValue::Single(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_rule(field, FilterOp::Gt, FilterValue::Single(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_rule(field, FilterOp::Gte, FilterValue::Single(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_rule(field, FilterOp::Lt, FilterValue::Single(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_rule(field, FilterOp::Lte, FilterValue::Single(value.into()))
    }

    /// Substring match.
    pub fn contains(self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.add_rule(
            field,
            FilterOp::Contains,
            FilterValue::Single(Value::Text(needle.into())),
        )
    }

    /// Pattern match with caller-supplied `%`/`_` wildcards.
    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.add_rule(
            field,
            FilterOp::Like,
            FilterValue::Single(Value::Text(pattern.into())),
        )
    }

    pub fn ilike(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.add_rule(
            field,
            FilterOp::ILike,
            FilterValue::Single(Value::Text(pattern.into())),
        )
    }

    pub fn in_<T, I>(self, field: impl Into<String>, values: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.add_rule(field, FilterOp::In, FilterValue::Multiple(values))
    }

    pub fn not_in<T, I>(self, field: impl Into<String>, values: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.add_rule(field, FilterOp::NotIn, FilterValue::Multiple(values))
    }

    pub fn between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.add_rule(
            field,
            FilterOp::Between,
            FilterValue::Range(low.into(), high.into()),
        )
    }

    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.add_rule(field, FilterOp::IsNull, FilterValue::None)
    }

    pub fn is_not_null(self, field: impl Into<String>) -> Self {
        self.add_rule(field, FilterOp::IsNotNull, FilterValue::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_keep_insertion_order() {
        let filter = Filter::new()
            .is("name", "Ann")
            .in_("id", [1, 2, 3])
            .is_null("note");

        let fields: Vec<_> = filter.rules().iter().map(Rule::field).collect();
        assert_eq!(fields, vec!["name", "id", "note"]);
        assert_eq!(
            filter.rules()[1].value(),
            &FilterValue::Multiple(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3)
            ])
        );
    }

    #[test]
    fn test_connectors() {
        let filter = Filter::new().is("a", 1).or_is("b", 2).is("c", 3);
        let connectors: Vec<_> = filter.rules().iter().map(Rule::connector).collect();

        assert_eq!(
            connectors,
            vec![LogicalOp::And, LogicalOp::Or, LogicalOp::And]
        );
    }

    #[test]
    fn test_lookup_split() {
        let rule = Rule::new("author__name", FilterOp::Eq, FilterValue::None);
        assert_eq!(rule.split_lookup(), Some(("author", "name")));

        let nested = Rule::new("author__employer__name", FilterOp::Eq, FilterValue::None);
        assert_eq!(nested.split_lookup(), Some(("author", "employer__name")));

        let plain = Rule::new("name", FilterOp::Eq, FilterValue::None);
        assert_eq!(plain.split_lookup(), None);
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(FilterOp::Gte.to_string(), ">=");
        assert_eq!(FilterOp::ILike.to_string(), "ILIKE");
        assert_eq!(FilterOp::IsNotNull.to_string(), "IS NOT NULL");
    }

    #[test]
    fn test_unknown_fields_are_accepted() {
        let filter = Filter::new().is("does_not_exist", 1);
        assert!(!filter.is_empty());
    }
}
