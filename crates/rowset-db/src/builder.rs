//! Compiles filter rules into select statements.
//!
//! Each rule resolves its field against the target [`Schema`] and becomes
//! one WHERE condition of a select over the schema's table. A field that is
//! not a column of the schema and has the form `relation__rest` follows the
//! relation into its target table and compiles to
//! `relation_column IN (SELECT id FROM target WHERE ...)`, one level deeper.

use tracing::trace;

use crate::{
    error::{DbError, Result},
    filter::{FilterOp, FilterValue, LogicalOp, Rule},
    row::Value,
    schema::Schema,
    statement::{Comparison, Condition, Select},
};

/// Default bound on related-field hops.
pub const DEFAULT_MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementBuilder {
    max_depth: usize,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl StatementBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Builds a select over `schema`'s table constrained by `rules`.
    ///
    /// `depth` is the number of relation hops already taken; callers start
    /// at 0.
    pub fn build(&self, schema: &Schema, rules: &[Rule], depth: usize) -> Result<Select> {
        if depth > self.max_depth {
            return Err(DbError::FilterTooDeep {
                depth,
                max: self.max_depth,
            });
        }

        let mut groups: Vec<Vec<Condition>> = vec![Vec::new()];
        for (idx, rule) in rules.iter().enumerate() {
            if idx > 0 && rule.connector() == LogicalOp::Or {
                groups.push(Vec::new());
            }
            let condition = self.condition(schema, rule, depth)?;
            if let Some(group) = groups.last_mut() {
                group.push(condition);
            }
        }

        let mut select = schema.select_all();
        if groups.len() == 1 {
            for condition in groups.into_iter().flatten() {
                select.and_where(condition);
            }
        } else {
            select.and_where(Condition::Any(
                groups.into_iter().map(Condition::All).collect(),
            ));
        }

        trace!(
            table = schema.table(),
            rules = rules.len(),
            depth,
            "compiled filter"
        );
        Ok(select)
    }

    fn condition(&self, schema: &Schema, rule: &Rule, depth: usize) -> Result<Condition> {
        if let Some(column) = schema.column(rule.field()) {
            return compile_rule(rule, column.to_string());
        }

        if let Some((head, rest)) = rule.split_lookup() {
            let relation = schema
                .relation_for(head)
                .ok_or_else(|| schema_field_error(schema, rule.field()))?;
            let target = (relation.target)();

            let mut related = self.build(&target, &[rule.retarget(rest)], depth + 1)?;
            related.columns([target.id_column()]);

            return Ok(Condition::InSelect {
                column: relation.column.clone(),
                select: Box::new(related),
            });
        }

        Err(schema_field_error(schema, rule.field()))
    }
}

fn schema_field_error(schema: &Schema, field: &str) -> DbError {
    DbError::SchemaField {
        table: schema.table().to_string(),
        field: field.to_string(),
    }
}

fn invalid(rule: &Rule, reason: &str) -> DbError {
    DbError::InvalidRule {
        field: rule.field().to_string(),
        reason: format!("{} {}", rule.op(), reason),
    }
}

fn compile_rule(rule: &Rule, column: String) -> Result<Condition> {
    let comparison = match rule.op() {
        FilterOp::Eq => Some(Comparison::Eq),
        FilterOp::Ne => Some(Comparison::Ne),
        FilterOp::Gt => Some(Comparison::Gt),
        FilterOp::Gte => Some(Comparison::Gte),
        FilterOp::Lt => Some(Comparison::Lt),
        FilterOp::Lte => Some(Comparison::Lte),
        _ => None,
    };

    match (rule.op(), rule.value()) {
        (FilterOp::Eq | FilterOp::Ne, FilterValue::Single(Value::Null)) => Ok(Condition::Null {
            column,
            is_null: rule.op() == FilterOp::Eq,
        }),
        (_, FilterValue::Single(value)) if comparison.is_some() => Ok(Condition::Compare {
            column,
            op: comparison.unwrap_or(Comparison::Eq),
            value: value.clone(),
        }),
        (FilterOp::Like | FilterOp::ILike | FilterOp::Contains, FilterValue::Single(value)) => {
            let Value::Text(text) = value else {
                return Err(invalid(rule, "expects a text value"));
            };
            let pattern = if rule.op() == FilterOp::Contains {
                format!("%{text}%")
            } else {
                text.clone()
            };
            Ok(Condition::Like {
                column,
                pattern,
                case_insensitive: rule.op() == FilterOp::ILike,
            })
        }
        (FilterOp::In | FilterOp::NotIn, FilterValue::Multiple(values)) => Ok(Condition::In {
            column,
            values: values.clone(),
            negated: rule.op() == FilterOp::NotIn,
        }),
        (FilterOp::Between, FilterValue::Range(low, high)) => Ok(Condition::Between {
            column,
            low: low.clone(),
            high: high.clone(),
        }),
        (FilterOp::IsNull | FilterOp::IsNotNull, FilterValue::None) => Ok(Condition::Null {
            column,
            is_null: rule.op() == FilterOp::IsNull,
        }),
        (FilterOp::In | FilterOp::NotIn, _) => Err(invalid(rule, "expects a list of values")),
        (FilterOp::Between, _) => Err(invalid(rule, "expects a range")),
        (FilterOp::IsNull | FilterOp::IsNotNull, _) => Err(invalid(rule, "takes no value")),
        _ => Err(invalid(rule, "expects a single value")),
    }
}
