//! Renders statements as SQLite SQL.
//!
//! Values are never inlined: every literal becomes a `?` placeholder and is
//! appended to the parameter list in textual order. Identifiers are double
//! quoted. In a select over a join, unqualified column references are
//! qualified with the join's left alias.

use crate::{
    error::{DbError, Result},
    row::Value,
    statement::{Condition, Projection, Select, SortDirection, Source, COUNT_COLUMN},
};

/// Renders `select` into SQL text and its bound parameters.
pub fn render(select: &Select) -> Result<(String, Vec<Value>)> {
    let mut params = Vec::new();
    let sql = render_select(select, &mut params)?;
    Ok((sql, params))
}

fn render_select(select: &Select, params: &mut Vec<Value>) -> Result<String> {
    let source = select
        .source()
        .ok_or_else(|| DbError::InvalidStatement("select has no source".into()))?;

    let qualifier = match source {
        Source::Join(join) => Some(join.left().1.to_string()),
        _ => None,
    };
    let qualifier = qualifier.as_deref();

    let mut sql = String::from("SELECT ");

    if select.is_count() {
        sql.push_str(&format!("COUNT(*) AS {}", quote(COUNT_COLUMN)));
    } else {
        if select.is_distinct() {
            sql.push_str("DISTINCT ");
        }
        match select.projection() {
            Projection::All => match qualifier {
                Some(alias) => sql.push_str(&format!("{}.*", quote(alias))),
                None => sql.push('*'),
            },
            Projection::Columns(columns) => {
                let columns = columns
                    .iter()
                    .map(|c| column(c, qualifier))
                    .collect::<Vec<_>>();
                sql.push_str(&columns.join(", "));
            }
        }
    }

    sql.push_str(" FROM ");
    sql.push_str(&render_source(source, params)?);

    if !select.conditions().is_empty() {
        let conditions = select
            .conditions()
            .iter()
            .map(|c| render_condition(c, qualifier, params))
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if select.is_count() {
        return Ok(sql);
    }

    if !select.ordering().is_empty() {
        let orders = select
            .ordering()
            .iter()
            .map(|o| {
                format!(
                    "{} {}",
                    column(&o.column, qualifier),
                    match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    }
                )
            })
            .collect::<Vec<_>>();
        sql.push_str(" ORDER BY ");
        sql.push_str(&orders.join(", "));
    }

    if let Some(limit) = select.get_limit() {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit.count, limit.offset));
    }

    Ok(sql)
}

fn render_source(source: &Source, params: &mut Vec<Value>) -> Result<String> {
    match source {
        Source::Table(table) => Ok(quote(table)),
        Source::Select(inner) => Ok(format!("({})", render_select(inner, params)?)),
        Source::Join(join) => {
            let (left, left_alias) = join.left();
            let (right, right_alias) = join.right();
            let (left_key, right_key) = join.keys();
            if left_key.is_empty() || right_key.is_empty() {
                return Err(DbError::InvalidStatement("join has no key columns".into()));
            }

            let left_sql = render_select(left, params)?;
            let right_sql = render_select(right, params)?;
            Ok(format!(
                "({left_sql}) AS {la} JOIN ({right_sql}) AS {ra} ON {la}.{lk} = {ra}.{rk}",
                la = quote(left_alias),
                ra = quote(right_alias),
                lk = quote(left_key),
                rk = quote(right_key),
            ))
        }
    }
}

fn render_condition(
    condition: &Condition,
    qualifier: Option<&str>,
    params: &mut Vec<Value>,
) -> Result<String> {
    let sql = match condition {
        Condition::Compare { column: c, op, value } => {
            params.push(value.clone());
            format!("{} {} ?", column(c, qualifier), op.as_sql())
        }
        Condition::Like {
            column: c,
            pattern,
            case_insensitive,
        } => {
            params.push(Value::Text(pattern.clone()));
            if *case_insensitive {
                format!("LOWER({}) LIKE LOWER(?)", column(c, qualifier))
            } else {
                format!("{} LIKE ?", column(c, qualifier))
            }
        }
        Condition::In {
            column: c,
            values,
            negated,
        } => {
            let placeholders = vec!["?"; values.len()].join(", ");
            params.extend(values.iter().cloned());
            let op = if *negated { "NOT IN" } else { "IN" };
            format!("{} {} ({})", column(c, qualifier), op, placeholders)
        }
        Condition::InSelect { column: c, select } => {
            let target = column(c, qualifier);
            format!("{} IN ({})", target, render_select(select, params)?)
        }
        Condition::Between {
            column: c,
            low,
            high,
        } => {
            params.push(low.clone());
            params.push(high.clone());
            format!("{} BETWEEN ? AND ?", column(c, qualifier))
        }
        Condition::Null { column: c, is_null } => {
            let op = if *is_null { "IS NULL" } else { "IS NOT NULL" };
            format!("{} {}", column(c, qualifier), op)
        }
        Condition::All(conditions) => join_conditions(conditions, "AND", "1", qualifier, params)?,
        Condition::Any(conditions) => join_conditions(conditions, "OR", "0", qualifier, params)?,
    };
    Ok(sql)
}

fn join_conditions(
    conditions: &[Condition],
    op: &str,
    empty: &str,
    qualifier: Option<&str>,
    params: &mut Vec<Value>,
) -> Result<String> {
    if conditions.is_empty() {
        return Ok(empty.to_string());
    }
    let parts = conditions
        .iter()
        .map(|c| render_condition(c, qualifier, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", parts.join(&format!(" {op} "))))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn column(name: &str, qualifier: Option<&str>) -> String {
    match (name.split_once('.'), qualifier) {
        _ if name == "*" => match qualifier {
            Some(alias) => format!("{}.*", quote(alias)),
            None => name.to_string(),
        },
        (Some((table, column)), _) => format!("{}.{}", quote(table), quote(column)),
        (None, Some(alias)) => format!("{}.{}", quote(alias), quote(name)),
        (None, None) => quote(name),
    }
}
