use std::{sync::Arc, time::Duration};

use nu_ansi_term::Color::{Cyan, Green, Yellow};
use rowset_config::config::Config;
use rowset_db::{
    ExecutionBridge, Filter, FilterOp, FilterValue, QuerySet, Record, SqliteStore,
    StatementBuilder, Value,
};
use tabled::{
    builder::Builder,
    settings::{themes::BorderCorrection, Panel, Style},
};
use tracing::{debug, info};

use crate::{
    error::{CliError, CliResult},
    utils::Colored,
};

/// Operators in the order they are tried at the first operator character.
const OPERATORS: [(&str, FilterOp); 7] = [
    ("!=", FilterOp::Ne),
    (">=", FilterOp::Gte),
    ("<=", FilterOp::Lte),
    ("=", FilterOp::Eq),
    (">", FilterOp::Gt),
    ("<", FilterOp::Lt),
    ("~", FilterOp::Contains),
];

#[derive(Debug, Default)]
pub struct QueryOptions {
    pub filters: Vec<String>,
    pub or_filters: Vec<String>,
    pub order: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
}

pub struct QueryContext {
    store: SqliteStore,
    config: Config,
}

impl QueryContext {
    pub fn new(config: Config) -> CliResult<Self> {
        let path = config.get_db_path()?;
        debug!("using database at {}", path.display());

        let store = SqliteStore::new(path)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms()))
            .case_sensitive_like(config.case_sensitive_like());
        Ok(Self { store, config })
    }

    fn records(&self, table: &str) -> CliResult<QuerySet<Record>> {
        let schema = self
            .store
            .introspect_with_id(table, self.config.id_column())?;
        let builder = StatementBuilder::new(self.config.max_filter_depth());

        Ok(
            QuerySet::with_schema(ExecutionBridge::new(self.store.clone()), Arc::new(schema))
                .with_builder(builder),
        )
    }

    fn filtered(
        &self,
        table: &str,
        filters: &[String],
        or_filters: &[String],
    ) -> CliResult<QuerySet<Record>> {
        let filter = build_filter(filters, or_filters)?;
        let mut records = self.records(table)?;
        if filter.is_empty() {
            records.all();
        } else {
            records.filter(&filter)?;
        }
        Ok(records)
    }

    pub fn select(&self, table: &str, options: &QueryOptions) -> CliResult<Vec<Record>> {
        let mut records = self.filtered(table, &options.filters, &options.or_filters)?;

        if !options.order.is_empty() {
            records.order_by(options.order.iter().map(String::as_str));
        }
        if options.distinct {
            records.distinct();
        }
        if let Some(limit) = options.limit {
            records.limit_offset(options.offset.unwrap_or(0), limit);
        }

        Ok(records.into_vec()?)
    }

    pub fn count(&self, table: &str, filters: &[String], or_filters: &[String]) -> CliResult<u64> {
        Ok(self.filtered(table, filters, or_filters)?.count()?)
    }

    pub fn get(&self, table: &str, id: &str) -> CliResult<Option<Record>> {
        Ok(self.records(table)?.get(parse_value(id))?)
    }
}

/// Parses a `FIELD<OP>VALUE` rule.
pub fn parse_rule(rule: &str) -> CliResult<(String, FilterOp, Value)> {
    let invalid = |reason| CliError::InvalidRule {
        rule: rule.to_string(),
        reason,
    };

    let idx = rule
        .find(['!', '>', '<', '=', '~'])
        .ok_or_else(|| invalid("missing operator"))?;
    let (field, rest) = rule.split_at(idx);
    let field = field.trim();
    if field.is_empty() {
        return Err(invalid("missing field"));
    }

    let (symbol, op) = OPERATORS
        .iter()
        .find(|(symbol, _)| rest.starts_with(symbol))
        .ok_or_else(|| invalid("unknown operator"))?;
    let raw = &rest[symbol.len()..];

    let value = if *op == FilterOp::Contains {
        Value::Text(raw.to_string())
    } else {
        parse_value(raw)
    };

    Ok((field.to_string(), *op, value))
}

/// Reads a command line value as an integer, then a real, else as text.
pub fn parse_value(raw: &str) -> Value {
    if let Ok(v) = raw.parse::<i64>() {
        Value::Integer(v)
    } else if let Ok(v) = raw.parse::<f64>() {
        Value::Real(v)
    } else {
        Value::Text(raw.to_string())
    }
}

pub fn build_filter(filters: &[String], or_filters: &[String]) -> CliResult<Filter> {
    let mut filter = Filter::new();
    for rule in filters {
        let (field, op, value) = parse_rule(rule)?;
        filter = filter.add_rule(field, op, FilterValue::Single(value));
    }
    for rule in or_filters {
        let (field, op, value) = parse_rule(rule)?;
        filter = filter.or_rule(field, op, FilterValue::Single(value));
    }
    Ok(filter)
}

pub fn print_records(table: &str, records: &[Record], json: bool) -> CliResult<()> {
    if json {
        for record in records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    let Some(first) = records.first() else {
        info!("{}", Colored(Yellow, "No rows found"));
        return Ok(());
    };

    let mut builder = Builder::new();
    builder.push_record(first.columns().map(String::from));
    for record in records {
        builder.push_record(record.values().map(ToString::to_string));
    }

    let rendered = builder
        .build()
        .with(Panel::header(table))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .to_string();

    info!("\n{rendered}");
    info!("{} rows", Colored(Green, records.len()));
    Ok(())
}

pub fn query_table(
    ctx: &QueryContext,
    table: &str,
    options: &QueryOptions,
    json: bool,
) -> CliResult<()> {
    debug!(table, ?options, "querying table");
    let records = ctx.select(table, options)?;
    print_records(table, &records, json)
}

pub fn count_table(
    ctx: &QueryContext,
    table: &str,
    filters: &[String],
    or_filters: &[String],
    json: bool,
) -> CliResult<()> {
    let count = ctx.count(table, filters, or_filters)?;
    if json {
        println!("{}", serde_json::json!({ "table": table, "count": count }));
    } else {
        info!("{}: {}", table, Colored(Cyan, count));
    }
    Ok(())
}

pub fn get_row(ctx: &QueryContext, table: &str, id: &str, json: bool) -> CliResult<()> {
    match ctx.get(table, id)? {
        Some(record) => print_records(table, &[record], json),
        None if json => {
            println!("null");
            Ok(())
        }
        None => {
            info!("{}", Colored(Yellow, format!("No row in {table} with id {id}")));
            Ok(())
        }
    }
}
