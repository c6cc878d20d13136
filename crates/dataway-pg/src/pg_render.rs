//! Renders a dialect-neutral `dataway_core::plan::QueryPlan` into
//! parameterized Postgres SQL. Grounded on `qb::select`/`qb::param`'s
//! `$n`-placeholder builder pattern, generalized to walk the compiler's IR
//! instead of a compile-time fluent chain.

use crate::ident::Ident;
use dataway_core::plan::{CompareOp, FilterExpr, QueryPlan, SelectPlan};
use dataway_core::value::Value;
use tokio_postgres::types::{ToSql, Type};

pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

struct ParamSink {
    params: Vec<Value>,
}

impl ParamSink {
    fn push(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

pub fn render_plan(plan: &QueryPlan) -> RenderedQuery {
    match plan {
        QueryPlan::Select(select) => render_select(select),
        QueryPlan::Insert(insert) => render_insert(insert),
        QueryPlan::Update(update) => render_update(update),
        QueryPlan::Delete(delete) => render_delete(delete),
    }
}

fn quote(table: &str) -> String {
    Ident::parse(table).map(|i| i.to_sql()).unwrap_or_else(|_| format!("\"{table}\""))
}

fn render_select(plan: &SelectPlan) -> RenderedQuery {
    let mut sink = ParamSink { params: Vec::new() };
    let table = format!("{}.{}", quote(&plan.schema), quote(&plan.table));

    let distinct = if plan.distinct { "DISTINCT " } else { "" };
    let columns = if plan.columns.is_empty() {
        "*".to_string()
    } else {
        plan.columns
            .iter()
            .map(|c| {
                let expr = if c.cast_text { format!("({})::text", c.expr) } else { c.expr.clone() };
                match &c.alias {
                    Some(alias) => format!("({expr}) AS {}", quote(alias)),
                    None => expr,
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {distinct}{columns} FROM {table}");

    if let Some(filter) = &plan.filter {
        sql.push_str(" WHERE ");
        sql.push_str(&render_filter(filter, &mut sink));
    }

    if !plan.sort.is_empty() {
        let order = plan
            .sort
            .iter()
            .map(|s| {
                let dir = match s.direction {
                    dataway_core::options::SortDir::Asc => "ASC",
                    dataway_core::options::SortDir::Desc => "DESC",
                };
                if s.raw {
                    format!("{} {dir}", s.column)
                } else {
                    format!("{} {dir}", quote(&s.column))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ORDER BY {order}"));
    }

    if let Some(limit) = plan.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = plan.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    RenderedQuery { sql, params: sink.params }
}

fn render_filter(filter: &FilterExpr, sink: &mut ParamSink) -> String {
    match filter {
        FilterExpr::Compare { column, op, value } => {
            let operator = match op {
                CompareOp::Eq => "=",
                CompareOp::Neq => "<>",
                CompareOp::Gt => ">",
                CompareOp::Gte => ">=",
                CompareOp::Lt => "<",
                CompareOp::Lte => "<=",
                CompareOp::Like => "LIKE",
                CompareOp::Ilike => "ILIKE",
            };
            let placeholder = sink.push(value.clone());
            format!("{} {operator} {placeholder}", quote(column))
        }
        FilterExpr::Between { column, low, high, inclusive } => {
            let lo = sink.push(low.clone());
            let hi = sink.push(high.clone());
            if *inclusive {
                format!("{} BETWEEN {lo} AND {hi}", quote(column))
            } else {
                format!("({} > {lo} AND {} < {hi})", quote(column), quote(column))
            }
        }
        FilterExpr::In { column, values } => {
            let placeholders: Vec<String> = values.iter().cloned().map(|v| sink.push(v)).collect();
            format!("{} IN ({})", quote(column), placeholders.join(", "))
        }
        FilterExpr::IsNull { column, negated } => {
            if *negated {
                format!("{} IS NOT NULL", quote(column))
            } else {
                format!("{} IS NULL", quote(column))
            }
        }
        FilterExpr::Raw(fragment) => format!("({fragment})"),
        FilterExpr::And(parts) => {
            let joined = parts.iter().map(|p| render_filter(p, sink)).collect::<Vec<_>>().join(" AND ");
            format!("({joined})")
        }
        FilterExpr::Or(parts) => {
            let joined = parts.iter().map(|p| render_filter(p, sink)).collect::<Vec<_>>().join(" OR ");
            format!("({joined})")
        }
    }
}

fn render_insert(plan: &dataway_core::plan::InsertPlan) -> RenderedQuery {
    let mut sink = ParamSink { params: Vec::new() };
    let table = format!("{}.{}", quote(&plan.schema), quote(&plan.table));
    let columns: Vec<&String> = plan.values.keys().collect();
    let placeholders: Vec<String> = plan.values.values().cloned().map(|v| sink.push(v)).collect();
    let column_list = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "INSERT INTO {table} ({column_list}) VALUES ({}) RETURNING *",
        placeholders.join(", ")
    );
    RenderedQuery { sql, params: sink.params }
}

fn render_update(plan: &dataway_core::plan::UpdatePlan) -> RenderedQuery {
    let mut sink = ParamSink { params: Vec::new() };
    let table = format!("{}.{}", quote(&plan.schema), quote(&plan.table));
    let assignments: Vec<String> = plan
        .values
        .iter()
        .map(|(col, v)| format!("{} = {}", quote(col), sink.push(v.clone())))
        .collect();
    let mut sql = format!("UPDATE {table} SET {} WHERE ", assignments.join(", "));
    sql.push_str(&render_filter(&plan.filter, &mut sink));
    sql.push_str(" RETURNING *");
    RenderedQuery { sql, params: sink.params }
}

fn render_delete(plan: &dataway_core::plan::DeletePlan) -> RenderedQuery {
    let mut sink = ParamSink { params: Vec::new() };
    let table = format!("{}.{}", quote(&plan.schema), quote(&plan.table));
    let mut sql = format!("DELETE FROM {table} WHERE ");
    sql.push_str(&render_filter(&plan.filter, &mut sink));
    sql.push_str(" RETURNING *");
    RenderedQuery { sql, params: sink.params }
}

/// Converts a dialect-neutral `Value` into a boxed `ToSql` for binding.
pub fn value_to_sql(value: &Value) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Null => Box::new(Option::<i64>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int(i) => Box::new(*i),
        Value::Float(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Json(s) => Box::new(
            serde_json::from_str::<serde_json::Value>(s).unwrap_or(serde_json::Value::Null),
        ),
        Value::Uuid(u) => Box::new(*u),
        Value::DateTime(dt) => Box::new(*dt),
    }
}

/// Used only by the statement cache's cache key derivation; Postgres infers
/// parameter types from context so an explicit `Type` list is rarely
/// required, but `pg_client::statement_cache` keys on it.
pub fn value_pg_type(value: &Value) -> Type {
    match value {
        Value::Null => Type::UNKNOWN,
        Value::Bool(_) => Type::BOOL,
        Value::Int(_) => Type::INT8,
        Value::Float(_) => Type::FLOAT8,
        Value::Text(_) => Type::TEXT,
        Value::Bytes(_) => Type::BYTEA,
        Value::Json(_) => Type::JSONB,
        Value::Uuid(_) => Type::UUID,
        Value::DateTime(_) => Type::TIMESTAMPTZ,
    }
}
