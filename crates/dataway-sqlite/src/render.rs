//! Renders a `dataway_core::plan::QueryPlan` into `?`-placeholder SQLite
//! SQL, mirroring `dataway-pg`'s `pg_render`.

use dataway_core::plan::{CompareOp, DeletePlan, FilterExpr, InsertPlan, QueryPlan, SelectPlan, UpdatePlan};
use dataway_core::value::Value;
use rusqlite::types::{Value as LiteValue, ValueRef};

pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn render_plan(plan: &QueryPlan) -> RenderedQuery {
    match plan {
        QueryPlan::Select(select) => render_select(select),
        QueryPlan::Insert(insert) => render_insert(insert),
        QueryPlan::Update(update) => render_update(update),
        QueryPlan::Delete(delete) => render_delete(delete),
    }
}

fn render_select(plan: &SelectPlan) -> RenderedQuery {
    let mut params = Vec::new();
    let table = quote(&plan.table);
    let distinct = if plan.distinct { "DISTINCT " } else { "" };
    let columns = if plan.columns.is_empty() {
        "*".to_string()
    } else {
        plan.columns
            .iter()
            .map(|c| {
                let expr = if c.cast_text { format!("CAST({} AS TEXT)", c.expr) } else { c.expr.clone() };
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
        sql.push_str(&render_filter(filter, &mut params));
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
    RenderedQuery { sql, params }
}

fn render_filter(filter: &FilterExpr, params: &mut Vec<Value>) -> String {
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
                CompareOp::Ilike => "LIKE",
            };
            params.push(value.clone());
            format!("{} {operator} ?", quote(column))
        }
        FilterExpr::Between { column, low, high, inclusive } => {
            params.push(low.clone());
            params.push(high.clone());
            if *inclusive {
                format!("{} BETWEEN ? AND ?", quote(column))
            } else {
                format!("({} > ? AND {} < ?)", quote(column), quote(column))
            }
        }
        FilterExpr::In { column, values } => {
            let placeholders = values
                .iter()
                .map(|v| {
                    params.push(v.clone());
                    "?".to_string()
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} IN ({placeholders})", quote(column))
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
            format!("({})", parts.iter().map(|p| render_filter(p, params)).collect::<Vec<_>>().join(" AND "))
        }
        FilterExpr::Or(parts) => {
            format!("({})", parts.iter().map(|p| render_filter(p, params)).collect::<Vec<_>>().join(" OR "))
        }
    }
}

fn render_insert(plan: &InsertPlan) -> RenderedQuery {
    let table = quote(&plan.table);
    let columns: Vec<&String> = plan.values.keys().collect();
    let mut params = Vec::new();
    let placeholders: Vec<&str> = plan.values.values().map(|v| { params.push(v.clone()); "?" }).collect();
    let column_list = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let sql = format!("INSERT INTO {table} ({column_list}) VALUES ({}) RETURNING *", placeholders.join(", "));
    RenderedQuery { sql, params }
}

fn render_update(plan: &UpdatePlan) -> RenderedQuery {
    let table = quote(&plan.table);
    let mut params = Vec::new();
    let assignments: Vec<String> = plan
        .values
        .iter()
        .map(|(col, v)| {
            params.push(v.clone());
            format!("{} = ?", quote(col))
        })
        .collect();
    let mut sql = format!("UPDATE {table} SET {} WHERE ", assignments.join(", "));
    sql.push_str(&render_filter(&plan.filter, &mut params));
    sql.push_str(" RETURNING *");
    RenderedQuery { sql, params }
}

fn render_delete(plan: &DeletePlan) -> RenderedQuery {
    let table = quote(&plan.table);
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {table} WHERE ");
    sql.push_str(&render_filter(&plan.filter, &mut params));
    sql.push_str(" RETURNING *");
    RenderedQuery { sql, params }
}

pub fn value_to_lite(value: &Value) -> LiteValue {
    match value {
        Value::Null => LiteValue::Null,
        Value::Bool(b) => LiteValue::Integer(*b as i64),
        Value::Int(i) => LiteValue::Integer(*i),
        Value::Float(f) => LiteValue::Real(*f),
        Value::Text(s) => LiteValue::Text(s.clone()),
        Value::Bytes(b) => LiteValue::Blob(b.clone()),
        Value::Json(s) => LiteValue::Text(s.clone()),
        Value::Uuid(u) => LiteValue::Text(u.to_string()),
        Value::DateTime(dt) => LiteValue::Text(dt.to_rfc3339()),
    }
}

pub fn lite_to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}
