//! Renders a `dataway_core::plan::QueryPlan` into `?`-placeholder MySQL SQL.
//! Mirrors `dataway-pg`'s `pg_render`, swapping `$n` placeholders for MySQL's
//! positional `?` and backtick identifier quoting for double-quoted ones.

use dataway_core::plan::{CompareOp, DeletePlan, FilterExpr, InsertPlan, QueryPlan, SelectPlan, UpdatePlan};
use dataway_core::value::Value;
use mysql_async::{Params, Value as MyValue};

pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

fn quote(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
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
                let expr = if c.cast_text { format!("CAST({} AS CHAR)", c.expr) } else { c.expr.clone() };
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
            let placeholders = values.iter().map(|v| {
                params.push(v.clone());
                "?".to_string()
            }).collect::<Vec<_>>().join(", ");
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
    let sql = format!("INSERT INTO {table} ({column_list}) VALUES ({})", placeholders.join(", "));
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
    RenderedQuery { sql, params }
}

fn render_delete(plan: &DeletePlan) -> RenderedQuery {
    let table = quote(&plan.table);
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {table} WHERE ");
    sql.push_str(&render_filter(&plan.filter, &mut params));
    RenderedQuery { sql, params }
}

pub fn value_to_my(value: &Value) -> MyValue {
    match value {
        Value::Null => MyValue::NULL,
        Value::Bool(b) => MyValue::Int(*b as i64),
        Value::Int(i) => MyValue::Int(*i),
        Value::Float(f) => MyValue::Double(*f),
        Value::Text(s) => MyValue::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => MyValue::Bytes(b.clone()),
        Value::Json(s) => MyValue::Bytes(s.clone().into_bytes()),
        Value::Uuid(u) => MyValue::Bytes(u.to_string().into_bytes()),
        Value::DateTime(dt) => MyValue::Bytes(dt.to_rfc3339().into_bytes()),
    }
}

pub fn params_to_my(params: &[Value]) -> Params {
    Params::Positional(params.iter().map(value_to_my).collect())
}

pub fn my_to_value(value: &MyValue, ty_hint: Option<&str>) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::Int(*i),
        MyValue::UInt(u) => Value::Int(*u as i64),
        MyValue::Float(f) => Value::Float(*f as f64),
        MyValue::Double(f) => Value::Float(*f),
        MyValue::Bytes(b) => {
            let text = String::from_utf8_lossy(b).to_string();
            match ty_hint {
                Some("json") => Value::Json(text),
                Some("uuid") => uuid::Uuid::parse_str(&text).map(Value::Uuid).unwrap_or(Value::Text(text)),
                _ => Value::Text(text),
            }
        }
        MyValue::Date(year, month, day, hour, minute, second, micro) => {
            let naive = chrono::NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                .and_then(|d| d.and_hms_micro_opt(*hour as u32, *minute as u32, *second as u32, *micro))
                .unwrap_or_default();
            Value::DateTime(chrono::DateTime::from_naive_utc_and_offset(naive, chrono::Utc))
        }
        MyValue::Time(..) => Value::Text(format!("{value:?}")),
    }
}
