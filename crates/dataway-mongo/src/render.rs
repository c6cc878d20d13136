//! Translates a `dataway_core::plan::QueryPlan` into Mongo filter/update
//! documents. The document dialect has no SQL to render, so this plays the
//! role `pg_render`/`render.rs` play for the relational providers:
//! dialect-specific translation of the same compiled IR.

use bson::{doc, Bson, Document};
use dataway_core::plan::{CompareOp, FilterExpr, QueryPlan, SelectPlan};
use dataway_core::value::Value;

pub fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::Text(s) => Bson::String(s.clone()),
        Value::Bytes(b) => Bson::Binary(bson::Binary { subtype: bson::spec::BinarySubtype::Generic, bytes: b.clone() }),
        Value::Json(s) => serde_json::from_str::<serde_json::Value>(s)
            .ok()
            .and_then(|v| bson::to_bson(&v).ok())
            .unwrap_or(Bson::Null),
        Value::Uuid(u) => Bson::String(u.to_string()),
        Value::DateTime(dt) => Bson::DateTime(bson::DateTime::from_chrono(*dt)),
    }
}

pub fn bson_to_value(value: &Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Int(*i as i64),
        Bson::Int64(i) => Value::Int(*i),
        Bson::Double(f) => Value::Float(*f),
        Bson::String(s) => Value::Text(s.clone()),
        Bson::Binary(b) => Value::Bytes(b.bytes.clone()),
        Bson::DateTime(dt) => Value::DateTime(dt.to_chrono()),
        Bson::ObjectId(oid) => Value::Text(oid.to_hex()),
        other => Value::Json(serde_json::to_string(other).unwrap_or_default()),
    }
}

pub fn render_filter(filter: &FilterExpr) -> Document {
    match filter {
        FilterExpr::Compare { column, op, value } => {
            let bson_value = value_to_bson(value);
            let expr = match op {
                CompareOp::Eq => bson_value,
                CompareOp::Neq => Bson::Document(doc! { "$ne": bson_value }),
                CompareOp::Gt => Bson::Document(doc! { "$gt": bson_value }),
                CompareOp::Gte => Bson::Document(doc! { "$gte": bson_value }),
                CompareOp::Lt => Bson::Document(doc! { "$lt": bson_value }),
                CompareOp::Lte => Bson::Document(doc! { "$lte": bson_value }),
                CompareOp::Like | CompareOp::Ilike => {
                    let pattern = value.as_display_string().replace('%', ".*").replace('_', ".");
                    let options = if matches!(op, CompareOp::Ilike) { "i" } else { "" };
                    Bson::Document(doc! { "$regex": pattern, "$options": options })
                }
            };
            doc! { column.clone(): expr }
        }
        FilterExpr::Between { column, low, high, inclusive } => {
            let (gte, lte) = if *inclusive { ("$gte", "$lte") } else { ("$gt", "$lt") };
            doc! { column.clone(): { gte: value_to_bson(low), lte: value_to_bson(high) } }
        }
        FilterExpr::In { column, values } => {
            doc! { column.clone(): { "$in": values.iter().map(value_to_bson).collect::<Vec<_>>() } }
        }
        FilterExpr::IsNull { column, negated } => {
            if *negated {
                doc! { column.clone(): { "$ne": Bson::Null } }
            } else {
                doc! { column.clone(): Bson::Null }
            }
        }
        FilterExpr::Raw(fragment) => {
            serde_json::from_str::<Document>(fragment).unwrap_or_else(|_| doc! {})
        }
        FilterExpr::And(parts) => doc! { "$and": parts.iter().map(render_filter).collect::<Vec<_>>() },
        FilterExpr::Or(parts) => doc! { "$or": parts.iter().map(render_filter).collect::<Vec<_>>() },
    }
}

pub fn render_select_filter(plan: &SelectPlan) -> Document {
    plan.filter.as_ref().map(render_filter).unwrap_or_default()
}

pub fn render_sort(plan: &SelectPlan) -> Document {
    let mut doc = Document::new();
    for term in &plan.sort {
        let dir = match term.direction {
            dataway_core::options::SortDir::Asc => 1,
            dataway_core::options::SortDir::Desc => -1,
        };
        doc.insert(term.column.clone(), dir);
    }
    doc
}

pub fn render_projection(plan: &SelectPlan) -> Option<Document> {
    if plan.columns.is_empty() {
        return None;
    }
    let mut doc = Document::new();
    for column in &plan.columns {
        let name = column.alias.clone().unwrap_or_else(|| column.expr.clone());
        doc.insert(name, 1);
    }
    Some(doc)
}

/// Unreachable for `Insert`/`Update`/`Delete` plans rendered via their own
/// paths in `provider.rs`; kept so callers can assert on the dispatch the
/// way `pg_render::render_plan` does.
pub fn requires_select(plan: &QueryPlan) -> bool {
    matches!(plan, QueryPlan::Select(_))
}
