//! Nested write processor (§4.8): decomposes a payload carrying embedded
//! relations into a parent-first ordered sequence of writes, propagating the
//! parent's generated primary key into each child's foreign-key field.
//! Grounded on the teacher's `eager`/`changeset` modules for the
//! map-to-struct and validation shape, and on `transaction.rs`/
//! `examples/savepoint/main.rs` for the per-depth savepoint supplement
//! (SPEC_FULL § Supplemented Features).

use crate::error::{EngineError, EngineResult};
use crate::model::{ModelCatalog, ModelDescriptor, RelationKind};
use crate::value::Value;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

/// One write step in the plan-order the processor assembles: parent rows
/// before the children whose foreign keys they feed.
#[derive(Debug, Clone)]
pub struct WriteStep {
    pub kind: WriteKind,
    pub table: String,
    pub schema: String,
    pub values: BTreeMap<String, Value>,
    /// Populated once the parent insert actually executes.
    pub generated_pk_field: Option<String>,
    pub depth: u8,
    pub join_table: Option<JoinWrite>,
}

#[derive(Debug, Clone)]
pub struct JoinWrite {
    pub table: String,
    pub left_column: String,
    pub right_column: String,
}

/// Input to the decomposition: the parent data map and the already-known
/// parent-ID values (propagated recursively as relations are expanded).
pub struct NestedWriteProcessor<'a> {
    catalog: &'a ModelCatalog,
}

impl<'a> NestedWriteProcessor<'a> {
    pub fn new(catalog: &'a ModelCatalog) -> Self {
        Self { catalog }
    }

    /// Normalizes a write body to a slice (§4.7 Write path: "single objects
    /// become a one-element slice").
    pub fn normalize_body(body: Json) -> Vec<Json> {
        match body {
            Json::Array(items) => items,
            other => vec![other],
        }
    }

    /// Decomposes one element's map into (scalar steps, relation steps),
    /// parent-first, depth-first.
    pub fn decompose(
        &self,
        kind: WriteKind,
        model: &ModelDescriptor,
        schema: &str,
        table: &str,
        data: &Map<String, Json>,
        parent_ids: &BTreeMap<String, Value>,
        depth: u8,
    ) -> EngineResult<Vec<WriteStep>> {
        let mut scalars: BTreeMap<String, Value> = BTreeMap::new();
        let mut relation_payloads: Vec<(&str, &Json)> = Vec::new();

        for (key, value) in data {
            if model.relation_of(key).is_some() {
                relation_payloads.push((key.as_str(), value));
            } else if model.column_by_ref(key).is_some() {
                scalars.insert(key.clone(), Value::from_json(value));
            }
        }
        for (field, value) in parent_ids {
            scalars.insert(field.clone(), value.clone());
        }

        let mut steps = vec![WriteStep {
            kind,
            table: table.to_string(),
            schema: schema.to_string(),
            values: scalars,
            generated_pk_field: Some(model.primary_key_name().to_string()),
            depth,
            join_table: None,
        }];

        for (field, payload) in relation_payloads {
            let relation = model.relation_of(field).expect("checked above");
            let related = self
                .catalog
                .lookup_by_name(&relation.related_model)
                .ok_or_else(|| EngineError::InvalidModelType(format!("unknown related model '{}'", relation.related_model)))?;
            let (related_schema, related_table) = related.resolve_table_name(schema, &related.entity);

            let child_objects = Self::relation_value_shapes(payload)?;
            for child in child_objects {
                let mut child_parent_ids = BTreeMap::new();
                if relation.kind != RelationKind::Many2Many {
                    // Placeholder value bound after the parent insert executes;
                    // the executor back-fills this with the generated PK.
                    child_parent_ids.insert(relation.foreign_key.clone(), Value::Null);
                }
                let mut child_steps = self.decompose(
                    WriteKind::Create,
                    related,
                    &related_schema,
                    &related_table,
                    &child,
                    &child_parent_ids,
                    depth + 1,
                )?;
                if relation.kind == RelationKind::Many2Many {
                    if let (Some(join_table), Some(first)) = (&relation.join_table, child_steps.first_mut()) {
                        first.join_table = Some(JoinWrite {
                            table: join_table.clone(),
                            left_column: format!("{}_id", model.entity.trim_end_matches('s')),
                            right_column: format!("{}_id", related.entity.trim_end_matches('s')),
                        });
                    }
                }
                steps.extend(child_steps.drain(..));
            }
        }

        Ok(steps)
    }

    /// Supports the three documented value shapes: single object, list of
    /// objects, list of typed maps (§4.8).
    fn relation_value_shapes(value: &Json) -> EngineResult<Vec<Map<String, Json>>> {
        match value {
            Json::Object(map) => Ok(vec![map.clone()]),
            Json::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object()
                        .cloned()
                        .ok_or_else(|| EngineError::InvalidRequest("nested relation list must contain objects".into()))
                })
                .collect(),
            Json::Null => Ok(vec![]),
            _ => Err(EngineError::InvalidRequest("nested relation value must be an object or list of objects".into())),
        }
    }

    /// "Returned records are merged with the caller's original map (DB
    /// values overwrite request values, but request-only keys survive)"
    /// (§4.7 Write path).
    pub fn merge_db_result(original: &Map<String, Json>, db_result: &Map<String, Json>) -> Map<String, Json> {
        let mut merged = original.clone();
        for (key, value) in db_result {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDescriptor, ColumnType, ModelDescriptor, RelationDescriptor};

    fn catalog() -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog.register(ModelDescriptor {
            entity: "orders".into(),
            schema: None,
            table: "orders".into(),
            columns: vec![
                ColumnDescriptor { json_name: "id".into(), column_name: "id".into(), is_primary_key: true, nullable: false, ty: ColumnType::Numeric },
                ColumnDescriptor { json_name: "total".into(), column_name: "total".into(), is_primary_key: false, nullable: false, ty: ColumnType::Numeric },
            ],
            relations: vec![RelationDescriptor {
                name: "items".into(),
                kind: RelationKind::HasMany,
                foreign_key: "order_id".into(),
                references: "id".into(),
                join_table: None,
                related_model: "order_items".into(),
            }],
            row_number_field: None,
        });
        catalog.register(ModelDescriptor {
            entity: "order_items".into(),
            schema: None,
            table: "order_items".into(),
            columns: vec![
                ColumnDescriptor { json_name: "id".into(), column_name: "id".into(), is_primary_key: true, nullable: false, ty: ColumnType::Numeric },
                ColumnDescriptor { json_name: "sku".into(), column_name: "sku".into(), is_primary_key: false, nullable: false, ty: ColumnType::Text },
            ],
            relations: vec![],
            row_number_field: None,
        });
        catalog
    }

    #[test]
    fn decomposes_parent_before_children() {
        let catalog = catalog();
        let model = catalog.lookup_by_name("orders").unwrap();
        let processor = NestedWriteProcessor::new(&catalog);
        let data: Map<String, Json> = serde_json::from_value(serde_json::json!({
            "total": 10,
            "items": [{"sku": "abc"}, {"sku": "def"}]
        }))
        .unwrap();
        let steps = processor
            .decompose(WriteKind::Create, model, "public", "orders", &data, &BTreeMap::new(), 0)
            .unwrap();
        assert_eq!(steps[0].table, "orders");
        assert_eq!(steps.len(), 3);
        assert!(steps[1..].iter().all(|s| s.table == "order_items"));
    }

    #[test]
    fn merge_keeps_request_only_keys_and_overwrites_with_db_values() {
        let original: Map<String, Json> = serde_json::from_value(serde_json::json!({"name": "a", "extra": "keep"})).unwrap();
        let db_result: Map<String, Json> = serde_json::from_value(serde_json::json!({"name": "a-normalized", "id": 1})).unwrap();
        let merged = NestedWriteProcessor::merge_db_result(&original, &db_result);
        assert_eq!(merged["name"], "a-normalized");
        assert_eq!(merged["extra"], "keep");
        assert_eq!(merged["id"], 1);
    }
}
