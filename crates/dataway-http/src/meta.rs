//! Schema-introspection document (§6): `{schema, table, columns: [...],
//! relations: [...]}`, built from a registered `ModelDescriptor`. Served
//! both from the dedicated meta route and from `POST` when the body carries
//! the meta-operation marker.

use dataway_core::model::{ColumnType, ModelDescriptor};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: &'static str,
    pub nullable: bool,
    pub primary: bool,
    /// `ModelDescriptor` doesn't reflect unique/index constraints today;
    /// reported conservatively until the derive macro grows that metadata.
    pub unique: bool,
    pub indexed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnMetadata>,
    pub relations: Vec<String>,
}

pub fn build_table_metadata(model: &ModelDescriptor, schema: &str, table: &str) -> TableMetadata {
    let columns = model
        .columns
        .iter()
        .map(|c| ColumnMetadata {
            name: c.column_name.clone(),
            ty: column_type_name(c.ty),
            nullable: c.nullable,
            primary: c.is_primary_key,
            unique: c.is_primary_key,
            indexed: c.is_primary_key,
        })
        .collect();
    let relations = model.relations.iter().map(|r| r.name.clone()).collect();
    TableMetadata { schema: schema.to_string(), table: table.to_string(), columns, relations }
}

fn column_type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text => "text",
        ColumnType::Numeric => "numeric",
        ColumnType::Bool => "bool",
        ColumnType::DateTime => "datetime",
        ColumnType::Json => "json",
        ColumnType::Uuid => "uuid",
        ColumnType::Bytes => "bytes",
    }
}

/// Recognized meta-operation marker on a `POST` body (§6: "detects a
/// meta-operation marker in body for schema introspection").
pub fn is_meta_marker(body: &serde_json::Value) -> bool {
    body.get("_meta").and_then(serde_json::Value::as_bool).unwrap_or(false)
        || body.get("_operation").and_then(serde_json::Value::as_str) == Some("meta")
}
