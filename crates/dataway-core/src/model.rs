//! Reflection layer (§4.1): `ModelDescriptor` is consulted, never re-derived,
//! on the hot path. The `#[derive(Model)]` macro in `dataway-derive` builds
//! one of these once at registration time, the way the teacher's
//! `#[derive(Model)]` builds `TABLE`/`COL_*`/`SELECT_LIST` consts once at
//! compile time; here the descriptor is a runtime value so the compiler can
//! be dialect- and model-generic.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    Many2Many,
}

#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    /// JSON name of the relation field on the parent model.
    pub name: String,
    pub kind: RelationKind,
    /// Foreign-key field (on the "many" side for hasOne/hasMany, on this side for belongsTo).
    pub foreign_key: String,
    /// Field referenced on the other side of the relation (defaults to the related model's PK).
    pub references: String,
    /// Present only for `Many2Many`.
    pub join_table: Option<String>,
    /// Name of the related model, as registered in the catalog.
    pub related_model: String,
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub json_name: String,
    pub column_name: String,
    pub is_primary_key: bool,
    pub nullable: bool,
    /// Coarse type tag used by the filter-value caster (§4.7 Filters).
    pub ty: ColumnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Numeric,
    Bool,
    DateTime,
    Json,
    Uuid,
    Bytes,
}

/// A model's reflected shape, built once at registration and consulted by
/// the compiler, validator, and nested-write processor.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub entity: String,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub relations: Vec<RelationDescriptor>,
    /// Name of a field the compiler writes `offset + index + 1` into for
    /// collection reads (§4.7 Row-number injection), if the model has one.
    pub row_number_field: Option<String>,
}

impl ModelDescriptor {
    /// `TableNameOf` (§4.1): dotted `table` wins over `schema` + `entity`,
    /// which wins over `default_schema` + `entity`.
    pub fn resolve_table_name(&self, default_schema: &str, entity: &str) -> (String, String) {
        if let Some((schema, table)) = self.table.split_once('.') {
            return (schema.to_string(), table.to_string());
        }
        if let Some(schema) = &self.schema {
            return (schema.clone(), self.table.clone());
        }
        (default_schema.to_string(), entity.to_string())
    }

    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    pub fn primary_key_name(&self) -> &str {
        self.primary_key().map(|c| c.column_name.as_str()).unwrap_or("id")
    }

    pub fn columns_of(&self) -> HashSet<&str> {
        self.columns
            .iter()
            .flat_map(|c| [c.json_name.as_str(), c.column_name.as_str()])
            .collect()
    }

    pub fn column_by_ref(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.json_name == name || c.column_name == name)
    }

    pub fn relation_of(&self, json_name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == json_name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_name.as_str()).collect()
    }
}

/// A lookup table of registered models, keyed by `{schema}.{entity}`, built
/// once at startup and handed to the engine (§5: "populated at startup,
/// read-only thereafter").
#[derive(Debug, Default)]
pub struct ModelCatalog {
    models: std::collections::HashMap<String, ModelDescriptor>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) {
        let key = format!(
            "{}.{}",
            descriptor.schema.as_deref().unwrap_or(""),
            descriptor.entity
        );
        self.models.insert(key, descriptor);
    }

    pub fn lookup(&self, schema: &str, entity: &str) -> Option<&ModelDescriptor> {
        self.models
            .get(&format!("{schema}.{entity}"))
            .or_else(|| self.models.get(&format!(".{entity}")))
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.values().find(|m| m.entity == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelDescriptor {
        ModelDescriptor {
            entity: "widgets".into(),
            schema: None,
            table: "widgets".into(),
            columns: vec![ColumnDescriptor {
                json_name: "id".into(),
                column_name: "id".into(),
                is_primary_key: true,
                nullable: false,
                ty: ColumnType::Numeric,
            }],
            relations: vec![],
            row_number_field: None,
        }
    }

    #[test]
    fn table_name_priority_dotted_wins() {
        let mut m = sample();
        m.table = "audit.widgets".into();
        m.schema = Some("public".into());
        assert_eq!(m.resolve_table_name("public", "widgets"), ("audit".into(), "widgets".into()));
    }

    #[test]
    fn table_name_falls_back_to_default_schema() {
        let m = sample();
        assert_eq!(m.resolve_table_name("public", "widgets"), ("public".into(), "widgets".into()));
    }

    #[test]
    fn catalog_lookup_by_schema_and_entity() {
        let mut catalog = ModelCatalog::new();
        catalog.register(sample());
        assert!(catalog.lookup("public", "widgets").is_some());
    }
}
