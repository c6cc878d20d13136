//! Query compiler (§4.7): `RequestOptions` + `ModelDescriptor` →
//! dialect-neutral `QueryPlan`. This is the heart of the engine; grounded on
//! the teacher's `builder::select::Select`/`qb::select::Select` assembly
//! logic, generalized to operate over the reflected model instead of a
//! compile-time struct.

use crate::error::{EngineError, EngineResult};
use crate::model::{ColumnType, ModelDescriptor};
use crate::options::{FilterOp, PreloadSpec, RequestOptions};
use crate::plan::{
    combine_filters, CompareOp, CursorToken, DeletePlan, FilterExpr, InsertPlan, PreloadPlan,
    ProjectionColumn, SelectPlan, SortExpr, UpdatePlan,
};
use crate::validator::{is_safe_sql_fragment, qualify_bare_columns, ColumnValidator};
use crate::value::Value;
use std::collections::BTreeMap;

pub struct QueryCompiler<'a> {
    pub model: &'a ModelDescriptor,
    pub default_schema: &'a str,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(model: &'a ModelDescriptor, default_schema: &'a str) -> Self {
        Self { model, default_schema }
    }

    fn resolved_table(&self) -> (String, String) {
        self.model.resolve_table_name(self.default_schema, &self.model.entity)
    }

    /// Validates the options against the model's reflected columns,
    /// dropping (never aborting on) unknown references (§3, §4.2).
    pub fn validate(&self, options: RequestOptions) -> RequestOptions {
        ColumnValidator::new(self.model).filter_request_options(options)
    }

    /// Compiles a read into a `SelectPlan` (§4.7 Projection/Filters/Sort/
    /// Pagination/Expand/Count/Row-number).
    pub fn compile_select(&self, options: &RequestOptions) -> EngineResult<SelectPlan> {
        let (schema, table) = self.resolved_table();
        let columns = self.compile_projection(options);
        let filter = self.compile_filters(options)?;
        let sort = self.compile_sort(options);
        let cursor = self.compile_cursor(options, &sort)?;
        let preloads = self
            .compile_preloads(&options.preload, "", 0)?
            .into_iter()
            .collect();

        Ok(SelectPlan {
            schema,
            table,
            distinct: options.distinct,
            columns,
            filter,
            sort,
            limit: options.limit,
            offset: options.offset,
            cursor,
            preloads,
            skip_count: options.skip_count,
            skip_cache: options.skip_cache,
            fetch_row_number_for: options.fetch_row_number.clone(),
            response_format: options.response_format,
            single_record_as_object: options.single_record_as_object,
            clean_json: options.clean_json,
        })
    }

    /// §4.7 Projection: computed columns widen an empty `Columns` list to the
    /// full model set instead of replacing it; `OmitColumns` is a
    /// set-difference applied last.
    fn compile_projection(&self, options: &RequestOptions) -> Vec<ProjectionColumn> {
        let mut names: Vec<String> = if options.columns.is_empty()
            && (!options.computed_ql.is_empty() || !options.computed_columns.is_empty())
        {
            self.model.column_names().into_iter().map(String::from).collect()
        } else {
            options.columns.clone()
        };

        let omit: std::collections::HashSet<&str> =
            options.omit_columns.iter().map(String::as_str).collect();
        names.retain(|c| !omit.contains(c.as_str()));

        let mut columns: Vec<ProjectionColumn> = names
            .into_iter()
            .map(|name| ProjectionColumn { expr: name, alias: None, cast_text: false })
            .collect();

        for (alias, expr) in &options.computed_ql {
            // Aliases duplicated in Columns are dropped to avoid re-emitting them.
            columns.retain(|c| c.alias.as_deref() != Some(alias.as_str()) && c.expr != *alias);
            columns.push(ProjectionColumn {
                expr: expr.clone(),
                alias: Some(alias.clone()),
                cast_text: alias.contains("cql"),
            });
        }

        columns
    }

    /// §4.7 Filters: type-aware value casting, fixed operator set, per-filter
    /// AND/OR chaining, plus sanitized custom WHERE/OR fragments.
    fn compile_filters(&self, options: &RequestOptions) -> EngineResult<Option<FilterExpr>> {
        let mut chain = Vec::new();
        for f in &options.filters {
            let Some(column) = self.model.column_by_ref(&f.column) else {
                continue;
            };
            let expr = self.compile_one_filter(column.ty, &f.column, f.operator, &f.value.as_list())?;
            chain.push((expr, f.logic));
        }
        let mut combined = combine_filters(chain);

        if let Some(raw) = &options.custom_sql_where {
            if !is_safe_sql_fragment(raw) {
                return Err(EngineError::InvalidPreloadWhere(
                    "custom WHERE fragment failed static safety check".into(),
                ));
            }
            let qualified = self.qualify(raw);
            combined = Some(match combined {
                Some(existing) => FilterExpr::And(vec![existing, FilterExpr::Raw(qualified)]),
                None => FilterExpr::Raw(qualified),
            });
        }
        if let Some(raw) = &options.custom_sql_or {
            if !is_safe_sql_fragment(raw) {
                return Err(EngineError::InvalidPreloadWhere(
                    "custom OR fragment failed static safety check".into(),
                ));
            }
            let qualified = self.qualify(raw);
            combined = Some(match combined {
                Some(existing) => FilterExpr::Or(vec![existing, FilterExpr::Raw(qualified)]),
                None => FilterExpr::Raw(qualified),
            });
        }
        Ok(combined)
    }

    fn qualify(&self, fragment: &str) -> String {
        let (_, table) = self.resolved_table();
        let known: Vec<&str> = self.model.column_names();
        qualify_bare_columns(fragment, &table, &known)
    }

    fn compile_one_filter(
        &self,
        column_type: ColumnType,
        column: &str,
        op: FilterOp,
        values: &[Value],
    ) -> EngineResult<FilterExpr> {
        if op.is_null_check() {
            return Ok(FilterExpr::IsNull { column: column.to_string(), negated: op == FilterOp::IsNotNull });
        }
        if op.is_between() {
            if values.len() != 2 {
                return Err(EngineError::InvalidRequest(format!(
                    "filter on '{column}' requires exactly two values for between"
                )));
            }
            return Ok(FilterExpr::Between {
                column: column.to_string(),
                low: self.cast_value(column_type, values[0].clone()),
                high: self.cast_value(column_type, values[1].clone()),
                inclusive: op == FilterOp::BetweenInclusive,
            });
        }
        if op == FilterOp::In {
            return Ok(FilterExpr::In {
                column: column.to_string(),
                values: values.iter().cloned().map(|v| self.cast_value(column_type, v)).collect(),
            });
        }
        let value = values.first().cloned().unwrap_or(Value::Null);
        let value = self.cast_value(column_type, value);
        let compare_op = match op {
            FilterOp::Eq => CompareOp::Eq,
            FilterOp::Neq => CompareOp::Neq,
            FilterOp::Gt => CompareOp::Gt,
            FilterOp::Gte => CompareOp::Gte,
            FilterOp::Lt => CompareOp::Lt,
            FilterOp::Lte => CompareOp::Lte,
            FilterOp::Like => CompareOp::Like,
            FilterOp::Ilike => CompareOp::Ilike,
            _ => unreachable!("null/between/in handled above"),
        };
        Ok(FilterExpr::Compare { column: column.to_string(), op: compare_op, value })
    }

    /// "if the declared column type is numeric and the value is not
    /// numeric, the column is cast to text before comparison" (§4.7) — here
    /// that's represented by coercing the bound value to `Value::Text` so
    /// the renderer emits `column::text = $n` rather than a numeric bind.
    fn cast_value(&self, column_type: ColumnType, value: Value) -> Value {
        if column_type == ColumnType::Numeric && !value.is_numeric() && !value.is_null() {
            return Value::Text(value.as_display_string());
        }
        value
    }

    fn compile_sort(&self, options: &RequestOptions) -> Vec<SortExpr> {
        options
            .sort
            .iter()
            .map(|t| SortExpr { column: t.column.clone(), direction: t.direction, raw: t.is_expression() })
            .collect()
    }

    /// §4.7 Pagination: a cursor is only honored if every column it carries
    /// is part of the active sort set.
    fn compile_cursor(&self, options: &RequestOptions, sort: &[SortExpr]) -> EngineResult<Option<CursorToken>> {
        let raw = match (&options.cursor_forward, &options.cursor_backward) {
            (Some(f), _) => Some((f, true)),
            (None, Some(b)) => Some((b, false)),
            (None, None) => None,
        };
        let Some((token, forward)) = raw else { return Ok(None) };
        if sort.is_empty() {
            return Err(EngineError::CursorError("cursor requires an active sort set".into()));
        }
        decode_cursor_token(token, forward)
    }

    /// §4.7 Expand & Preload, including the depth-5 recursion cap and the
    /// "lower(relation.path) with '.' → '__'" alias rewrite.
    fn compile_preloads(
        &self,
        specs: &[PreloadSpec],
        path_prefix: &str,
        depth: u8,
    ) -> EngineResult<Vec<PreloadPlan>> {
        if depth > RequestOptions::PRELOAD_MAX_DEPTH {
            return Err(EngineError::InvalidRequest("preload depth exceeds limit of 5".into()));
        }
        let mut out = Vec::new();
        for spec in specs {
            let Some(relation) = self.model.relation_of(&spec.relation) else {
                continue;
            };
            let path = if path_prefix.is_empty() {
                spec.relation.clone()
            } else {
                format!("{path_prefix}.{}", spec.relation)
            };
            let alias = PreloadPlan::derive_alias(&path);

            let mut columns: Vec<ProjectionColumn> = spec
                .columns
                .iter()
                .map(|c| ProjectionColumn { expr: c.clone(), alias: None, cast_text: false })
                .collect();
            if columns.is_empty() && !spec.computed_ql.is_empty() {
                // populated with the whole related-model column set when empty and computed fields exist
                columns = vec![ProjectionColumn { expr: "*".into(), alias: None, cast_text: false }];
            }
            for (cql_alias, expr) in &spec.computed_ql {
                let rewritten = rewrite_alias_references(expr, &relation.related_model, &alias);
                columns.push(ProjectionColumn {
                    expr: rewritten,
                    alias: Some(cql_alias.clone()),
                    cast_text: cql_alias.contains("cql"),
                });
            }

            let filter = if let Some(frag) = &spec.where_fragment {
                if !is_safe_sql_fragment(frag) {
                    return Err(EngineError::InvalidPreloadWhere(format!(
                        "preload '{}' where fragment failed static safety check",
                        spec.relation
                    )));
                }
                Some(FilterExpr::Raw(qualify_bare_columns(frag, &alias, &[])))
            } else {
                None
            };

            let mut children = self.compile_preloads(&spec.preload, &path, depth + 1)?;
            // A recursive preload with no explicit children re-applies itself
            // down to the depth cap (§4.7 scenario 2: self-referential
            // hierarchies like Subtasks).
            if spec.recursive && depth < RequestOptions::PRELOAD_MAX_DEPTH {
                let self_child = std::slice::from_ref(spec);
                children.extend(self.compile_preloads(self_child, &path, depth + 1)?);
            }

            out.push(PreloadPlan {
                relation_path: path,
                alias,
                related_table: relation.related_model.clone(),
                foreign_key: relation.foreign_key.clone(),
                references: relation.references.clone(),
                join_table: relation.join_table.clone(),
                columns,
                filter,
                sort: spec
                    .sort
                    .iter()
                    .map(|t| SortExpr { column: t.column.clone(), direction: t.direction, raw: t.is_expression() })
                    .collect(),
                limit: spec.limit,
                offset: spec.offset,
                recursive: spec.recursive,
                children,
            });
        }
        Ok(out)
    }

    pub fn compile_insert(&self, values: BTreeMap<String, Value>) -> InsertPlan {
        let (schema, table) = self.resolved_table();
        InsertPlan { schema, table, values }
    }

    pub fn compile_update(&self, id: Value, values: BTreeMap<String, Value>) -> UpdatePlan {
        let (schema, table) = self.resolved_table();
        UpdatePlan {
            schema,
            table,
            values,
            filter: FilterExpr::Compare {
                column: self.model.primary_key_name().to_string(),
                op: CompareOp::Eq,
                value: id,
            },
        }
    }

    pub fn compile_delete(&self, filter: FilterExpr) -> DeletePlan {
        let (schema, table) = self.resolved_table();
        DeletePlan { schema, table, filter }
    }
}

/// "rewritten (both bare and quoted forms) to reference this alias" (§4.7
/// Computed-column alias rewriting).
fn rewrite_alias_references(expr: &str, bare_table: &str, alias: &str) -> String {
    let quoted = format!("\"{bare_table}\"");
    expr.replace(&quoted, alias).replace(bare_table, alias)
}

fn decode_cursor_token(token: &str, forward: bool) -> EngineResult<Option<CursorToken>> {
    use base64::Engine;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| EngineError::CursorError("cursor token is not valid base64".into()))?;
    let parsed: CursorWire = serde_json::from_slice(&decoded)
        .map_err(|_| EngineError::CursorError("cursor token payload is malformed".into()))?;
    Ok(Some(CursorToken {
        sort_values: parsed.sort_values,
        pk_value: parsed.pk_value,
        forward,
    }))
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CursorWire {
    sort_values: Vec<Value>,
    pk_value: Value,
}

/// Opaque-to-clients encoding counterpart used when the formatter/engine
/// needs to hand back a cursor for the next page.
pub fn encode_cursor_token(sort_values: Vec<Value>, pk_value: Value) -> String {
    use base64::Engine;
    let wire = CursorWire { sort_values, pk_value };
    let json = serde_json::to_vec(&wire).expect("cursor values are always serializable");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDescriptor, ColumnType, ModelDescriptor};
    use crate::options::{Filter, FilterValue, LogicOp, SortTerm};

    fn widgets() -> ModelDescriptor {
        ModelDescriptor {
            entity: "widgets".into(),
            schema: None,
            table: "widgets".into(),
            columns: vec![
                ColumnDescriptor { json_name: "id".into(), column_name: "id".into(), is_primary_key: true, nullable: false, ty: ColumnType::Numeric },
                ColumnDescriptor { json_name: "name".into(), column_name: "name".into(), is_primary_key: false, nullable: false, ty: ColumnType::Text },
                ColumnDescriptor { json_name: "price".into(), column_name: "price".into(), is_primary_key: false, nullable: true, ty: ColumnType::Numeric },
            ],
            relations: vec![],
            row_number_field: None,
        }
    }

    #[test]
    fn numeric_column_with_non_numeric_value_casts_to_text() {
        let model = widgets();
        let compiler = QueryCompiler::new(&model, "public");
        let mut options = RequestOptions::default();
        options.filters.push(Filter {
            column: "price".into(),
            operator: FilterOp::Eq,
            value: FilterValue::Scalar(Value::Text("n/a".into())),
            logic: LogicOp::And,
        });
        let plan = compiler.compile_select(&options).unwrap();
        match plan.filter {
            Some(FilterExpr::Compare { value: Value::Text(t), .. }) => assert_eq!(t, "n/a"),
            other => panic!("expected cast compare filter, got {other:?}"),
        }
    }

    #[test]
    fn between_requires_exactly_two_values() {
        let model = widgets();
        let compiler = QueryCompiler::new(&model, "public");
        let mut options = RequestOptions::default();
        options.filters.push(Filter {
            column: "price".into(),
            operator: FilterOp::Between,
            value: FilterValue::List(vec![Value::Int(1)]),
            logic: LogicOp::And,
        });
        assert!(compiler.compile_select(&options).is_err());
    }

    #[test]
    fn cursor_without_active_sort_is_rejected() {
        let model = widgets();
        let compiler = QueryCompiler::new(&model, "public");
        let mut options = RequestOptions::default();
        options.cursor_forward = Some("whatever".into());
        assert!(matches!(compiler.compile_select(&options), Err(EngineError::CursorError(_))));
    }

    #[test]
    fn cursor_round_trips_through_encode_decode() {
        let token = encode_cursor_token(vec![Value::Int(5)], Value::Int(42));
        let model = widgets();
        let compiler = QueryCompiler::new(&model, "public");
        let mut options = RequestOptions::default();
        options.sort.push(SortTerm { column: "id".into(), direction: crate::options::SortDir::Asc });
        options.cursor_forward = Some(token);
        let plan = compiler.compile_select(&options).unwrap();
        assert!(plan.cursor.unwrap().forward);
    }

    #[test]
    fn unsafe_custom_where_is_rejected() {
        let model = widgets();
        let compiler = QueryCompiler::new(&model, "public");
        let mut options = RequestOptions::default();
        options.custom_sql_where = Some("1=1; DROP TABLE widgets".into());
        assert!(matches!(compiler.compile_select(&options), Err(EngineError::InvalidPreloadWhere(_))));
    }

    #[test]
    fn empty_columns_widen_to_full_set_when_computed_present() {
        let model = widgets();
        let compiler = QueryCompiler::new(&model, "public");
        let mut options = RequestOptions::default();
        options.computed_ql.insert("total_cql".into(), "price * 2".into());
        let plan = compiler.compile_select(&options).unwrap();
        assert!(plan.columns.iter().any(|c| c.expr == "id"));
        assert!(plan.columns.iter().any(|c| c.alias.as_deref() == Some("total_cql") && c.cast_text));
    }
}
