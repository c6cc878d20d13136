//! Top-level orchestration (§2 data flow): wires the header decoder,
//! validator, hook dispatcher, compiler, cache, nested-write processor, and
//! formatter around a dialect's `Executor`. `dataway-http` is the thin HTTP
//! adapter on top of this; this module has no axum/tower dependency so it
//! can be driven directly in tests, matching the way the teacher keeps
//! `client`/`builder` usable without its CLI or HTTP layers.

use crate::cache::{fingerprint, table_tags, CachedTotal, QueryTotalCache, DEFAULT_TTL};
use crate::compiler::QueryCompiler;
use crate::error::{EngineError, EngineResult};
use crate::executor::Executor;
use crate::format::{format_response, FormatOptions, FormattedResponse, ResponseMetadata};
use crate::hooks::{HookContext, HookKind, HookRegistry, OperationKind};
use crate::model::ModelCatalog;
use crate::nested_write::{NestedWriteProcessor, WriteKind};
use crate::options::RequestOptions;
use crate::plan::QueryPlan;
use crate::value::Value;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct Engine {
    pub catalog: ModelCatalog,
    pub hooks: HookRegistry,
    pub cache: Arc<dyn QueryTotalCache>,
    pub default_schema: String,
}

impl Engine {
    pub fn new(catalog: ModelCatalog, hooks: HookRegistry, cache: Arc<dyn QueryTotalCache>, default_schema: impl Into<String>) -> Self {
        Self { catalog, hooks, cache, default_schema: default_schema.into() }
    }

    #[instrument(skip(self, executor, options))]
    pub async fn handle_read(
        &self,
        executor: &dyn Executor,
        schema: &str,
        entity: &str,
        id: Option<Value>,
        options: RequestOptions,
    ) -> EngineResult<FormattedResponse> {
        // Model-not-found passes through with no error (§4.7 Failure policy);
        // callers are expected to have a registered fallback route.
        let model = self
            .catalog
            .lookup(schema, entity)
            .ok_or_else(|| EngineError::NotFound(format!("no model registered for {schema}.{entity}")))?;

        let compiler = QueryCompiler::new(model, &self.default_schema);
        let options = compiler.validate(options);

        let mut ctx = HookContext::new(schema, entity, &model.table, OperationKind::Read, options);
        ctx.target_id = id.clone();
        self.hooks.execute(HookKind::BeforeHandle, &mut ctx).await?;
        self.hooks.execute(HookKind::BeforeRead, &mut ctx).await?;

        let mut plan = compiler.compile_select(&ctx.options)?;
        if let Some(id) = &id {
            plan.filter = Some(match plan.filter.take() {
                Some(existing) => crate::plan::FilterExpr::And(vec![
                    existing,
                    crate::plan::FilterExpr::Compare {
                        column: model.primary_key_name().to_string(),
                        op: crate::plan::CompareOp::Eq,
                        value: id.clone(),
                    },
                ]),
                None => crate::plan::FilterExpr::Compare {
                    column: model.primary_key_name().to_string(),
                    op: crate::plan::CompareOp::Eq,
                    value: id.clone(),
                },
            });
        }
        ctx.query = Some(QueryPlan::Select(plan));

        self.hooks.execute(HookKind::BeforeScan, &mut ctx).await?;

        let Some(QueryPlan::Select(plan)) = ctx.query.take() else {
            return Err(EngineError::Internal("hook replaced select plan with a non-select plan".into()));
        };

        let fp = fingerprint(&[&plan.schema, &plan.table, &format!("{:?}", plan.filter), &format!("{:?}", plan.sort)]);
        let total = if plan.skip_count {
            None
        } else if plan.skip_cache {
            None
        } else if let Some(cached) = self.cache.get(&fp).await {
            debug!(fingerprint = %fp, "query-total cache hit");
            Some(cached.total)
        } else {
            None
        };

        debug!(table = %plan.table, ?plan.filter, "executing compiled select plan");
        let executed = executor.execute(&QueryPlan::Select(plan.clone())).await.map_err(|_| EngineError::QueryError(format!("failed to execute select against {}", plan.table)))?;

        let total = match total {
            Some(t) => t,
            None => {
                let t = executed.total.unwrap_or(executed.rows.len() as i64);
                if !plan.skip_count {
                    self.cache
                        .set(fp, CachedTotal { total: t, computed_at: std::time::Instant::now() }, table_tags(&plan.schema, &plan.table), DEFAULT_TTL)
                        .await;
                }
                t
            }
        };

        if id.is_some() && executed.rows.is_empty() {
            return Err(EngineError::NotFound(format!("{entity} row not found")));
        }

        let rows_json: Vec<Json> = executed.rows.iter().map(row_to_json).collect();
        ctx.result = Some(Json::Array(rows_json.clone()));
        self.hooks.execute(HookKind::AfterRead, &mut ctx).await?;

        let metadata = ResponseMetadata {
            total,
            count: rows_json.len() as i64,
            filtered: total,
            limit: plan.limit,
            offset: plan.offset.unwrap_or(0),
            row_number: None,
        };
        let format_opts = FormatOptions {
            format: plan.response_format,
            single_record_as_object: plan.single_record_as_object,
            clean_json: plan.clean_json,
        };
        let result = ctx.result.take().unwrap_or(Json::Array(rows_json));
        Ok(format_response(result, metadata, &format_opts))
    }

    #[instrument(skip(self, executor, data))]
    pub async fn handle_write(
        &self,
        executor: &dyn Executor,
        schema: &str,
        entity: &str,
        operation: OperationKind,
        data: Json,
    ) -> EngineResult<Json> {
        let model = self
            .catalog
            .lookup(schema, entity)
            .ok_or_else(|| EngineError::NotFound(format!("no model registered for {schema}.{entity}")))?;

        let before_kind = match operation {
            OperationKind::Create => HookKind::BeforeCreate,
            OperationKind::Update => HookKind::BeforeUpdate,
            OperationKind::Delete => HookKind::BeforeDelete,
            OperationKind::Read => unreachable!("handle_write never called with Read"),
        };
        let after_kind = match operation {
            OperationKind::Create => HookKind::AfterCreate,
            OperationKind::Update => HookKind::AfterUpdate,
            OperationKind::Delete => HookKind::AfterDelete,
            OperationKind::Read => unreachable!("handle_write never called with Read"),
        };

        let mut ctx = HookContext::new(schema, entity, &model.table, operation, RequestOptions::default());
        ctx.data = Some(data.clone());
        self.hooks.execute(HookKind::BeforeHandle, &mut ctx).await?;
        self.hooks.execute(before_kind, &mut ctx).await?;

        let payload = ctx.data.clone().unwrap_or(data);
        let elements = NestedWriteProcessor::normalize_body(payload);
        let processor = NestedWriteProcessor::new(&self.catalog);
        let (default_schema, table) = model.resolve_table_name(&self.default_schema, entity);

        let tx = executor.begin_transaction().await?;
        let mut results = Vec::with_capacity(elements.len());
        for element in &elements {
            let Some(map) = element.as_object() else {
                let _ = tx.rollback().await;
                return Err(EngineError::InvalidRequest("write payload element must be an object".into()));
            };
            let steps = processor.decompose(
                write_kind(operation),
                model,
                &default_schema,
                &table,
                map,
                &BTreeMap::new(),
                0,
            )?;

            self.hooks.execute(HookKind::BeforeScan, &mut ctx).await?;

            let mut parent_pk: Option<Value> = None;
            for step in &steps {
                let plan = self.plan_for_step(model, operation, step, &parent_pk);
                let outcome = executor
                    .execute_in_transaction(tx.as_ref(), &plan)
                    .await
                    .map_err(|_| write_error(operation, &step.table));
                let outcome = match outcome {
                    Ok(o) => o,
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(e);
                    }
                };
                if step.depth == 0 {
                    parent_pk = outcome
                        .rows
                        .first()
                        .and_then(|row| step.generated_pk_field.as_ref().and_then(|pk| row.get(pk)))
                        .cloned();
                }
            }

            let merged = steps
                .first()
                .map(|s| {
                    let mut out = Map::new();
                    for (k, v) in &s.values {
                        out.insert(k.clone(), v.to_json());
                    }
                    NestedWriteProcessor::merge_db_result(map, &out)
                })
                .unwrap_or_else(|| map.clone());
            results.push(Json::Object(merged));
        }
        tx.commit().await?;

        self.cache.invalidate_by_tags(&table_tags(&default_schema, &table)).await;

        ctx.result = Some(Json::Array(results));
        self.hooks.execute(after_kind, &mut ctx).await?;
        Ok(ctx.result.take().unwrap_or(Json::Null))
    }

    fn plan_for_step(
        &self,
        model: &crate::model::ModelDescriptor,
        operation: OperationKind,
        step: &crate::nested_write::WriteStep,
        parent_pk: &Option<Value>,
    ) -> QueryPlan {
        let compiler = QueryCompiler::new(model, &self.default_schema);
        let mut values = step.values.clone();
        if let Some(pk) = parent_pk {
            for (field, v) in values.iter_mut() {
                if matches!(v, Value::Null) && field.ends_with("_id") {
                    *v = pk.clone();
                }
            }
        }
        match operation {
            OperationKind::Create => QueryPlan::Insert(compiler.compile_insert(values)),
            OperationKind::Update => {
                let id = values
                    .get(model.primary_key_name())
                    .cloned()
                    .unwrap_or(Value::Null);
                QueryPlan::Update(compiler.compile_update(id, values))
            }
            OperationKind::Delete => QueryPlan::Delete(compiler.compile_delete(crate::plan::FilterExpr::Compare {
                column: model.primary_key_name().to_string(),
                op: crate::plan::CompareOp::Eq,
                value: values.get(model.primary_key_name()).cloned().unwrap_or(Value::Null),
            })),
            OperationKind::Read => unreachable!(),
        }
    }
}

fn write_kind(operation: OperationKind) -> WriteKind {
    match operation {
        OperationKind::Create => WriteKind::Create,
        OperationKind::Update => WriteKind::Update,
        _ => WriteKind::Create,
    }
}

fn write_error(operation: OperationKind, table: &str) -> EngineError {
    match operation {
        OperationKind::Create => EngineError::CreateError(format!("failed to insert into {table}")),
        OperationKind::Update => EngineError::UpdateError(format!("failed to update {table}")),
        OperationKind::Delete => EngineError::DeleteError(format!("failed to delete from {table}")),
        OperationKind::Read => unreachable!(),
    }
}

fn row_to_json(row: &BTreeMap<String, Value>) -> Json {
    let mut map = Map::new();
    for (k, v) in row {
        map.insert(k.clone(), v.to_json());
    }
    Json::Object(map)
}
