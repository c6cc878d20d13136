//! Route handlers for `{schema}/{entity}[/{id}]` (§6). Mount with
//! `.nest(base, router(state))` for whatever `{base}` prefix the deployment
//! wants; this module has no opinion on it.

use crate::headers::AxumHeaders;
use crate::meta::{build_table_metadata, is_meta_marker, TableMetadata};
use crate::response::{ApiError, ReadResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use dataway_core::hooks::OperationKind;
use dataway_core::value::Value;
use serde_json::{Map, Value as Json_};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/{schema}/{entity}/_meta", get(meta))
        .route("/{schema}/{entity}", get(list).post(create).delete(delete_batch))
        .route("/{schema}/{entity}/{id}", get(read_one).put(update).patch(update).delete(delete_one))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list(State(state): State<AppState>, Path((schema, entity)): Path<(String, String)>, headers: HeaderMap) -> Result<ReadResponse, ApiError> {
    read(state, schema, entity, None, headers).await
}

async fn read_one(
    State(state): State<AppState>,
    Path((schema, entity, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<ReadResponse, ApiError> {
    read(state, schema, entity, Some(id), headers).await
}

async fn read(state: AppState, schema: String, entity: String, id: Option<String>, headers: HeaderMap) -> Result<ReadResponse, ApiError> {
    let options = dataway_core::header::decode_headers(&AxumHeaders(&headers));
    let provider = state.executor_provider().await?;
    let formatted = state
        .engine
        .handle_read(provider.executor(), &schema, &entity, id.map(Value::Text), options)
        .await?;
    Ok(ReadResponse(formatted))
}

async fn meta(State(state): State<AppState>, Path((schema, entity)): Path<(String, String)>) -> Result<Json<TableMetadata>, ApiError> {
    Ok(Json(table_metadata(&state, &schema, &entity)?))
}

fn table_metadata(state: &AppState, schema: &str, entity: &str) -> Result<TableMetadata, ApiError> {
    let model = state
        .engine
        .catalog
        .lookup(schema, entity)
        .ok_or_else(|| dataway_core::EngineError::NotFound(format!("no model registered for {schema}.{entity}")))?;
    let (resolved_schema, table) = model.resolve_table_name(&state.engine.default_schema, entity);
    Ok(build_table_metadata(model, &resolved_schema, &table))
}

async fn create(
    State(state): State<AppState>,
    Path((schema, entity)): Path<(String, String)>,
    Json(body): Json<Json_>,
) -> Result<Json<Json_>, ApiError> {
    if is_meta_marker(&body) {
        return Ok(Json(serde_json::to_value(table_metadata(&state, &schema, &entity)?).unwrap_or(Json_::Null)));
    }
    write(state, schema, entity, OperationKind::Create, body).await
}

async fn update(
    State(state): State<AppState>,
    Path((schema, entity, id)): Path<(String, String, String)>,
    Json(mut body): Json<Json_>,
) -> Result<Json<Json_>, ApiError> {
    insert_id(&state, &schema, &entity, &id, &mut body);
    write(state, schema, entity, OperationKind::Update, body).await
}

async fn delete_one(
    State(state): State<AppState>,
    Path((schema, entity, id)): Path<(String, String, String)>,
) -> Result<Json<Json_>, ApiError> {
    let mut body = Json_::Object(Map::new());
    insert_id(&state, &schema, &entity, &id, &mut body);
    write(state, schema, entity, OperationKind::Delete, body).await
}

/// Batch delete (§6 "DELETE (single or batch)"): body is a JSON array of
/// primary-key values.
async fn delete_batch(
    State(state): State<AppState>,
    Path((schema, entity)): Path<(String, String)>,
    Json(body): Json<Json_>,
) -> Result<Json<Json_>, ApiError> {
    let ids = body.as_array().cloned().unwrap_or_default();
    let mut elements = Vec::with_capacity(ids.len());
    for id in ids {
        let mut element = Json_::Object(Map::new());
        if let Json_::String(s) = &id {
            insert_id(&state, &schema, &entity, s, &mut element);
        } else if let Some(obj) = id.as_object() {
            element = Json_::Object(obj.clone());
        }
        elements.push(element);
    }
    write(state, schema, entity, OperationKind::Delete, Json_::Array(elements)).await
}

fn insert_id(state: &AppState, schema: &str, entity: &str, id: &str, body: &mut Json_) {
    let pk_name = state
        .engine
        .catalog
        .lookup(schema, entity)
        .map(|m| m.primary_key_name().to_string())
        .unwrap_or_else(|| "id".to_string());
    if let Some(obj) = body.as_object_mut() {
        obj.entry(pk_name).or_insert_with(|| Json_::String(id.to_string()));
    }
}

async fn write(state: AppState, schema: String, entity: String, operation: OperationKind, data: Json_) -> Result<Json<Json_>, ApiError> {
    let provider = state.executor_provider().await?;
    let result = state.engine.handle_write(provider.executor(), &schema, &entity, operation, data).await?;
    Ok(Json(result))
}

