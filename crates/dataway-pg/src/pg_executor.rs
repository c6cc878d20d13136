//! Implements `dataway_core::executor::{Executor, Transaction}` against a
//! `deadpool_postgres::Pool`, rendering plans via `pg_render` and mapping
//! rows back into `dataway_core::Value`s. Grounded on `client.rs`'s
//! `GenericClient` query/execute split; transactions are driven with plain
//! `BEGIN`/`COMMIT`/`ROLLBACK`/`SAVEPOINT` statements over a held pooled
//! client rather than `tokio_postgres::Transaction`, so the handle stays
//! `'static` and object-safe (see `transaction.rs` for the borrowing
//! alternative used by direct callers).

use crate::client::{GenericClient, PoolClient};
use crate::error::PgError;
use crate::ident::Ident;
use crate::pg_render::{render_plan, value_to_sql};
use async_trait::async_trait;
use dataway_core::error::{EngineError, EngineResult};
use dataway_core::executor::{ExecutedRows, Executor};
use dataway_core::plan::QueryPlan;
use dataway_core::value::Value;
use deadpool_postgres::Pool;
use std::any::Any;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tokio_postgres::Row;

pub struct PgExecutor {
    pool: Pool,
}

impl PgExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn row_to_map(row: &Row) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_());
        map.insert(column.name().to_string(), value);
    }
    map
}

fn decode_column(row: &Row, idx: usize, ty: &tokio_postgres::types::Type) -> Value {
    use tokio_postgres::types::Type;
    match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).ok().flatten().map(Value::Bool).unwrap_or(Value::Null),
        Type::INT2 | Type::INT4 | Type::INT8 => {
            row.try_get::<_, Option<i64>>(idx).ok().flatten().map(Value::Int).unwrap_or(Value::Null)
        }
        Type::FLOAT4 | Type::FLOAT8 => {
            row.try_get::<_, Option<f64>>(idx).ok().flatten().map(Value::Float).unwrap_or(Value::Null)
        }
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Json(v.to_string()))
            .unwrap_or(Value::Null),
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx).ok().flatten().map(Value::Uuid).unwrap_or(Value::Null),
        Type::TIMESTAMPTZ | Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .ok()
            .flatten()
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        _ => row.try_get::<_, Option<String>>(idx).ok().flatten().map(Value::Text).unwrap_or(Value::Null),
    }
}

async fn run_plan<C: GenericClient>(client: &C, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
    let rendered = render_plan(plan);
    let boxed_params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> =
        rendered.params.iter().map(value_to_sql).collect();
    let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        boxed_params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

    let rows = client
        .query(&rendered.sql, &param_refs)
        .await
        .map_err(|e| EngineError::QueryError(e.to_string()))?;

    let total = match plan {
        QueryPlan::Select(select) if !select.skip_count => Some(rows.len() as i64),
        _ => None,
    };

    Ok(ExecutedRows { rows: rows.iter().map(row_to_map).collect(), total })
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        let inner = self.pool.get().await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        run_plan(&PoolClient::new(inner), plan).await
    }

    async fn begin_transaction(&self) -> EngineResult<Box<dyn dataway_core::executor::Transaction>> {
        let inner = self.pool.get().await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        let client = PoolClient::new(inner);
        client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| EngineError::Internal(PgError::from_db_error(e).to_string()))?;
        Ok(Box::new(PgTransaction { client: Mutex::new(client) }))
    }

    async fn execute_in_transaction(
        &self,
        tx: &dyn dataway_core::executor::Transaction,
        plan: &QueryPlan,
    ) -> EngineResult<ExecutedRows> {
        let tx = tx
            .as_any()
            .downcast_ref::<PgTransaction>()
            .ok_or_else(|| EngineError::Internal("transaction handle was not a PgTransaction".into()))?;
        let client = tx.client.lock().await;
        run_plan(&*client, plan).await
    }
}

/// A pooled client held for the lifetime of a transaction. Statements are
/// issued as plain SQL (`BEGIN`/`COMMIT`/`ROLLBACK`/`SAVEPOINT ...`) against
/// the same connection rather than through `tokio_postgres::Transaction`, so
/// this handle has no borrowed lifetime and can live behind `Box<dyn
/// Transaction>`.
pub struct PgTransaction {
    client: Mutex<PoolClient>,
}

#[async_trait]
impl dataway_core::executor::Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let client = self.client.lock().await;
        client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| EngineError::Internal(PgError::from_db_error(e).to_string()))
    }

    async fn rollback(self: Box<Self>) -> EngineResult<()> {
        let client = self.client.lock().await;
        client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| EngineError::Internal(PgError::from_db_error(e).to_string()))
    }

    async fn savepoint(&self, name: &str) -> EngineResult<()> {
        let ident = Ident::quoted(name).map_err(|e| EngineError::Internal(e.to_string()))?;
        let client = self.client.lock().await;
        client
            .batch_execute(&format!("SAVEPOINT {}", ident.to_sql()))
            .await
            .map_err(|e| EngineError::Internal(PgError::from_db_error(e).to_string()))
    }

    async fn rollback_to_savepoint(&self, name: &str) -> EngineResult<()> {
        let ident = Ident::quoted(name).map_err(|e| EngineError::Internal(e.to_string()))?;
        let client = self.client.lock().await;
        client
            .batch_execute(&format!("ROLLBACK TO SAVEPOINT {}", ident.to_sql()))
            .await
            .map_err(|e| EngineError::Internal(PgError::from_db_error(e).to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
