//! `dataway_core::executor::{Executor, ConnectionProvider}` over
//! `mysql_async::Pool`. Transactions are driven with plain `BEGIN`/`COMMIT`/
//! `ROLLBACK`/`SAVEPOINT` statements over a held connection (mirrors
//! `dataway-pg`'s `pg_executor::PgTransaction`) so the handle stays
//! `'static` and object-safe.

use crate::error::MyError;
use crate::render::{params_to_my, render_plan, my_to_value};
use async_trait::async_trait;
use dataway_core::error::{EngineError, EngineResult};
use dataway_core::executor::{
    backoff_delay, ConnectionProvider, ExecutedRows, Executor, PoolStats, Transaction,
    CONNECT_RETRY_ATTEMPTS, HEALTH_CHECK_DEADLINE,
};
use dataway_core::plan::QueryPlan;
use dataway_core::value::Value;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Pool};
use std::any::Any;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

pub struct MyExecutor {
    pool: Pool,
}

impl MyExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

async fn run_plan(conn: &mut Conn, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
    let rendered = render_plan(plan);
    let params = params_to_my(&rendered.params);
    let rows: Vec<mysql_async::Row> = conn
        .exec(&rendered.sql, params)
        .await
        .map_err(|e| EngineError::QueryError(MyError::from_server_error(e).to_string()))?;

    let mapped: Vec<BTreeMap<String, Value>> = rows
        .iter()
        .map(|row| {
            let mut map = BTreeMap::new();
            for (idx, column) in row.columns_ref().iter().enumerate() {
                let value: Option<mysql_async::Value> = row.as_ref(idx).cloned();
                let v = value.map(|v| my_to_value(&v, None)).unwrap_or(Value::Null);
                map.insert(column.name_str().to_string(), v);
            }
            map
        })
        .collect();

    let total = match plan {
        QueryPlan::Select(select) if !select.skip_count => Some(mapped.len() as i64),
        _ => None,
    };

    Ok(ExecutedRows { rows: mapped, total })
}

#[async_trait]
impl Executor for MyExecutor {
    async fn execute(&self, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        let mut conn = self.pool.get_conn().await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        run_plan(&mut conn, plan).await
    }

    async fn begin_transaction(&self) -> EngineResult<Box<dyn Transaction>> {
        let mut conn = self.pool.get_conn().await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        conn.query_drop("BEGIN").await.map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(Box::new(MyTransaction { conn: Mutex::new(conn) }))
    }

    async fn execute_in_transaction(&self, tx: &dyn Transaction, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        let tx = tx
            .as_any()
            .downcast_ref::<MyTransaction>()
            .ok_or_else(|| EngineError::Internal("transaction handle was not a MyTransaction".into()))?;
        let mut conn = tx.conn.lock().await;
        run_plan(&mut conn, plan).await
    }
}

pub struct MyTransaction {
    conn: Mutex<Conn>,
}

#[async_trait]
impl Transaction for MyTransaction {
    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let mut conn = self.conn.lock().await;
        conn.query_drop("COMMIT").await.map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> EngineResult<()> {
        let mut conn = self.conn.lock().await;
        conn.query_drop("ROLLBACK").await.map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn savepoint(&self, name: &str) -> EngineResult<()> {
        let ident = validate_identifier(name)?;
        let mut conn = self.conn.lock().await;
        conn.query_drop(format!("SAVEPOINT `{ident}`")).await.map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn rollback_to_savepoint(&self, name: &str) -> EngineResult<()> {
        let ident = validate_identifier(name)?;
        let mut conn = self.conn.lock().await;
        conn.query_drop(format!("ROLLBACK TO SAVEPOINT `{ident}`"))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn validate_identifier(name: &str) -> EngineResult<&str> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(EngineError::Internal(format!("invalid savepoint identifier: {name}")))
    }
}

pub struct MyConnectionProvider {
    pool: Pool,
    executor: MyExecutor,
}

impl MyConnectionProvider {
    pub fn new(database_url: &str) -> EngineResult<Self> {
        let pool = Pool::new(database_url);
        let executor = MyExecutor::new(pool.clone());
        Ok(Self { pool, executor })
    }
}

#[async_trait]
impl ConnectionProvider for MyConnectionProvider {
    async fn connect(&self) -> EngineResult<()> {
        let mut attempt = 0;
        loop {
            match self.pool.get_conn().await {
                Ok(_) => return Ok(()),
                Err(err) if attempt + 1 >= CONNECT_RETRY_ATTEMPTS => {
                    return Err(EngineError::ServiceUnavailable(format!(
                        "failed to connect after {CONNECT_RETRY_ATTEMPTS} attempts: {err}"
                    )));
                }
                Err(_) => {
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn close(&self) -> EngineResult<()> {
        self.pool.clone().disconnect().await.map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn health_check(&self) -> EngineResult<()> {
        tokio::time::timeout(HEALTH_CHECK_DEADLINE, async {
            let mut conn = self.pool.get_conn().await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
            conn.query_drop("SELECT 1").await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))
        })
        .await
        .map_err(|_| EngineError::ServiceUnavailable("health check timed out".into()))?
    }

    fn stats(&self) -> PoolStats {
        PoolStats { dialect: "mysql", open: 0, idle: 0, in_use: 0 }
    }

    fn executor(&self) -> &dyn Executor {
        &self.executor
    }
}
