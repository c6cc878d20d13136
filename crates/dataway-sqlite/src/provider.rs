//! `dataway_core::executor::{Executor, ConnectionProvider}` over a single
//! `rusqlite::Connection`. Per spec (§4.4: "the embedded dialect defaults to
//! a max-open of 1 unless overridden, to avoid write contention"), this
//! provider holds exactly one connection behind a mutex and every call runs
//! on a blocking thread via `spawn_blocking`, since `rusqlite` is
//! synchronous. WAL journaling and a busy-timeout are set at connect.

use crate::error::LiteError;
use crate::render::{lite_to_value, render_plan, value_to_lite};
use async_trait::async_trait;
use dataway_core::error::{EngineError, EngineResult};
use dataway_core::executor::{ConnectionProvider, ExecutedRows, Executor, PoolStats, Transaction};
use dataway_core::plan::QueryPlan;
use dataway_core::value::Value;
use rusqlite::Connection;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Busy-timeout floor per §4.4 ("≥ 2 min").
const BUSY_TIMEOUT: Duration = Duration::from_secs(120);

fn run_sync(conn: &Connection, plan: &QueryPlan) -> Result<ExecutedRows, LiteError> {
    let rendered = render_plan(plan);
    let mut stmt = conn.prepare(&rendered.sql).map_err(LiteError::from_sqlite_error)?;
    let lite_params: Vec<rusqlite::types::Value> = rendered.params.iter().map(value_to_lite).collect();
    let param_refs: Vec<&dyn rusqlite::ToSql> = lite_params.iter().map(|v| v as &dyn rusqlite::ToSql).collect();

    let column_count = stmt.column_count();
    let column_names: Vec<String> = (0..column_count).map(|i| stmt.column_name(i).unwrap_or("").to_string()).collect();

    let rows: Vec<BTreeMap<String, Value>> = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut map = BTreeMap::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value = row.get_ref(idx)?;
                map.insert(name.clone(), lite_to_value(value));
            }
            Ok(map)
        })
        .map_err(LiteError::from_sqlite_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(LiteError::from_sqlite_error)?;

    let total = match plan {
        QueryPlan::Select(select) if !select.skip_count => Some(rows.len() as i64),
        _ => None,
    };

    Ok(ExecutedRows { rows, total })
}

pub struct LiteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl LiteExecutor {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Executor for LiteExecutor {
    async fn execute(&self, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        let conn = self.conn.clone();
        let plan = plan.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            run_sync(&guard, &plan)
        })
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))?
        .map_err(|e| EngineError::QueryError(e.to_string()))
    }

    async fn begin_transaction(&self) -> EngineResult<Box<dyn Transaction>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            guard.execute_batch("BEGIN")
        })
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))?
        .map_err(|e| EngineError::Internal(LiteError::from_sqlite_error(e).to_string()))?;
        Ok(Box::new(LiteTransaction { conn: self.conn.clone() }))
    }

    async fn execute_in_transaction(&self, tx: &dyn Transaction, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        let tx = tx
            .as_any()
            .downcast_ref::<LiteTransaction>()
            .ok_or_else(|| EngineError::Internal("transaction handle was not a LiteTransaction".into()))?;
        let conn = tx.conn.clone();
        let plan = plan.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            run_sync(&guard, &plan)
        })
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))?
        .map_err(|e| EngineError::QueryError(e.to_string()))
    }
}

pub struct LiteTransaction {
    conn: Arc<Mutex<Connection>>,
}

fn run_batch(conn: &Arc<Mutex<Connection>>, sql: String) -> EngineResult<()> {
    let conn = conn.clone();
    let guard = conn.lock().expect("sqlite connection mutex poisoned");
    guard.execute_batch(&sql).map_err(|e| EngineError::Internal(LiteError::from_sqlite_error(e).to_string()))
}

#[async_trait]
impl Transaction for LiteTransaction {
    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || run_batch(&conn, "COMMIT".into()))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?
    }

    async fn rollback(self: Box<Self>) -> EngineResult<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || run_batch(&conn, "ROLLBACK".into()))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?
    }

    async fn savepoint(&self, name: &str) -> EngineResult<()> {
        let ident = validate_identifier(name)?.to_string();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || run_batch(&conn, format!("SAVEPOINT \"{ident}\"")))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?
    }

    async fn rollback_to_savepoint(&self, name: &str) -> EngineResult<()> {
        let ident = validate_identifier(name)?.to_string();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || run_batch(&conn, format!("ROLLBACK TO SAVEPOINT \"{ident}\"")))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?
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

pub struct LiteConnectionProvider {
    conn: Arc<Mutex<Connection>>,
    executor: LiteExecutor,
    path: String,
}

impl LiteConnectionProvider {
    pub fn open(path: impl Into<String>) -> EngineResult<Self> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));
        let executor = LiteExecutor::new(conn.clone());
        Ok(Self { conn, executor, path })
    }
}

#[async_trait]
impl ConnectionProvider for LiteConnectionProvider {
    async fn connect(&self) -> EngineResult<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            guard.execute_batch("SELECT 1")
        })
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))?
        .map_err(|e| EngineError::ServiceUnavailable(e.to_string()))
    }

    async fn close(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> EngineResult<()> {
        tokio::time::timeout(dataway_core::executor::HEALTH_CHECK_DEADLINE, self.connect())
            .await
            .map_err(|_| EngineError::ServiceUnavailable("health check timed out".into()))?
    }

    fn stats(&self) -> PoolStats {
        PoolStats { dialect: "sqlite", open: 1, idle: 0, in_use: 1 }
    }

    fn executor(&self) -> &dyn Executor {
        &self.executor
    }
}

impl LiteConnectionProvider {
    pub fn path(&self) -> &str {
        &self.path
    }
}
