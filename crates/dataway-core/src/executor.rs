//! Dialect-neutral execution seam (§4.3, §4.4): the traits a provider crate
//! (`dataway-pg`, `dataway-mysql`, `dataway-sqlite`, `dataway-mongo`)
//! implements so the engine can drive any of them identically. Grounded on
//! the teacher's `client::GenericClient` trait (query/execute over a shared
//! abstraction regardless of whether the handle is a direct connection or a
//! pooled one) and on `dbflux_core::traits`'s `Connect`/`HealthCheck`/`Stats`
//! shape for the connection-provider half.

use crate::error::EngineResult;
use crate::plan::QueryPlan;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub dialect: &'static str,
    pub open: u32,
    pub idle: u32,
    pub in_use: u32,
}

#[derive(Debug, Clone)]
pub struct ExecutedRows {
    pub rows: Vec<BTreeMap<String, Value>>,
    /// Present only when the plan was a counted `SELECT` (§4.7 Count).
    pub total: Option<i64>,
}

/// A transaction handle opaque to the engine; providers hand back their own
/// concrete type wrapped behind this marker trait so `nested_write`'s
/// orchestration can thread one through recursive calls without knowing the
/// dialect.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(self: Box<Self>) -> EngineResult<()>;
    async fn rollback(self: Box<Self>) -> EngineResult<()>;
    /// Supplemented feature: per-depth savepoints for the nested-write
    /// processor (SPEC_FULL § Supplemented Features), grounded in
    /// `examples/savepoint/main.rs`.
    async fn savepoint(&self, name: &str) -> EngineResult<()>;
    async fn rollback_to_savepoint(&self, name: &str) -> EngineResult<()>;
    /// Lets `Executor::execute_in_transaction` recover the provider's
    /// concrete transaction type from the opaque handle.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Per-request execution surface a compiled `QueryPlan` runs against.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, plan: &QueryPlan) -> EngineResult<ExecutedRows>;
    async fn begin_transaction(&self) -> EngineResult<Box<dyn Transaction>>;
    async fn execute_in_transaction(&self, tx: &dyn Transaction, plan: &QueryPlan) -> EngineResult<ExecutedRows>;
}

/// Per-dialect connection lifecycle (§4.3). `GetNative`/`GetDocument` return
/// a sentinel error rather than panicking when called against the wrong
/// kind of provider.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self) -> EngineResult<()>;
    async fn close(&self) -> EngineResult<()>;
    /// MUST NOT retry; bounded by a 5-second deadline at the call site.
    async fn health_check(&self) -> EngineResult<()>;
    fn stats(&self) -> PoolStats;
    fn executor(&self) -> &dyn Executor;
}

pub const HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(5);
pub const CONNECT_RETRY_ATTEMPTS: u32 = 3;
pub const CONNECT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const CONNECT_RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Exponential backoff schedule shared by every provider's `Connect` retry
/// loop (§4.3: "retries up to 3 times with exponential backoff (base 1 s,
/// cap 10 s)").
pub fn backoff_delay(attempt: u32) -> Duration {
    let scaled = CONNECT_RETRY_BASE_DELAY.saturating_mul(1 << attempt.min(8));
    scaled.min(CONNECT_RETRY_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_max_delay() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(10), CONNECT_RETRY_MAX_DELAY);
    }
}
