//! The *existing-handle* provider (§4.3): wraps a `dyn ConnectionProvider`
//! created outside the manager (e.g. by application start-up code that
//! already owns a pool). `Connect` only verifies liveness; `Close` transfers
//! ownership back to the caller instead of tearing the handle down;
//! `Stats` reports the dialect generically since the wrapped handle's real
//! identity is opaque to the manager.

use async_trait::async_trait;
use dataway_core::executor::{ConnectionProvider, Executor, PoolStats};
use dataway_core::EngineResult;
use std::sync::Arc;

pub struct ExistingHandleProvider {
    inner: Arc<dyn ConnectionProvider>,
}

impl ExistingHandleProvider {
    pub fn new(inner: Arc<dyn ConnectionProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ConnectionProvider for ExistingHandleProvider {
    async fn connect(&self) -> EngineResult<()> {
        self.inner.health_check().await
    }

    async fn close(&self) -> EngineResult<()> {
        // Ownership is the caller's; the manager does not tear the handle
        // down on its own Close().
        Ok(())
    }

    async fn health_check(&self) -> EngineResult<()> {
        self.inner.health_check().await
    }

    fn stats(&self) -> PoolStats {
        let mut stats = self.inner.stats();
        stats.dialect = "existing-handle";
        stats
    }

    fn executor(&self) -> &dyn Executor {
        self.inner.executor()
    }
}
