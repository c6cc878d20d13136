//! Connection manager (§4.4): a name-keyed map of connections, a singleton
//! accessor, and a background health loop with optional auto-reconnect.

use dataway_core::executor::ConnectionProvider;
use dataway_core::{EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(15);

struct Entry {
    provider: Arc<dyn ConnectionProvider>,
}

pub struct ConnectionManager {
    connections: RwLock<HashMap<String, Entry>>,
    default_name: RwLock<Option<String>>,
    health_check_interval: Duration,
    enable_auto_reconnect: bool,
    health_loop: RwLock<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

static SINGLETON: OnceLock<Arc<ConnectionManager>> = OnceLock::new();

impl ConnectionManager {
    pub fn new(health_check_interval: Duration, enable_auto_reconnect: bool) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            default_name: RwLock::new(None),
            health_check_interval,
            enable_auto_reconnect,
            health_loop: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Installs this manager as the process-wide singleton. Re-initialization
    /// is rejected (§4.4).
    pub fn install(self: Arc<Self>) -> Result<(), Arc<ConnectionManager>> {
        SINGLETON.set(self)
    }

    pub fn global() -> Option<Arc<ConnectionManager>> {
        SINGLETON.get().cloned()
    }

    pub async fn register(&self, name: impl Into<String>, provider: Arc<dyn ConnectionProvider>) {
        let name = name.into();
        let mut guard = self.connections.write().await;
        let mut default_guard = self.default_name.write().await;
        if default_guard.is_none() {
            *default_guard = Some(name.clone());
        }
        guard.insert(name, Entry { provider });
    }

    pub async fn set_default(&self, name: &str) -> EngineResult<()> {
        let guard = self.connections.read().await;
        if !guard.contains_key(name) {
            return Err(EngineError::NotFound(format!("no connection named '{name}'")));
        }
        drop(guard);
        *self.default_name.write().await = Some(name.to_string());
        Ok(())
    }

    pub async fn get(&self, name: &str) -> EngineResult<Arc<dyn ConnectionProvider>> {
        self.connections
            .read()
            .await
            .get(name)
            .map(|e| e.provider.clone())
            .ok_or_else(|| EngineError::NotFound(format!("no connection named '{name}'")))
    }

    pub async fn get_default(&self) -> EngineResult<Arc<dyn ConnectionProvider>> {
        let name = self.default_name.read().await.clone().ok_or_else(|| {
            EngineError::Internal("no default connection configured".into())
        })?;
        self.get(&name).await
    }

    pub async fn get_all(&self) -> Vec<(String, Arc<dyn ConnectionProvider>)> {
        self.connections.read().await.iter().map(|(k, v)| (k.clone(), v.provider.clone())).collect()
    }

    /// Fans out `Connect` to every configured provider.
    pub async fn connect_all(&self) -> EngineResult<()> {
        let entries = self.get_all().await;
        for (name, provider) in entries {
            provider.connect().await.map_err(|e| {
                EngineError::ServiceUnavailable(format!("connection '{name}' failed to connect: {e}"))
            })?;
        }
        Ok(())
    }

    pub async fn health_check_all(&self) -> HashMap<String, EngineResult<()>> {
        let entries = self.get_all().await;
        let mut results = HashMap::new();
        for (name, provider) in entries {
            results.insert(name, provider.health_check().await);
        }
        results
    }

    /// Starts the background health loop. Calling this twice is a no-op;
    /// stop the existing loop with `close()` first.
    pub fn spawn_health_loop(self: &Arc<Self>) {
        let manager = self.clone();
        let interval = self.health_check_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if manager.closed.load(Ordering::Acquire) {
                    return;
                }
                let results = manager.health_check_all().await;
                for (name, result) in results {
                    if let Err(err) = result {
                        tracing::warn!(connection = %name, error = %err, "health check failed");
                        if manager.enable_auto_reconnect {
                            if let Err(reconnect_err) = manager.reconnect(&name).await {
                                tracing::warn!(connection = %name, error = %reconnect_err, "reconnect failed");
                            }
                        }
                    }
                }
            }
        });
        // spawn_health_loop is called at most once per manager in normal
        // startup; replacing a prior handle silently would leak a task, so
        // this only stores the handle if none is set yet.
        if let Ok(mut guard) = self.health_loop.try_write() {
            if guard.is_none() {
                *guard = Some(handle);
            } else {
                handle.abort();
            }
        } else {
            handle.abort();
        }
    }

    async fn reconnect(&self, name: &str) -> EngineResult<()> {
        let provider = self.get(name).await?;
        provider.close().await?;
        provider.connect().await
    }

    /// Drains the health loop before returning (§4.4 invariant). After
    /// `close()`, no subsequent operation is valid.
    pub async fn close(&self) -> EngineResult<()> {
        self.closed.store(true, Ordering::Release);
        if let Some(handle) = self.health_loop.write().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        let entries = self.get_all().await;
        for (name, provider) in entries {
            if let Err(err) = provider.close().await {
                tracing::warn!(connection = %name, error = %err, "error closing connection");
            }
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataway_core::executor::{ExecutedRows, Executor, PoolStats};
    use dataway_core::plan::QueryPlan;
    use async_trait::async_trait;

    struct StubExecutor;

    #[async_trait]
    impl Executor for StubExecutor {
        async fn execute(&self, _plan: &QueryPlan) -> EngineResult<ExecutedRows> {
            Ok(ExecutedRows { rows: vec![], total: Some(0) })
        }
        async fn begin_transaction(&self) -> EngineResult<Box<dyn dataway_core::executor::Transaction>> {
            Err(EngineError::Internal("not supported".into()))
        }
        async fn execute_in_transaction(
            &self,
            _tx: &dyn dataway_core::executor::Transaction,
            _plan: &QueryPlan,
        ) -> EngineResult<ExecutedRows> {
            Err(EngineError::Internal("not supported".into()))
        }
    }

    struct StubProvider {
        executor: StubExecutor,
        healthy: AtomicBool,
    }

    #[async_trait]
    impl ConnectionProvider for StubProvider {
        async fn connect(&self) -> EngineResult<()> {
            Ok(())
        }
        async fn close(&self) -> EngineResult<()> {
            Ok(())
        }
        async fn health_check(&self) -> EngineResult<()> {
            if self.healthy.load(Ordering::Acquire) {
                Ok(())
            } else {
                Err(EngineError::ServiceUnavailable("down".into()))
            }
        }
        fn stats(&self) -> PoolStats {
            PoolStats::default()
        }
        fn executor(&self) -> &dyn Executor {
            &self.executor
        }
    }

    #[tokio::test]
    async fn first_registered_connection_becomes_default() {
        let manager = ConnectionManager::new(DEFAULT_HEALTH_CHECK_INTERVAL, false);
        let provider = Arc::new(StubProvider { executor: StubExecutor, healthy: AtomicBool::new(true) });
        manager.register("primary", provider).await;
        assert!(manager.get_default().await.is_ok());
    }

    #[tokio::test]
    async fn unknown_connection_name_is_not_found() {
        let manager = ConnectionManager::new(DEFAULT_HEALTH_CHECK_INTERVAL, false);
        assert!(manager.get("missing").await.is_err());
    }

    #[tokio::test]
    async fn close_marks_manager_closed() {
        let manager = ConnectionManager::new(DEFAULT_HEALTH_CHECK_INTERVAL, false);
        manager.close().await.unwrap();
        assert!(manager.is_closed());
    }
}
