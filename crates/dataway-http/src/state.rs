//! Shared request state: the engine plus the connection manager that backs
//! it. Cloned into every handler the way the teacher's CLI passes its pool
//! around by `Arc`.

use dataway_core::Engine;
use dataway_manager::ConnectionManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub manager: Arc<ConnectionManager>,
    /// Name of the connection entries resolve to when a request doesn't ask
    /// for one explicitly. Requests never carry a connection name on the
    /// wire (§6 route template has none), so this is always used.
    pub default_connection: Option<String>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, manager: Arc<ConnectionManager>) -> Self {
        Self { engine, manager, default_connection: None }
    }

    pub fn with_default_connection(mut self, name: impl Into<String>) -> Self {
        self.default_connection = Some(name.into());
        self
    }

    pub async fn executor_provider(&self) -> Result<Arc<dyn dataway_core::executor::ConnectionProvider>, dataway_core::EngineError> {
        match &self.default_connection {
            Some(name) => self.manager.get(name).await,
            None => self.manager.get_default().await,
        }
    }
}
