//! Hook registry & dispatcher (§4.9). Grounded on the teacher's
//! `monitor::QueryHook`/`TracingSqlHook` seam (async trait objects invoked in
//! registration order), generalized from "observe a query" to "observe and
//! possibly rewrite/abort a lifecycle phase."

use crate::error::EngineError;
use crate::options::RequestOptions;
use crate::plan::QueryPlan;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookKind {
    BeforeHandle,
    BeforeRead,
    AfterRead,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    BeforeScan,
}

impl HookKind {
    pub const ALL: [HookKind; 10] = [
        HookKind::BeforeHandle,
        HookKind::BeforeRead,
        HookKind::AfterRead,
        HookKind::BeforeCreate,
        HookKind::AfterCreate,
        HookKind::BeforeUpdate,
        HookKind::AfterUpdate,
        HookKind::BeforeDelete,
        HookKind::AfterDelete,
        HookKind::BeforeScan,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

/// Mutable record threaded through a hook chain (§3 "Hook context"). Hooks
/// may replace `query`, `data`, and `result`; downstream stages use the
/// replacement, never the original.
pub struct HookContext {
    pub schema: String,
    pub entity: String,
    pub table: String,
    pub operation: OperationKind,
    pub target_id: Option<Value>,
    pub options: RequestOptions,
    /// Write payload, absent for reads.
    pub data: Option<serde_json::Value>,
    /// The compiled-so-far query plan; `None` before the compiler has run.
    pub query: Option<QueryPlan>,
    /// Result of execution, populated after `BeforeScan` runs and the
    /// dialect executor returns rows.
    pub result: Option<serde_json::Value>,
    abort: bool,
    abort_status: u16,
    abort_message: String,
}

impl HookContext {
    pub fn new(schema: impl Into<String>, entity: impl Into<String>, table: impl Into<String>, operation: OperationKind, options: RequestOptions) -> Self {
        Self {
            schema: schema.into(),
            entity: entity.into(),
            table: table.into(),
            operation,
            target_id: None,
            options,
            data: None,
            query: None,
            result: None,
            abort: false,
            abort_status: 403,
            abort_message: String::new(),
        }
    }

    /// §3: "if `Abort=true` after any hook returns, the operation
    /// terminates." Callers set an explicit status/message override.
    pub fn abort(&mut self, status: u16, message: impl Into<String>) {
        self.abort = true;
        self.abort_status = status;
        self.abort_message = message.into();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort
    }

    pub fn abort_error(&self) -> EngineError {
        EngineError::aborted(self.abort_status, self.abort_message.clone())
    }
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: &mut HookContext) -> Result<(), EngineError>;
}

/// Ordered chains per lifecycle point, populated at registration and never
/// mutated again (§5: "the hook registry ... guarded by a reader-writer
/// lock, write only at registration/setup").
#[derive(Default, Clone)]
pub struct HookRegistry {
    chains: BTreeMap<HookKind, Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: HookKind, hook: Arc<dyn Hook>) {
        self.chains.entry(kind).or_default().push(hook);
    }

    pub fn count(&self, kind: HookKind) -> usize {
        self.chains.get(&kind).map(Vec::len).unwrap_or(0)
    }

    /// `Execute(type, ctx)` (§4.9): runs handlers in insertion order; stops
    /// at the first error or abort.
    pub async fn execute(&self, kind: HookKind, ctx: &mut HookContext) -> Result<(), EngineError> {
        let Some(chain) = self.chains.get(&kind) else {
            return Ok(());
        };
        for hook in chain {
            hook.call(ctx).await?;
            if ctx.is_aborted() {
                return Err(ctx.abort_error());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysAbort;

    #[async_trait]
    impl Hook for AlwaysAbort {
        async fn call(&self, ctx: &mut HookContext) -> Result<(), EngineError> {
            ctx.abort(403, "nope");
            Ok(())
        }
    }

    struct ShouldNotRun(Arc<std::sync::atomic::AtomicBool>);

    #[async_trait]
    impl Hook for ShouldNotRun {
        async fn call(&self, _ctx: &mut HookContext) -> Result<(), EngineError> {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn abort_short_circuits_downstream_hooks() {
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut registry = HookRegistry::new();
        registry.register(HookKind::BeforeRead, Arc::new(AlwaysAbort));
        registry.register(HookKind::BeforeRead, Arc::new(ShouldNotRun(ran.clone())));

        let mut ctx = HookContext::new("public", "widgets", "widgets", OperationKind::Read, RequestOptions::default());
        let result = registry.execute(HookKind::BeforeRead, &mut ctx).await;
        assert!(result.is_err());
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_chain_is_a_no_op() {
        let registry = HookRegistry::new();
        let mut ctx = HookContext::new("public", "widgets", "widgets", OperationKind::Read, RequestOptions::default());
        assert!(registry.execute(HookKind::BeforeRead, &mut ctx).await.is_ok());
    }
}
