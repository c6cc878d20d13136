//! Query-total cache: memoizes COUNT results by a content-hash fingerprint
//! of the count-relevant query inputs, tag-invalidated on write. Uses the
//! same `tokio::sync::RwLock`-guarded in-memory map pattern as
//! `monitor::monitors`'s registry, generalized to carry a TTL and tag index.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct CachedTotal {
    pub total: i64,
    pub computed_at: Instant,
}

#[async_trait::async_trait]
pub trait QueryTotalCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedTotal>;
    async fn set(&self, key: String, value: CachedTotal, tags: Vec<String>, ttl: Duration);
    async fn invalidate_by_tags(&self, tags: &[String]);
}

struct Entry {
    value: CachedTotal,
    tags: Vec<String>,
    expires_at: Instant,
}

/// Default TTL (§3): two minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

#[derive(Default)]
pub struct InMemoryQueryTotalCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryQueryTotalCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl QueryTotalCache for InMemoryQueryTotalCache {
    async fn get(&self, key: &str) -> Option<CachedTotal> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: String, value: CachedTotal, tags: Vec<String>, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key, Entry { value, tags, expires_at: Instant::now() + ttl });
    }

    async fn invalidate_by_tags(&self, tags: &[String]) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(t)));
    }
}

/// Tag set for a table, per §3: `{"schema:<s>", "table:<s.t>"}`.
pub fn table_tags(schema: &str, table: &str) -> Vec<String> {
    vec![format!("schema:{schema}"), format!("table:{schema}.{table}")]
}

/// Content-hash fingerprint of the count-relevant inputs (§3): table,
/// filters, sort, custom-where fragments, expand specs, distinct flag,
/// cursor tokens — passed in pre-serialized by the caller so this module
/// stays plan-shape-agnostic.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_value_before_expiry() {
        let cache = InMemoryQueryTotalCache::new();
        let key = fingerprint(&["public.widgets", "[]"]);
        cache
            .set(key.clone(), CachedTotal { total: 7, computed_at: Instant::now() }, table_tags("public", "widgets"), DEFAULT_TTL)
            .await;
        assert_eq!(cache.get(&key).await.unwrap().total, 7);
    }

    #[tokio::test]
    async fn invalidate_by_tag_removes_matching_entries() {
        let cache = InMemoryQueryTotalCache::new();
        let key = fingerprint(&["public.widgets"]);
        cache
            .set(key.clone(), CachedTotal { total: 7, computed_at: Instant::now() }, table_tags("public", "widgets"), DEFAULT_TTL)
            .await;
        cache.invalidate_by_tags(&["table:public.widgets".to_string()]).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let cache = InMemoryQueryTotalCache::new();
        let key = fingerprint(&["x"]);
        cache
            .set(key.clone(), CachedTotal { total: 1, computed_at: Instant::now() }, vec![], Duration::from_millis(1))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
