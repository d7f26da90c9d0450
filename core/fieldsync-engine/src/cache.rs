//! Field list caching.
//!
//! [`SharedCache`] is the injected key/value backend (in-process or a
//! distributed store). [`FieldDescriptorCache`] layers table-keyed field
//! snapshots on top of it. Backend failures degrade to a cache miss.

use async_trait::async_trait;
use fieldsync_types::{FieldDescriptor, TableRef};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Errors from a shared cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type for cache backend operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// String-keyed cache with per-entry TTL.
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_count: usize,
    pub expired_count: usize,
}

/// In-process [`SharedCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all expired entries.
    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read().await;
        CacheStats {
            total_count: entries.len(),
            expired_count: entries.values().filter(|e| e.expires_at <= now).count(),
        }
    }
}

#[async_trait]
impl SharedCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Table-keyed snapshots of live field lists.
#[derive(Clone)]
pub struct FieldDescriptorCache {
    backend: Arc<dyn SharedCache>,
    namespace: String,
    ttl: Duration,
}

impl FieldDescriptorCache {
    pub fn new(backend: Arc<dyn SharedCache>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            ttl,
        }
    }

    /// Backend key for a table.
    pub fn key(&self, table: &TableRef) -> String {
        format!("{}:fields:{}:{}", self.namespace, table.app_token, table.table_id)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached field list, or `None` on a miss.
    pub async fn get(&self, table: &TableRef) -> Option<Vec<FieldDescriptor>> {
        let key = self.key(table);
        let payload = match self.backend.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Field cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(fields) => Some(fields),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable field cache entry");
                self.invalidate(table).await;
                None
            }
        }
    }

    /// Stores a field list with the configured TTL.
    pub async fn put(&self, table: &TableRef, fields: &[FieldDescriptor]) {
        self.put_with_ttl(table, fields, self.ttl).await;
    }

    pub async fn put_with_ttl(&self, table: &TableRef, fields: &[FieldDescriptor], ttl: Duration) {
        let key = self.key(table);
        let result = match serde_json::to_string(fields) {
            Ok(payload) => self.backend.set(&key, payload, ttl).await,
            Err(e) => Err(CacheError::from(e)),
        };
        match result {
            Ok(()) => debug!(key = %key, count = fields.len(), "Cached field list"),
            Err(e) => warn!(key = %key, error = %e, "Field cache write failed"),
        }
    }

    /// Drops the table's snapshot so the next lookup is fetched fresh.
    pub async fn invalidate(&self, table: &TableRef) {
        let key = self.key(table);
        match self.backend.delete(&key).await {
            Ok(()) => debug!(key = %key, "Invalidated field cache"),
            Err(e) => warn!(key = %key, error = %e, "Field cache invalidation failed"),
        }
    }
}
