//! Response cache
//!
//! Holds the most recent `list()` result per resource kind for the lifetime of
//! a run. The lock is held while a missing entry is loaded, so concurrent
//! callers trigger a single `list()` and an invalidation can never interleave
//! with a load.

use crate::error::Result;
use crate::resource::Resource;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type CachedList = Arc<Vec<Resource>>;

#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, CachedList>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached list for `kind`, loading it on a miss.
    /// A failed load leaves the entry empty.
    pub async fn get_or_populate<F, Fut>(&self, kind: &str, load: F) -> Result<CachedList>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Resource>>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(cached) = entries.get(kind) {
            tracing::trace!("Cache hit for {}", kind);
            return Ok(cached.clone());
        }

        tracing::debug!("Cache miss for {}, listing", kind);
        let loaded: CachedList = Arc::new(load().await?);
        entries.insert(kind.to_string(), loaded.clone());
        Ok(loaded)
    }

    pub async fn invalidate(&self, kind: &str) {
        if self.entries.lock().await.remove(kind).is_some() {
            tracing::debug!("Invalidated cached {} list", kind);
        }
    }

    pub async fn contains(&self, kind: &str) -> bool {
        self.entries.lock().await.contains_key(kind)
    }
}
