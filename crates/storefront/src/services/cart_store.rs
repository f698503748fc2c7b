//! In-memory cart persistence.
//!
//! Carts live in a `moka` cache keyed by [`CartKey`]. Entries expire after
//! the configured idle period and the oldest are evicted past the capacity
//! limit. Nothing survives a restart.

use async_trait::async_trait;
use moka::future::Cache;

use medpro_core::{CartKey, LedgerSnapshot, LedgerStore, StoreError};

use crate::config::CartConfig;

/// A [`LedgerStore`] backed by a bounded, idle-expiring cache.
#[derive(Clone)]
pub struct MemoryLedgerStore {
    carts: Cache<CartKey, LedgerSnapshot>,
}

impl std::fmt::Debug for MemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedgerStore")
            .field("entries", &self.carts.entry_count())
            .finish()
    }
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        let carts = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_idle(config.idle_ttl)
            .build();
        Self { carts }
    }

    /// Number of stored carts.
    pub async fn len(&self) -> u64 {
        self.carts.run_pending_tasks().await;
        self.carts.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn save(&self, key: &CartKey, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        // An empty cart and an absent cart load the same way.
        if snapshot.lines().is_empty() {
            self.carts.invalidate(key).await;
        } else {
            self.carts.insert(*key, snapshot.clone()).await;
        }
        Ok(())
    }

    async fn load(&self, key: &CartKey) -> Result<Option<LedgerSnapshot>, StoreError> {
        Ok(self.carts.get(key).await)
    }
}
