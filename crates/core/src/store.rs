//! Persistence contract for cart ledgers.
//!
//! Any key-value store can back a cart as long as it can save and load a
//! [`LedgerSnapshot`] under a [`CartKey`]. Concurrent writers to the same key
//! are last-writer-wins; there is no conflict resolution.

use async_trait::async_trait;

use crate::ledger::LedgerSnapshot;
use crate::types::CartKey;

/// Errors from a ledger store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// A stored snapshot could not be decoded.
    #[error("corrupt ledger snapshot: {0}")]
    Corrupt(String),
}

/// Key-value persistence for cart snapshots.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Store `snapshot` under `key`, replacing any previous value.
    async fn save(&self, key: &CartKey, snapshot: &LedgerSnapshot) -> Result<(), StoreError>;

    /// Fetch the snapshot stored under `key`, if any.
    async fn load(&self, key: &CartKey) -> Result<Option<LedgerSnapshot>, StoreError>;
}
