//! Per-shopper cart session: ledger + persistence + change notification.
//!
//! A [`CartSession`] is owned by whoever handles the shopper's request and is
//! passed around explicitly. Each effective mutation saves the snapshot and
//! then tells every [`LedgerObserver`] before the call returns. No-op
//! mutations do neither.

use std::sync::Arc;

use serde::Serialize;

use crate::ledger::{CartLedger, LedgerChange, LedgerSnapshot};
use crate::product::Product;
use crate::store::LedgerStore;
use crate::types::{CartKey, Money, ProductRef};

/// Emitted after every effective ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub cart_key: CartKey,
    pub change: LedgerChange,
    /// Units in the cart after the change.
    pub item_count: u64,
    /// Subtotal after the change.
    pub subtotal: Money,
}

/// Receives ledger change notifications, synchronously.
pub trait LedgerObserver: Send + Sync {
    fn ledger_changed(&self, event: &LedgerEvent);
}

/// A shopper's cart, bound to its store and observers.
pub struct CartSession {
    key: CartKey,
    ledger: CartLedger,
    store: Arc<dyn LedgerStore>,
    observers: Vec<Arc<dyn LedgerObserver>>,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("key", &self.key)
            .field("ledger", &self.ledger)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// Restore the cart stored under `key`, or start empty.
    ///
    /// A store failure is logged and treated as an empty cart rather than
    /// blocking the shopper.
    pub async fn open(
        key: CartKey,
        store: Arc<dyn LedgerStore>,
        observers: Vec<Arc<dyn LedgerObserver>>,
    ) -> Self {
        let ledger = load_ledger(store.as_ref(), key).await;

        Self {
            key,
            ledger,
            store,
            observers,
        }
    }

    #[must_use]
    pub const fn key(&self) -> CartKey {
        self.key
    }

    #[must_use]
    pub const fn ledger(&self) -> &CartLedger {
        &self.ledger
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.ledger.subtotal()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.ledger.item_count()
    }

    /// See [`CartLedger::add`].
    pub async fn add(&mut self, product: &Product, quantity: u32) -> Option<LedgerChange> {
        let change = self.ledger.add(product, quantity);
        self.commit(change).await
    }

    /// See [`CartLedger::update_quantity`].
    pub async fn update_quantity(
        &mut self,
        product_ref: &ProductRef,
        new_quantity: i64,
    ) -> Option<LedgerChange> {
        let change = self.ledger.update_quantity(product_ref, new_quantity);
        self.commit(change).await
    }

    /// See [`CartLedger::remove`].
    pub async fn remove(&mut self, product_ref: &ProductRef) -> Option<LedgerChange> {
        let change = self.ledger.remove(product_ref);
        self.commit(change).await
    }

    /// See [`CartLedger::clear`].
    pub async fn clear(&mut self) -> Option<LedgerChange> {
        let change = self.ledger.clear();
        self.commit(change).await
    }

    /// Take the lines of an accepted order out of the cart.
    ///
    /// The stored cart is reloaded first: if it still matches `ordered` it is
    /// cleared, otherwise only the ordered quantities are removed and anything
    /// changed in the meantime stays.
    pub async fn settle(&mut self, ordered: &LedgerSnapshot) -> Vec<LedgerChange> {
        self.ledger = load_ledger(self.store.as_ref(), self.key).await;

        if self.ledger.snapshot() == *ordered {
            return self.clear().await.into_iter().collect();
        }

        let mut changes = Vec::new();
        for line in ordered.lines() {
            let Some(current) = self.ledger.line(&line.product_ref) else {
                continue;
            };
            let remaining = i64::from(current.quantity) - i64::from(line.quantity);
            let change = self.ledger.update_quantity(&line.product_ref, remaining);
            if let Some(change) = self.commit(change).await {
                changes.push(change);
            }
        }
        tracing::info!(
            cart_key = %self.key,
            kept = self.ledger.len(),
            "Cart changed during checkout, kept unordered items"
        );
        changes
    }

    async fn commit(&self, change: Option<LedgerChange>) -> Option<LedgerChange> {
        let change = change?;

        if let Err(e) = self.store.save(&self.key, &self.ledger.snapshot()).await {
            tracing::warn!(cart_key = %self.key, error = %e, "Failed to persist cart");
        }

        let event = LedgerEvent {
            cart_key: self.key,
            change: change.clone(),
            item_count: self.ledger.item_count(),
            subtotal: self.ledger.subtotal(),
        };
        for observer in &self.observers {
            observer.ledger_changed(&event);
        }

        Some(change)
    }
}

async fn load_ledger(store: &dyn LedgerStore, key: CartKey) -> CartLedger {
    match store.load(&key).await {
        Ok(Some(snapshot)) => CartLedger::from_snapshot(snapshot),
        Ok(None) => CartLedger::new(),
        Err(e) => {
            tracing::warn!(cart_key = %key, error = %e, "Failed to load cart, starting empty");
            CartLedger::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::product::fixtures::product;
    use crate::store::StoreError;

    #[derive(Default)]
    struct MapStore {
        data: Mutex<HashMap<CartKey, LedgerSnapshot>>,
        saves: Mutex<usize>,
    }

    #[async_trait]
    impl LedgerStore for MapStore {
        async fn save(&self, key: &CartKey, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
            *self.saves.lock().unwrap() += 1;
            self.data.lock().unwrap().insert(*key, snapshot.clone());
            Ok(())
        }

        async fn load(&self, key: &CartKey) -> Result<Option<LedgerSnapshot>, StoreError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl LedgerStore for BrokenStore {
        async fn save(&self, _: &CartKey, _: &LedgerSnapshot) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn load(&self, _: &CartKey) -> Result<Option<LedgerSnapshot>, StoreError> {
            Err(StoreError::Corrupt("bad json".to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LedgerEvent>>);

    impl LedgerObserver for Recorder {
        fn ledger_changed(&self, event: &LedgerEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn watching(recorder: &Arc<Recorder>) -> Vec<Arc<dyn LedgerObserver>> {
        vec![Arc::clone(recorder) as Arc<dyn LedgerObserver>]
    }

    #[tokio::test]
    async fn test_mutations_persist_and_notify() {
        let store = Arc::new(MapStore::default());
        let recorder = Arc::new(Recorder::default());
        let key = CartKey::generate();
        let mut session = CartSession::open(key, store.clone(), watching(&recorder)).await;

        let p = product("scalpel", 1_500, None);
        session.add(&p, 2).await;
        session.update_quantity(&p.id, 3).await;

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].item_count, 3);
        assert_eq!(events[1].subtotal, Money::from_cents(4_500));
        assert_eq!(events[1].cart_key, key);

        let stored = store.load(&key).await.unwrap().unwrap();
        assert_eq!(stored, session.ledger().snapshot());
    }

    #[tokio::test]
    async fn test_noop_mutations_are_silent() {
        let store = Arc::new(MapStore::default());
        let recorder = Arc::new(Recorder::default());
        let mut session =
            CartSession::open(CartKey::generate(), store.clone(), watching(&recorder)).await;

        assert_eq!(session.remove(&ProductRef::new("absent")).await, None);
        assert_eq!(session.add(&product("a", 100, None), 0).await, None);
        assert_eq!(session.clear().await, None);

        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(*store.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_restores_identical_ledger() {
        let store = Arc::new(MapStore::default());
        let key = CartKey::generate();
        let mut first = CartSession::open(key, store.clone(), Vec::new()).await;
        first.add(&product("b", 200, Some(4)), 1).await;
        first.add(&product("a", 100, None), 5).await;

        let second = CartSession::open(key, store, Vec::new()).await;
        assert_eq!(second.ledger(), first.ledger());
    }

    #[tokio::test]
    async fn test_broken_store_degrades_gracefully() {
        let recorder = Arc::new(Recorder::default());
        let mut session =
            CartSession::open(CartKey::generate(), Arc::new(BrokenStore), watching(&recorder))
                .await;
        assert!(session.ledger().is_empty());

        let change = session.add(&product("a", 100, None), 1).await;
        assert!(change.is_some());
        assert_eq!(session.item_count(), 1);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settle_clears_unchanged_cart() {
        let store = Arc::new(MapStore::default());
        let key = CartKey::generate();
        let mut cart = CartSession::open(key, store.clone(), Vec::new()).await;
        cart.add(&product("a", 100, None), 2).await;
        let ordered = cart.ledger().snapshot();

        let changes = cart.settle(&ordered).await;

        assert_eq!(changes, vec![LedgerChange::Cleared]);
        assert!(cart.ledger().is_empty());
        assert!(store.load(&key).await.unwrap().unwrap().lines().is_empty());
    }

    #[tokio::test]
    async fn test_settle_keeps_items_added_meanwhile() {
        let store = Arc::new(MapStore::default());
        let key = CartKey::generate();
        let mut checkout = CartSession::open(key, store.clone(), Vec::new()).await;
        checkout.add(&product("a", 100, None), 2).await;
        let ordered = checkout.ledger().snapshot();

        // Another request on the same cart while the order is in flight.
        let mut other = CartSession::open(key, store.clone(), Vec::new()).await;
        other.add(&product("a", 100, None), 1).await;
        other.add(&product("b", 500, None), 1).await;

        checkout.settle(&ordered).await;

        let kept = CartSession::open(key, store, Vec::new()).await;
        assert_eq!(kept.ledger().len(), 2);
        assert_eq!(kept.ledger().line(&ProductRef::new("a")).unwrap().quantity, 1);
        assert_eq!(kept.ledger().line(&ProductRef::new("b")).unwrap().quantity, 1);
        assert_eq!(checkout.ledger(), kept.ledger());
    }
}
