//! Checkout: build the order, submit it, clear the cart.
//!
//! The flow for one cart:
//!
//! 1. Resolve pricing settings (fallback on failure)
//! 2. Build the order record from the ledger and form
//! 3. Submit it to the order sink, bounded by a timeout
//! 4. On acceptance, remove the ordered lines from the stored ledger
//!
//! Any failure before acceptance leaves the ledger exactly as it was so the
//! shopper can retry. Only one submission per cart may be in flight.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use medpro_core::{
    CartKey, CartSession, CheckoutForm, Money, OrderConfirmation, OrderError, OrderSink,
    SettingsSource, SinkError, build_order, resolve_pricing,
};

/// Why a checkout did not produce an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Another submission for this cart has not finished yet.
    #[error("an order for this cart is already being placed")]
    AlreadyPending,

    /// The cart or form failed validation.
    #[error(transparent)]
    Invalid(#[from] OrderError),

    /// The order backend refused or could not take the order.
    #[error(transparent)]
    Submission(#[from] SinkError),

    /// The order backend did not answer in time.
    #[error("order submission timed out after {0:?}")]
    TimedOut(Duration),
}

/// An accepted order, as reported back to the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub confirmation: OrderConfirmation,
    pub total: Money,
}

/// Carts with a submission in flight.
#[derive(Debug, Clone, Default)]
pub struct PendingCheckouts {
    carts: Arc<Mutex<HashSet<CartKey>>>,
}

impl PendingCheckouts {
    /// Mark `key` as pending. Returns `None` if it already is.
    ///
    /// The mark is released when the guard drops, including when the
    /// request future is cancelled.
    #[must_use]
    pub fn begin(&self, key: CartKey) -> Option<PendingGuard> {
        let inserted = self
            .carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        inserted.then(|| PendingGuard {
            carts: Arc::clone(&self.carts),
            key,
        })
    }

    #[must_use]
    pub fn contains(&self, key: &CartKey) -> bool {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases a pending mark on drop.
#[derive(Debug)]
pub struct PendingGuard {
    carts: Arc<Mutex<HashSet<CartKey>>>,
    key: CartKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Places orders for cart sessions.
#[derive(Clone)]
pub struct CheckoutService {
    settings: Arc<dyn SettingsSource>,
    orders: Arc<dyn OrderSink>,
    submit_timeout: Duration,
    pending: PendingCheckouts,
}

impl std::fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("submit_timeout", &self.submit_timeout)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        orders: Arc<dyn OrderSink>,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            settings,
            orders,
            submit_timeout,
            pending: PendingCheckouts::default(),
        }
    }

    /// Whether a submission for `key` is currently in flight.
    #[must_use]
    pub fn is_pending(&self, key: &CartKey) -> bool {
        self.pending.contains(key)
    }

    /// Place an order for everything in `cart`.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`]; in every error case the cart is unchanged.
    #[instrument(skip(self, cart, form), fields(cart_key = %cart.key(), items = cart.ledger().len()))]
    pub async fn place_order(
        &self,
        cart: &mut CartSession,
        form: &CheckoutForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let _guard = self
            .pending
            .begin(cart.key())
            .ok_or(CheckoutError::AlreadyPending)?;

        let settings = resolve_pricing(self.settings.as_ref()).await;
        let order = build_order(cart.ledger(), form, &settings, Utc::now())?;
        let ordered = cart.ledger().snapshot();
        let total = order.pricing().total;

        let confirmation =
            match tokio::time::timeout(self.submit_timeout, self.orders.submit(&order)).await {
                Ok(Ok(confirmation)) => confirmation,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Order submission failed, cart kept");
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::warn!(timeout = ?self.submit_timeout, "Order submission timed out, cart kept");
                    return Err(CheckoutError::TimedOut(self.submit_timeout));
                }
            };

        tracing::info!(
            order_id = %confirmation.order_id,
            order_number = %confirmation.order_number,
            total = %total,
            "Order placed"
        );
        cart.settle(&ordered).await;

        Ok(PlacedOrder {
            confirmation,
            total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use async_trait::async_trait;

    use medpro_core::{
        LedgerStore, OrderId, OrderNumber, OrderRecord, PricingSettings, Product, ProductRef,
        SettingsUnavailable,
    };

    use super::*;
    use crate::config::CartConfig;
    use crate::services::MemoryLedgerStore;

    struct Settings(Option<PricingSettings>);

    #[async_trait]
    impl SettingsSource for Settings {
        async fn pricing_settings(&self) -> Result<PricingSettings, SettingsUnavailable> {
            self.0
                .clone()
                .ok_or_else(|| SettingsUnavailable("offline".to_string()))
        }
    }

    #[derive(Default)]
    struct Sink {
        received: Mutex<Vec<OrderRecord>>,
        fail_with: Option<SinkError>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl OrderSink for Sink {
        async fn submit(&self, order: &OrderRecord) -> Result<OrderConfirmation, SinkError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.received.lock().unwrap().push(order.clone());
            Ok(OrderConfirmation {
                order_id: OrderId::new("order-1"),
                order_number: OrderNumber::new("MP-20260101-AAAAAA"),
            })
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            email: "buyer@clinic.example".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            phone: "555-0199".to_string(),
            address: "9 Harbor Rd".to_string(),
            city: "Arlington".to_string(),
            state: "VA".to_string(),
            zip_code: "22201".to_string(),
            notes: Some("Leave at reception".to_string()),
        }
    }

    fn product(cents: i64) -> Product {
        Product {
            id: ProductRef::new("stethoscope"),
            title: "Stethoscope".to_string(),
            slug: None,
            price: Money::from_cents(cents),
            original_price: None,
            stock: None,
            images: Vec::new(),
            is_featured: false,
            brand: None,
            material: None,
            category: None,
        }
    }

    async fn cart_with(cents: i64, quantity: u32) -> (CartSession, Arc<MemoryLedgerStore>) {
        let store = Arc::new(MemoryLedgerStore::new(&CartConfig::default()));
        let mut cart = CartSession::open(CartKey::generate(), store.clone(), Vec::new()).await;
        cart.add(&product(cents), quantity).await;
        (cart, store)
    }

    fn service(settings: Option<PricingSettings>, sink: Arc<Sink>) -> CheckoutService {
        CheckoutService::new(Arc::new(Settings(settings)), sink, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_success_clears_cart() {
        let sink = Arc::new(Sink::default());
        let service = service(Some(PricingSettings::fallback()), sink.clone());
        let (mut cart, store) = cart_with(10_000, 1).await;

        let placed = service.place_order(&mut cart, &form()).await.unwrap();

        assert_eq!(placed.confirmation.order_number.as_str(), "MP-20260101-AAAAAA");
        // 100 + 25 shipping + 8 tax
        assert_eq!(placed.total, Money::from_cents(13_300));
        assert!(cart.ledger().is_empty());
        assert!(store.load(&cart.key()).await.unwrap().is_none());
        assert_eq!(sink.received.lock().unwrap().len(), 1);
        assert!(!service.is_pending(&cart.key()));
    }

    #[tokio::test]
    async fn test_item_added_during_submission_is_kept() {
        let sink = Arc::new(Sink {
            delay: Some(Duration::from_millis(200)),
            ..Sink::default()
        });
        let service = service(None, sink.clone());
        let (mut cart, store) = cart_with(2_000, 1).await;
        let key = cart.key();
        let otoscope = Product {
            id: ProductRef::new("otoscope"),
            ..product(4_000)
        };

        let order_form = form();
        let (placed, ()) = tokio::join!(service.place_order(&mut cart, &order_form), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut other = CartSession::open(key, store.clone(), Vec::new()).await;
            other.add(&otoscope, 1).await;
        });

        placed.unwrap();
        let ordered = sink.received.lock().unwrap()[0].items().len();
        assert_eq!(ordered, 1);

        let kept = CartSession::open(key, store, Vec::new()).await;
        assert_eq!(kept.ledger().len(), 1);
        assert!(kept.ledger().line(&otoscope.id).is_some());
    }

    #[tokio::test]
    async fn test_settings_outage_uses_fallback() {
        let sink = Arc::new(Sink::default());
        let service = service(None, sink.clone());
        let (mut cart, _) = cart_with(48_000, 1).await;

        let placed = service.place_order(&mut cart, &form()).await.unwrap();
        // 480 + 25 + 38.40
        assert_eq!(placed.total, Money::from_cents(54_340));
    }

    #[tokio::test]
    async fn test_rejection_keeps_cart() {
        let sink = Arc::new(Sink {
            fail_with: Some(SinkError::Rejected("invalid reference".to_string())),
            ..Sink::default()
        });
        let service = service(Some(PricingSettings::fallback()), sink);
        let (mut cart, _) = cart_with(2_000, 3).await;
        let before = cart.ledger().clone();

        let err = service.place_order(&mut cart, &form()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Submission(SinkError::Rejected(_))));
        assert_eq!(cart.ledger(), &before);
    }

    #[tokio::test]
    async fn test_timeout_keeps_cart() {
        let sink = Arc::new(Sink {
            delay: Some(Duration::from_secs(5)),
            ..Sink::default()
        });
        let service = CheckoutService::new(
            Arc::new(Settings(None)),
            sink,
            Duration::from_millis(20),
        );
        let (mut cart, _) = cart_with(2_000, 1).await;

        let err = service.place_order(&mut cart, &form()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::TimedOut(_)));
        assert_eq!(cart.item_count(), 1);
        assert!(!service.is_pending(&cart.key()));
    }

    #[tokio::test]
    async fn test_invalid_form_never_submits() {
        let sink = Arc::new(Sink::default());
        let service = service(None, sink.clone());
        let (mut cart, _) = cart_with(2_000, 1).await;
        let mut form = form();
        form.email = "not-an-email".to_string();

        let err = service.place_order(&mut cart, &form).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Invalid(OrderError::InvalidEmail(_))));
        assert!(sink.received.lock().unwrap().is_empty());
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let sink = Arc::new(Sink::default());
        let service = service(None, sink);
        let store = Arc::new(MemoryLedgerStore::new(&CartConfig::default()));
        let mut cart = CartSession::open(CartKey::generate(), store, Vec::new()).await;

        let err = service.place_order(&mut cart, &form()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(OrderError::EmptyCart)));
    }

    #[test]
    fn test_pending_guard_releases_on_drop() {
        let pending = PendingCheckouts::default();
        let key = CartKey::generate();

        let guard = pending.begin(key).unwrap();
        assert!(pending.contains(&key));
        assert!(pending.begin(key).is_none());

        drop(guard);
        assert!(!pending.contains(&key));
        assert!(pending.begin(key).is_some());
    }
}
