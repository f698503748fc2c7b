//! Application state shared across handlers.

use std::sync::Arc;

use medpro_core::{
    CartKey, CartSession, LedgerObserver, LedgerStore, OrderSink, ProductSource, SettingsSource,
};

use crate::config::StorefrontConfig;
use crate::sanity::{SanityClient, SanityError};
use crate::services::{BreadcrumbObserver, CheckoutService, MemoryLedgerStore};

/// The external collaborators the storefront talks to.
///
/// Production wires every source to the Sanity client; tests substitute
/// in-memory fakes.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn ProductSource>,
    pub settings: Arc<dyn SettingsSource>,
    pub orders: Arc<dyn OrderSink>,
    pub carts: Arc<dyn LedgerStore>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like backend clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
    checkout: CheckoutService,
    observers: Vec<Arc<dyn LedgerObserver>>,
}

impl AppState {
    /// Create the production application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Sanity client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, SanityError> {
        let sanity = Arc::new(SanityClient::new(&config.sanity)?);
        let carts = Arc::new(MemoryLedgerStore::new(&config.cart));

        let backends = Backends {
            catalog: sanity.clone(),
            settings: sanity.clone(),
            orders: sanity,
            carts,
        };
        Ok(Self::with_backends(config, backends))
    }

    /// Create application state over explicit collaborators.
    #[must_use]
    pub fn with_backends(config: StorefrontConfig, backends: Backends) -> Self {
        let checkout = CheckoutService::new(
            Arc::clone(&backends.settings),
            Arc::clone(&backends.orders),
            config.order_submit_timeout,
        );
        let observers = vec![Arc::new(BreadcrumbObserver) as Arc<dyn LedgerObserver>];

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                checkout,
                observers,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn ProductSource {
        self.inner.backends.catalog.as_ref()
    }

    /// Store settings.
    #[must_use]
    pub fn settings(&self) -> &dyn SettingsSource {
        self.inner.backends.settings.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Open the cart stored under `key`, wired to the shared store and
    /// observers.
    pub async fn open_cart(&self, key: CartKey) -> CartSession {
        CartSession::open(
            key,
            Arc::clone(&self.inner.backends.carts),
            self.inner.observers.clone(),
        )
        .await
    }
}
