//! Integration tests for the MedPro storefront.
//!
//! The tests drive the real application router in-process with
//! `tower::ServiceExt::oneshot`, carrying the session cookie between calls
//! like a browser would. Every external collaborator is replaced by an
//! in-memory fake that the test can inspect and steer.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p medpro-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `products_api` - Catalog listing, detail and health checks
//! - `cart_api` - Cart mutations, stock rules and pricing
//! - `checkout_api` - Order placement and failure recovery

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use medpro_core::{
    Money, OrderConfirmation, OrderId, OrderNumber, OrderRecord, OrderSink,
    PricingSettings, Product, ProductQuery, ProductRef, ProductSource, SettingsSource,
    SettingsUnavailable, SinkError, SourceError,
};
use medpro_storefront::config::{CartConfig, SanityConfig, StorefrontConfig};
use medpro_storefront::services::MemoryLedgerStore;
use medpro_storefront::{AppState, Backends, app};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Fixtures
// =============================================================================

/// A product with the given price in cents and optional stock count.
#[must_use]
pub fn product(id: &str, cents: i64, stock: Option<u32>) -> Product {
    Product {
        id: ProductRef::new(id),
        title: format!("Product {id}"),
        slug: Some(id.to_string()),
        price: Money::from_cents(cents),
        original_price: None,
        stock,
        images: vec![format!("https://cdn.sanity.io/images/{id}.jpg")],
        is_featured: false,
        brand: None,
        material: None,
        category: None,
    }
}

/// A complete, valid checkout form.
#[must_use]
pub fn checkout_form() -> Value {
    serde_json::json!({
        "email": "orders@riverside-clinic.example",
        "firstName": "Mary",
        "lastName": "Seacole",
        "phone": "555-0142",
        "address": "12 Riverside Way",
        "city": "Portland",
        "state": "OR",
        "zipCode": "97201",
        "notes": "Deliver to the loading dock"
    })
}

/// Configuration suitable for in-process tests.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        sanity: SanityConfig {
            project_id: "test1234".to_string(),
            dataset: "test".to_string(),
            api_version: "2024-01-01".to_string(),
            use_cdn: false,
            write_token: SecretString::from("skTq81Lw3ZmVx9Rb4Ne7Ya2Pk6Hc0Uj5"),
        },
        cart: CartConfig::default(),
        order_submit_timeout: Duration::from_millis(250),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Read a JSON money string as a decimal.
///
/// # Panics
///
/// Panics if `value` is not a decimal string; tests want that loudly.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    let text = value.as_str().unwrap_or_default();
    Decimal::from_str(text).unwrap_or_else(|_| panic!("not a money string: {value}"))
}

/// Shorthand for a decimal literal like `"38.40"`.
///
/// # Panics
///
/// Panics on malformed input.
#[must_use]
pub fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap_or_else(|_| panic!("bad decimal literal: {text}"))
}

// =============================================================================
// Fakes
// =============================================================================

/// In-memory product catalog.
#[derive(Default)]
pub struct FakeCatalog {
    products: Mutex<Vec<Product>>,
    failing: AtomicBool,
}

impl FakeCatalog {
    pub fn insert(&self, product: Product) {
        let mut products = lock(&self.products);
        products.retain(|p| p.id != product.id);
        products.push(product);
    }

    /// Make every query fail until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SourceError("connection reset by peer".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProductSource for FakeCatalog {
    async fn product(&self, id: &ProductRef) -> Result<Option<Product>, SourceError> {
        self.check()?;
        Ok(lock(&self.products)
            .iter()
            .find(|p| &p.id == id || p.slug.as_deref() == Some(id.as_str()))
            .cloned())
    }

    async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, SourceError> {
        self.check()?;
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(lock(&self.products)
            .iter()
            .filter(|p| !query.featured_only || p.is_featured)
            .filter(|p| {
                query
                    .category
                    .as_deref()
                    .is_none_or(|c| p.category.as_deref() == Some(c))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Settings source that can be taken offline.
pub struct FakeSettings {
    settings: Mutex<Option<PricingSettings>>,
}

impl Default for FakeSettings {
    fn default() -> Self {
        Self {
            settings: Mutex::new(Some(PricingSettings::fallback())),
        }
    }
}

impl FakeSettings {
    /// `None` makes the source unavailable.
    pub fn set(&self, settings: Option<PricingSettings>) {
        *lock(&self.settings) = settings;
    }
}

#[async_trait]
impl SettingsSource for FakeSettings {
    async fn pricing_settings(&self) -> Result<PricingSettings, SettingsUnavailable> {
        lock(&self.settings)
            .clone()
            .ok_or_else(|| SettingsUnavailable("settings backend offline".to_string()))
    }
}

/// How the fake order backend answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMode {
    Accept,
    Reject(String),
    Unavailable,
    /// Never answers within any reasonable timeout.
    Hang,
    /// Accepts after a delay.
    Slow(Duration),
}

/// Order backend that records what it accepts.
pub struct FakeOrders {
    mode: Mutex<SinkMode>,
    accepted: Mutex<Vec<OrderRecord>>,
    attempts: AtomicU32,
}

impl Default for FakeOrders {
    fn default() -> Self {
        Self {
            mode: Mutex::new(SinkMode::Accept),
            accepted: Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
        }
    }
}

impl FakeOrders {
    pub fn set_mode(&self, mode: SinkMode) {
        *lock(&self.mode) = mode;
    }

    #[must_use]
    pub fn accepted(&self) -> Vec<OrderRecord> {
        lock(&self.accepted).clone()
    }

    /// Submissions received, accepted or not.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn accept(&self, order: &OrderRecord, attempt: u32) -> OrderConfirmation {
        lock(&self.accepted).push(order.clone());
        OrderConfirmation {
            order_id: OrderId::new(format!("order-{attempt}")),
            order_number: OrderNumber::new(format!("MP-20261017-TEST{attempt:02}")),
        }
    }
}

#[async_trait]
impl OrderSink for FakeOrders {
    async fn submit(&self, order: &OrderRecord) -> Result<OrderConfirmation, SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mode = lock(&self.mode).clone();

        match mode {
            SinkMode::Accept => Ok(self.accept(order, attempt)),
            SinkMode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.accept(order, attempt))
            }
            SinkMode::Reject(reason) => Err(SinkError::Rejected(reason)),
            SinkMode::Unavailable => Err(SinkError::Unavailable("503 from backend".to_string())),
            SinkMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(SinkError::Unavailable("hung".to_string()))
            }
        }
    }
}

// =============================================================================
// Test application
// =============================================================================

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, or the raw text as a JSON string when it is not JSON.
    pub body: Value,
}

/// The router plus its fakes, acting as one browser.
///
/// Cloning shares the fakes and the current session cookie; use
/// [`TestApp::new_shopper`] for an unrelated visitor.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
    pub catalog: Arc<FakeCatalog>,
    pub settings: Arc<FakeSettings>,
    pub orders: Arc<FakeOrders>,
    pub carts: Arc<MemoryLedgerStore>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let catalog = Arc::new(FakeCatalog::default());
        let settings = Arc::new(FakeSettings::default());
        let orders = Arc::new(FakeOrders::default());
        let carts = Arc::new(MemoryLedgerStore::new(&config.cart));

        let backends = Backends {
            catalog: catalog.clone(),
            settings: settings.clone(),
            orders: orders.clone(),
            carts: carts.clone(),
        };
        let router = app(AppState::with_backends(config, backends));

        Self {
            router,
            cookie: None,
            catalog,
            settings,
            orders,
            carts,
        }
    }

    /// Another visitor on the same server, with no session yet.
    #[must_use]
    pub fn new_shopper(&self) -> Self {
        Self {
            cookie: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Add `quantity` of `product_id` and assert success.
    ///
    /// # Panics
    ///
    /// Panics if the add is refused.
    pub async fn add_to_cart(&mut self, product_id: &str, quantity: u32) -> TestResponse {
        let response = self
            .post(
                "/api/cart/add",
                serde_json::json!({ "productId": product_id, "quantity": quantity }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "add {product_id} failed: {}",
            response.body
        );
        response
    }

    /// Send a request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap_or_else(|e| panic!("invalid request: {e}"));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.trim().to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("failed to read body: {e}"));
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
