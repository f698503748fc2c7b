//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (settings source reachable)
//!
//! # Products
//! GET  /api/products           - Product listing (?featured=true&category=..&limit=..)
//! GET  /api/products/{id}      - Product detail (by ID or slug)
//!
//! # Cart
//! GET  /api/cart               - Cart with pricing summary
//! GET  /api/cart/count         - Item count
//! POST /api/cart/add           - Add a product
//! POST /api/cart/update        - Set a line quantity (<= 0 removes)
//! POST /api/cart/remove        - Remove a line
//! POST /api/cart/clear         - Empty the cart
//!
//! # Checkout
//! POST /api/checkout           - Place a cash-on-delivery order
//! ```

pub mod cart;
pub mod checkout;
pub mod health;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/checkout", post(checkout::place))
}

/// Build the complete application router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
