//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions over a moka cache, cart key only)

pub mod request_id;
pub mod session;

pub use request_id::request_id_middleware;
pub use session::{
    CacheSessionStore, create_session_layer, current_cart_key, existing_cart_key,
};
