//! Services behind the HTTP handlers.
//!
//! # Services
//!
//! - `cart_store` - In-memory cart persistence with idle expiry
//! - `checkout` - Order placement for a cart session
//! - `observers` - Ledger observers (logging and Sentry breadcrumbs)

pub mod cart_store;
pub mod checkout;
pub mod observers;

pub use cart_store::MemoryLedgerStore;
pub use checkout::{CheckoutError, CheckoutService, PendingCheckouts, PlacedOrder};
pub use observers::BreadcrumbObserver;
