//! MedPro Storefront library.
//!
//! The JSON cart and checkout service as a library, so the binary stays thin
//! and the router can be driven end to end from tests.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`sanity`] - Sanity content backend client (products, settings, orders)
//! - [`services`] - Cart store, checkout and ledger observers
//! - [`routes`] - HTTP handlers and the application router
//! - [`middleware`] - Request IDs and cart sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod sanity;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::{AppState, Backends};
