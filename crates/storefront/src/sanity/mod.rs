//! Sanity content backend client.
//!
//! # Architecture
//!
//! - GROQ queries over the HTTP query API, parameters passed as `$name`
//! - Sanity is the source of truth for products, settings and orders
//! - In-memory caching via `moka` for read responses (5 minute TTL)
//! - Orders are created through the mutate API with a write token
//!
//! The client implements the core collaborator traits
//! ([`ProductSource`](medpro_core::ProductSource),
//! [`SettingsSource`](medpro_core::SettingsSource) and
//! [`OrderSink`](medpro_core::OrderSink)) so the rest of the storefront never
//! sees GROQ or document shapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use medpro_core::{ProductSource, ProductRef};
//! use medpro_storefront::sanity::SanityClient;
//!
//! let client = SanityClient::new(&config.sanity)?;
//! let product = client.product(&ProductRef::new("scalpel-10")).await?;
//! ```

mod cache;
mod client;
mod conversions;
pub mod queries;
pub mod types;

pub use client::SanityClient;
pub use conversions::generate_order_number;

use thiserror::Error;

/// Errors that can occur when talking to the Sanity API.
#[derive(Debug, Error)]
pub enum SanityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Sanity API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Sanity.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Endpoint URLs could not be built from configuration.
    #[error("Invalid Sanity configuration: {0}")]
    InvalidConfig(#[from] url::ParseError),

    /// A mutation succeeded but returned no document ID.
    #[error("Mutation returned no document ID")]
    MissingDocumentId,
}

impl SanityError {
    /// Whether the backend refused the request itself (4xx other than 429).
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 400 && *status < 500)
    }
}
