//! Contracts for the external collaborators: product catalog, store
//! settings and the order sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::order::OrderRecord;
use crate::pricing::PricingSettings;
use crate::product::Product;
use crate::types::{OrderId, OrderNumber, ProductRef};

/// The settings source could not provide pricing settings.
///
/// Never fatal: callers fall back to [`PricingSettings::fallback`].
#[derive(Debug, thiserror::Error)]
#[error("pricing settings unavailable: {0}")]
pub struct SettingsUnavailable(pub String);

/// A product query failed.
#[derive(Debug, thiserror::Error)]
#[error("product source error: {0}")]
pub struct SourceError(pub String);

/// Why an order submission failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The backend answered and refused the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached, timed out or answered garbage.
    #[error("order service unavailable: {0}")]
    Unavailable(String),
}

/// Identifiers assigned to an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
}

/// Filters for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductQuery {
    pub featured_only: bool,
    pub category: Option<String>,
    pub limit: Option<u32>,
}

/// Read-only pricing settings.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn pricing_settings(&self) -> Result<PricingSettings, SettingsUnavailable>;

    /// Check that the source is reachable, for readiness checks.
    async fn ping(&self) -> Result<(), SettingsUnavailable> {
        self.pricing_settings().await.map(|_| ())
    }
}

/// Read-only product catalog.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Look up one product by identifier.
    async fn product(&self, id: &ProductRef) -> Result<Option<Product>, SourceError>;

    /// List products matching `query`.
    async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, SourceError>;
}

/// Durable destination for built orders.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Persist `order`. Success means the backend has durably accepted it.
    async fn submit(&self, order: &OrderRecord) -> Result<OrderConfirmation, SinkError>;
}

/// Fetch settings, falling back to the defaults when the source fails.
pub async fn resolve_pricing(source: &dyn SettingsSource) -> PricingSettings {
    match source.pricing_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Using fallback pricing settings");
            PricingSettings::fallback()
        }
    }
}
