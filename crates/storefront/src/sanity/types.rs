//! Wire shapes for Sanity responses and mutations.
//!
//! Sanity stores numbers as JSON floats, so money crosses this boundary as
//! `f64` and is converted to [`Money`](medpro_core::Money) in
//! `conversions`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use medpro_core::{OrderStatus, PaymentMethod};

/// Envelope of a `GET /data/query` response.
#[derive(Debug, Deserialize)]
pub struct QueryResponse<T> {
    pub result: T,
}

/// Error body returned on non-success statuses.
///
/// Query errors nest an object, mutation errors sometimes send a bare string.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Described {
        description: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
    },
}

impl ErrorDetail {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Described {
                description: Some(description),
                ..
            } => description.clone(),
            Self::Described {
                description: None,
                kind,
            } => kind.clone().unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

/// A product as projected by [`super::queries::PRODUCT_PROJECTION`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityProduct {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub stock: Option<f64>,
    #[serde(default)]
    pub images: Option<Vec<Option<String>>>,
    pub is_featured: Option<bool>,
    pub brand: Option<String>,
    pub material: Option<String>,
    pub category: Option<String>,
}

/// The `storeSettings` document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityStoreSettings {
    pub shipping_charges: Option<SanityShippingCharges>,
    pub tax_settings: Option<SanityTaxSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityShippingCharges {
    pub free_shipping_threshold: Option<f64>,
    pub fixed_charge: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityTaxSettings {
    pub tax_percentage: Option<f64>,
    pub tax_label: Option<String>,
}

// =============================================================================
// Mutations
// =============================================================================

/// Body of `POST /data/mutate`.
#[derive(Debug, Serialize)]
pub struct MutationRequest<T> {
    pub mutations: Vec<Mutation<T>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation<T> {
    Create(T),
}

/// Response of a mutation with `returnIds=true`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
pub struct MutationResult {
    pub id: String,
}

/// An `order` document ready to be created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    #[serde(rename = "_type")]
    pub doc_type: &'static str,
    pub order_number: String,
    pub customer: CustomerDocument,
    pub shipping_address: AddressDocument,
    pub items: Vec<OrderItemDocument>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub pricing: PricingDocument,
    pub notes: String,
    pub order_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDocument {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDocument {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDocument {
    /// Array members need a unique `_key`.
    #[serde(rename = "_key")]
    pub key: String,
    pub product: Reference,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub reference: String,
    #[serde(rename = "_type")]
    pub ref_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingDocument {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}
