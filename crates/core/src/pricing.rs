//! Shipping and tax policy.
//!
//! Pure functions over a subtotal and [`PricingSettings`]. Settings come from
//! the store's settings document; anything missing or out of range falls
//! back to the built-in defaults instead of failing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Orders at or above this subtotal ship free when no settings are available.
pub const FALLBACK_FREE_SHIPPING_THRESHOLD: Money = Money::new(Decimal::from_parts(500, 0, 0, false, 0));

/// Flat shipping charge when no settings are available.
pub const FALLBACK_SHIPPING_CHARGE: Money = Money::new(Decimal::from_parts(25, 0, 0, false, 0));

/// Tax percentage when no settings are available.
pub const FALLBACK_TAX_PERCENTAGE: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Tax line label when no settings are available.
pub const FALLBACK_TAX_LABEL: &str = "Tax";

/// Shipping section of the store settings document, as authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingCharges {
    pub free_shipping_threshold: Option<Money>,
    pub fixed_charge: Option<Money>,
}

/// Tax section of the store settings document, as authored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSettings {
    pub tax_percentage: Option<Decimal>,
    pub tax_label: Option<String>,
}

/// Effective shipping and tax configuration for one checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSettings {
    pub free_shipping_threshold: Money,
    pub fixed_shipping_charge: Money,
    /// Between 0 and 100.
    pub tax_percentage: Decimal,
    pub tax_label: String,
}

impl PricingSettings {
    /// The built-in defaults: $25 shipping, free from $500, 8% tax.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            free_shipping_threshold: FALLBACK_FREE_SHIPPING_THRESHOLD,
            fixed_shipping_charge: FALLBACK_SHIPPING_CHARGE,
            tax_percentage: FALLBACK_TAX_PERCENTAGE,
            tax_label: FALLBACK_TAX_LABEL.to_string(),
        }
    }

    /// Build effective settings from possibly partial or malformed sections.
    ///
    /// Each field falls back on its own: negative amounts, a tax percentage
    /// outside 0..=100 and blank labels are replaced by the defaults.
    #[must_use]
    pub fn from_parts(shipping: Option<ShippingCharges>, tax: Option<TaxSettings>) -> Self {
        let shipping = shipping.unwrap_or_default();
        let tax = tax.unwrap_or_default();

        let non_negative = |amount: Option<Money>, default: Money| {
            amount.filter(|m| !m.is_negative()).unwrap_or(default)
        };

        Self {
            free_shipping_threshold: non_negative(
                shipping.free_shipping_threshold,
                FALLBACK_FREE_SHIPPING_THRESHOLD,
            ),
            fixed_shipping_charge: non_negative(shipping.fixed_charge, FALLBACK_SHIPPING_CHARGE),
            tax_percentage: tax
                .tax_percentage
                .filter(|pct| (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(pct))
                .unwrap_or(FALLBACK_TAX_PERCENTAGE),
            tax_label: tax
                .tax_label
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| FALLBACK_TAX_LABEL.to_string()),
        }
    }
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Shipping for a subtotal: free at or above the threshold, flat otherwise.
#[must_use]
pub fn compute_shipping(subtotal: Money, settings: &PricingSettings) -> Money {
    if subtotal >= settings.free_shipping_threshold {
        Money::ZERO
    } else {
        settings.fixed_shipping_charge
    }
}

/// Tax on a subtotal, rounded to cents.
///
/// Tax is the one derived amount that can carry sub-cent digits, so it is
/// rounded here; this keeps `total == subtotal + shipping + tax` exact.
#[must_use]
pub fn compute_tax(subtotal: Money, settings: &PricingSettings) -> Money {
    subtotal.percent(settings.tax_percentage).round_currency()
}

/// Subtotal, shipping, tax and total for one cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub tax_label: String,
    pub total: Money,
}

impl PricingSummary {
    /// Price a subtotal under `settings`.
    #[must_use]
    pub fn compute(subtotal: Money, settings: &PricingSettings) -> Self {
        let shipping = compute_shipping(subtotal, settings);
        let tax = compute_tax(subtotal, settings);
        Self {
            subtotal,
            shipping,
            tax,
            tax_label: settings.tax_label.clone(),
            total: (subtotal + shipping + tax).round_currency(),
        }
    }

    /// How much more the shopper must spend to ship free; zero once reached.
    #[must_use]
    pub fn free_shipping_remaining(&self, settings: &PricingSettings) -> Money {
        if self.subtotal >= settings.free_shipping_threshold {
            Money::ZERO
        } else {
            settings.free_shipping_threshold - self.subtotal
        }
    }
}
