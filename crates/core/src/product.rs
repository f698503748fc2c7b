//! Product records as read from the content backend.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductRef, StockLevel};

/// Brand shown when a product record has none.
pub const DEFAULT_BRAND: &str = "MedPro";

/// Material shown when a product record has none.
pub const DEFAULT_MATERIAL: &str = "Stainless Steel";

/// A catalog product.
///
/// Read-only from the storefront's point of view; the cart captures the
/// fields it needs into a [`crate::LineItem`] when the product is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductRef,
    pub title: String,
    pub slug: Option<String>,
    pub price: Money,
    /// Pre-discount price, shown struck through when higher than `price`.
    pub original_price: Option<Money>,
    /// Units on hand; `None` when the product does not track stock.
    pub stock: Option<u32>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub brand: Option<String>,
    pub material: Option<String>,
    pub category: Option<String>,
}

impl Product {
    /// Availability classification for display and add-to-cart checks.
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::from_count(self.stock)
    }

    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock_level().is_available()
    }

    /// First image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Brand with the storefront default applied.
    #[must_use]
    pub fn brand_or_default(&self) -> &str {
        self.brand.as_deref().unwrap_or(DEFAULT_BRAND)
    }

    /// Material with the storefront default applied.
    #[must_use]
    pub fn material_or_default(&self) -> &str {
        self.material.as_deref().unwrap_or(DEFAULT_MATERIAL)
    }

    /// Whole-percent discount from `original_price`, 0 when not discounted.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        let Some(original) = self.original_price else {
            return 0;
        };
        if original <= self.price || original.is_zero() {
            return 0;
        }

        let ratio = (original.amount() - self.price.amount()) / original.amount();
        (ratio * Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
            .unwrap_or(0)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_discount_percentage() {
        let mut p = product("scalpel", 7_500, Some(5));
        assert_eq!(p.discount_percentage(), 0);

        p.original_price = Some(Money::from_cents(10_000));
        assert_eq!(p.discount_percentage(), 25);

        p.original_price = Some(Money::from_cents(5_000));
        assert_eq!(p.discount_percentage(), 0);
    }

    #[test]
    fn test_stock_checks() {
        assert!(product("a", 100, None).is_in_stock());
        assert!(product("a", 100, Some(2)).is_in_stock());
        assert!(!product("a", 100, Some(0)).is_in_stock());
    }

    #[test]
    fn test_display_defaults() {
        let mut p = product("forceps", 100, None);
        assert_eq!(p.brand_or_default(), "MedPro");
        assert_eq!(p.material_or_default(), "Stainless Steel");
        p.brand = Some("Acme".to_string());
        assert_eq!(p.brand_or_default(), "Acme");
        assert_eq!(p.primary_image(), Some("https://cdn.example/forceps.jpg"));
    }
}
