//! Cache types for Sanity read responses.

use medpro_core::{PricingSettings, Product, ProductQuery, ProductRef};

/// Cache key for products and settings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductRef),
    Products(ProductQuery),
    Settings,
}

/// Cached value types.
///
/// A missing product is cached too, so repeated lookups of a bad ID do not
/// hit the API.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Option<Box<Product>>),
    Products(Vec<Product>),
    Settings(PricingSettings),
}
