//! GROQ queries used by the storefront.
//!
//! Every query projects documents into the shapes in [`super::types`].
//! User-supplied values always travel as `$params`, never spliced into the
//! query text.

use medpro_core::ProductQuery;

/// Listing size when the caller does not ask for one.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 50;
/// Hard cap on a single listing.
pub const MAX_PRODUCT_LIMIT: u32 = 100;

/// Fields fetched for every product.
pub const PRODUCT_PROJECTION: &str = r#"{
  _id,
  title,
  "slug": slug.current,
  price,
  originalPrice,
  stock,
  "images": images[].asset->url,
  isFeatured,
  brand,
  material,
  "category": category->title
}"#;

/// Single product by document ID or slug.
#[must_use]
pub fn product_by_id() -> String {
    format!(
        r#"*[_type == "product" && (_id == $id || slug.current == $id)][0]{PRODUCT_PROJECTION}"#
    )
}

/// The singleton store settings document.
pub const STORE_SETTINGS: &str = r#"*[_type == "storeSettings"][0]{
  shippingCharges { freeShippingThreshold, fixedCharge },
  taxSettings { taxPercentage, taxLabel }
}"#;

/// Cheapest possible query, used for readiness checks.
pub const PING: &str = r#"count(*[_type == "storeSettings"])"#;

/// A product listing query together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub groq: String,
    /// `(name, value)` pairs, values as plain strings (JSON-encoded on send).
    pub params: Vec<(&'static str, String)>,
}

/// Build the listing query for `query`.
#[must_use]
pub fn product_listing(query: &ProductQuery) -> ProductListing {
    let mut filters = vec![r#"_type == "product""#];
    let mut params = Vec::new();

    if query.featured_only {
        filters.push("isFeatured == true");
    }
    if let Some(category) = query.category.as_deref().map(str::trim)
        && !category.is_empty()
    {
        filters.push("(category->slug.current == $category || category->title == $category)");
        params.push(("category", category.to_string()));
    }

    let limit = effective_limit(query.limit);
    let groq = format!(
        "*[{}] | order(_createdAt desc) [0...{limit}]{PRODUCT_PROJECTION}",
        filters.join(" && ")
    );

    ProductListing { groq, params }
}

/// Clamp a requested listing size into `1..=MAX_PRODUCT_LIMIT`.
#[must_use]
pub fn effective_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_PRODUCT_LIMIT)
        .clamp(1, MAX_PRODUCT_LIMIT)
}
