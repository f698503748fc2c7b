//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use medpro_core::{Money, Product, ProductQuery, ProductRef, StockLevel};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub featured: Option<bool>,
    pub category: Option<String>,
    pub limit: Option<u32>,
}

impl From<ListParams> for ProductQuery {
    fn from(params: ListParams) -> Self {
        Self {
            featured_only: params.featured.unwrap_or(false),
            category: params.category.filter(|c| !c.trim().is_empty()),
            limit: params.limit,
        }
    }
}

/// Product display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductRef,
    pub title: String,
    pub slug: Option<String>,
    pub price: Money,
    pub original_price: Option<Money>,
    pub discount_percentage: u32,
    pub stock: StockLevel,
    pub stock_label: String,
    pub in_stock: bool,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub brand: String,
    pub material: String,
    pub category: Option<String>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let stock = product.stock_level();
        Self {
            discount_percentage: product.discount_percentage(),
            stock,
            stock_label: stock.label(),
            in_stock: stock.is_available(),
            brand: product.brand_or_default().to_string(),
            material: product.material_or_default().to_string(),
            id: product.id,
            title: product.title,
            slug: product.slug,
            price: product.price,
            original_price: product.original_price,
            images: product.images,
            is_featured: product.is_featured,
            category: product.category,
        }
    }
}

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProductView>>> {
    let query = ProductQuery::from(params);
    let products = state.catalog().products(&query).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// Show one product by ID or slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let product_ref = ProductRef::new(id);
    let product = state
        .catalog()
        .product(&product_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_ref}")))?;
    Ok(Json(ProductView::from(product)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_into_query() {
        let query = ProductQuery::from(ListParams {
            featured: Some(true),
            category: Some("  ".to_string()),
            limit: Some(8),
        });
        assert!(query.featured_only);
        assert_eq!(query.category, None);
        assert_eq!(query.limit, Some(8));
    }

    #[test]
    fn test_product_view_applies_defaults() {
        let view = ProductView::from(Product {
            id: ProductRef::new("retractor"),
            title: "Retractor".to_string(),
            slug: Some("retractor".to_string()),
            price: Money::from_cents(7_500),
            original_price: Some(Money::from_cents(10_000)),
            stock: Some(3),
            images: Vec::new(),
            is_featured: true,
            brand: None,
            material: None,
            category: None,
        });
        assert_eq!(view.brand, "MedPro");
        assert_eq!(view.material, "Stainless Steel");
        assert_eq!(view.discount_percentage, 25);
        assert_eq!(view.stock, StockLevel::LowStock(3));
        assert_eq!(view.stock_label, "Only 3 left");
        assert!(view.in_stock);
    }
}
