//! Cart route handlers.
//!
//! The cart key lives in the session; the ledger itself is loaded from the
//! ledger store on every request. Every handler answers with the full cart
//! view so clients never need a second round trip.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use medpro_core::{
    CartLedger, CartSession, LineItem, Money, PricingSettings, PricingSummary, ProductRef,
    resolve_pricing,
};

use crate::error::{AppError, Result};
use crate::middleware::{current_cart_key, existing_cart_key};
use crate::state::AppState;

/// Shown when the cart is changed while its order is being placed.
pub const CHECKOUT_PENDING_MESSAGE: &str =
    "Your order is being placed. The cart can be changed again once it finishes.";

/// One cart line for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product_id: ProductRef,
    pub title: String,
    pub image: Option<String>,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
    /// Stock captured when the line was added; `None` when untracked.
    pub max_quantity: Option<u32>,
}

impl From<&LineItem> for CartItemView {
    fn from(line: &LineItem) -> Self {
        Self {
            product_id: line.product_ref.clone(),
            title: line.title.clone(),
            image: line.image.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
            max_quantity: line.stock,
        }
    }
}

/// The cart with its pricing summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    #[serde(flatten)]
    pub pricing: PricingSummary,
    pub free_shipping_threshold: Money,
    pub free_shipping_remaining: Money,
    /// An order for this cart is being submitted.
    pub checkout_pending: bool,
}

impl CartView {
    #[must_use]
    pub fn new(ledger: &CartLedger, settings: &PricingSettings, checkout_pending: bool) -> Self {
        let pricing = PricingSummary::compute(ledger.subtotal(), settings);
        Self {
            items: ledger.lines().iter().map(CartItemView::from).collect(),
            item_count: ledger.item_count(),
            free_shipping_threshold: settings.free_shipping_threshold,
            free_shipping_remaining: pricing.free_shipping_remaining(settings),
            pricing,
            checkout_pending,
        }
    }
}

/// Item count for the header badge.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update-quantity request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove-from-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub product_id: String,
}

/// Open the session's cart for a change.
///
/// Refused while an order for the cart is being submitted; the order only
/// covers the lines it was built from.
async fn open_for_change(state: &AppState, session: &Session) -> Result<CartSession> {
    let key = current_cart_key(session).await?;
    if state.checkout().is_pending(&key) {
        return Err(AppError::Conflict(CHECKOUT_PENDING_MESSAGE.to_string()));
    }
    Ok(state.open_cart(key).await)
}

async fn render(state: &AppState, cart: &CartSession) -> CartView {
    let settings = resolve_pricing(state.settings()).await;
    CartView::new(
        cart.ledger(),
        &settings,
        state.checkout().is_pending(&cart.key()),
    )
}

/// Show the cart.
///
/// A visitor without a session sees an empty cart; no session is created.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let view = match existing_cart_key(&session).await? {
        Some(key) => render(&state, &state.open_cart(key).await).await,
        None => {
            let settings = resolve_pricing(state.settings()).await;
            CartView::new(&CartLedger::new(), &settings, false)
        }
    };
    Ok(Json(view))
}

/// Get the cart item count.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<CartCount>> {
    let count = match existing_cart_key(&session).await? {
        Some(key) => state.open_cart(key).await.item_count(),
        None => 0,
    };
    Ok(Json(CartCount { count }))
}

/// Add a product to the cart.
///
/// Unknown products are a 404 and out-of-stock products a 409. A quantity of
/// zero changes nothing. Every cart change is a 409 while the cart's order is
/// being submitted.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let product_ref = ProductRef::new(request.product_id.trim());
    if product_ref.is_blank() {
        return Err(AppError::BadRequest("productId is required".to_string()));
    }

    let product = state
        .catalog()
        .product(&product_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_ref}")))?;
    if !product.is_in_stock() {
        return Err(AppError::Conflict(format!("{} is out of stock", product.title)));
    }

    let mut cart = open_for_change(&state, &session).await?;
    cart.add(&product, request.quantity.unwrap_or(1)).await;

    Ok(Json(render(&state, &cart).await))
}

/// Set the quantity of a cart line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let mut cart = open_for_change(&state, &session).await?;
    cart.update_quantity(&ProductRef::new(request.product_id.trim()), request.quantity)
        .await;

    Ok(Json(render(&state, &cart).await))
}

/// Remove a line from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let mut cart = open_for_change(&state, &session).await?;
    cart.remove(&ProductRef::new(request.product_id.trim())).await;

    Ok(Json(render(&state, &cart).await))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = open_for_change(&state, &session).await?;
    cart.clear().await;

    Ok(Json(render(&state, &cart).await))
}
