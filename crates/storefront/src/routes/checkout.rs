//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use medpro_core::{CheckoutForm, Money, OrderError, OrderId, OrderNumber};

use crate::error::{AppError, Result};
use crate::middleware::existing_cart_key;
use crate::state::AppState;

/// Response body for an accepted order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedView {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total: Money,
    pub message: String,
}

/// Place an order for the session's cart.
///
/// Returns 201 with the backend-assigned identifiers. On any failure the cart
/// is left untouched so the shopper can fix the form or retry.
#[instrument(skip(state, session, form))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<OrderPlacedView>)> {
    let key = existing_cart_key(&session)
        .await?
        .ok_or(AppError::Order(OrderError::EmptyCart))?;
    let mut cart = state.open_cart(key).await;

    let placed = state.checkout().place_order(&mut cart, &form).await?;
    let confirmation = placed.confirmation;

    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedView {
            message: format!(
                "Order placed successfully! Order #{}",
                confirmation.order_number
            ),
            order_id: confirmation.order_id,
            order_number: confirmation.order_number,
            total: placed.total,
        }),
    ))
}
