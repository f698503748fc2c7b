//! Checkout endpoint tests: order placement and failure recovery.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use axum::http::StatusCode;
use medpro_core::{Money, OrderStatus, PaymentMethod};
use medpro_integration_tests::{
    SinkMode, TestApp, checkout_form, dec, money, product, test_config,
};
use medpro_storefront::error::ORDER_FAILED_MESSAGE;
use medpro_storefront::routes::cart::CHECKOUT_PENDING_MESSAGE;
use serde_json::json;

async fn shopper_with_cart() -> TestApp {
    let mut app = TestApp::new();
    app.catalog.insert(product("scalpel", 1_250, Some(40)));
    app.catalog.insert(product("gloves", 900, None));
    app.add_to_cart("scalpel", 2).await;
    app.add_to_cart("gloves", 1).await;
    app
}

async fn assert_cart_kept(app: &mut TestApp) {
    let cart = app.get("/api/cart").await;
    assert_eq!(cart.body["itemCount"], 3, "cart should survive a failed checkout");
    assert_eq!(cart.body["checkoutPending"], false);
}

#[tokio::test]
async fn test_place_order() {
    let mut app = shopper_with_cart().await;

    let response = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["orderId"], "order-1");
    assert_eq!(response.body["orderNumber"], "MP-20261017-TEST01");
    assert_eq!(
        response.body["message"],
        "Order placed successfully! Order #MP-20261017-TEST01"
    );
    // 34 + 25 shipping + 2.72 tax
    assert_eq!(money(&response.body["total"]), dec("61.72"));

    let cart = app.get("/api/cart").await;
    assert_eq!(cart.body["itemCount"], 0);
}

#[tokio::test]
async fn test_submitted_order_contents() {
    let mut app = shopper_with_cart().await;

    app.post("/api/checkout", checkout_form()).await;

    let accepted = app.orders.accepted();
    assert_eq!(accepted.len(), 1);
    let order = &accepted[0];

    assert_eq!(order.customer().email.as_str(), "orders@riverside-clinic.example");
    assert_eq!(order.customer().first_name, "Mary");
    assert_eq!(order.shipping_address().zip_code, "97201");
    assert_eq!(order.payment_method(), PaymentMethod::CashOnDelivery);
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.notes(), Some("Deliver to the loading dock"));

    let items = order.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product_ref.as_str(), "scalpel");
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].line_total, Money::from_cents(2_500));
    assert_eq!(items[1].product_ref.as_str(), "gloves");

    let pricing = order.pricing();
    assert_eq!(pricing.subtotal, Money::from_cents(3_400));
    assert_eq!(pricing.shipping, Money::from_cents(2_500));
    assert_eq!(pricing.tax, Money::from_cents(272));
    assert_eq!(
        pricing.total,
        pricing.subtotal + pricing.shipping + pricing.tax
    );
}

#[tokio::test]
async fn test_missing_field_is_rejected_before_submission() {
    let mut app = shopper_with_cart().await;
    let mut form = checkout_form();
    form["phone"] = "  ".into();

    let response = app.post("/api/checkout", form).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "missing required field: phone");
    assert_eq!(app.orders.attempts(), 0);
    assert_cart_kept(&mut app).await;
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let mut app = shopper_with_cart().await;
    let mut form = checkout_form();
    form["email"] = "front-desk.riverside".into();

    let response = app.post("/api/checkout", form).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        response.body["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid email")
    );
    assert_eq!(app.orders.attempts(), 0);
}

#[tokio::test]
async fn test_checkout_without_session() {
    let mut app = TestApp::new();

    let response = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "cart is empty");
    assert!(!app.has_session());
}

#[tokio::test]
async fn test_checkout_with_emptied_cart() {
    let mut app = shopper_with_cart().await;
    app.post("/api/cart/clear", json!({})).await;

    let response = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "cart is empty");
}

#[tokio::test]
async fn test_backend_outage_keeps_cart_and_allows_retry() {
    let mut app = shopper_with_cart().await;
    app.orders.set_mode(SinkMode::Unavailable);

    let failed = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(failed.status, StatusCode::BAD_GATEWAY);
    assert_eq!(failed.body["error"], ORDER_FAILED_MESSAGE);
    assert!(app.orders.accepted().is_empty());
    assert_cart_kept(&mut app).await;

    app.orders.set_mode(SinkMode::Accept);
    let retried = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(retried.status, StatusCode::CREATED);
    assert_eq!(app.orders.attempts(), 2);
    assert_eq!(app.orders.accepted().len(), 1);
}

#[tokio::test]
async fn test_backend_rejection_reports_reason() {
    let mut app = shopper_with_cart().await;
    app.orders
        .set_mode(SinkMode::Reject("document validation failed".to_string()));

    let response = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let message = response.body["error"].as_str().unwrap();
    assert!(message.starts_with(ORDER_FAILED_MESSAGE));
    assert!(message.ends_with("(document validation failed)"));
    assert_cart_kept(&mut app).await;
}

#[tokio::test]
async fn test_submission_timeout_keeps_cart() {
    let mut app = shopper_with_cart().await;
    app.orders.set_mode(SinkMode::Hang);

    let response = app.post("/api/checkout", checkout_form()).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"], ORDER_FAILED_MESSAGE);
    assert_cart_kept(&mut app).await;
}

#[tokio::test]
async fn test_duplicate_submission_is_refused() {
    let mut config = test_config();
    config.order_submit_timeout = Duration::from_secs(2);
    let mut app = TestApp::with_config(config);
    app.catalog.insert(product("scalpel", 1_250, Some(40)));
    app.add_to_cart("scalpel", 1).await;
    app.orders.set_mode(SinkMode::Hang);

    let mut first = app.clone();
    let in_flight =
        tokio::spawn(async move { first.post("/api/checkout", checkout_form()).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let cart = app.get("/api/cart").await;
    assert_eq!(cart.body["checkoutPending"], true);

    let duplicate = app.post("/api/checkout", checkout_form()).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(app.orders.attempts(), 1);

    let first_response = in_flight.await.unwrap();
    assert_eq!(first_response.status, StatusCode::BAD_GATEWAY);

    let cart = app.get("/api/cart").await;
    assert_eq!(cart.body["checkoutPending"], false);
    assert_eq!(cart.body["itemCount"], 1);
}

#[tokio::test]
async fn test_other_shoppers_are_not_blocked() {
    let mut config = test_config();
    config.order_submit_timeout = Duration::from_secs(2);
    let mut app = TestApp::with_config(config);
    app.catalog.insert(product("scalpel", 1_250, Some(40)));
    app.add_to_cart("scalpel", 1).await;
    app.orders.set_mode(SinkMode::Hang);

    let mut first = app.clone();
    let in_flight =
        tokio::spawn(async move { first.post("/api/checkout", checkout_form()).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut other = app.new_shopper();
    other.add_to_cart("scalpel", 1).await;
    let cart = other.get("/api/cart").await;
    assert_eq!(cart.body["checkoutPending"], false);

    in_flight.abort();
}

#[tokio::test]
async fn test_cart_is_frozen_while_order_is_submitted() {
    let mut config = test_config();
    config.order_submit_timeout = Duration::from_secs(2);
    let mut app = TestApp::with_config(config);
    app.catalog.insert(product("scalpel", 1_250, Some(40)));
    app.catalog.insert(product("gloves", 900, None));
    app.add_to_cart("scalpel", 1).await;
    app.orders.set_mode(SinkMode::Slow(Duration::from_millis(200)));

    let mut first = app.clone();
    let in_flight =
        tokio::spawn(async move { first.post("/api/checkout", checkout_form()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let added = app
        .post("/api/cart/add", json!({ "productId": "gloves", "quantity": 1 }))
        .await;
    assert_eq!(added.status, StatusCode::CONFLICT);
    assert_eq!(added.body["error"], CHECKOUT_PENDING_MESSAGE);

    let updated = app
        .post("/api/cart/update", json!({ "productId": "scalpel", "quantity": 3 }))
        .await;
    assert_eq!(updated.status, StatusCode::CONFLICT);

    let cleared = app.post("/api/cart/clear", json!({})).await;
    assert_eq!(cleared.status, StatusCode::CONFLICT);

    let placed = in_flight.await.unwrap();
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(app.orders.accepted()[0].items().len(), 1);

    // The cart is usable again once the order is in.
    let cart = app.get("/api/cart").await;
    assert_eq!(cart.body["itemCount"], 0);
    app.add_to_cart("gloves", 1).await;
}
