//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`proshop-cli migrate`)
//! - The storefront server running (`cargo run -p proshop-storefront`)
//! - `PROSHOP_API_URL` and `PROSHOP_SESSION_COOKIE` for a logged-in customer
//!
//! Run with: `cargo test -p proshop-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proshop_client::{ClientConfig, ClientError, HttpStorefrontApi, StorefrontApi};
use proshop_core::{Cart, OrderError, ShippingPolicy};
use proshop_integration_tests::{item, receipt};
use reqwest::StatusCode;
use rust_decimal_macros::dec;

fn config() -> ClientConfig {
    ClientConfig::from_env().expect("PROSHOP_API_URL must be set")
}

fn api() -> HttpStorefrontApi {
    HttpStorefrontApi::new(&config()).expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health() {
    let url = config().base_url.join("health").unwrap();
    let resp = reqwest::get(url).await.expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_requests_without_session_are_unauthorized() {
    let config = ClientConfig::new(config().base_url);
    let api = HttpStorefrontApi::new(&config).unwrap();

    let err = api.list_my_orders().await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[tokio::test]
#[ignore = "Requires running storefront server and a session cookie"]
async fn test_empty_order_is_rejected() {
    let draft = Cart::new().to_draft(&ShippingPolicy::default());

    let err = api().create_order(&draft).await.unwrap_err();

    assert_eq!(err, ClientError::Order(OrderError::EmptyOrder));
}

#[tokio::test]
#[ignore = "Requires running storefront server and a session cookie"]
async fn test_create_and_pay_over_http() {
    let api = api();
    let mut cart = Cart::new();
    cart.add_item(item(1, dec!(30.00), 1), 10);
    cart.set_payment_method("PayPal");

    let order = api
        .create_order(&cart.to_draft(&ShippingPolicy::default()))
        .await
        .unwrap();
    assert_eq!(order.total_price, dec!(130.00));

    let summary = api.get_order(order.id).await.unwrap();
    assert_eq!(summary.order.id, order.id);

    let config = api.payment_config().await.unwrap();
    assert!(!config.client_id.is_empty());

    let receipt = receipt(&format!("HTTP-{}", order.id));
    let paid = api.pay_order(order.id, &receipt).await.unwrap();
    let again = api.pay_order(order.id, &receipt).await.unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.paid_at, again.paid_at);

    let mine = api.list_my_orders().await.unwrap();
    assert!(mine.iter().any(|summary| summary.order.id == order.id));
}
