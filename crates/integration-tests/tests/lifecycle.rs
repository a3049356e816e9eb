//! End-to-end lifecycle scenarios: client sessions driving the storefront
//! service in process.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use proshop_client::{ClientError, StorefrontApi};
use proshop_core::{OrderError, OrderStatus, OwnerInfo, UserId};
use proshop_integration_tests::{Shop, item, place_order, receipt};
use rust_decimal_macros::dec;

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_create_pay_deliver() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let admin = shop.session(9, "Grace", true);

    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    assert_eq!(order.status(), OrderStatus::Created);
    assert!(owner.snapshot().cart.is_empty());

    owner.view_order(order.id).await.unwrap();
    assert!(owner.ready_for(order.id));
    let paid = owner.pay().await.unwrap().unwrap();
    assert_eq!(paid.status(), OrderStatus::Paid);
    assert_eq!(paid.payment_result.as_ref().unwrap().id, format!("PAY-{}", order.id));

    admin.view_order(order.id).await.unwrap();
    let delivered = admin.deliver().await.unwrap().unwrap();
    assert_eq!(delivered.status(), OrderStatus::Delivered);
    assert_eq!(delivered.paid_at, paid.paid_at);

    let summary = owner.view_order(order.id).await.unwrap().unwrap();
    assert!(summary.order.is_delivered);
    assert_eq!(summary.owner_info.name, "Ada");
}

#[tokio::test]
async fn test_order_history_and_admin_list() {
    let shop = Shop::new();
    let ada = shop.session(1, "Ada", false);
    let bob = shop.session(2, "Bob", false);
    let admin = shop.session(9, "Grace", true);

    place_order(&ada, vec![item(1, dec!(10.00), 1)]).await;
    place_order(&ada, vec![item(2, dec!(20.00), 1)]).await;
    place_order(&bob, vec![item(3, dec!(30.00), 1)]).await;

    assert_eq!(ada.my_orders().await.unwrap().len(), 2);
    assert_eq!(bob.my_orders().await.unwrap().len(), 1);

    let all = admin.all_orders().await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|summary| summary.owner_info.name == "Bob"));

    let err = ada.api().list_orders().await.unwrap_err();
    assert!(matches!(err, ClientError::Order(OrderError::Forbidden(_))));
}

#[tokio::test]
async fn test_payment_script_is_shared_across_sessions() {
    let shop = Shop::new();
    let ada = shop.session(1, "Ada", false);
    let bob = shop.session(2, "Bob", false);

    let first = place_order(&ada, vec![item(1, dec!(10.00), 1)]).await;
    let second = place_order(&bob, vec![item(2, dec!(20.00), 1)]).await;
    ada.view_order(first.id).await.unwrap();
    bob.view_order(second.id).await.unwrap();

    assert!(ada.ready_for(first.id));
    assert!(bob.ready_for(second.id));
    assert_eq!(shop.sdk().loads(), 1);
}

// =============================================================================
// Payment idempotency
// =============================================================================

#[tokio::test]
async fn test_paying_twice_with_same_receipt_pays_once() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    owner.view_order(order.id).await.unwrap();

    let first = owner.confirm_payment(receipt("R")).await.unwrap().unwrap();
    let second = owner.confirm_payment(receipt("R")).await.unwrap().unwrap();

    assert_eq!(owner.api().pay_calls(), 2);
    assert!(second.is_paid);
    assert_eq!(first.paid_at, second.paid_at);
    assert_eq!(second.payment_result.unwrap().id, "R");
}

#[tokio::test]
async fn test_second_receipt_keeps_first_payment() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    owner.view_order(order.id).await.unwrap();
    owner.confirm_payment(receipt("R1")).await.unwrap();

    // The storefront answers AlreadyPaid; the session treats that as done.
    let shown = owner.confirm_payment(receipt("R2")).await.unwrap().unwrap();

    assert_eq!(shown.payment_result.unwrap().id, "R1");
    let err = owner.api().pay_order(order.id, &receipt("R2")).await.unwrap_err();
    assert_eq!(err, ClientError::Order(OrderError::AlreadyPaid(order.id)));
}

#[tokio::test]
async fn test_cancelled_payment_leaves_order_unpaid() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    owner.view_order(order.id).await.unwrap();
    shop.sdk().cancel_next(true);

    let err = owner.pay().await.unwrap_err();

    assert_eq!(err, ClientError::PaymentCancelled);
    assert_eq!(owner.snapshot().pay.error(), Some(&ClientError::PaymentCancelled));
    assert!(owner.ready_for(order.id));
    let summary = owner.view_order(order.id).await.unwrap().unwrap();
    assert!(!summary.order.is_paid);
}

// =============================================================================
// Stale views
// =============================================================================

#[tokio::test]
async fn test_abandoned_view_does_not_leak_into_next_view() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let a = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    let b = place_order(&owner, vec![item(2, dec!(150.00), 1)]).await;
    shop.slow_reads(a.id, Duration::from_millis(50));

    let (stale, current) = tokio::join!(owner.view_order(a.id), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        owner.view_order(b.id).await
    });

    assert!(stale.unwrap().is_none());
    assert_eq!(current.unwrap().unwrap().order.id, b.id);

    let snapshot = owner.snapshot();
    assert_eq!(snapshot.viewing, Some(b.id));
    let details = snapshot.details.value().unwrap();
    assert_eq!(details.order.id, b.id);
    assert_eq!(details.order.total_price, dec!(150.00));
    assert_eq!(snapshot.payment.value().unwrap().order_id, b.id);
    assert!(!owner.ready_for(a.id));
}

#[tokio::test]
async fn test_payment_approved_after_leaving_is_still_recorded() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    owner.view_order(order.id).await.unwrap();
    shop.sdk().delay_approval(Some(Duration::from_millis(30)));

    let (paid, ()) = tokio::join!(owner.pay(), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        owner.leave();
    });

    // The session no longer shows the order, but the storefront recorded it.
    assert!(paid.unwrap().is_none());
    assert!(owner.snapshot().pay.is_idle());
    let summary = owner.view_order(order.id).await.unwrap().unwrap();
    assert!(summary.order.is_paid);
}

// =============================================================================
// Role gating and validation
// =============================================================================

#[tokio::test]
async fn test_owner_cannot_deliver() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;
    owner.view_order(order.id).await.unwrap();
    owner.pay().await.unwrap();

    // Turned away by the session before the storefront is asked.
    let err = owner.deliver().await.unwrap_err();
    assert!(matches!(err, ClientError::Order(OrderError::Forbidden(_))));

    // And by the storefront when asked directly.
    let err = owner.api().deliver_order(order.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Order(OrderError::Forbidden(_))));

    let summary = owner.view_order(order.id).await.unwrap().unwrap();
    assert!(!summary.order.is_delivered);
}

#[tokio::test]
async fn test_deliver_unpaid_is_rejected() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let admin = shop.session(9, "Grace", true);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;

    admin.view_order(order.id).await.unwrap();
    let err = admin.deliver().await.unwrap_err();

    assert_eq!(err, ClientError::Order(OrderError::NotPaid(order.id)));
    let summary = admin.view_order(order.id).await.unwrap().unwrap();
    assert!(!summary.order.is_delivered);
    assert!(summary.order.delivered_at.is_none());
}

#[tokio::test]
async fn test_empty_cart_persists_nothing() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);

    let err = owner.place_order().await.unwrap_err();

    assert_eq!(err, ClientError::Order(OrderError::EmptyOrder));
    assert!(shop.service().repository().is_empty());
}

#[tokio::test]
async fn test_stranger_cannot_view_order() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let stranger = shop.session(2, "Eve", false);
    let order = place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;

    let err = stranger.view_order(order.id).await.unwrap_err();

    assert!(matches!(err, ClientError::Order(OrderError::Forbidden(_))));
    assert!(stranger.snapshot().details.error().is_some());
}

#[tokio::test]
async fn test_deleted_owner_is_unknown() {
    let shop = Shop::new();
    let owner = shop.session(1, "Ada", false);
    let admin = shop.session(9, "Grace", true);
    place_order(&owner, vec![item(1, dec!(30.00), 1)]).await;

    shop.service().repository().remove_customer(UserId::new(1));

    let all = admin.all_orders().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all.first().unwrap().owner_info, OwnerInfo::unknown());
}
