//! Order API handlers.
//!
//! Handlers only translate HTTP to service calls. Role and state checks live
//! in [`crate::services::OrderService`].

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use tracing::instrument;

use proshop_core::{Order, OrderDraft, OrderId, OrderSummary, PaymentReceipt};

use crate::db::OrderRepository;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `POST /api/orders` - place an order from a checkout draft.
#[instrument(skip_all)]
pub async fn create<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
    payload: std::result::Result<Json<OrderDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(draft) = payload?;
    let order = state.orders().create_order(&customer, draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders` - every order with its owner (admin).
#[instrument(skip_all)]
pub async fn list<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(state.orders().list_orders(&customer).await?))
}

/// `GET /api/orders/mine` - the caller's order history.
#[instrument(skip_all)]
pub async fn mine<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(state.orders().list_my_orders(&customer).await?))
}

/// `GET /api/orders/{id}` - order details.
#[instrument(skip_all)]
pub async fn show<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<OrderSummary>> {
    let Path(id) = id?;
    Ok(Json(state.orders().get_order(&customer, id).await?))
}

/// `PUT /api/orders/{id}/pay` - confirm payment with a gateway receipt.
#[instrument(skip_all)]
pub async fn pay<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
    payload: std::result::Result<Json<PaymentReceipt>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    let Json(receipt) = payload?;

    let order_id = id.to_string();
    add_breadcrumb(
        "order",
        "Payment confirmation received",
        &[("order_id", order_id.as_str()), ("receipt_id", receipt.id.as_str())],
    );

    Ok(Json(state.orders().pay_order(&customer, id, receipt).await?))
}

/// `PUT /api/orders/{id}/deliver` - mark an order delivered (admin).
#[instrument(skip_all)]
pub async fn deliver<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    Ok(Json(state.orders().deliver_order(&customer, id).await?))
}
