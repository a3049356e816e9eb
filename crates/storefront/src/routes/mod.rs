//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Database readiness check
//!
//! # Orders (session required)
//! POST /api/orders                 - Place an order (201)
//! GET  /api/orders                 - All orders with owners (admin)
//! GET  /api/orders/mine            - Caller's order history
//! GET  /api/orders/{id}            - Order details (owner or admin)
//! PUT  /api/orders/{id}/pay        - Confirm payment (owner)
//! PUT  /api/orders/{id}/deliver    - Mark delivered (admin)
//!
//! # Payment
//! GET  /api/config/payment         - Gateway public client id
//! ```

pub mod orders;
pub mod payment;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::db::OrderRepository;
use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes<R: OrderRepository + 'static>() -> Router<AppState<R>> {
    Router::new()
        .route("/", post(orders::create::<R>).get(orders::list::<R>))
        .route("/mine", get(orders::mine::<R>))
        .route("/{id}", get(orders::show::<R>))
        .route("/{id}/pay", put(orders::pay::<R>))
        .route("/{id}/deliver", put(orders::deliver::<R>))
}

/// Create all API routes for the storefront.
pub fn routes<R: OrderRepository + 'static>() -> Router<AppState<R>> {
    Router::new()
        .nest("/api/orders", order_routes())
        .route("/api/config/payment", get(payment::config::<R>))
}
