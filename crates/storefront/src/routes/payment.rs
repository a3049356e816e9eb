//! Payment gateway configuration endpoint.

use axum::{Json, extract::State};

use proshop_core::PaymentConfig;

use crate::db::OrderRepository;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `GET /api/config/payment` - public gateway client id.
pub async fn config<R: OrderRepository + 'static>(
    State(state): State<AppState<R>>,
    RequireAuth(customer): RequireAuth,
) -> Json<PaymentConfig> {
    Json(state.orders().payment_config(&customer))
}
