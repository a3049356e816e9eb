//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{OrderRepository, PgOrderRepository};
use crate::services::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It is generic over the order
/// repository so the router can be exercised against in-memory storage.
pub struct AppState<R = PgOrderRepository> {
    inner: Arc<AppStateInner<R>>,
}

struct AppStateInner<R> {
    config: StorefrontConfig,
    orders: OrderService<R>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: OrderRepository> AppState<R> {
    /// Create application state around an order repository.
    #[must_use]
    pub fn with_repository(config: StorefrontConfig, repo: R) -> Self {
        let orders = OrderService::new(repo, config.shipping, config.payment.clone());
        Self {
            inner: Arc::new(AppStateInner { config, orders }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService<R> {
        &self.inner.orders
    }
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self::with_repository(config, PgOrderRepository::new(pool))
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.orders().repository().pool()
    }
}
