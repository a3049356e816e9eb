//! In-memory order repository.
//!
//! Used by unit and integration tests in place of `PostgreSQL`. It honors the
//! same conditional-update contract as [`super::PgOrderRepository`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use proshop_core::{NewOrder, Order, OrderId, OrderSummary, OwnerInfo, UserId};

use super::{OrderRepository, RepositoryError};

#[derive(Debug, Default)]
struct Store {
    last_id: i32,
    orders: BTreeMap<OrderId, Order>,
    owners: HashMap<UserId, OwnerInfo>,
}

impl Store {
    fn summary(&self, order: &Order) -> OrderSummary {
        OrderSummary {
            order: order.clone(),
            owner_info: self
                .owners
                .get(&order.owner)
                .cloned()
                .unwrap_or_else(OwnerInfo::unknown),
        }
    }

    fn summaries<'a>(&self, orders: impl Iterator<Item = &'a Order>) -> Vec<OrderSummary> {
        let mut summaries: Vec<OrderSummary> = orders.map(|order| self.summary(order)).collect();
        summaries.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then_with(|| b.order.id.cmp(&a.order.id))
        });
        summaries
    }
}

/// Order repository backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    store: Mutex<Store>,
}

impl InMemoryOrderRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer so their orders carry owner details.
    pub fn add_customer(&self, id: UserId, name: impl Into<String>, email: impl Into<String>) {
        self.lock().owners.insert(
            id,
            OwnerInfo {
                name: name.into(),
                email: Some(email.into()),
            },
        );
    }

    /// Delete a customer account, leaving their orders behind.
    pub fn remove_customer(&self, id: UserId) {
        self.lock().owners.remove(&id);
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut store = self.lock();
        store.last_id += 1;
        let order = order.into_order(OrderId::new(store.last_id));
        store.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        let store = self.lock();
        Ok(store.orders.get(&id).map(|order| store.summary(order)))
    }

    async fn record_payment(&self, order: &Order) -> Result<bool, RepositoryError> {
        let mut store = self.lock();
        let stored = store
            .orders
            .get_mut(&order.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.is_paid {
            return Ok(false);
        }

        stored.is_paid = true;
        stored.paid_at = order.paid_at;
        stored.payment_result.clone_from(&order.payment_result);
        Ok(true)
    }

    async fn record_delivery(&self, order: &Order) -> Result<bool, RepositoryError> {
        let mut store = self.lock();
        let stored = store
            .orders
            .get_mut(&order.id)
            .ok_or(RepositoryError::NotFound)?;
        if !stored.is_paid || stored.is_delivered {
            return Ok(false);
        }

        stored.is_delivered = true;
        stored.delivered_at = order.delivered_at;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<OrderSummary>, RepositoryError> {
        let store = self.lock();
        Ok(store.summaries(store.orders.values()))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let store = self.lock();
        Ok(store.summaries(store.orders.values().filter(|order| order.owner == owner)))
    }
}
