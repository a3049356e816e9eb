//! Order service: the trusted side of the order lifecycle.
//!
//! Every state-changing request passes through here. The service
//! 1. checks who is asking (owner or admin),
//! 2. recomputes prices from the submitted line items,
//! 3. applies the transition on the aggregate, and
//! 4. persists it with a conditional write.
//!
//! Client-side checks are a convenience; the checks in this module are the
//! ones that hold.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use proshop_core::{
    NewOrder, Order, OrderDraft, OrderError, OrderId, OrderSummary, PaymentConfig,
    PaymentReceipt, ShippingPolicy, Transition,
};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::CurrentCustomer;

/// Errors that can occur in the order service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A lifecycle rule rejected the request.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order lifecycle service.
#[derive(Debug)]
pub struct OrderService<R> {
    repo: R,
    shipping: ShippingPolicy,
    payment: PaymentConfig,
}

impl<R: OrderRepository> OrderService<R> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(repo: R, shipping: ShippingPolicy, payment: PaymentConfig) -> Self {
        Self {
            repo,
            shipping,
            payment,
        }
    }

    /// The underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// The shipping rule new orders are priced with.
    #[must_use]
    pub const fn shipping_policy(&self) -> &ShippingPolicy {
        &self.shipping
    }

    /// Place an order from a checkout draft.
    ///
    /// Prices are recomputed from the items. Totals the client sent along are
    /// only compared; a mismatch is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyOrder` or `OrderError::InvalidLineItem`
    /// without touching the database, or a repository error if the insert
    /// fails.
    #[instrument(skip(self, customer, draft), fields(user_id = %customer.id, items = draft.items.len()))]
    pub async fn create_order(
        &self,
        customer: &CurrentCustomer,
        draft: OrderDraft,
    ) -> Result<Order, ServiceError> {
        let client_totals = draft.client_totals();
        let new_order = NewOrder::from_draft(customer.id, draft, &self.shipping, Utc::now())?;

        if let Some(client) = client_totals
            && client != new_order.prices
        {
            warn!(
                client_total = %client.total_price,
                server_total = %new_order.prices.total_price,
                "Client price estimate differs from computed prices"
            );
        }

        let order = self.repo.insert(new_order).await?;
        info!(order_id = %order.id, total = %order.total_price, "Order created");
        Ok(order)
    }

    /// Fetch an order with its owner details.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown id and
    /// `OrderError::Forbidden` if the caller is neither the owner nor an admin.
    #[instrument(skip(self, customer), fields(user_id = %customer.id))]
    pub async fn get_order(
        &self,
        customer: &CurrentCustomer,
        id: OrderId,
    ) -> Result<OrderSummary, ServiceError> {
        let summary = self.load(id).await?;
        if !customer.can_access(summary.order.owner) {
            return Err(OrderError::Forbidden("order belongs to another customer".to_string()).into());
        }
        Ok(summary)
    }

    /// Confirm payment of an order with the receipt returned by the gateway.
    ///
    /// Confirming again with the same receipt returns the order unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `OrderError::Forbidden` for anyone but
    /// the owner (admins included), or `OrderError::AlreadyPaid` when the
    /// order was paid with a different receipt.
    #[instrument(skip(self, customer, receipt), fields(user_id = %customer.id, receipt_id = %receipt.id))]
    pub async fn pay_order(
        &self,
        customer: &CurrentCustomer,
        id: OrderId,
        receipt: PaymentReceipt,
    ) -> Result<Order, ServiceError> {
        let mut order = self.load(id).await?.order;
        if !order.is_owned_by(customer.id) {
            return Err(OrderError::Forbidden("only the owner can pay for an order".to_string()).into());
        }

        if order.confirm_payment(receipt.clone(), Utc::now())? == Transition::AlreadyApplied {
            debug!("Duplicate payment receipt ignored");
            return Ok(order);
        }

        if self.repo.record_payment(&order).await? {
            info!(order_id = %order.id, "Order paid");
            return Ok(order);
        }

        // Another confirmation won the race; judge this receipt against the stored one.
        let mut current = self.load(id).await?.order;
        match current.confirm_payment(receipt, Utc::now())? {
            Transition::AlreadyApplied => Ok(current),
            Transition::Applied => Err(RepositoryError::DataCorruption(format!(
                "payment of order {id} was not recorded"
            ))
            .into()),
        }
    }

    /// Mark an order delivered. Admin only.
    ///
    /// Delivering an already delivered order returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for a non-admin caller (whatever the
    /// order's state), `OrderError::NotFound`, or `OrderError::NotPaid` when
    /// the order has not been paid.
    #[instrument(skip(self, customer), fields(user_id = %customer.id))]
    pub async fn deliver_order(
        &self,
        customer: &CurrentCustomer,
        id: OrderId,
    ) -> Result<Order, ServiceError> {
        if !customer.is_admin {
            return Err(OrderError::Forbidden("only admins can mark orders delivered".to_string()).into());
        }

        let mut order = self.load(id).await?.order;
        if order.confirm_delivery(Utc::now())? == Transition::AlreadyApplied {
            debug!("Order already delivered");
            return Ok(order);
        }

        if self.repo.record_delivery(&order).await? {
            info!(order_id = %order.id, "Order delivered");
            return Ok(order);
        }

        let mut current = self.load(id).await?.order;
        match current.confirm_delivery(Utc::now())? {
            Transition::AlreadyApplied => Ok(current),
            Transition::Applied => Err(RepositoryError::DataCorruption(format!(
                "delivery of order {id} was not recorded"
            ))
            .into()),
        }
    }

    /// All orders with their owners. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for a non-admin caller.
    #[instrument(skip(self, customer), fields(user_id = %customer.id))]
    pub async fn list_orders(
        &self,
        customer: &CurrentCustomer,
    ) -> Result<Vec<OrderSummary>, ServiceError> {
        if !customer.is_admin {
            return Err(OrderError::Forbidden("only admins can list all orders".to_string()).into());
        }
        Ok(self.repo.list_all().await?)
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the query fails.
    #[instrument(skip(self, customer), fields(user_id = %customer.id))]
    pub async fn list_my_orders(
        &self,
        customer: &CurrentCustomer,
    ) -> Result<Vec<OrderSummary>, ServiceError> {
        Ok(self.repo.list_by_owner(customer.id).await?)
    }

    /// Public payment gateway settings.
    #[must_use]
    pub fn payment_config(&self, customer: &CurrentCustomer) -> PaymentConfig {
        debug!(user_id = %customer.id, "Payment config requested");
        self.payment.clone()
    }

    async fn load(&self, id: OrderId) -> Result<OrderSummary, ServiceError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id).into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proshop_core::{LineItem, ProductId, ShippingAddress, UserId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::db::InMemoryOrderRepository;

    const OWNER: i32 = 1;
    const STRANGER: i32 = 2;
    const ADMIN: i32 = 9;

    fn service() -> OrderService<InMemoryOrderRepository> {
        let repo = InMemoryOrderRepository::new();
        repo.add_customer(UserId::new(OWNER), "Olive", "olive@example.com");
        repo.add_customer(UserId::new(ADMIN), "Ada", "ada@example.com");
        OrderService::new(
            repo,
            ShippingPolicy::default(),
            PaymentConfig {
                client_id: "sb-client".to_string(),
            },
        )
    }

    fn customer(id: i32, is_admin: bool) -> CurrentCustomer {
        CurrentCustomer {
            id: UserId::new(id),
            name: format!("Customer {id}"),
            email: format!("c{id}@example.com"),
            is_admin,
        }
    }

    fn draft(items: Vec<(Decimal, u32)>) -> OrderDraft {
        OrderDraft {
            items: items
                .into_iter()
                .zip(1..)
                .map(|((unit_price, quantity), product)| LineItem {
                    product: ProductId::new(product),
                    name: format!("Product {product}"),
                    image: format!("/images/{product}.jpg"),
                    unit_price,
                    quantity,
                })
                .collect(),
            shipping_address: ShippingAddress {
                address: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                postal_code: "12345".to_string(),
                country: "US".to_string(),
            },
            payment_method: "PayPal".to_string(),
            items_price: None,
            shipping_price: None,
            total_price: None,
        }
    }

    fn receipt(id: &str) -> PaymentReceipt {
        PaymentReceipt {
            id: id.to_string(),
            status: "COMPLETED".to_string(),
            update_time: "2026-10-17T10:00:00Z".to_string(),
            email_address: Some("payer@example.com".to_string()),
        }
    }

    async fn placed(service: &OrderService<InMemoryOrderRepository>) -> Order {
        service
            .create_order(&customer(OWNER, false), draft(vec![(dec!(30), 1)]))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_order_computes_prices() {
        let service = service();
        let order = placed(&service).await;

        assert_eq!(order.items_price, dec!(30.00));
        assert_eq!(order.shipping_price, dec!(100.00));
        assert_eq!(order.total_price, dec!(130.00));
        assert!(!order.is_paid);
        assert_eq!(service.repository().len(), 1);
    }

    #[tokio::test]
    async fn test_create_order_ignores_client_totals() {
        let service = service();
        let mut draft = draft(vec![(dec!(50), 2)]);
        draft.items_price = Some(dec!(1));
        draft.shipping_price = Some(dec!(0));
        draft.total_price = Some(dec!(1));

        let order = service
            .create_order(&customer(OWNER, false), draft)
            .await
            .unwrap();

        assert_eq!(order.items_price, dec!(100.00));
        assert_eq!(order.shipping_price, dec!(100.00));
        assert_eq!(order.total_price, dec!(200.00));
    }

    #[tokio::test]
    async fn test_create_empty_order_persists_nothing() {
        let service = service();
        let result = service
            .create_order(&customer(OWNER, false), draft(vec![]))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::EmptyOrder))
        ));
        assert!(service.repository().is_empty());
    }

    #[tokio::test]
    async fn test_get_order_access() {
        let service = service();
        let order = placed(&service).await;

        let summary = service
            .get_order(&customer(OWNER, false), order.id)
            .await
            .unwrap();
        assert_eq!(summary.owner_info.name, "Olive");

        assert!(service.get_order(&customer(ADMIN, true), order.id).await.is_ok());
        assert!(matches!(
            service.get_order(&customer(STRANGER, false), order.id).await,
            Err(ServiceError::Order(OrderError::Forbidden(_)))
        ));
        assert!(matches!(
            service
                .get_order(&customer(OWNER, false), OrderId::new(404))
                .await,
            Err(ServiceError::Order(OrderError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_pay_twice_with_same_receipt_is_noop() {
        let service = service();
        let order = placed(&service).await;
        let owner = customer(OWNER, false);

        let first = service
            .pay_order(&owner, order.id, receipt("PAY-1"))
            .await
            .unwrap();
        let second = service
            .pay_order(&owner, order.id, receipt("PAY-1"))
            .await
            .unwrap();

        assert!(first.is_paid);
        assert_eq!(first.paid_at, second.paid_at);
        assert_eq!(second.payment_result.unwrap().id, "PAY-1");
    }

    #[tokio::test]
    async fn test_pay_with_different_receipt_is_rejected() {
        let service = service();
        let order = placed(&service).await;
        let owner = customer(OWNER, false);

        service
            .pay_order(&owner, order.id, receipt("PAY-1"))
            .await
            .unwrap();
        let result = service.pay_order(&owner, order.id, receipt("PAY-2")).await;

        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::AlreadyPaid(id))) if id == order.id
        ));
    }

    #[tokio::test]
    async fn test_pay_by_stranger_is_forbidden() {
        let service = service();
        let order = placed(&service).await;

        let result = service
            .pay_order(&customer(STRANGER, false), order.id, receipt("PAY-1"))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn test_pay_by_admin_of_foreign_order_is_forbidden() {
        let service = service();
        let order = placed(&service).await;

        let result = service
            .pay_order(&customer(ADMIN, true), order.id, receipt("PAY-1"))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::Forbidden(_)))
        ));
        let stored = service
            .get_order(&customer(OWNER, false), order.id)
            .await
            .unwrap();
        assert!(!stored.order.is_paid);
    }

    #[tokio::test]
    async fn test_create_order_with_overflowing_price_persists_nothing() {
        let service = service();
        let result = service
            .create_order(&customer(OWNER, false), draft(vec![(Decimal::MAX, 2)]))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::InvalidLineItem { .. }))
        ));
        assert!(service.repository().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_requires_admin_before_payment_check() {
        let service = service();
        let order = placed(&service).await;

        let result = service
            .deliver_order(&customer(OWNER, false), order.id)
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn test_deliver_unpaid_is_rejected() {
        let service = service();
        let order = placed(&service).await;

        let result = service.deliver_order(&customer(ADMIN, true), order.id).await;
        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::NotPaid(_)))
        ));

        let stored = service
            .get_order(&customer(ADMIN, true), order.id)
            .await
            .unwrap();
        assert!(!stored.order.is_delivered);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let service = service();
        let order = placed(&service).await;
        let admin = customer(ADMIN, true);

        service
            .pay_order(&customer(OWNER, false), order.id, receipt("PAY-1"))
            .await
            .unwrap();
        let delivered = service.deliver_order(&admin, order.id).await.unwrap();
        assert!(delivered.is_delivered);

        let again = service.deliver_order(&admin, order.id).await.unwrap();
        assert_eq!(again.delivered_at, delivered.delivered_at);
    }

    #[tokio::test]
    async fn test_list_orders_is_admin_only() {
        let service = service();
        placed(&service).await;

        assert!(matches!(
            service.list_orders(&customer(OWNER, false)).await,
            Err(ServiceError::Order(OrderError::Forbidden(_)))
        ));
        assert_eq!(service.list_orders(&customer(ADMIN, true)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_degrades_deleted_owner() {
        let service = service();
        placed(&service).await;
        service.repository().remove_customer(UserId::new(OWNER));

        let orders = service.list_orders(&customer(ADMIN, true)).await.unwrap();
        assert_eq!(orders[0].owner_info.name, "unknown");
    }

    #[tokio::test]
    async fn test_list_my_orders_only_returns_own() {
        let service = service();
        placed(&service).await;
        service
            .create_order(&customer(STRANGER, false), draft(vec![(dec!(5), 1)]))
            .await
            .unwrap();

        let mine = service
            .list_my_orders(&customer(OWNER, false))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].order.owner, UserId::new(OWNER));
    }

    #[test]
    fn test_payment_config() {
        let config = service().payment_config(&customer(OWNER, false));
        assert_eq!(config.client_id, "sb-client");
    }
}
