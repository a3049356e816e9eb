//! Order repository.
//!
//! [`OrderRepository`] is the persistence seam of the order service. The
//! `PostgreSQL` implementation stores line items, the shipping address and the
//! payment receipt as JSONB next to the scalar order columns.
//!
//! Payment and delivery writes are conditional on the previous flag value, so
//! of two concurrent confirmations exactly one sees `true`.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use proshop_core::{
    LineItem, NewOrder, Order, OrderId, OrderSummary, OwnerInfo, PaymentReceipt,
    ShippingAddress, UserId,
};

use super::RepositoryError;

/// Storage for orders.
pub trait OrderRepository: Send + Sync {
    /// Persist a new order and return it with its assigned id.
    fn insert(&self, order: NewOrder)
    -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Fetch an order together with its owner.
    fn get(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<OrderSummary>, RepositoryError>> + Send;

    /// Write the payment fields of `order` if the stored order is still unpaid.
    ///
    /// Returns `false` when the stored order was already paid.
    fn record_payment(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Write the delivery fields of `order` if the stored order is paid and
    /// not yet delivered.
    ///
    /// Returns `false` when nothing was updated.
    fn record_delivery(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// All orders, newest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<OrderSummary>, RepositoryError>> + Send;

    /// Orders placed by `owner`, newest first.
    fn list_by_owner(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<OrderSummary>, RepositoryError>> + Send;
}

// =============================================================================
// Internal Row Types
// =============================================================================

const SELECT_ORDERS: &str = r"
    SELECT o.id, o.owner_id, o.items, o.shipping_address, o.payment_method,
           o.items_price, o.shipping_price, o.total_price,
           o.is_paid, o.paid_at, o.payment_result,
           o.is_delivered, o.delivered_at, o.created_at,
           c.name AS owner_name, c.email AS owner_email
    FROM storefront.orders o
    LEFT JOIN storefront.customer c ON c.id = o.owner_id
";

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    owner_id: i32,
    items: Json<Vec<LineItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    items_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_result: Option<Json<PaymentReceipt>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    owner_name: Option<String>,
    owner_email: Option<String>,
}

impl TryFrom<OrderRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        if row.is_delivered && !row.is_paid {
            return Err(RepositoryError::DataCorruption(format!(
                "order {} is delivered but unpaid",
                row.id
            )));
        }

        let owner_info = row.owner_name.map_or_else(OwnerInfo::unknown, |name| OwnerInfo {
            name,
            email: row.owner_email,
        });

        Ok(Self {
            order: Order {
                id: OrderId::new(row.id),
                owner: UserId::new(row.owner_id),
                items: row.items.0,
                shipping_address: row.shipping_address.0,
                payment_method: row.payment_method,
                items_price: row.items_price,
                shipping_price: row.shipping_price,
                total_price: row.total_price,
                is_paid: row.is_paid,
                paid_at: row.paid_at,
                payment_result: row.payment_result.map(|receipt| receipt.0),
                is_delivered: row.is_delivered,
                delivered_at: row.delivered_at,
                created_at: row.created_at,
            },
            owner_info,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL`-backed order repository.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_summaries(
        &self,
        sql: &str,
        owner: Option<UserId>,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let mut query = sqlx::query_as::<_, OrderRow>(sql);
        if let Some(owner) = owner {
            query = query.bind(owner);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO storefront.orders
                (owner_id, items, shipping_address, payment_method,
                 items_price, shipping_price, total_price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(order.owner)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(&order.payment_method)
        .bind(order.prices.items_price)
        .bind(order.prices.shipping_price)
        .bind(order.prices.total_price)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(order.into_order(OrderId::new(id)))
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        let sql = format!("{SELECT_ORDERS} WHERE o.id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn record_payment(&self, order: &Order) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET is_paid = TRUE, paid_at = $2, payment_result = $3
            WHERE id = $1 AND is_paid = FALSE
            ",
        )
        .bind(order.id)
        .bind(order.paid_at)
        .bind(order.payment_result.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_delivery(&self, order: &Order) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET is_delivered = TRUE, delivered_at = $2
            WHERE id = $1 AND is_paid = TRUE AND is_delivered = FALSE
            ",
        )
        .bind(order.id)
        .bind(order.delivered_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_all(&self) -> Result<Vec<OrderSummary>, RepositoryError> {
        let sql = format!("{SELECT_ORDERS} ORDER BY o.created_at DESC, o.id DESC");
        self.fetch_summaries(&sql, None).await
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let sql =
            format!("{SELECT_ORDERS} WHERE o.owner_id = $1 ORDER BY o.created_at DESC, o.id DESC");
        self.fetch_summaries(&sql, Some(owner)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn row() -> OrderRow {
        OrderRow {
            id: 7,
            owner_id: 3,
            items: Json(vec![LineItem {
                product: proshop_core::ProductId::new(1),
                name: "Keyboard".to_string(),
                image: "/images/keyboard.jpg".to_string(),
                unit_price: dec!(30.00),
                quantity: 1,
            }]),
            shipping_address: Json(ShippingAddress::default()),
            payment_method: "PayPal".to_string(),
            items_price: dec!(30.00),
            shipping_price: dec!(100.00),
            total_price: dec!(130.00),
            is_paid: false,
            paid_at: None,
            payment_result: None,
            is_delivered: false,
            delivered_at: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
            owner_name: Some("Ada".to_string()),
            owner_email: Some("ada@example.com".to_string()),
        }
    }

    #[test]
    fn test_row_conversion_keeps_owner() {
        let summary = OrderSummary::try_from(row()).expect("valid row");
        assert_eq!(summary.order.id, OrderId::new(7));
        assert_eq!(summary.owner_info.name, "Ada");
        assert_eq!(summary.order.total_price, dec!(130.00));
    }

    #[test]
    fn test_row_without_owner_is_unknown() {
        let mut row = row();
        row.owner_name = None;
        row.owner_email = None;

        let summary = OrderSummary::try_from(row).expect("valid row");
        assert_eq!(summary.owner_info, OwnerInfo::unknown());
    }

    #[test]
    fn test_row_delivered_but_unpaid_is_corrupt() {
        let mut row = row();
        row.is_delivered = true;

        assert!(matches!(
            OrderSummary::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
