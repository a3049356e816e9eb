//! The order aggregate.
//!
//! An [`Order`] is the server-of-record commitment created from a cart
//! snapshot. Its prices are computed once, from the submitted line items, and
//! trusted from then on. Payment and delivery are one-way flags guarded by
//! [`Order::confirm_payment`] and [`Order::confirm_delivery`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::pricing::{PriceBreakdown, ShippingPolicy};
use crate::types::{OrderId, OrderStatus, ProductId, UserId};

/// A product line in a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub name: String,
    pub image: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price * quantity`, unrounded. `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// Check the ranges the pricing calculator relies on.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidLineItem` for a negative price or a zero
    /// quantity.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.unit_price < Decimal::ZERO {
            return Err(OrderError::InvalidLineItem {
                product: self.product,
                reason: "unit price cannot be negative".to_string(),
            });
        }
        if self.quantity == 0 {
            return Err(OrderError::InvalidLineItem {
                product: self.product,
                reason: "quantity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where an order ships to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Opaque confirmation returned by the payment widget.
///
/// Two receipts with the same `id` describe the same payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub id: String,
    pub status: String,
    pub update_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// Public payment gateway settings a client needs to render the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub client_id: String,
}

/// What a client submits at checkout.
///
/// The `*_price` fields are the client's own estimate. They are never used as
/// the order's prices; the storefront only compares them against its own
/// computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

impl OrderDraft {
    /// The client-estimated totals, if the client sent all three.
    #[must_use]
    pub fn client_totals(&self) -> Option<PriceBreakdown> {
        match (self.items_price, self.shipping_price, self.total_price) {
            (Some(items_price), Some(shipping_price), Some(total_price)) => Some(PriceBreakdown {
                items_price,
                shipping_price,
                total_price,
            }),
            _ => None,
        }
    }
}

/// An order that has passed validation but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub owner: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub prices: PriceBreakdown,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Validate a draft and compute its trusted prices.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyOrder` if the draft has no items, or
    /// `OrderError::InvalidLineItem` if any item is out of range, a product
    /// appears on two lines, or the prices overflow.
    pub fn from_draft(
        owner: UserId,
        draft: OrderDraft,
        policy: &ShippingPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for (index, item) in draft.items.iter().enumerate() {
            item.validate()?;
            if draft
                .items
                .iter()
                .take(index)
                .any(|earlier| earlier.product == item.product)
            {
                return Err(OrderError::InvalidLineItem {
                    product: item.product,
                    reason: "product appears on more than one line".to_string(),
                });
            }
        }

        let prices = PriceBreakdown::compute(&draft.items, policy)?;

        Ok(Self {
            owner,
            items: draft.items,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method,
            prices,
            created_at: now,
        })
    }

    /// Attach the id assigned by persistence.
    #[must_use]
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            owner: self.owner,
            items: self.items,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            items_price: self.prices.items_price,
            shipping_price: self.prices.shipping_price,
            total_price: self.prices.total_price,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            is_delivered: false,
            delivered_at: None,
            created_at: self.created_at,
        }
    }
}

/// Result of a lifecycle transition that succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order changed state.
    Applied,
    /// The order was already in the target state for the same request.
    AlreadyApplied,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentReceipt>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        if self.is_delivered {
            OrderStatus::Delivered
        } else if self.is_paid {
            OrderStatus::Paid
        } else {
            OrderStatus::Created
        }
    }

    /// The prices fixed at creation.
    #[must_use]
    pub const fn prices(&self) -> PriceBreakdown {
        PriceBreakdown {
            items_price: self.items_price,
            shipping_price: self.shipping_price,
            total_price: self.total_price,
        }
    }

    /// Whether `user` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Record a payment.
    ///
    /// Delivering the same receipt twice is a no-op that reports
    /// [`Transition::AlreadyApplied`]; `paid_at` keeps its first value.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::AlreadyPaid` if the order was paid with a
    /// different receipt.
    pub fn confirm_payment(
        &mut self,
        receipt: PaymentReceipt,
        now: DateTime<Utc>,
    ) -> Result<Transition, OrderError> {
        if self.is_paid {
            return match &self.payment_result {
                Some(existing) if existing.id == receipt.id => Ok(Transition::AlreadyApplied),
                _ => Err(OrderError::AlreadyPaid(self.id)),
            };
        }

        self.is_paid = true;
        self.paid_at = Some(now);
        self.payment_result = Some(receipt);
        Ok(Transition::Applied)
    }

    /// Record delivery.
    ///
    /// Role checks are the caller's job; this only enforces ordering.
    /// A second call on a delivered order is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotPaid` if the order has not been paid.
    pub fn confirm_delivery(&mut self, now: DateTime<Utc>) -> Result<Transition, OrderError> {
        if !self.is_paid {
            return Err(OrderError::NotPaid(self.id));
        }
        if self.is_delivered {
            return Ok(Transition::AlreadyApplied);
        }

        self.is_delivered = true;
        self.delivered_at = Some(now);
        Ok(Transition::Applied)
    }
}

/// Owner details shown next to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl OwnerInfo {
    /// Display name used when the owner account no longer exists.
    pub const UNKNOWN_NAME: &'static str = "unknown";

    /// Placeholder for a deleted owner.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            name: Self::UNKNOWN_NAME.to_string(),
            email: None,
        }
    }
}

/// An order together with its denormalized owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub owner_info: OwnerInfo,
}
