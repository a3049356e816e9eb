//! Price calculation for carts and orders.
//!
//! All functions here are pure. The storefront calls them to compute the
//! trusted totals of a new order; the client calls the same functions to show
//! an estimate before checkout. Client estimates are advisory only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::order::LineItem;
use crate::types::round_money;

/// Shipping rule: a flat rate, waived above a threshold.
///
/// Both values are configuration; the storefront loads them from the
/// environment and falls back to [`ShippingPolicy::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Shipping is free when the items price is strictly greater than this.
    pub free_shipping_threshold: Decimal,
    /// Shipping charged otherwise.
    pub flat_rate: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::ONE_HUNDRED,
            flat_rate: Decimal::ONE_HUNDRED,
        }
    }
}

/// Sum of `unit_price * quantity` over `items`, rounded to two digits.
///
/// `None` when the sum does not fit in a `Decimal`.
#[must_use]
pub fn items_price(items: &[LineItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
        .map(round_money)
}

/// Shipping for a given items price.
///
/// The comparison is strict: an items price exactly at the threshold still
/// pays the flat rate.
#[must_use]
pub fn shipping_price(items_price: Decimal, policy: &ShippingPolicy) -> Decimal {
    if items_price > policy.free_shipping_threshold {
        round_money(Decimal::ZERO)
    } else {
        round_money(policy.flat_rate)
    }
}

/// `items_price + shipping_price`, rounded to two digits.
///
/// `None` on overflow.
#[must_use]
pub fn total_price(items_price: Decimal, shipping_price: Decimal) -> Option<Decimal> {
    items_price.checked_add(shipping_price).map(round_money)
}

/// The three derived prices of a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl PriceBreakdown {
    /// Compute all three prices from line items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidLineItem` naming the first line whose
    /// amount pushes a price out of the `Decimal` range.
    pub fn compute(items: &[LineItem], policy: &ShippingPolicy) -> Result<Self, OrderError> {
        let mut sum = Decimal::ZERO;
        for item in items {
            sum = item
                .line_total()
                .and_then(|line| sum.checked_add(line))
                .ok_or_else(|| out_of_range(item))?;
        }

        let items_price = round_money(sum);
        let shipping_price = shipping_price(items_price, policy);
        let total_price = total_price(items_price, shipping_price)
            .ok_or_else(|| items.last().map_or(OrderError::EmptyOrder, out_of_range))?;

        Ok(Self {
            items_price,
            shipping_price,
            total_price,
        })
    }

    /// Whether no shipping is charged.
    #[must_use]
    pub fn ships_free(&self) -> bool {
        self.shipping_price.is_zero()
    }
}

fn out_of_range(item: &LineItem) -> OrderError {
    OrderError::InvalidLineItem {
        product: item.product,
        reason: "price is out of range".to_string(),
    }
}
