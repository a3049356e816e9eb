//! Client-side cart.
//!
//! The cart is the pre-order state of one shopping session: selected line
//! items plus the shipping address and payment method chosen during checkout.
//! Its prices are derived on every read and never stored. Once an order has
//! been placed the caller resets the cart; that reset is a separate step from
//! order creation.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::order::{LineItem, OrderDraft, ShippingAddress};
use crate::pricing::{PriceBreakdown, ShippingPolicy};
use crate::types::ProductId;

/// Line items, address and payment choice of a shopping session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
    shipping_address: Option<ShippingAddress>,
    payment_method: Option<String>,
}

/// Clamp a requested quantity into `1..=stock_ceiling`.
///
/// A ceiling of zero still allows one unit; out-of-stock products are kept
/// out of the cart by the catalog, not here.
fn clamp_quantity(quantity: u32, stock_ceiling: u32) -> u32 {
    quantity.clamp(1, stock_ceiling.max(1))
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub const fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    #[must_use]
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Add a product, or replace its line if it is already in the cart.
    ///
    /// The requested quantity replaces the existing one rather than adding to
    /// it. `stock_ceiling` comes from the catalog.
    pub fn add_item(&mut self, mut item: LineItem, stock_ceiling: u32) {
        item.quantity = clamp_quantity(item.quantity, stock_ceiling);

        match self.items.iter_mut().find(|existing| existing.product == item.product) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Change the quantity of a line already in the cart.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product: ProductId, quantity: u32, stock_ceiling: u32) -> bool {
        match self.items.iter_mut().find(|item| item.product == product) {
            Some(item) => {
                item.quantity = clamp_quantity(quantity, stock_ceiling);
                true
            }
            None => false,
        }
    }

    /// Remove a product's line. Returns the removed line, if any.
    pub fn remove_item(&mut self, product: ProductId) -> Option<LineItem> {
        let index = self.items.iter().position(|item| item.product == product)?;
        Some(self.items.remove(index))
    }

    pub fn set_shipping_address(&mut self, address: ShippingAddress) {
        self.shipping_address = Some(address);
    }

    pub fn set_payment_method(&mut self, method: impl Into<String>) {
        self.payment_method = Some(method.into());
    }

    /// Derived prices, recomputed on every call.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidLineItem` when a line's amount overflows.
    pub fn totals(&self, policy: &ShippingPolicy) -> Result<PriceBreakdown, OrderError> {
        PriceBreakdown::compute(&self.items, policy)
    }

    /// Snapshot the cart into a checkout draft.
    ///
    /// The draft carries this cart's own price estimate, or none if the
    /// estimate overflows; the storefront recomputes the real prices from the
    /// items either way.
    #[must_use]
    pub fn to_draft(&self, policy: &ShippingPolicy) -> OrderDraft {
        let totals = self.totals(policy).ok();
        OrderDraft {
            items: self.items.clone(),
            shipping_address: self.shipping_address.clone().unwrap_or_default(),
            payment_method: self.payment_method.clone().unwrap_or_default(),
            items_price: totals.map(|t| t.items_price),
            shipping_price: totals.map(|t| t.shipping_price),
            total_price: totals.map(|t| t.total_price),
        }
    }

    /// Clear items, address and payment method.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
