//! Proshop Core - Order lifecycle and pricing domain.
//!
//! This crate provides the domain shared by every Proshop component:
//! - `storefront` - Trusted order service and REST API
//! - `client` - Client-side checkout session (cart, payment widget, lifecycle)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Prices computed here are the same on both sides of
//! the wire, which is what lets the storefront re-verify client estimates.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money rounding, order status
//! - [`pricing`] - Items, shipping and total price calculation
//! - [`cart`] - Client-held pre-order state
//! - [`order`] - The persisted order aggregate and its transitions
//! - [`error`] - Order lifecycle error taxonomy and its wire form
//! - [`request`] - Per-operation request state for client sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod error;
pub mod order;
pub mod pricing;
pub mod request;
pub mod types;

pub use cart::Cart;
pub use error::{ErrorBody, ErrorKind, OrderError};
pub use order::{
    LineItem, NewOrder, Order, OrderDraft, OrderSummary, OwnerInfo, PaymentConfig,
    PaymentReceipt, ShippingAddress, Transition,
};
pub use pricing::{PriceBreakdown, ShippingPolicy};
pub use request::RequestState;
pub use types::*;
