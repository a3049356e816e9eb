//! Business logic services for storefront.
//!
//! # Services
//!
//! - `orders` - Order lifecycle (create, pay, deliver) with role gating

pub mod orders;

pub use orders::{OrderService, ServiceError};
