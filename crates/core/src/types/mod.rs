//! Core types for Proshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::{MONEY_SCALE, format_money, round_money};
pub use status::OrderStatus;
