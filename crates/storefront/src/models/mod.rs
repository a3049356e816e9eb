//! Domain models for storefront.

pub mod session;

pub use session::{CurrentCustomer, session_keys};
