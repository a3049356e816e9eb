//! Proshop client - the client-side half of the order lifecycle.
//!
//! # Modules
//!
//! - [`api`] - `StorefrontApi` trait and its reqwest transport
//! - [`payment`] - payment script singleton and widget bridge
//! - [`controller`] - `LifecycleController`, one per client session
//! - [`config`] - client configuration
//! - [`error`] - `ClientError`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod payment;

pub use api::{HttpStorefrontApi, StorefrontApi};
pub use config::ClientConfig;
pub use controller::{LifecycleController, SessionSnapshot, SessionUser, ViewToken};
pub use error::ClientError;
pub use payment::{PaymentGateway, PaymentScript, PaymentSdk, PaymentWidget, ScriptState};
