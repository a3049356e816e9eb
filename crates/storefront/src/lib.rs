//! Proshop Storefront library.
//!
//! The trusted half of the order lifecycle: an axum REST API over
//! [`services::OrderService`], which owns role checks, price recomputation and
//! conditional persistence. Exposed as a library so the router and service can
//! be tested and embedded.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
