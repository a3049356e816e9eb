//! Price a cart file with the storefront's pricing rules.
//!
//! The file holds `{ "items": [ { "product", "name", "image", "unit_price",
//! "quantity" } ] }`. Shipping uses `SHIPPING_FREE_THRESHOLD` and
//! `SHIPPING_FLAT_RATE` (both default to 100).

use std::path::Path;

use proshop_core::{LineItem, OrderError, PriceBreakdown, ShippingPolicy};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid cart file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    #[error(transparent)]
    Order(#[from] OrderError),
}

#[derive(Debug, Deserialize)]
struct CartFile {
    items: Vec<LineItem>,
}

/// Print the price breakdown of the cart at `path` as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a line item is
/// invalid, or the shipping variables are malformed.
pub fn run(path: &Path) -> Result<(), QuoteError> {
    let contents = std::fs::read_to_string(path).map_err(|source| QuoteError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let breakdown = quote(&contents, &shipping_policy()?)?;

    tracing::info!(
        items_price = %breakdown.items_price,
        shipping_price = %breakdown.shipping_price,
        total_price = %breakdown.total_price,
        "Quote computed"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    }
    Ok(())
}

fn quote(contents: &str, policy: &ShippingPolicy) -> Result<PriceBreakdown, QuoteError> {
    let cart: CartFile = serde_json::from_str(contents)?;
    if cart.items.is_empty() {
        return Err(OrderError::EmptyOrder.into());
    }
    for item in &cart.items {
        item.validate()?;
    }

    Ok(PriceBreakdown::compute(&cart.items, policy)?)
}

fn shipping_policy() -> Result<ShippingPolicy, QuoteError> {
    dotenvy::dotenv().ok();

    let defaults = ShippingPolicy::default();
    Ok(ShippingPolicy {
        free_shipping_threshold: money_env(
            "SHIPPING_FREE_THRESHOLD",
            defaults.free_shipping_threshold,
        )?,
        flat_rate: money_env("SHIPPING_FLAT_RATE", defaults.flat_rate)?,
    })
}

fn money_env(key: &'static str, default: Decimal) -> Result<Decimal, QuoteError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    let value: Decimal = raw
        .parse()
        .map_err(|e: rust_decimal::Error| QuoteError::InvalidEnvVar(key, e.to_string()))?;
    if value.is_sign_negative() {
        return Err(QuoteError::InvalidEnvVar(key, "must not be negative".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cart(items: &str) -> String {
        format!(r#"{{ "items": {items} }}"#)
    }

    #[test]
    fn test_quote_below_threshold() {
        let breakdown = quote(
            &cart(r#"[{ "product": 1, "name": "Camera", "image": "/c.jpg", "unit_price": "30.00", "quantity": 1 }]"#),
            &ShippingPolicy::default(),
        )
        .unwrap();

        assert_eq!(breakdown.items_price, dec!(30.00));
        assert_eq!(breakdown.shipping_price, dec!(100.00));
        assert_eq!(breakdown.total_price, dec!(130.00));
    }

    #[test]
    fn test_quote_at_threshold_pays_shipping() {
        let breakdown = quote(
            &cart(r#"[{ "product": 1, "name": "Lens", "image": "/l.jpg", "unit_price": "50.00", "quantity": 2 }]"#),
            &ShippingPolicy::default(),
        )
        .unwrap();

        assert_eq!(breakdown.items_price, dec!(100.00));
        assert_eq!(breakdown.shipping_price, dec!(100.00));
        assert_eq!(breakdown.total_price, dec!(200.00));
    }

    #[test]
    fn test_quote_rejects_empty_cart() {
        assert!(matches!(
            quote(&cart("[]"), &ShippingPolicy::default()),
            Err(QuoteError::Order(OrderError::EmptyOrder))
        ));
    }

    #[test]
    fn test_quote_rejects_zero_quantity() {
        let err = quote(
            &cart(r#"[{ "product": 4, "name": "Bag", "image": "/b.jpg", "unit_price": "10.00", "quantity": 0 }]"#),
            &ShippingPolicy::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            QuoteError::Order(OrderError::InvalidLineItem { .. })
        ));
    }

    #[test]
    fn test_quote_rejects_overflowing_price() {
        let err = quote(
            &cart(r#"[{ "product": 5, "name": "Yacht", "image": "/y.jpg", "unit_price": "79228162514264337593543950335", "quantity": 2 }]"#),
            &ShippingPolicy::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            QuoteError::Order(OrderError::InvalidLineItem { .. })
        ));
    }
}
