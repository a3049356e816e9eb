//! Money arithmetic helpers.
//!
//! Amounts are plain [`Decimal`] values in the store's single currency.
//! Every amount that leaves the pricing calculator goes through
//! [`round_money`], so two sides computing the same price always agree on
//! both value and scale.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for every money amount.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to [`MONEY_SCALE`] digits, half-up, and fix its scale.
///
/// Fixing the scale means `100` and `100.000` both come out as `100.00`,
/// which keeps the serialized form stable.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    // Amounts are never negative, so away-from-zero is half-up.
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Format an amount with exactly two fractional digits (e.g. `"130.00"`).
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    round_money(amount).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_money(dec!(0.005)), dec!(0.01));
        assert_eq!(round_money(dec!(0.004)), dec!(0.00));
        assert_eq!(round_money(dec!(19.995)), dec!(20.00));
    }

    #[test]
    fn test_scale_is_fixed() {
        assert_eq!(round_money(dec!(100)).scale(), MONEY_SCALE);
        assert_eq!(round_money(dec!(1.23456)).scale(), MONEY_SCALE);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(130)), "130.00");
        assert_eq!(format_money(dec!(0)), "0.00");
        assert_eq!(format_money(dec!(12.345)), "12.35");
    }
}
