//! Decimal type utilities for precise financial calculations

use rust_decimal::{Decimal, RoundingStrategy};
pub use rust_decimal_macros::dec;

/// Price type with high precision
pub type Price = Decimal;

/// Quantity type with high precision
pub type Quantity = Decimal;

/// Amount type with high precision (typically Price * Quantity)
pub type Amount = Decimal;

/// Precision helpers for common operations
pub mod precision {
    use super::*;

    /// Default price precision (8 decimal places)
    pub const PRICE_PRECISION: u32 = 8;

    /// Default quantity precision (8 decimal places)
    pub const QUANTITY_PRECISION: u32 = 8;

    /// Round price to standard precision
    pub fn round_price(price: Price) -> Price {
        price.round_dp(PRICE_PRECISION)
    }

    /// Round quantity to standard precision
    pub fn round_quantity(qty: Quantity) -> Quantity {
        qty.round_dp(QUANTITY_PRECISION)
    }

    /// Round quantity down to standard precision, never over-allocating
    pub fn floor_quantity(qty: Quantity) -> Quantity {
        qty.round_dp_with_strategy(QUANTITY_PRECISION, RoundingStrategy::ToZero)
    }

    /// Whether `value` is an exact multiple of `step` (a zero step accepts everything)
    pub fn is_multiple_of(value: Decimal, step: Decimal) -> bool {
        step.is_zero() || (value % step).is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::precision::*;
    use super::*;

    #[test]
    fn floor_never_rounds_up() {
        assert_eq!(floor_quantity(dec!(0.123456789)), dec!(0.12345678));
        assert_eq!(round_quantity(dec!(0.123456789)), dec!(0.12345679));
    }

    #[test]
    fn step_alignment() {
        assert!(is_multiple_of(dec!(1.25), dec!(0.05)));
        assert!(!is_multiple_of(dec!(1.26), dec!(0.05)));
        assert!(is_multiple_of(dec!(1.26), Decimal::ZERO));
    }
}
