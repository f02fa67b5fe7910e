//! Monetary amount precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount the ledger stores is a `rust_decimal::Decimal` rounded to
//! [`AMOUNT_SCALE`] fractional digits with banker's rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits every stored amount carries.
pub const AMOUNT_SCALE: u32 = 4;

/// Largest magnitude a `NUMERIC(19, 4)` column holds: 999 999 999 999 999.9999.
pub const MAX_STORED_AMOUNT: Decimal =
    Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, AMOUNT_SCALE);

/// Rounds an amount to the stored precision using banker's rounding.
///
/// - 0.00005 → 0.0000 (to nearest even)
/// - 0.00015 → 0.0002 (to nearest even)
#[must_use]
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Converts a transaction-currency amount into the base currency.
///
/// The result is rounded to the stored precision. `None` when the product
/// overflows.
#[must_use]
pub fn convert_to_base(amount: Decimal, exchange_rate: Decimal) -> Option<Decimal> {
    amount.checked_mul(exchange_rate).map(round_amount)
}

/// Returns true if the value carries no more than [`AMOUNT_SCALE`] fractional digits.
#[must_use]
pub fn is_at_stored_precision(value: Decimal) -> bool {
    round_amount(value) == value
}

/// Returns true if the value fits a `NUMERIC(19, 4)` column.
#[must_use]
pub fn is_within_stored_range(value: Decimal) -> bool {
    value.abs() <= MAX_STORED_AMOUNT
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(100.12345), dec!(100.1234))]
    #[case(dec!(100.12355), dec!(100.1236))]
    #[case(dec!(0.00005), dec!(0.0000))]
    #[case(dec!(0.00015), dec!(0.0002))]
    #[case(dec!(-1.00005), dec!(-1.0000))]
    #[case(dec!(1000), dec!(1000))]
    fn test_round_amount(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_amount(input), expected);
    }

    #[test]
    fn test_convert_to_base() {
        // 100 EUR * 1.08345 = 108.345 USD
        assert_eq!(convert_to_base(dec!(100), dec!(1.08345)), Some(dec!(108.3450)));
        // 33.33 * 0.333333 = 11.10998889 -> 11.1100
        assert_eq!(convert_to_base(dec!(33.33), dec!(0.333333)), Some(dec!(11.1100)));
    }

    #[test]
    fn test_convert_to_base_overflow_is_none() {
        assert_eq!(convert_to_base(Decimal::MAX, dec!(2)), None);
    }

    #[test]
    fn test_stored_range() {
        assert_eq!(MAX_STORED_AMOUNT, dec!(999999999999999.9999));
        assert!(is_within_stored_range(MAX_STORED_AMOUNT));
        assert!(is_within_stored_range(-MAX_STORED_AMOUNT));
        assert!(!is_within_stored_range(dec!(1000000000000000)));
        assert!(!is_within_stored_range(Decimal::MAX));
    }

    #[test]
    fn test_is_at_stored_precision() {
        assert!(is_at_stored_precision(dec!(12.3456)));
        assert!(is_at_stored_precision(dec!(12)));
        assert!(!is_at_stored_precision(dec!(12.34567)));
    }
}
