//! Mathematical utility functions

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

pub const BPS_DENOMINATOR: Decimal = dec!(10_000);

/// `amount * bps / 10000`
pub fn apply_bps(amount: Decimal, bps: u32) -> Decimal {
    amount * Decimal::from(bps) / BPS_DENOMINATOR
}

/// Percentage change from `low` to `high`; zero when `low` is not positive.
pub fn spread_pct(low: Decimal, high: Decimal) -> Decimal {
    if low <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (high - low) / low * dec!(100)
}

pub fn gwei_to_native(gwei: Decimal) -> Decimal {
    gwei / dec!(1_000_000_000)
}

/// Median of an unsorted slice.
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / dec!(2))
    } else {
        Some(sorted[mid])
    }
}

/// Saturating sum of confidence components, capped at 100.
pub fn cap_confidence(parts: &[u8]) -> u8 {
    parts.iter().fold(0u32, |acc, p| acc + *p as u32).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bps_and_spread() {
        assert_eq!(apply_bps(dec!(40000), 9), dec!(36));
        assert_eq!(spread_pct(dec!(100), dec!(102)), dec!(2));
        assert_eq!(spread_pct(dec!(0), dec!(102)), dec!(0));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[dec!(3), dec!(1), dec!(2)]), Some(dec!(2)));
        assert_eq!(median(&[dec!(4), dec!(1), dec!(2), dec!(3)]), Some(dec!(2.5)));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn confidence_caps_at_hundred() {
        assert_eq!(cap_confidence(&[60, 20, 15, 10]), 100);
        assert_eq!(cap_confidence(&[50, 20]), 70);
    }
}
