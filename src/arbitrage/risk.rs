//! Opportunity risk classification

use rust_decimal::Decimal;
use crate::{config::RiskThresholds, types::RiskLevel};

/// Pure function of spread and margin under the configured cutoffs.
pub fn classify_risk(spread_pct: Decimal, margin_pct: Decimal, thresholds: &RiskThresholds) -> RiskLevel {
    if spread_pct < thresholds.high_spread_pct || margin_pct < thresholds.high_margin_pct {
        RiskLevel::High
    } else if spread_pct < thresholds.medium_spread_pct || margin_pct < thresholds.medium_margin_pct {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rust_decimal_macros::dec;

    #[test]
    fn classification_cases() {
        let t = Config::default().risk;
        assert_eq!(classify_risk(dec!(0.3), dec!(5), &t), RiskLevel::High);
        assert_eq!(classify_risk(dec!(2), dec!(0.1), &t), RiskLevel::High);
        assert_eq!(classify_risk(dec!(2), dec!(5), &t), RiskLevel::Low);
        assert_eq!(classify_risk(dec!(0.7), dec!(5), &t), RiskLevel::Medium);
        assert_eq!(classify_risk(dec!(2), dec!(0.3), &t), RiskLevel::Medium);
    }

    #[test]
    fn thresholds_are_configuration() {
        let mut t = Config::default().risk;
        t.high_spread_pct = dec!(0.1);
        t.medium_spread_pct = dec!(0.2);
        assert_eq!(classify_risk(dec!(0.3), dec!(5), &t), RiskLevel::Low);
    }
}
