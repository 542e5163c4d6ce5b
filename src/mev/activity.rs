//! Window-level MEV activity scoring

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use crate::{
    config::DetectorConfig,
    types::TransactionRecord,
    utils::math::median,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityBreakdown {
    pub known_actor_rate: Decimal,
    pub high_gas_price_rate: Decimal,
    pub high_gas_usage_rate: Decimal,
    /// Weighted sum of the three rates, 0..=100.
    pub score: u8,
}

pub fn measure_activity(
    records: &[&TransactionRecord],
    known_actors: &HashSet<Address>,
    config: &DetectorConfig,
) -> ActivityBreakdown {
    if records.is_empty() {
        return ActivityBreakdown::default();
    }
    let total = Decimal::from(records.len());

    let known_hits = records.iter().filter(|t| known_actors.contains(&t.from)).count();

    let gas_prices: Vec<Decimal> = records.iter().map(|t| t.gas_price_gwei).collect();
    let high_gas_price = match median(&gas_prices) {
        Some(m) => {
            let cutoff = m * config.frontrun_gas_multiplier;
            gas_prices.iter().filter(|g| **g > cutoff).count()
        }
        None => 0,
    };

    // Only records with a known gas used count towards the usage ratio.
    let measured: Vec<u64> = records.iter().filter_map(|t| t.gas_used).collect();
    let high_gas_usage = measured.iter().filter(|used| **used >= config.jit_gas_threshold).count();

    let known_actor_rate = Decimal::from(known_hits) / total;
    let high_gas_price_rate = Decimal::from(high_gas_price) / total;
    let high_gas_usage_rate = if measured.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from(high_gas_usage) / Decimal::from(measured.len())
    };

    let weighted = Decimal::from(config.activity_actor_weight) * known_actor_rate
        + Decimal::from(config.activity_gas_price_weight) * high_gas_price_rate
        + Decimal::from(config.activity_gas_usage_weight) * high_gas_usage_rate;
    let score = weighted.round().to_u8().unwrap_or(100).min(100);

    ActivityBreakdown {
        known_actor_rate,
        high_gas_price_rate,
        high_gas_usage_rate,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::ChainId;
    use alloy::primitives::B256;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(from: u8, gas: Decimal, gas_used: Option<u64>) -> TransactionRecord {
        TransactionRecord {
            chain: ChainId::ETHEREUM,
            hash: B256::repeat_byte(from),
            from: Address::repeat_byte(from),
            to: None,
            value: dec!(1),
            gas_price_gwei: gas,
            gas_used,
            gas_limit: 500_000,
            block_number: 1,
            tx_index: from as u32,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_window_scores_zero() {
        let config = Config::default().detector;
        assert_eq!(measure_activity(&[], &HashSet::new(), &config).score, 0);
    }

    #[test]
    fn weighted_rates() {
        let config = Config::default().detector;
        let records = [
            record(1, dec!(10), Some(21_000)),
            record(2, dec!(10), Some(21_000)),
            record(3, dec!(10), Some(250_000)),
            record(4, dec!(40), Some(21_000)),
        ];
        let refs: Vec<&TransactionRecord> = records.iter().collect();
        let known = HashSet::from([Address::repeat_byte(4)]);

        let activity = measure_activity(&refs, &known, &config);
        assert_eq!(activity.known_actor_rate, dec!(0.25));
        assert_eq!(activity.high_gas_price_rate, dec!(0.25));
        assert_eq!(activity.high_gas_usage_rate, dec!(0.25));
        // 40*0.25 + 35*0.25 + 25*0.25
        assert_eq!(activity.score, 25);
    }

    #[test]
    fn saturated_window_stays_within_bounds() {
        let config = Config::default().detector;
        let records = [record(1, dec!(10), Some(300_000)), record(2, dec!(10), Some(300_000))];
        let refs: Vec<&TransactionRecord> = records.iter().collect();
        let known = HashSet::from([Address::repeat_byte(1), Address::repeat_byte(2)]);
        let activity = measure_activity(&refs, &known, &config);
        assert!(activity.score <= 100);
        assert_eq!(activity.score, 65);
    }

    #[test]
    fn usage_ratio_ignores_records_without_receipts() {
        let config = Config::default().detector;
        let records = [
            record(1, dec!(10), Some(250_000)),
            record(2, dec!(10), Some(21_000)),
            record(3, dec!(10), None),
            record(4, dec!(10), None),
        ];
        let refs: Vec<&TransactionRecord> = records.iter().collect();
        let activity = measure_activity(&refs, &HashSet::new(), &config);
        assert_eq!(activity.high_gas_usage_rate, dec!(0.5));

        let blind = [record(1, dec!(10), None), record(2, dec!(10), None)];
        let refs: Vec<&TransactionRecord> = blind.iter().collect();
        assert_eq!(measure_activity(&refs, &HashSet::new(), &config).high_gas_usage_rate, Decimal::ZERO);
    }
}
