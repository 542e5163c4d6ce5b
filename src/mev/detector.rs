//! MEV attack pattern detection over a window of recent blocks

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use crate::{
    config::DetectorConfig,
    errors::EngineError,
    mev::{measure_activity, ActivityBreakdown},
    types::{AttackPattern, AttackType, BlockRange, TransactionRecord},
    utils::math::cap_confidence,
};

/// Outcome of scanning one window.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub range: BlockRange,
    pub patterns: Vec<AttackPattern>,
    pub scanned: usize,
    pub skipped_malformed: usize,
    pub out_of_window: usize,
    pub activity: ActivityBreakdown,
}

pub struct TransactionPatternDetector {
    config: DetectorConfig,
}

impl TransactionPatternDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Full rescan of `records` restricted to `range`. Malformed records and
    /// records outside the window are dropped individually.
    pub fn scan(
        &self,
        records: &[TransactionRecord],
        range: BlockRange,
        known_actors: &HashSet<Address>,
        now: DateTime<Utc>,
    ) -> ScanReport {
        let mut valid: Vec<&TransactionRecord> = Vec::with_capacity(records.len());
        let mut skipped_malformed = 0;
        let mut out_of_window = 0;

        for record in records {
            if !range.contains(record.block_number) {
                out_of_window += 1;
                continue;
            }
            if let Err(reason) = record.validate() {
                let err = EngineError::MalformedTransaction {
                    hash: record.hash.to_string(),
                    reason,
                };
                warn!(block = record.block_number, error = %err, "Skipping transaction record");
                skipped_malformed += 1;
                continue;
            }
            valid.push(record);
        }

        let mut patterns = Vec::new();
        for (block, txs) in group_by_block(&valid) {
            let before = patterns.len();
            patterns.extend(self.detect_sandwiches(&txs, known_actors, now));
            patterns.extend(self.detect_frontruns(&txs, known_actors, now));
            patterns.extend(self.detect_backruns(&txs, known_actors, now));
            patterns.extend(self.detect_jit_liquidity(&txs, known_actors, now));
            if patterns.len() > before {
                debug!(block, found = patterns.len() - before, "Patterns detected in block");
            }
        }

        let activity = measure_activity(&valid, known_actors, &self.config);

        ScanReport {
            range,
            patterns,
            scanned: valid.len(),
            skipped_malformed,
            out_of_window,
            activity,
        }
    }

    /// A and C from the same sender bracketing a victim B that pays less gas.
    pub fn detect_sandwiches(
        &self,
        block: &[&TransactionRecord],
        known_actors: &HashSet<Address>,
        now: DateTime<Utc>,
    ) -> Vec<AttackPattern> {
        let c = &self.config;
        let mut found = Vec::new();

        for (i, front) in block.iter().enumerate() {
            let last = block.len().min(i + c.max_position_gap + 1);
            for back in block.iter().take(last).skip(i + 2) {
                if back.from != front.from {
                    continue;
                }
                for victim in &block[i + 1..] {
                    if victim.tx_index >= back.tx_index {
                        break;
                    }
                    if victim.from == front.from
                        || front.gas_price_gwei <= victim.gas_price_gwei
                        || back.gas_price_gwei <= victim.gas_price_gwei
                    {
                        continue;
                    }

                    let mut parts = vec![c.sandwich_base, c.sandwich_same_sender_bonus];
                    let bracket_floor = victim.gas_price_gwei * c.sandwich_gas_ratio;
                    if front.gas_price_gwei >= bracket_floor && back.gas_price_gwei >= bracket_floor {
                        parts.push(c.sandwich_gas_bonus);
                    }
                    if known_actors.contains(&front.from) {
                        parts.push(c.known_actor_bonus);
                    }

                    found.push(AttackPattern {
                        attack_type: AttackType::Sandwich,
                        confidence: cap_confidence(&parts),
                        attacker: front.from,
                        victim: Some(victim.from),
                        profit_estimate: victim.value * c.sandwich_profit_factor,
                        evidence: vec![front.hash, victim.hash, back.hash],
                        block_number: front.block_number,
                        detected_at: now,
                    });
                }
            }
        }
        found
    }

    /// A known actor outbidding a later transaction by the configured gas multiple.
    pub fn detect_frontruns(
        &self,
        block: &[&TransactionRecord],
        known_actors: &HashSet<Address>,
        now: DateTime<Utc>,
    ) -> Vec<AttackPattern> {
        let c = &self.config;
        let k = c.frontrun_gas_multiplier;
        let mut found = Vec::new();

        for (i, front) in block.iter().enumerate() {
            if !known_actors.contains(&front.from) {
                continue;
            }
            let last = block.len().min(i + c.max_position_gap + 1);
            for victim in block.iter().take(last).skip(i + 1) {
                if victim.from == front.from || front.gas_price_gwei <= victim.gas_price_gwei * k {
                    continue;
                }

                let mut parts = vec![c.frontrun_base, c.frontrun_known_actor_bonus];
                if front.gas_price_gwei >= victim.gas_price_gwei * k * Decimal::TWO {
                    parts.push(c.frontrun_ratio_bonus);
                }

                found.push(AttackPattern {
                    attack_type: AttackType::Frontrun,
                    confidence: cap_confidence(&parts),
                    attacker: front.from,
                    victim: Some(victim.from),
                    profit_estimate: victim.value * c.frontrun_profit_factor,
                    evidence: vec![front.hash, victim.hash],
                    block_number: front.block_number,
                    detected_at: now,
                });
            }
        }
        found
    }

    /// A known actor landing directly behind a high-value transaction without outbidding it.
    pub fn detect_backruns(
        &self,
        block: &[&TransactionRecord],
        known_actors: &HashSet<Address>,
        now: DateTime<Utc>,
    ) -> Vec<AttackPattern> {
        let c = &self.config;

        block
            .windows(2)
            .filter_map(|pair| {
                let (victim, follower) = (pair[0], pair[1]);
                let matches = known_actors.contains(&follower.from)
                    && follower.from != victim.from
                    && victim.value >= c.backrun_min_value
                    && follower.gas_price_gwei <= victim.gas_price_gwei;
                matches.then(|| AttackPattern {
                    attack_type: AttackType::Backrun,
                    confidence: cap_confidence(&[c.backrun_base, c.known_actor_bonus]),
                    attacker: follower.from,
                    victim: Some(victim.from),
                    profit_estimate: victim.value * c.backrun_profit_factor,
                    evidence: vec![victim.hash, follower.hash],
                    block_number: victim.block_number,
                    detected_at: now,
                })
            })
            .collect()
    }

    /// Liquidity add and remove by one sender against the same contract around
    /// another sender's trade. Liquidity operations are recognised by gas used.
    pub fn detect_jit_liquidity(
        &self,
        block: &[&TransactionRecord],
        known_actors: &HashSet<Address>,
        now: DateTime<Utc>,
    ) -> Vec<AttackPattern> {
        let c = &self.config;
        let threshold = c.jit_gas_threshold;
        let heavy = threshold.saturating_add(threshold / 2);
        let mut found = Vec::new();

        for (i, add) in block.iter().enumerate() {
            if !add.used_at_least(threshold) || add.to.is_none() {
                continue;
            }
            let last = block.len().min(i + c.max_position_gap + 1);
            for remove in block.iter().take(last).skip(i + 2) {
                if remove.from != add.from || remove.to != add.to || !remove.used_at_least(threshold) {
                    continue;
                }
                for trade in &block[i + 1..] {
                    if trade.tx_index >= remove.tx_index {
                        break;
                    }
                    if trade.from == add.from {
                        continue;
                    }

                    let mut parts = vec![c.jit_base];
                    if add.used_at_least(heavy) && remove.used_at_least(heavy) {
                        parts.push(c.jit_gas_bonus);
                    }
                    if known_actors.contains(&add.from) {
                        parts.push(c.known_actor_bonus);
                    }

                    found.push(AttackPattern {
                        attack_type: AttackType::JitLiquidity,
                        confidence: cap_confidence(&parts),
                        attacker: add.from,
                        victim: Some(trade.from),
                        profit_estimate: trade.value * c.jit_profit_factor,
                        evidence: vec![add.hash, trade.hash, remove.hash],
                        block_number: add.block_number,
                        detected_at: now,
                    });
                }
            }
        }
        found
    }
}

/// Groups records per block, each block ordered by transaction index.
fn group_by_block<'a>(records: &[&'a TransactionRecord]) -> BTreeMap<u64, Vec<&'a TransactionRecord>> {
    let mut blocks: BTreeMap<u64, Vec<&TransactionRecord>> = BTreeMap::new();
    for record in records {
        blocks.entry(record.block_number).or_default().push(*record);
    }
    for txs in blocks.values_mut() {
        txs.sort_by_key(|t| t.tx_index);
        txs.dedup_by_key(|t| t.hash);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::ChainId;
    use alloy::primitives::B256;
    use rust_decimal_macros::dec;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn tx(from: u8, index: u32, gas: Decimal) -> TransactionRecord {
        TransactionRecord {
            chain: ChainId::ETHEREUM,
            hash: B256::repeat_byte(index as u8 + 1),
            from: addr(from),
            to: Some(addr(0xee)),
            value: dec!(5),
            gas_price_gwei: gas,
            gas_used: Some(120_000),
            gas_limit: 300_000,
            block_number: 100,
            tx_index: index,
            timestamp: Utc::now(),
        }
    }

    fn detector() -> TransactionPatternDetector {
        TransactionPatternDetector::new(Config::default().detector)
    }

    fn range() -> BlockRange {
        BlockRange::trailing(100, 5)
    }

    #[test]
    fn sandwich_detected_with_gas_bonus() {
        let records = vec![tx(0xa, 0, dec!(100)), tx(0xb, 1, dec!(50)), tx(0xa, 2, dec!(100))];
        let report = detector().scan(&records, range(), &HashSet::new(), Utc::now());

        let sandwiches: Vec<_> = report
            .patterns
            .iter()
            .filter(|p| p.attack_type == AttackType::Sandwich)
            .collect();
        assert_eq!(sandwiches.len(), 1);
        let p = sandwiches[0];
        assert_eq!(p.confidence, 95);
        assert!(p.confidence > 60);
        assert_eq!(p.attacker, addr(0xa));
        assert_eq!(p.victim, Some(addr(0xb)));
        assert_eq!(p.profit_estimate, dec!(0.025));
        assert_eq!(p.evidence.len(), 3);
    }

    #[test]
    fn known_actor_sandwich_caps_at_hundred() {
        let records = vec![tx(0xa, 0, dec!(100)), tx(0xb, 1, dec!(50)), tx(0xa, 2, dec!(100))];
        let known = HashSet::from([addr(0xa)]);
        let report = detector().scan(&records, range(), &known, Utc::now());
        let p = report
            .patterns
            .iter()
            .find(|p| p.attack_type == AttackType::Sandwich)
            .unwrap();
        assert_eq!(p.confidence, 100);
    }

    #[test]
    fn differing_brackets_are_not_a_sandwich() {
        let records = vec![tx(0xa, 0, dec!(100)), tx(0xb, 1, dec!(50)), tx(0xc, 2, dec!(100))];
        let report = detector().scan(&records, range(), &HashSet::new(), Utc::now());
        assert!(report.patterns.iter().all(|p| p.attack_type != AttackType::Sandwich));
    }

    #[test]
    fn victim_paying_more_is_not_a_sandwich() {
        let records = vec![tx(0xa, 0, dec!(40)), tx(0xb, 1, dec!(50)), tx(0xa, 2, dec!(100))];
        let report = detector().scan(&records, range(), &HashSet::new(), Utc::now());
        assert!(report.patterns.is_empty());
    }

    #[test]
    fn frontrun_requires_known_actor() {
        let records = vec![tx(0xa, 0, dec!(400)), tx(0xb, 1, dec!(100))];
        let d = detector();

        let unknown = d.scan(&records, range(), &HashSet::new(), Utc::now());
        assert!(unknown.patterns.iter().all(|p| p.attack_type != AttackType::Frontrun));

        let known = HashSet::from([addr(0xa)]);
        let report = d.scan(&records, range(), &known, Utc::now());
        let p = report
            .patterns
            .iter()
            .find(|p| p.attack_type == AttackType::Frontrun)
            .unwrap();
        // 400 >= 100 * 1.5 * 2
        assert_eq!(p.confidence, 100);
    }

    #[test]
    fn frontrun_without_ratio_bonus() {
        let records = vec![tx(0xa, 0, dec!(200)), tx(0xb, 1, dec!(100))];
        let known = HashSet::from([addr(0xa)]);
        let report = detector().scan(&records, range(), &known, Utc::now());
        let p = report
            .patterns
            .iter()
            .find(|p| p.attack_type == AttackType::Frontrun)
            .unwrap();
        assert_eq!(p.confidence, 70);
    }

    #[test]
    fn backrun_behind_high_value_transaction() {
        let mut victim = tx(0xb, 0, dec!(60));
        victim.value = dec!(50);
        let records = vec![victim, tx(0xa, 1, dec!(60))];
        let known = HashSet::from([addr(0xa)]);
        let report = detector().scan(&records, range(), &known, Utc::now());
        let p = report
            .patterns
            .iter()
            .find(|p| p.attack_type == AttackType::Backrun)
            .unwrap();
        assert_eq!(p.confidence, 50);
        assert_eq!(p.victim, Some(addr(0xb)));
    }

    #[test]
    fn jit_liquidity_detected_by_gas_usage() {
        let mut add = tx(0xa, 0, dec!(30));
        add.gas_used = Some(320_000);
        add.gas_limit = 400_000;
        let trade = tx(0xb, 1, dec!(30));
        let mut remove = tx(0xa, 2, dec!(30));
        remove.gas_used = Some(310_000);
        remove.gas_limit = 400_000;

        let report = detector().scan(&[add, trade, remove], range(), &HashSet::new(), Utc::now());
        let p = report
            .patterns
            .iter()
            .find(|p| p.attack_type == AttackType::JitLiquidity)
            .unwrap();
        assert_eq!(p.confidence, 70);
        assert_eq!(p.attacker, addr(0xa));
    }

    #[test]
    fn unknown_gas_usage_is_never_a_liquidity_operation() {
        let mut add = tx(0xa, 0, dec!(30));
        add.gas_used = None;
        add.gas_limit = 400_000;
        let trade = tx(0xb, 1, dec!(30));
        let mut remove = tx(0xa, 2, dec!(30));
        remove.gas_used = None;
        remove.gas_limit = 400_000;

        let report = detector().scan(&[add, trade, remove], range(), &HashSet::new(), Utc::now());
        assert_eq!(report.skipped_malformed, 0);
        assert!(report.patterns.iter().all(|p| p.attack_type != AttackType::JitLiquidity));
    }

    #[test]
    fn malformed_and_out_of_window_records_are_skipped() {
        let mut broken = tx(0xa, 0, dec!(100));
        broken.gas_used = Some(broken.gas_limit + 1);
        let mut stale = tx(0xb, 1, dec!(50));
        stale.block_number = 10;
        let ok = tx(0xc, 2, dec!(20));

        let report = detector().scan(&[broken, stale, ok], range(), &HashSet::new(), Utc::now());
        assert_eq!(report.skipped_malformed, 1);
        assert_eq!(report.out_of_window, 1);
        assert_eq!(report.scanned, 1);
        assert!(report.patterns.is_empty());
    }

    #[test]
    fn brackets_too_far_apart_are_ignored() {
        let records = vec![
            tx(0xa, 0, dec!(100)),
            tx(0xb, 1, dec!(50)),
            tx(0xc, 2, dec!(50)),
            tx(0xd, 3, dec!(50)),
            tx(0xa, 4, dec!(100)),
        ];
        let report = detector().scan(&records, range(), &HashSet::new(), Utc::now());
        assert!(report.patterns.is_empty());
    }
}
