//! Detected MEV attack patterns

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Sandwich,
    Frontrun,
    Backrun,
    JitLiquidity,
    Arbitrage,
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttackType::Sandwich => "sandwich",
            AttackType::Frontrun => "frontrun",
            AttackType::Backrun => "backrun",
            AttackType::JitLiquidity => "jit_liquidity",
            AttackType::Arbitrage => "arbitrage",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackPattern {
    pub attack_type: AttackType,
    /// Always within 0..=100.
    pub confidence: u8,
    pub attacker: Address,
    pub victim: Option<Address>,
    pub profit_estimate: Decimal,
    pub evidence: Vec<B256>,
    pub block_number: u64,
    pub detected_at: DateTime<Utc>,
}

impl AttackPattern {
    pub fn same_evidence(&self, other: &Self) -> bool {
        self.attack_type == other.attack_type && self.evidence == other.evidence
    }
}
