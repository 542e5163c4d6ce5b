//! Cross-chain opportunity and bridge types

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::ArbitrageOpportunity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM: ChainId = ChainId(1);
    pub const OPTIMISM: ChainId = ChainId(10);
    pub const BSC: ChainId = ChainId(56);
    pub const POLYGON: ChainId = ChainId(137);
    pub const BASE: ChainId = ChainId(8453);
    pub const ARBITRUM: ChainId = ChainId(42161);
    pub const AVALANCHE: ChainId = ChainId(43114);

    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "ethereum",
            10 => "optimism",
            56 => "bsc",
            137 => "polygon",
            8453 => "base",
            42161 => "arbitrum",
            43114 => "avalanche",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub protocol: String,
    pub chains: Vec<ChainId>,
    pub tokens: Vec<String>,
    pub fee_bps: u32,
    pub fixed_fee_usd: Decimal,
    pub processing_secs: u64,
}

impl BridgeConfig {
    pub fn supports(&self, source: ChainId, target: ChainId, token: &str) -> bool {
        self.chains.contains(&source)
            && self.chains.contains(&target)
            && self.tokens.iter().any(|t| t.eq_ignore_ascii_case(token))
    }

    pub fn fee_for(&self, amount: Decimal) -> Decimal {
        amount * Decimal::from(self.fee_bps) / Decimal::from(10_000) + self.fixed_fee_usd
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossChainOpportunity {
    pub base: ArbitrageOpportunity,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub bridge_protocol: String,
    pub bridge_fee: Decimal,
    pub cross_chain_gas: Decimal,
    #[serde(skip)]
    pub transit_time: Duration,
    pub risk_score: Decimal,
}
