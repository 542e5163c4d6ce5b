//! Arbitrage opportunity types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use super::TokenPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CostBreakdown {
    pub flashloan_fee: Decimal,
    pub dex_fees: Decimal,
    pub gas_cost: Decimal,
    pub slippage_cost: Decimal,
    /// Zero for single-chain opportunities.
    pub bridge_fee: Decimal,
}

impl CostBreakdown {
    /// All cost terms. For single-chain opportunities `bridge_fee` is zero and
    /// this is flashloan + dex + gas + slippage; cross-chain routes add the
    /// bridge fee on top of gas.
    pub fn total(&self) -> Decimal {
        self.flashloan_fee + self.dex_fees + self.gas_cost + self.slippage_cost + self.bridge_fee
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub pair: TokenPair,
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub spread_pct: Decimal,
    pub trade_amount: Decimal,
    pub gross_profit: Decimal,
    pub costs: CostBreakdown,
    pub net_profit: Decimal,
    pub profit_margin_pct: Decimal,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub ttl: Duration,
}

impl ArbitrageOpportunity {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.ttl
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Equality of everything except identity and creation time.
    pub fn same_economics(&self, other: &Self) -> bool {
        self.pair == other.pair
            && self.buy_venue == other.buy_venue
            && self.sell_venue == other.sell_venue
            && self.trade_amount == other.trade_amount
            && self.gross_profit == other.gross_profit
            && self.costs == other.costs
            && self.net_profit == other.net_profit
            && self.profit_margin_pct == other.profit_margin_pct
            && self.risk_level == other.risk_level
    }
}
