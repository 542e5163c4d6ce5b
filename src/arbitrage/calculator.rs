//! Arbitrage opportunity calculation

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use crate::{
    arbitrage::classify_risk,
    config::{FeeConfig, RiskThresholds, ScoringConfig},
    types::{AggregatedQuote, ArbitrageOpportunity, CostBreakdown, Quote, TokenPair},
    utils::{apply_bps, gwei_to_native, spread_pct},
};

/// Gas cost inputs for one trade on the scoring chain.
#[derive(Debug, Clone, Copy, PartialEq, Hash, Serialize)]
pub struct GasEstimate {
    pub gas_units: u64,
    pub gas_price_gwei: Decimal,
    pub native_price_usd: Decimal,
}

impl GasEstimate {
    pub fn cost_usd(&self) -> Decimal {
        Decimal::from(self.gas_units) * gwei_to_native(self.gas_price_gwei) * self.native_price_usd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectionReason {
    InsufficientData { available: usize },
    NoSpread,
    ZeroTradeAmount,
    Unprofitable { net_profit: Decimal },
    BelowMinimumProfit { net_profit: Decimal, minimum: Decimal },
    /// Quotes older than the opportunity TTL.
    StaleQuotes { age_secs: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub enum ScoreOutcome {
    Opportunity(ArbitrageOpportunity),
    Rejected { pair: TokenPair, reason: RejectionReason },
}

impl ScoreOutcome {
    pub fn opportunity(self) -> Option<ArbitrageOpportunity> {
        match self {
            ScoreOutcome::Opportunity(opp) => Some(opp),
            ScoreOutcome::Rejected { .. } => None,
        }
    }
}

pub struct ScoringInputs<'a> {
    pub capital: Decimal,
    pub fees: &'a FeeConfig,
    pub scoring: &'a ScoringConfig,
    pub risk: &'a RiskThresholds,
    pub gas: GasEstimate,
}

/// Caps exposure by capital, by a fraction of the thinner side's quoted
/// liquidity, and by an absolute ceiling.
pub fn optimal_trade_amount(
    capital: Decimal,
    buy_liquidity: Decimal,
    sell_liquidity: Decimal,
    scoring: &ScoringConfig,
) -> Decimal {
    let by_capital = capital * scoring.utilization_cap;
    let by_liquidity = buy_liquidity.min(sell_liquidity) * scoring.liquidity_cap;
    by_capital.min(by_liquidity).min(scoring.hard_cap_usd).max(Decimal::ZERO)
}

pub fn venue_fee_bps(fees: &FeeConfig, quote: &Quote) -> u32 {
    fees.dex_fee_bps.get(&quote.venue_id).copied().unwrap_or(quote.fee_bps)
}

pub fn calculate_costs(amount: Decimal, buy: &Quote, sell: &Quote, inputs: &ScoringInputs<'_>) -> CostBreakdown {
    let combined_dex_bps = venue_fee_bps(inputs.fees, buy) + venue_fee_bps(inputs.fees, sell);
    CostBreakdown {
        flashloan_fee: apply_bps(amount, inputs.fees.provider_fee()),
        dex_fees: apply_bps(amount, combined_dex_bps),
        gas_cost: inputs.gas.cost_usd(),
        slippage_cost: apply_bps(amount, inputs.fees.slippage_bps),
        bridge_fee: Decimal::ZERO,
    }
}

pub fn calculate_arbitrage(
    aggregate: &AggregatedQuote,
    inputs: &ScoringInputs<'_>,
    now: DateTime<Utc>,
) -> ScoreOutcome {
    let reject = |reason| ScoreOutcome::Rejected { pair: aggregate.pair.clone(), reason };

    if !aggregate.is_arbitrageable || aggregate.quotes.len() < 2 {
        return reject(RejectionReason::InsufficientData { available: aggregate.quotes.len() });
    }

    // An opportunity is as old as the quotes it was computed from.
    let ttl = Duration::seconds(inputs.scoring.opportunity_ttl_secs as i64);
    if now >= aggregate.computed_at + ttl {
        return reject(RejectionReason::StaleQuotes {
            age_secs: (now - aggregate.computed_at).num_seconds(),
        });
    }

    let mut sorted = aggregate.quotes.clone();
    sorted.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.venue_id.cmp(&b.venue_id)));
    let (buy, sell) = match (sorted.first(), sorted.last()) {
        (Some(buy), Some(sell)) => (buy, sell),
        _ => return reject(RejectionReason::InsufficientData { available: 0 }),
    };

    let spread = spread_pct(buy.price, sell.price);
    if spread <= Decimal::ZERO {
        return reject(RejectionReason::NoSpread);
    }

    let amount = optimal_trade_amount(inputs.capital, buy.liquidity, sell.liquidity, inputs.scoring);
    if amount <= Decimal::ZERO {
        return reject(RejectionReason::ZeroTradeAmount);
    }

    let gross_profit = amount * spread / dec!(100);
    let costs = calculate_costs(amount, buy, sell, inputs);
    let net_profit = gross_profit - costs.total();

    if net_profit <= Decimal::ZERO {
        return reject(RejectionReason::Unprofitable { net_profit });
    }
    if net_profit < inputs.scoring.min_profit_usd {
        return reject(RejectionReason::BelowMinimumProfit {
            net_profit,
            minimum: inputs.scoring.min_profit_usd,
        });
    }

    let profit_margin_pct = net_profit / amount * dec!(100);

    ScoreOutcome::Opportunity(ArbitrageOpportunity {
        id: uuid::Uuid::new_v4().to_string(),
        pair: aggregate.pair.clone(),
        buy_venue: buy.venue_id.clone(),
        sell_venue: sell.venue_id.clone(),
        buy_price: buy.price,
        sell_price: sell.price,
        spread_pct: spread,
        trade_amount: amount,
        gross_profit,
        costs,
        net_profit,
        profit_margin_pct,
        risk_level: classify_risk(spread, profit_margin_pct, inputs.risk),
        created_at: aggregate.computed_at,
        ttl,
    })
}
