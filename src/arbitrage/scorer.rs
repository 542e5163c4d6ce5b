//! Opportunity scoring, caching and ranking

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use crate::{
    arbitrage::{calculate_arbitrage, GasEstimate, RejectionReason, ScoreOutcome, ScoringInputs},
    cache::{CacheStats, ResultCache},
    config::Config,
    errors::EngineResult,
    network::MarketDataProvider,
    types::{AggregatedQuote, ArbitrageOpportunity},
    utils::Clock,
};

/// Cache key: everything the score depends on, gas included, so a gas move
/// inside one bucket forces a rescore.
struct ScoreRequest<'a> {
    aggregate: &'a AggregatedQuote,
    capital: Decimal,
    gas: Option<GasEstimate>,
}

impl Hash for ScoreRequest<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.aggregate.pair.hash(state);
        for q in &self.aggregate.quotes {
            q.venue_id.hash(state);
            q.price.hash(state);
            q.liquidity.hash(state);
            q.fee_bps.hash(state);
        }
        self.capital.hash(state);
        self.gas.hash(state);
    }
}

/// Descending net profit, then ascending risk, then newest first.
pub fn compare_opportunities(a: &ArbitrageOpportunity, b: &ArbitrageOpportunity) -> Ordering {
    b.net_profit
        .cmp(&a.net_profit)
        .then_with(|| a.risk_level.cmp(&b.risk_level))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

pub fn rank_opportunities(opportunities: &mut [ArbitrageOpportunity]) {
    opportunities.sort_by(compare_opportunities);
}

pub struct OpportunityScorer {
    config: Arc<Config>,
    market: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    cache: Mutex<ResultCache<ScoreOutcome>>,
}

impl OpportunityScorer {
    pub fn new(config: Arc<Config>, market: Arc<dyn MarketDataProvider>, clock: Arc<dyn Clock>) -> Self {
        let cache = Mutex::new(ResultCache::from_config(&config.cache));
        Self { config, market, clock, cache }
    }

    pub async fn gas_estimate(&self) -> EngineResult<GasEstimate> {
        let chain = self.config.scoring.chain;
        let gas_price_gwei = self.market.gas_price_gwei(chain).await?;
        let native_price_usd = self.market.native_price_usd(chain).await?;
        Ok(GasEstimate {
            gas_units: self.config.fees.gas_units,
            gas_price_gwei,
            native_price_usd,
        })
    }

    /// Scores one aggregate with the configured capital.
    pub async fn score(&self, aggregate: &AggregatedQuote) -> EngineResult<ScoreOutcome> {
        self.score_with_capital(aggregate, self.config.scoring.capital_usd).await
    }

    pub async fn score_with_capital(&self, aggregate: &AggregatedQuote, capital: Decimal) -> EngineResult<ScoreOutcome> {
        let now = self.clock.now();
        let gas = if aggregate.is_arbitrageable {
            Some(self.gas_estimate().await?)
        } else {
            None
        };
        let request = ScoreRequest { aggregate, capital, gas };

        if let Some(cached) = self.cache.lock().await.get(&request, now) {
            let still_valid = match &cached {
                ScoreOutcome::Opportunity(opp) => !opp.is_expired(now),
                ScoreOutcome::Rejected { .. } => true,
            };
            if still_valid {
                debug!(pair = %aggregate.pair, "Score cache hit");
                return Ok(cached);
            }
        }

        let outcome = match gas {
            Some(gas) => {
                let inputs = ScoringInputs {
                    capital,
                    fees: &self.config.fees,
                    scoring: &self.config.scoring,
                    risk: &self.config.risk,
                    gas,
                };
                calculate_arbitrage(aggregate, &inputs, now)
            }
            None => ScoreOutcome::Rejected {
                pair: aggregate.pair.clone(),
                reason: RejectionReason::InsufficientData { available: aggregate.quotes.len() },
            },
        };

        match &outcome {
            ScoreOutcome::Opportunity(opp) => info!(
                pair = %opp.pair,
                buy = %opp.buy_venue,
                sell = %opp.sell_venue,
                net_profit = %opp.net_profit.round_dp(2),
                risk = %opp.risk_level,
                "Scored arbitrage opportunity"
            ),
            ScoreOutcome::Rejected { pair, reason } => debug!(pair = %pair, reason = ?reason, "No opportunity"),
        }

        self.cache.lock().await.insert(&request, outcome.clone(), now);
        Ok(outcome)
    }

    /// Ranked, unexpired opportunities across `aggregates`. Aggregates that
    /// fail to score are logged and skipped.
    pub async fn score_all(&self, aggregates: &[AggregatedQuote]) -> Vec<ArbitrageOpportunity> {
        let mut opportunities = Vec::new();
        for aggregate in aggregates {
            match self.score(aggregate).await {
                Ok(outcome) => opportunities.extend(outcome.opportunity()),
                Err(e) => tracing::warn!(pair = %aggregate.pair, error = %e, "Scoring failed"),
            }
        }

        let now = self.clock.now();
        opportunities.retain(|o| !o.is_expired(now));
        rank_opportunities(&mut opportunities);
        opportunities
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    pub async fn purge_cache(&self) -> usize {
        let now = self.clock.now();
        self.cache.lock().await.purge_expired(now)
    }
}
