//! Cross-chain arbitrage matching with a bridge cost and transit model

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::{
    arbitrage::{classify_risk, GasEstimate},
    config::{Config, CrossChainConfig, RiskThresholds},
    errors::{EngineError, EngineResult},
    network::{retry_with_backoff, BridgeCatalog, MarketDataProvider, RetryConfig},
    types::{ArbitrageOpportunity, BridgeConfig, ChainId, CostBreakdown, CrossChainOpportunity, TokenPair},
    utils::spread_pct,
};

const CATALOG_REFRESH_SECS: i64 = 300;
const QUOTE_SYMBOL: &str = "USD";

/// Market inputs for moving `token` from `source` to `target`.
#[derive(Debug, Clone)]
pub struct RouteQuote {
    pub token: String,
    pub source: ChainId,
    pub target: ChainId,
    pub source_price: Decimal,
    pub target_price: Decimal,
    pub source_gas_usd: Decimal,
    pub target_gas_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteRejection {
    SpreadBelowMinimum { spread_pct: Decimal },
    UnknownChain(ChainId),
    NoBridge,
    BelowProfitFloor { net_profit: Decimal },
    RiskTooHigh { risk_score: Decimal },
}

/// First matching tier, tiers ordered highest threshold first.
fn tier_penalty<T: PartialOrd + Copy>(value: T, tiers: &[(T, Decimal)]) -> Decimal {
    tiers
        .iter()
        .find(|(threshold, _)| value >= *threshold)
        .map(|(_, penalty)| *penalty)
        .unwrap_or(Decimal::ZERO)
}

pub fn route_risk_score(
    config: &CrossChainConfig,
    amount: Decimal,
    transit_secs: u64,
    source: ChainId,
    target: ChainId,
) -> Decimal {
    config.base_risk
        + tier_penalty(amount, &config.amount_tiers)
        + tier_penalty(transit_secs, &config.transit_tiers)
        + config.chain_risk(source)
        + config.chain_risk(target)
}

/// Lowest total fee for `amount` among bridges serving the route.
pub fn cheapest_bridge<'a>(
    bridges: &'a [BridgeConfig],
    source: ChainId,
    target: ChainId,
    token: &str,
    amount: Decimal,
) -> Option<&'a BridgeConfig> {
    bridges
        .iter()
        .filter(|b| b.supports(source, target, token))
        .min_by(|a, b| {
            a.fee_for(amount)
                .cmp(&b.fee_for(amount))
                .then_with(|| a.protocol.cmp(&b.protocol))
        })
}

pub fn evaluate_route(
    route: &RouteQuote,
    bridges: &[BridgeConfig],
    config: &CrossChainConfig,
    risk: &RiskThresholds,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<CrossChainOpportunity, RouteRejection> {
    let spread = spread_pct(route.source_price, route.target_price);
    if spread <= config.min_spread_pct {
        return Err(RouteRejection::SpreadBelowMinimum { spread_pct: spread });
    }

    let source_profile = config
        .profile(route.source)
        .ok_or(RouteRejection::UnknownChain(route.source))?;
    let target_profile = config
        .profile(route.target)
        .ok_or(RouteRejection::UnknownChain(route.target))?;

    let amount = config.trade_amount_usd;
    let bridge = cheapest_bridge(bridges, route.source, route.target, &route.token, amount)
        .ok_or(RouteRejection::NoBridge)?;

    let bridge_fee = bridge.fee_for(amount);
    let cross_chain_gas = route.source_gas_usd + route.target_gas_usd;
    let processing = if bridge.processing_secs > 0 {
        bridge.processing_secs
    } else {
        config.bridge_processing_secs
    };
    let transit_secs = source_profile.confirmation_secs + target_profile.confirmation_secs + processing;

    let gross_profit = amount * spread / dec!(100);
    let costs = CostBreakdown {
        gas_cost: cross_chain_gas,
        bridge_fee,
        ..CostBreakdown::default()
    };
    let net_profit = gross_profit - costs.total();
    if net_profit <= config.min_net_profit_usd {
        return Err(RouteRejection::BelowProfitFloor { net_profit });
    }

    let risk_score = route_risk_score(config, amount, transit_secs, route.source, route.target);
    if risk_score >= config.max_risk_score {
        return Err(RouteRejection::RiskTooHigh { risk_score });
    }

    let profit_margin_pct = net_profit / amount * dec!(100);
    let base = ArbitrageOpportunity {
        id: uuid::Uuid::new_v4().to_string(),
        pair: TokenPair::new(&route.token, QUOTE_SYMBOL),
        buy_venue: route.source.name().to_string(),
        sell_venue: route.target.name().to_string(),
        buy_price: route.source_price,
        sell_price: route.target_price,
        spread_pct: spread,
        trade_amount: amount,
        gross_profit,
        costs,
        net_profit,
        profit_margin_pct,
        risk_level: classify_risk(spread, profit_margin_pct, risk),
        created_at: now,
        ttl,
    };

    Ok(CrossChainOpportunity {
        base,
        source_chain: route.source,
        target_chain: route.target,
        bridge_protocol: bridge.protocol.clone(),
        bridge_fee,
        cross_chain_gas,
        transit_time: Duration::seconds(transit_secs as i64),
        risk_score,
    })
}

struct CachedCatalog {
    bridges: Vec<BridgeConfig>,
    fetched_at: DateTime<Utc>,
}

pub struct CrossChainOpportunityMatcher {
    config: Arc<Config>,
    market: Arc<dyn MarketDataProvider>,
    catalog: Arc<dyn BridgeCatalog>,
    retry: RetryConfig,
    cached: RwLock<Option<CachedCatalog>>,
}

impl CrossChainOpportunityMatcher {
    pub fn new(config: Arc<Config>, market: Arc<dyn MarketDataProvider>, catalog: Arc<dyn BridgeCatalog>) -> Self {
        Self {
            config,
            market,
            catalog,
            retry: RetryConfig::default(),
            cached: RwLock::new(None),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Cached catalog, refreshed after it ages out. A failed refresh falls
    /// back to the stale copy when one exists.
    pub async fn bridges(&self, now: DateTime<Utc>) -> EngineResult<Vec<BridgeConfig>> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if now - cached.fetched_at < Duration::seconds(CATALOG_REFRESH_SECS) {
                return Ok(cached.bridges.clone());
            }
        }

        let fetched = retry_with_backoff(
            || self.catalog.fetch_bridge_catalog(),
            &self.retry,
            "bridge catalog",
        )
        .await;

        let mut cached = self.cached.write().await;
        match fetched {
            Ok(bridges) => {
                info!(bridges = bridges.len(), "Bridge catalog refreshed");
                *cached = Some(CachedCatalog {
                    bridges: bridges.clone(),
                    fetched_at: now,
                });
                Ok(bridges)
            }
            Err(e) => match cached.as_ref() {
                Some(stale) => {
                    warn!(error = %e, "Bridge catalog refresh failed, using cached copy");
                    Ok(stale.bridges.clone())
                }
                None => Err(e),
            },
        }
    }

    async fn chain_gas_usd(&self, chain: ChainId, gas_units: u64) -> EngineResult<Decimal> {
        let gas_price_gwei = self.market.gas_price_gwei(chain).await?;
        let native_price_usd = self.market.native_price_usd(chain).await?;
        Ok(GasEstimate {
            gas_units,
            gas_price_gwei,
            native_price_usd,
        }
        .cost_usd())
    }

    /// Ranked by net profit, descending. Chains or tokens whose market data
    /// is unavailable are left out of this cycle.
    pub async fn find_opportunities(&self, now: DateTime<Utc>) -> EngineResult<Vec<CrossChainOpportunity>> {
        let cfg = &self.config.cross_chain;
        let bridges = self.bridges(now).await?;
        if bridges.is_empty() {
            return Err(EngineError::InsufficientData {
                context: "bridge catalog".to_string(),
                available: 0,
                required: 1,
            });
        }

        let gas_results = join_all(cfg.chains.iter().map(|p| async move {
            (p.chain, self.chain_gas_usd(p.chain, p.gas_units).await)
        }))
        .await;
        let mut gas_usd: HashMap<ChainId, Decimal> = HashMap::new();
        for (chain, result) in gas_results {
            match result {
                Ok(cost) => {
                    gas_usd.insert(chain, cost);
                }
                Err(e) => warn!(chain = %chain, error = %e, "Gas data unavailable, chain skipped"),
            }
        }

        let price_requests = cfg
            .chains
            .iter()
            .filter(|p| gas_usd.contains_key(&p.chain))
            .flat_map(|p| cfg.tokens.iter().map(move |t| (p.chain, t.as_str())));
        let price_results = join_all(price_requests.map(|(chain, token)| async move {
            (chain, token, self.market.token_price(chain, token).await)
        }))
        .await;
        let mut prices: HashMap<(ChainId, &str), Decimal> = HashMap::new();
        for (chain, token, result) in price_results {
            match result {
                Ok(price) if price > Decimal::ZERO => {
                    prices.insert((chain, token), price);
                }
                Ok(price) => debug!(chain = %chain, token, %price, "Ignoring non-positive price"),
                Err(e) => debug!(chain = %chain, token, error = %e, "No price"),
            }
        }

        let ttl = Duration::seconds(self.config.scoring.opportunity_ttl_secs as i64);
        let mut found = Vec::new();
        for source in &cfg.chains {
            for target in &cfg.chains {
                if source.chain == target.chain {
                    continue;
                }
                for token in &cfg.tokens {
                    let (Some(source_price), Some(target_price)) = (
                        prices.get(&(source.chain, token.as_str())),
                        prices.get(&(target.chain, token.as_str())),
                    ) else {
                        continue;
                    };
                    let (Some(source_gas), Some(target_gas)) = (gas_usd.get(&source.chain), gas_usd.get(&target.chain))
                    else {
                        continue;
                    };

                    let route = RouteQuote {
                        token: token.clone(),
                        source: source.chain,
                        target: target.chain,
                        source_price: *source_price,
                        target_price: *target_price,
                        source_gas_usd: *source_gas,
                        target_gas_usd: *target_gas,
                    };
                    match evaluate_route(&route, &bridges, cfg, &self.config.risk, ttl, now) {
                        Ok(opp) => found.push(opp),
                        Err(reason) => debug!(
                            token = %route.token,
                            source = %route.source,
                            target = %route.target,
                            reason = ?reason,
                            "Route rejected"
                        ),
                    }
                }
            }
        }

        found.retain(|o| !o.base.is_expired(now));
        found.sort_by(|a, b| {
            b.base
                .net_profit
                .cmp(&a.base.net_profit)
                .then_with(|| a.risk_score.cmp(&b.risk_score))
        });

        info!(routes = found.len(), "Cross-chain matching complete");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{StaticBridgeCatalog, StaticMarketData};

    fn route(source_price: Decimal, target_price: Decimal) -> RouteQuote {
        RouteQuote {
            token: "USDC".to_string(),
            source: ChainId::ARBITRUM,
            target: ChainId::OPTIMISM,
            source_price,
            target_price,
            source_gas_usd: dec!(1),
            target_gas_usd: dec!(1),
        }
    }

    #[test]
    fn profitable_route_with_cheapest_bridge() {
        let config = Config::default();
        let bridges = StaticBridgeCatalog::default();
        let bridges = tokio_test::block_on(bridges.fetch_bridge_catalog()).unwrap();

        let opp = evaluate_route(
            &route(dec!(1.000), dec!(1.010)),
            &bridges,
            &config.cross_chain,
            &config.risk,
            Duration::seconds(30),
            Utc::now(),
        )
        .unwrap();

        // spread 1% of 10k = 100; across: 10k * 5bps + 2 = 7; gas 2
        assert_eq!(opp.bridge_protocol, "across");
        assert_eq!(opp.base.gross_profit, dec!(100));
        assert_eq!(opp.bridge_fee, dec!(7));
        assert_eq!(opp.base.net_profit, dec!(91));
        assert_eq!(opp.base.net_profit, opp.base.gross_profit - opp.base.costs.total());
        let c = &opp.base.costs;
        let without_bridge = c.flashloan_fee + c.dex_fees + c.gas_cost + c.slippage_cost;
        assert_eq!(c.total() - without_bridge, opp.bridge_fee);
        // 60 + 60 + 30
        assert_eq!(opp.transit_time, Duration::seconds(150));
        // 0.1 + 0.05 (amount) + 0 (transit) + 0.05 + 0.05
        assert_eq!(opp.risk_score, dec!(0.25));
    }

    #[test]
    fn thin_spread_is_rejected() {
        let config = Config::default();
        let err = evaluate_route(
            &route(dec!(1.000), dec!(1.002)),
            &[],
            &config.cross_chain,
            &config.risk,
            Duration::seconds(30),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, RouteRejection::SpreadBelowMinimum { .. }));
    }

    #[test]
    fn risk_ceiling_is_exclusive() {
        let mut config = Config::default();
        config.cross_chain.max_risk_score = dec!(0.25);
        let bridges = tokio_test::block_on(StaticBridgeCatalog::default().fetch_bridge_catalog()).unwrap();
        let err = evaluate_route(
            &route(dec!(1.000), dec!(1.010)),
            &bridges,
            &config.cross_chain,
            &config.risk,
            Duration::seconds(30),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, RouteRejection::RiskTooHigh { risk_score: dec!(0.25) });
    }

    #[test]
    fn tiers_pick_first_matching_threshold() {
        let tiers = vec![(dec!(100), dec!(0.3)), (dec!(10), dec!(0.1))];
        assert_eq!(tier_penalty(dec!(150), &tiers), dec!(0.3));
        assert_eq!(tier_penalty(dec!(50), &tiers), dec!(0.1));
        assert_eq!(tier_penalty(dec!(5), &tiers), Decimal::ZERO);
    }

    #[tokio::test]
    async fn matcher_finds_only_the_profitable_direction() {
        let market = StaticMarketData::new()
            .with_gas(ChainId::ARBITRUM, dec!(0.1), dec!(2000))
            .with_gas(ChainId::OPTIMISM, dec!(0.1), dec!(2000))
            .with_price(ChainId::ARBITRUM, "USDC", dec!(1.000))
            .with_price(ChainId::OPTIMISM, "USDC", dec!(1.010));
        let mut config = Config::default();
        config.cross_chain.chains.retain(|p| p.chain == ChainId::ARBITRUM || p.chain == ChainId::OPTIMISM);

        let matcher = CrossChainOpportunityMatcher::new(
            Arc::new(config),
            Arc::new(market),
            Arc::new(StaticBridgeCatalog::default()),
        );
        let found = matcher.find_opportunities(Utc::now()).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_chain, ChainId::ARBITRUM);
        assert_eq!(found[0].target_chain, ChainId::OPTIMISM);
        assert!(found[0].base.net_profit > dec!(25));
    }
}
