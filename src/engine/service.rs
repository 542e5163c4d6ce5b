//! Engine facade: owns every component and drives the periodic schedules

use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use crate::{
    aggregator::PriceAggregator,
    arbitrage::OpportunityScorer,
    cache::CacheStats,
    config::Config,
    cross_chain::CrossChainOpportunityMatcher,
    errors::EngineResult,
    mev::{ActorRegistry, DetectionSummary, MevMonitor},
    network::{BridgeCatalog, MarketDataProvider, TransactionSource, VenueClient},
    protection::ProtectionStrategySelector,
    types::{
        AggregatedQuote, ArbitrageOpportunity, AttackPattern, CrossChainOpportunity, RiskAnalysis,
        TokenPair, ValidationResult, VenueHealth,
    },
    utils::{
        print_arbitrage_opportunity, print_attack_pattern, print_cross_chain_opportunity,
        print_session_stats, Clock, SessionStats,
    },
    validation::revalidate_opportunity,
};

/// External capabilities the engine is built from.
pub struct EngineDeps {
    pub venues: Vec<Arc<dyn VenueClient>>,
    pub market: Arc<dyn MarketDataProvider>,
    pub transactions: Arc<dyn TransactionSource>,
    pub bridges: Arc<dyn BridgeCatalog>,
    pub actors: Arc<dyn ActorRegistry>,
    pub clock: Arc<dyn Clock>,
}

pub struct Engine {
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    actors: Arc<dyn ActorRegistry>,
    aggregator: PriceAggregator,
    scorer: OpportunityScorer,
    monitor: MevMonitor,
    selector: ProtectionStrategySelector,
    matcher: CrossChainOpportunityMatcher,
    stats: Mutex<SessionStats>,
}

impl Engine {
    pub fn new(config: Config, deps: EngineDeps) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let aggregator = PriceAggregator::new(deps.venues, deps.clock.clone(), &config.polling);
        let scorer = OpportunityScorer::new(config.clone(), deps.market.clone(), deps.clock.clone());
        let monitor = MevMonitor::new(
            config.detector.clone(),
            deps.transactions,
            deps.actors.clone(),
            deps.clock.clone(),
            Duration::from_millis(config.polling.venue_timeout_ms),
        );
        let selector = ProtectionStrategySelector::new(&config.protection)?;
        let matcher = CrossChainOpportunityMatcher::new(config.clone(), deps.market, deps.bridges);

        Ok(Self {
            config,
            clock: deps.clock,
            actors: deps.actors,
            aggregator,
            scorer,
            monitor,
            selector,
            matcher,
            stats: Mutex::new(SessionStats::default()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn aggregator(&self) -> &PriceAggregator {
        &self.aggregator
    }

    pub fn actors(&self) -> Arc<dyn ActorRegistry> {
        self.actors.clone()
    }

    /// Polls every configured pair once.
    pub async fn run_price_cycle(&self) -> Vec<AggregatedQuote> {
        let aggregates = self.aggregator.poll_all(&self.config.pairs).await;
        self.stats.lock().await.price_cycles += 1;
        aggregates
    }

    pub async fn run_detection_cycle(&self) -> EngineResult<DetectionSummary> {
        let result = self.monitor.run_cycle().await;
        let mut stats = self.stats.lock().await;
        stats.detection_cycles += 1;
        match &result {
            Ok(summary) => stats.patterns_detected += summary.inserted as u64,
            Err(_) => stats.record_error("detection"),
        }
        result
    }

    /// Ranked, unexpired opportunities from the latest aggregates.
    pub async fn get_opportunities(&self) -> Vec<ArbitrageOpportunity> {
        let aggregates = self.aggregator.latest_all().await;
        self.scorer.score_all(&aggregates).await
    }

    pub async fn get_cross_chain_opportunities(&self) -> EngineResult<Vec<CrossChainOpportunity>> {
        self.matcher.find_opportunities(self.clock.now()).await
    }

    pub async fn analyze_risk(&self, pair: &TokenPair, amount: Decimal) -> EngineResult<RiskAnalysis> {
        let activity = self.monitor.activity().await;
        let patterns = self.monitor.recent_patterns().await;
        self.selector.analyze_risk(pair, amount, activity.score, patterns)
    }

    /// Newest first.
    pub async fn get_attack_patterns(&self, limit: usize) -> Vec<AttackPattern> {
        self.monitor.attack_patterns(limit).await
    }

    /// Checks an opportunity against the latest aggregate for its pair.
    pub async fn revalidate(&self, opportunity: &ArbitrageOpportunity) -> ValidationResult {
        let now = self.clock.now();
        match self.aggregator.latest(&opportunity.pair).await {
            Some(latest) => revalidate_opportunity(
                opportunity,
                &latest,
                now,
                self.config.scoring.revalidation_tolerance_pct,
            ),
            None => ValidationResult {
                not_expired: !opportunity.is_expired(now),
                warnings: vec![format!("No quotes held for {}", opportunity.pair)],
                ..ValidationResult::default()
            },
        }
    }

    pub async fn venue_health(&self) -> Vec<VenueHealth> {
        self.aggregator.venue_health().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.scorer.cache_stats().await
    }

    pub async fn session_stats(&self) -> SessionStats {
        self.stats.lock().await.clone()
    }

    async fn price_tick(&self) {
        let started = self.clock.now();
        self.run_price_cycle().await;
        let opportunities = self.get_opportunities().await;

        let fresh: Vec<&ArbitrageOpportunity> =
            opportunities.iter().filter(|o| o.created_at >= started).collect();
        {
            let mut stats = self.stats.lock().await;
            stats.total_opportunities += fresh.len() as u64;
            stats.total_potential_profit += fresh.iter().map(|o| o.net_profit).sum::<Decimal>();
        }
        for opportunity in fresh {
            print_arbitrage_opportunity(opportunity);
        }
        let purged = self.scorer.purge_cache().await;
        if purged > 0 {
            debug!(purged, "Expired score cache entries purged");
        }
    }

    async fn detection_tick(&self) {
        match self.run_detection_cycle().await {
            Ok(summary) if summary.inserted > 0 => {
                for pattern in self.get_attack_patterns(summary.inserted).await {
                    print_attack_pattern(&pattern);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Detection cycle failed"),
        }

        match self.get_cross_chain_opportunities().await {
            Ok(routes) => {
                self.stats.lock().await.cross_chain_opportunities += routes.len() as u64;
                for route in &routes {
                    print_cross_chain_opportunity(route);
                }
            }
            Err(e) => {
                warn!(error = %e, "Cross-chain matching failed");
                self.stats.lock().await.record_error("cross_chain");
            }
        }
    }

    /// Ticks `cycle` every `period` until `stop` flips. A cycle still running
    /// when it flips gets at most the shutdown deadline.
    async fn schedule<F, Fut>(&self, name: &str, period: Duration, mut stop: watch::Receiver<bool>, mut cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop.changed() => break,
                _ = interval.tick() => {
                    let running = cycle();
                    tokio::pin!(running);
                    tokio::select! {
                        _ = &mut running => {}
                        _ = stop.changed() => {
                            let deadline = Duration::from_millis(self.config.polling.shutdown_deadline_ms);
                            info!(cycle = name, deadline_ms = deadline.as_millis() as u64, "Draining in-flight cycle");
                            if time::timeout(deadline, &mut running).await.is_err() {
                                error!(cycle = name, "In-flight cycle abandoned at shutdown deadline");
                            }
                            break;
                        }
                    }
                }
            }
        }
        debug!(cycle = name, "Schedule stopped");
    }

    /// Runs the price and detection schedules side by side until `shutdown`
    /// resolves. A slow cycle on one schedule never delays the other.
    pub async fn run<S>(&self, shutdown: S) -> SessionStats
    where
        S: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        info!(
            pairs = self.config.pairs.len(),
            venues = self.aggregator.venue_count(),
            "🚀 Engine schedules started"
        );

        let signal = async move {
            shutdown.await;
            // Receivers gone means both schedules already stopped.
            let _ = stop_tx.send(true);
        };
        let price = self.schedule(
            "price",
            Duration::from_millis(self.config.polling.price_interval_ms),
            stop_rx.clone(),
            move || self.price_tick(),
        );
        let detection = self.schedule(
            "detection",
            Duration::from_millis(self.config.polling.detection_interval_ms),
            stop_rx,
            move || self.detection_tick(),
        );
        tokio::join!(signal, price, detection);

        info!("📛 Engine stopped");
        let stats = self.session_stats().await;
        print_session_stats(&stats, &self.venue_health().await, &self.cache_stats().await);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mev::InMemoryActorRegistry;
    use crate::network::{StaticBridgeCatalog, StaticMarketData, StaticTransactionSource};
    use crate::types::{BlockRange, ChainId, Quote, TransactionRecord};
    use crate::utils::{ManualClock, SystemClock};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct FixedVenue {
        id: String,
        price: Decimal,
    }

    #[async_trait]
    impl VenueClient for FixedVenue {
        fn venue_id(&self) -> &str {
            &self.id
        }

        async fn fetch_quote(&self, pair: &TokenPair) -> EngineResult<Quote> {
            Ok(Quote {
                venue_id: self.id.clone(),
                pair: pair.clone(),
                price: self.price,
                liquidity: dec!(1_000_000),
                fee_bps: 30,
                timestamp: Utc::now(),
            })
        }
    }

    fn engine_with(config: Config, transactions: Arc<dyn TransactionSource>, clock: Arc<dyn Clock>) -> Engine {
        let market = StaticMarketData::new().with_gas(ChainId::ETHEREUM, dec!(30), dec!(2000));
        Engine::new(
            config,
            EngineDeps {
                venues: vec![
                    Arc::new(FixedVenue { id: "a".into(), price: dec!(100) }),
                    Arc::new(FixedVenue { id: "b".into(), price: dec!(102) }),
                ],
                market: Arc::new(market),
                transactions,
                bridges: Arc::new(StaticBridgeCatalog::default()),
                actors: Arc::new(InMemoryActorRegistry::new()),
                clock,
            },
        )
        .unwrap()
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.pairs = vec![TokenPair::new("WETH", "USDC")];
        config
    }

    fn engine() -> Engine {
        engine_with(test_config(), Arc::new(StaticTransactionSource::new(1, vec![])), Arc::new(SystemClock))
    }

    /// Answers after `delay`, long enough to outlast several price ticks.
    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl TransactionSource for SlowSource {
        async fn latest_block(&self, _chain: ChainId) -> EngineResult<u64> {
            tokio::time::sleep(self.delay).await;
            Ok(1)
        }

        async fn fetch_recent_transactions(
            &self,
            _chain: ChainId,
            _range: BlockRange,
        ) -> EngineResult<Vec<TransactionRecord>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn price_cycle_feeds_opportunities() {
        let engine = engine();
        assert!(engine.get_opportunities().await.is_empty());

        engine.run_price_cycle().await;
        let opportunities = engine.get_opportunities().await;
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].buy_venue, "a");

        let check = engine.revalidate(&opportunities[0]).await;
        assert!(check.all_passed, "{:?}", check.warnings);
    }

    #[tokio::test]
    async fn quiet_chain_recommends_stealth() {
        let engine = engine();
        engine.run_detection_cycle().await.unwrap();
        let analysis = engine
            .analyze_risk(&TokenPair::new("WETH", "USDC"), dec!(1_000))
            .await
            .unwrap();
        assert!(!analysis.is_risky);
        assert_eq!(analysis.matched_rule, "default");
    }

    #[tokio::test]
    async fn opportunities_from_old_quotes_are_not_served() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let engine = engine_with(test_config(), Arc::new(StaticTransactionSource::new(1, vec![])), clock.clone());

        engine.run_price_cycle().await;
        let opportunities = engine.get_opportunities().await;
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].created_at, clock.now());

        clock.advance(chrono::Duration::seconds(3_600));
        assert!(engine.get_opportunities().await.is_empty());

        engine.run_price_cycle().await;
        let refreshed = engine.get_opportunities().await;
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].created_at, clock.now());
    }

    #[tokio::test]
    async fn slow_detection_does_not_stall_price_polling() {
        let mut config = test_config();
        config.polling.price_interval_ms = 50;
        config.polling.detection_interval_ms = 50;
        config.polling.venue_timeout_ms = 2_000;
        config.polling.shutdown_deadline_ms = 50;
        let engine = engine_with(
            config,
            Arc::new(SlowSource { delay: Duration::from_secs(5) }),
            Arc::new(SystemClock),
        );

        let stats = engine.run(tokio::time::sleep(Duration::from_millis(600))).await;
        // The first detection cycle is still waiting on its source.
        assert_eq!(stats.detection_cycles, 0);
        assert!(stats.price_cycles >= 5, "price cycles: {}", stats.price_cycles);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let engine = engine();
        let stats = engine.run(tokio::time::sleep(Duration::from_millis(50))).await;
        assert!(stats.price_cycles >= 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = Config::default();
        config.detector.window_blocks = 0;
        let result = Engine::new(
            config,
            EngineDeps {
                venues: vec![],
                market: Arc::new(StaticMarketData::new()),
                transactions: Arc::new(StaticTransactionSource::unavailable()),
                bridges: Arc::new(StaticBridgeCatalog::default()),
                actors: Arc::new(InMemoryActorRegistry::new()),
                clock: Arc::new(SystemClock),
            },
        );
        assert!(result.is_err());
    }
}
