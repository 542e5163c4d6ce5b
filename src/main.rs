//! MEV Arb Scout - Main Entry Point
//!
//! Wires configuration, data sources and the engine, then runs the price and
//! detection schedules until Ctrl+C.

use mev_arb_scout::*;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use mev_arb_scout::{
    mev::InMemoryActorRegistry,
    network::{
        HttpMarketData, HttpVenueClient, MarketDataProvider, RpcChainClient, StaticBridgeCatalog,
        StaticMarketData, StaticTransactionSource, TransactionSource, VenueClient,
    },
    utils::{print_risk_analysis, SystemClock},
};

fn known_actors_from_env() -> Vec<Address> {
    std::env::var("KNOWN_MEV_ACTORS")
        .map(|raw| {
            raw.split(',')
                .filter_map(|s| match Address::from_str(s.trim()) {
                    Ok(address) => Some(address),
                    Err(e) => {
                        warn!("Ignoring invalid actor address '{}': {}", s.trim(), e);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let _logging_guard = utils::setup_logging(&log_dir)?;

    // Load configuration
    let config = Config::load();
    config.validate().context("Invalid configuration")?;

    info!("🔭 MEV Arb Scout v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Chain: {}", config.scoring.chain);
    info!(
        "   Pairs: {}",
        config.pairs.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
    );
    info!("   Venues: {}", config.venues.len());
    info!("   Capital: ${}", config.scoring.capital_usd);
    info!("   Min Profit: ${}", config.scoring.min_profit_usd);
    info!("   Flashloan Provider: {} ({} bps)", config.fees.flashloan_provider, config.fees.provider_fee());
    info!("   Detection Window: {} blocks", config.detector.window_blocks);

    let venue_timeout = Duration::from_millis(config.polling.venue_timeout_ms);
    let mut venues: Vec<Arc<dyn VenueClient>> = Vec::new();
    for endpoint in &config.venues {
        let client = HttpVenueClient::new(&endpoint.id, &endpoint.url, endpoint.fee_bps, venue_timeout)?;
        venues.push(Arc::new(client));
    }
    if venues.len() < 2 {
        warn!("⚠️  Fewer than two venues configured, no single-chain arbitrage is possible");
    }

    let market: Arc<dyn MarketDataProvider> = match std::env::var("MARKET_DATA_URL") {
        Ok(url) => Arc::new(HttpMarketData::new(url, venue_timeout)?),
        Err(_) => {
            warn!("⚠️  MARKET_DATA_URL not set, using static gas and price table");
            Arc::new(
                StaticMarketData::new().with_gas(config.scoring.chain, dec!(20), dec!(3000)),
            )
        }
    };

    let transactions: Arc<dyn TransactionSource> = match &config.rpc_url {
        Some(url) => Arc::new(RpcChainClient::connect(config.detector.chain, url).await?),
        None => {
            warn!("⚠️  RPC_URL not set, MEV detection disabled");
            Arc::new(StaticTransactionSource::unavailable())
        }
    };

    let actors = known_actors_from_env();
    info!("   Known MEV actors: {}", actors.len());

    let engine = Engine::new(
        config,
        EngineDeps {
            venues,
            market,
            transactions,
            bridges: Arc::new(StaticBridgeCatalog::default()),
            actors: Arc::new(InMemoryActorRegistry::with_actors(actors)),
            clock: Arc::new(SystemClock),
        },
    )?;

    // Setup shutdown handler
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("\n📛 Received shutdown signal (Ctrl+C)..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    info!("\n🚀 Starting monitoring schedules...\n");
    let stats = engine.run(shutdown).await;

    // Final risk snapshot for the largest configured exposure
    if let Some(pair) = engine.config().pairs.first() {
        match engine.analyze_risk(pair, engine.config().scoring.capital_usd).await {
            Ok(analysis) => print_risk_analysis(&analysis),
            Err(e) => warn!("Risk analysis unavailable: {}", e),
        }
    }

    info!(
        "✅ Shutdown complete after {} price and {} detection cycles",
        stats.price_cycles, stats.detection_cycles
    );
    Ok(())
}
