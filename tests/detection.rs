//! Detection cycles feeding protection selection through the engine

use alloy::primitives::{Address, B256};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use mev_arb_scout::{
    config::Config,
    mev::{ActorRegistry, InMemoryActorRegistry},
    network::{StaticBridgeCatalog, StaticMarketData, StaticTransactionSource},
    types::{AttackType, ChainId, StrategyKind, TokenPair, TransactionRecord},
    utils::SystemClock,
    Engine, EngineDeps,
};

fn tx(from: u8, block: u64, index: u32, gas: Decimal) -> TransactionRecord {
    TransactionRecord {
        chain: ChainId::ETHEREUM,
        hash: B256::with_last_byte((block as u8).wrapping_mul(16).wrapping_add(index as u8)),
        from: Address::repeat_byte(from),
        to: Some(Address::repeat_byte(0xee)),
        value: dec!(3),
        gas_price_gwei: gas,
        gas_used: Some(90_000),
        gas_limit: 150_000,
        block_number: block,
        tx_index: index,
        timestamp: Utc::now(),
    }
}

fn engine(source: StaticTransactionSource, registry: Arc<InMemoryActorRegistry>) -> Engine {
    Engine::new(
        Config::default(),
        EngineDeps {
            venues: vec![],
            market: Arc::new(StaticMarketData::new()),
            transactions: Arc::new(source),
            bridges: Arc::new(StaticBridgeCatalog::default()),
            actors: registry,
            clock: Arc::new(SystemClock),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn sandwich_case_drives_bundled_submission() {
    let source = StaticTransactionSource::new(
        20,
        vec![tx(0xa, 20, 0, dec!(100)), tx(0xb, 20, 1, dec!(50)), tx(0xa, 20, 2, dec!(100))],
    );
    let engine = engine(source, Arc::new(InMemoryActorRegistry::new()));

    let summary = engine.run_detection_cycle().await.unwrap();
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.inserted, 1);

    let patterns = engine.get_attack_patterns(10).await;
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].attack_type, AttackType::Sandwich);
    assert!(patterns[0].confidence > 60);

    let analysis = engine
        .analyze_risk(&TokenPair::new("WETH", "USDC"), dec!(5_000))
        .await
        .unwrap();
    // Sandwich at 95 exceeds the maximum-protection confidence cutoff.
    assert!(analysis.is_risky);
    assert_eq!(analysis.confidence, 95);
    assert_eq!(analysis.recommended_strategy.kind, StrategyKind::MaximumProtection);
    assert_eq!(analysis.contributing_patterns.len(), 1);
}

#[tokio::test]
async fn differing_brackets_produce_nothing() {
    let source = StaticTransactionSource::new(
        20,
        vec![tx(0xa, 20, 0, dec!(100)), tx(0xb, 20, 1, dec!(50)), tx(0xc, 20, 2, dec!(100))],
    );
    let engine = engine(source, Arc::new(InMemoryActorRegistry::new()));

    engine.run_detection_cycle().await.unwrap();
    assert!(engine.get_attack_patterns(10).await.is_empty());
}

#[tokio::test]
async fn registry_changes_apply_on_next_cycle() {
    let source = StaticTransactionSource::new(20, vec![tx(0xa, 20, 0, dec!(400)), tx(0xb, 20, 1, dec!(100))]);
    let registry = Arc::new(InMemoryActorRegistry::new());
    let engine = engine(source, registry.clone());

    engine.run_detection_cycle().await.unwrap();
    assert!(engine.get_attack_patterns(10).await.is_empty());

    registry.add(Address::repeat_byte(0xa), Some("searcher".to_string())).await;
    engine.run_detection_cycle().await.unwrap();

    let patterns = engine.get_attack_patterns(10).await;
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].attack_type, AttackType::Frontrun);
    assert_eq!(patterns[0].attacker, Address::repeat_byte(0xa));
}

#[tokio::test]
async fn blocks_outside_the_window_are_ignored() {
    // Window of 5 ending at 20 starts at 16.
    let source = StaticTransactionSource::new(
        20,
        vec![tx(0xa, 10, 0, dec!(100)), tx(0xb, 10, 1, dec!(50)), tx(0xa, 10, 2, dec!(100))],
    );
    let engine = engine(source, Arc::new(InMemoryActorRegistry::new()));

    let summary = engine.run_detection_cycle().await.unwrap();
    assert_eq!(summary.range.from, 16);
    assert_eq!(summary.scanned, 0);
    assert!(engine.get_attack_patterns(10).await.is_empty());
}

#[tokio::test]
async fn malformed_records_are_skipped_not_fatal() {
    let mut broken = tx(0xd, 20, 3, dec!(10));
    broken.gas_limit = 0;
    let source = StaticTransactionSource::new(
        20,
        vec![tx(0xa, 20, 0, dec!(100)), tx(0xb, 20, 1, dec!(50)), tx(0xa, 20, 2, dec!(100)), broken],
    );
    let engine = engine(source, Arc::new(InMemoryActorRegistry::new()));

    let summary = engine.run_detection_cycle().await.unwrap();
    assert_eq!(summary.skipped_malformed, 1);
    assert_eq!(summary.inserted, 1);
}
