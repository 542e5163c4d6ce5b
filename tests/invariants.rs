//! Property tests for the scoring arithmetic and detector confidence bounds

use alloy::primitives::{Address, B256};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use mev_arb_scout::{
    aggregator::aggregate_quotes,
    arbitrage::{calculate_arbitrage, classify_risk, GasEstimate, OpportunityScorer, ScoringInputs},
    config::Config,
    mev::TransactionPatternDetector,
    network::StaticMarketData,
    types::{BlockRange, ChainId, Quote, TokenPair, TransactionRecord},
    utils::{spread_pct, ManualClock},
};

fn quote(venue: &str, cents: u64, liquidity: u64) -> Quote {
    Quote {
        venue_id: venue.to_string(),
        pair: TokenPair::new("WETH", "USDC"),
        price: Decimal::new(cents as i64, 2),
        liquidity: Decimal::from(liquidity),
        fee_bps: 30,
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

fn record(from: u8, index: u32, gwei: u64, gas_used: u64) -> TransactionRecord {
    TransactionRecord {
        chain: ChainId::ETHEREUM,
        hash: B256::with_last_byte(index as u8),
        from: Address::repeat_byte(from),
        to: Some(Address::repeat_byte(0xee)),
        value: Decimal::from(index + 1),
        gas_price_gwei: Decimal::from(gwei),
        gas_used: Some(gas_used),
        gas_limit: 1_000_000,
        block_number: 7,
        tx_index: index,
        timestamp: Utc::now(),
    }
}

proptest! {
    #[test]
    fn spread_matches_extreme_prices(prices in proptest::collection::vec(1u64..10_000_000, 2..6)) {
        let quotes: Vec<Quote> = prices
            .iter()
            .enumerate()
            .map(|(i, cents)| quote(&format!("v{}", i), *cents, 1_000))
            .collect();
        let agg = aggregate_quotes(&TokenPair::new("WETH", "USDC"), quotes, vec![], Utc::now());

        let min = Decimal::new(*prices.iter().min().unwrap() as i64, 2);
        let max = Decimal::new(*prices.iter().max().unwrap() as i64, 2);
        prop_assert_eq!(agg.spread_pct, (max - min) / min * Decimal::from(100));
        prop_assert_eq!(agg.spread_pct, spread_pct(min, max));
        prop_assert!(agg.is_arbitrageable);
    }

    #[test]
    fn net_profit_identity_holds(
        low in 1_000u64..1_000_000,
        bump in 1u64..50_000,
        liq_a in 1_000u64..10_000_000,
        liq_b in 1_000u64..10_000_000,
        gwei in 1u64..500,
    ) {
        let config = Config::default();
        let agg = aggregate_quotes(
            &TokenPair::new("WETH", "USDC"),
            vec![quote("a", low, liq_a), quote("b", low + bump, liq_b)],
            vec![],
            Utc::now(),
        );
        let inputs = ScoringInputs {
            capital: config.scoring.capital_usd,
            fees: &config.fees,
            scoring: &config.scoring,
            risk: &config.risk,
            gas: GasEstimate {
                gas_units: config.fees.gas_units,
                gas_price_gwei: Decimal::from(gwei),
                native_price_usd: Decimal::from(2_000),
            },
        };

        if let Some(opp) = calculate_arbitrage(&agg, &inputs, Utc::now()).opportunity() {
            prop_assert_eq!(opp.net_profit, opp.gross_profit - opp.costs.total());
            prop_assert!(opp.net_profit >= config.scoring.min_profit_usd);
            prop_assert_eq!(
                opp.risk_level,
                classify_risk(opp.spread_pct, opp.profit_margin_pct, &config.risk)
            );
        }
    }

    #[test]
    fn scoring_is_idempotent_apart_from_identity(low in 10_000u64..1_000_000, bump in 500u64..50_000) {
        let config = Arc::new(Config::default());
        let market = Arc::new(
            StaticMarketData::new().with_gas(ChainId::ETHEREUM, Decimal::from(20), Decimal::from(2_000)),
        );
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_010, 0).unwrap()));
        let scorer = OpportunityScorer::new(config, market, clock.clone());
        let agg = aggregate_quotes(
            &TokenPair::new("WETH", "USDC"),
            vec![quote("a", low, 5_000_000), quote("b", low + bump, 5_000_000)],
            vec![],
            Utc::now(),
        );

        let first = tokio_test::block_on(scorer.score(&agg)).unwrap().opportunity();
        // Next bucket, so the cache cannot answer.
        clock.advance(chrono::Duration::seconds(31));
        let second = tokio_test::block_on(scorer.score(&agg)).unwrap().opportunity();

        match (first, second) {
            (Some(a), Some(b)) => prop_assert!(a.same_economics(&b)),
            (None, None) => {}
            _ => prop_assert!(false, "outcome changed between identical requests"),
        }
    }

    #[test]
    fn detector_confidence_stays_in_bounds(
        txs in proptest::collection::vec((0u8..4, 1u64..1_000, 21_000u64..600_000), 0..24),
        known in proptest::collection::hash_set(0u8..4, 0..4),
    ) {
        let records: Vec<TransactionRecord> = txs
            .iter()
            .enumerate()
            .map(|(i, (from, gwei, used))| record(*from, i as u32, *gwei, *used))
            .collect();
        let known: HashSet<Address> = known.into_iter().map(Address::repeat_byte).collect();

        let detector = TransactionPatternDetector::new(Config::default().detector);
        let report = detector.scan(&records, BlockRange::trailing(7, 5), &known, Utc::now());

        prop_assert!(report.activity.score <= 100);
        for pattern in &report.patterns {
            prop_assert!(pattern.confidence <= 100);
            prop_assert!(!pattern.evidence.is_empty());
        }
    }
}
