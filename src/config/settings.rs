//! Engine configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use crate::{
    errors::{EngineError, EngineResult},
    types::{ChainId, TokenPair},
};

// Configuration bounds
pub const MIN_TRADE_CAPITAL_USD: Decimal = dec!(100);
pub const MAX_TRADE_CAPITAL_USD: Decimal = dec!(10_000_000);
pub const MAX_SLIPPAGE_BPS: u32 = 500; // 5%
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
pub const MAX_VENUE_TIMEOUT_MS: u64 = 30_000;
pub const MAX_WINDOW_BLOCKS: u64 = 256;

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub price_interval_ms: u64,
    pub detection_interval_ms: u64,
    pub venue_timeout_ms: u64,
    pub shutdown_deadline_ms: u64,
    pub max_consecutive_failures: u32,
    pub circuit_breaker_cooldown_secs: u64,
}

#[derive(Debug, Clone)]
pub struct FeeConfig {
    pub flashloan_provider: String,
    /// Flashloan provider → fee in bps.
    pub provider_fee_bps: HashMap<String, u32>,
    /// Venue id → swap fee in bps. Venues not listed use their quoted fee.
    pub dex_fee_bps: HashMap<String, u32>,
    pub slippage_bps: u32,
    pub gas_units: u64,
}

impl FeeConfig {
    pub fn provider_fee(&self) -> u32 {
        self.provider_fee_bps
            .get(&self.flashloan_provider)
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub chain: ChainId,
    pub capital_usd: Decimal,
    pub utilization_cap: Decimal,
    pub liquidity_cap: Decimal,
    pub hard_cap_usd: Decimal,
    pub min_profit_usd: Decimal,
    pub opportunity_ttl_secs: u64,
    /// Maximum relative move of a venue price before a cached opportunity is
    /// considered invalid, in percent.
    pub revalidation_tolerance_pct: Decimal,
}

#[derive(Debug, Clone)]
pub struct RiskThresholds {
    pub high_spread_pct: Decimal,
    pub high_margin_pct: Decimal,
    pub medium_spread_pct: Decimal,
    pub medium_margin_pct: Decimal,
}

#[derive(Debug, Clone)]
pub struct ProtectionThresholds {
    /// T1
    pub max_protection_amount: Decimal,
    /// T2
    pub max_protection_confidence: u8,
    /// T3
    pub bundle_sandwich_confidence: u8,
    /// T4
    pub stealth_delay_confidence: u8,
    pub risky_confidence: u8,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub chain: ChainId,
    pub window_blocks: u64,
    /// Largest index distance between the outer legs of a bracketing pattern.
    pub max_position_gap: usize,
    pub buffer_max_size: usize,
    pub buffer_max_age_secs: u64,
    pub sandwich_base: u8,
    pub sandwich_same_sender_bonus: u8,
    pub sandwich_gas_bonus: u8,
    pub sandwich_gas_ratio: Decimal,
    pub frontrun_gas_multiplier: Decimal,
    pub frontrun_base: u8,
    pub frontrun_ratio_bonus: u8,
    pub backrun_base: u8,
    pub backrun_min_value: Decimal,
    pub jit_gas_threshold: u64,
    pub jit_base: u8,
    pub jit_gas_bonus: u8,
    pub known_actor_bonus: u8,
    pub frontrun_known_actor_bonus: u8,
    pub sandwich_profit_factor: Decimal,
    pub frontrun_profit_factor: Decimal,
    pub backrun_profit_factor: Decimal,
    pub jit_profit_factor: Decimal,
    pub activity_actor_weight: u8,
    pub activity_gas_price_weight: u8,
    pub activity_gas_usage_weight: u8,
}

#[derive(Debug, Clone)]
pub struct ChainProfile {
    pub chain: ChainId,
    pub confirmation_secs: u64,
    pub gas_units: u64,
}

#[derive(Debug, Clone)]
pub struct CrossChainConfig {
    pub chains: Vec<ChainProfile>,
    pub tokens: Vec<String>,
    pub trade_amount_usd: Decimal,
    pub min_spread_pct: Decimal,
    pub min_net_profit_usd: Decimal,
    pub max_risk_score: Decimal,
    pub base_risk: Decimal,
    pub bridge_processing_secs: u64,
    /// (amount threshold, penalty), evaluated highest first.
    pub amount_tiers: Vec<(Decimal, Decimal)>,
    /// (transit seconds threshold, penalty), evaluated highest first.
    pub transit_tiers: Vec<(u64, Decimal)>,
    pub chain_risk_weights: HashMap<ChainId, Decimal>,
    pub default_chain_risk: Decimal,
}

impl CrossChainConfig {
    pub fn chain_risk(&self, chain: ChainId) -> Decimal {
        self.chain_risk_weights
            .get(&chain)
            .copied()
            .unwrap_or(self.default_chain_risk)
    }

    pub fn profile(&self, chain: ChainId) -> Option<&ChainProfile> {
        self.chains.iter().find(|p| p.chain == chain)
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub bucket_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct VenueEndpoint {
    pub id: String,
    pub url: String,
    pub fee_bps: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pairs: Vec<TokenPair>,
    pub venues: Vec<VenueEndpoint>,
    pub rpc_url: Option<String>,
    pub polling: PollingConfig,
    pub fees: FeeConfig,
    pub scoring: ScoringConfig,
    pub risk: RiskThresholds,
    pub protection: ProtectionThresholds,
    pub detector: DetectorConfig,
    pub cross_chain: CrossChainConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairs: vec![TokenPair::new("WETH", "USDC")],
            venues: Vec::new(),
            rpc_url: None,
            polling: PollingConfig {
                price_interval_ms: 2_000,
                detection_interval_ms: 12_000,
                venue_timeout_ms: 3_000,
                shutdown_deadline_ms: 5_000,
                max_consecutive_failures: 5,
                circuit_breaker_cooldown_secs: 300,
            },
            fees: FeeConfig {
                flashloan_provider: "aave".to_string(),
                provider_fee_bps: HashMap::from([
                    ("aave".to_string(), 9),
                    ("balancer".to_string(), 0),
                    ("dydx".to_string(), 2),
                ]),
                dex_fee_bps: HashMap::new(),
                slippage_bps: 10,
                gas_units: 350_000,
            },
            scoring: ScoringConfig {
                chain: ChainId::ETHEREUM,
                capital_usd: dec!(100_000),
                utilization_cap: dec!(0.4),
                liquidity_cap: dec!(0.05),
                hard_cap_usd: dec!(250_000),
                min_profit_usd: dec!(10),
                opportunity_ttl_secs: 30,
                revalidation_tolerance_pct: dec!(0.1),
            },
            risk: RiskThresholds {
                high_spread_pct: dec!(0.5),
                high_margin_pct: dec!(0.2),
                medium_spread_pct: dec!(1.0),
                medium_margin_pct: dec!(0.5),
            },
            protection: ProtectionThresholds {
                max_protection_amount: dec!(100_000),
                max_protection_confidence: 80,
                bundle_sandwich_confidence: 60,
                stealth_delay_confidence: 40,
                risky_confidence: 50,
            },
            detector: DetectorConfig {
                chain: ChainId::ETHEREUM,
                window_blocks: 5,
                max_position_gap: 3,
                buffer_max_size: 1_000,
                buffer_max_age_secs: 3_600,
                sandwich_base: 60,
                sandwich_same_sender_bonus: 20,
                sandwich_gas_bonus: 15,
                sandwich_gas_ratio: dec!(1.5),
                frontrun_gas_multiplier: dec!(1.5),
                frontrun_base: 50,
                frontrun_ratio_bonus: 30,
                backrun_base: 40,
                backrun_min_value: dec!(10),
                jit_gas_threshold: 200_000,
                jit_base: 55,
                jit_gas_bonus: 15,
                known_actor_bonus: 10,
                frontrun_known_actor_bonus: 20,
                sandwich_profit_factor: dec!(0.005),
                frontrun_profit_factor: dec!(0.003),
                backrun_profit_factor: dec!(0.001),
                jit_profit_factor: dec!(0.002),
                activity_actor_weight: 40,
                activity_gas_price_weight: 35,
                activity_gas_usage_weight: 25,
            },
            cross_chain: CrossChainConfig {
                chains: vec![
                    ChainProfile { chain: ChainId::ETHEREUM, confirmation_secs: 180, gas_units: 250_000 },
                    ChainProfile { chain: ChainId::ARBITRUM, confirmation_secs: 60, gas_units: 800_000 },
                    ChainProfile { chain: ChainId::OPTIMISM, confirmation_secs: 60, gas_units: 300_000 },
                    ChainProfile { chain: ChainId::POLYGON, confirmation_secs: 120, gas_units: 300_000 },
                    ChainProfile { chain: ChainId::BASE, confirmation_secs: 60, gas_units: 300_000 },
                ],
                tokens: vec!["USDC".to_string(), "WETH".to_string(), "USDT".to_string()],
                trade_amount_usd: dec!(10_000),
                min_spread_pct: dec!(0.3),
                min_net_profit_usd: dec!(25),
                max_risk_score: dec!(0.7),
                base_risk: dec!(0.1),
                bridge_processing_secs: 300,
                amount_tiers: vec![(dec!(100_000), dec!(0.3)), (dec!(25_000), dec!(0.15)), (dec!(5_000), dec!(0.05))],
                transit_tiers: vec![(1_800, dec!(0.3)), (900, dec!(0.15)), (300, dec!(0.05))],
                chain_risk_weights: HashMap::from([
                    (ChainId::ETHEREUM, dec!(0.02)),
                    (ChainId::ARBITRUM, dec!(0.05)),
                    (ChainId::OPTIMISM, dec!(0.05)),
                    (ChainId::BASE, dec!(0.06)),
                    (ChainId::POLYGON, dec!(0.08)),
                    (ChainId::BSC, dec!(0.1)),
                ]),
                default_chain_risk: dec!(0.15),
            },
            cache: CacheConfig {
                ttl_secs: 30,
                bucket_secs: 30,
                capacity: 512,
            },
        }
    }
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|s| Decimal::from_str(s.trim()).ok())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// `id=url[@fee_bps]` entries separated by commas.
fn parse_venues(raw: &str) -> Vec<VenueEndpoint> {
    raw.split(',')
        .filter_map(|entry| {
            let (id, rest) = entry.trim().split_once('=')?;
            let (url, fee_bps) = match rest.rsplit_once('@') {
                Some((url, fee)) => (url, fee.parse().ok()?),
                None => (rest, 30),
            };
            Some(VenueEndpoint {
                id: id.trim().to_string(),
                url: url.trim().to_string(),
                fee_bps,
            })
        })
        .collect()
}

impl Config {
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(pairs) = env::var("TOKEN_PAIRS") {
            let parsed: Vec<TokenPair> = pairs.split(',').filter_map(TokenPair::parse).collect();
            if !parsed.is_empty() {
                config.pairs = parsed;
            }
        }
        if let Ok(venues) = env::var("VENUES") {
            config.venues = parse_venues(&venues);
        }
        config.rpc_url = env::var("RPC_URL").ok();

        config.polling.price_interval_ms = env_parse("PRICE_INTERVAL_MS")
            .unwrap_or(config.polling.price_interval_ms)
            .max(MIN_POLL_INTERVAL_MS);
        config.polling.detection_interval_ms = env_parse("DETECTION_INTERVAL_MS")
            .unwrap_or(config.polling.detection_interval_ms)
            .max(MIN_POLL_INTERVAL_MS);
        config.polling.venue_timeout_ms = env_parse("VENUE_TIMEOUT_MS")
            .unwrap_or(config.polling.venue_timeout_ms)
            .min(MAX_VENUE_TIMEOUT_MS);

        if let Ok(provider) = env::var("FLASHLOAN_PROVIDER") {
            config.fees.flashloan_provider = provider.to_lowercase();
        }
        config.fees.slippage_bps = env_parse("SLIPPAGE_BPS")
            .unwrap_or(config.fees.slippage_bps)
            .min(MAX_SLIPPAGE_BPS);
        for venue in &config.venues {
            config.fees.dex_fee_bps.insert(venue.id.clone(), venue.fee_bps);
        }

        config.scoring.capital_usd = env_decimal("CAPITAL_USD")
            .unwrap_or(config.scoring.capital_usd)
            .max(MIN_TRADE_CAPITAL_USD)
            .min(MAX_TRADE_CAPITAL_USD);
        config.scoring.min_profit_usd = env_decimal("MIN_PROFIT_USD")
            .unwrap_or(config.scoring.min_profit_usd);
        config.scoring.opportunity_ttl_secs = env_parse("OPPORTUNITY_TTL_SECS")
            .unwrap_or(config.scoring.opportunity_ttl_secs);

        config.risk.high_spread_pct = env_decimal("RISK_HIGH_SPREAD_PCT").unwrap_or(config.risk.high_spread_pct);
        config.risk.high_margin_pct = env_decimal("RISK_HIGH_MARGIN_PCT").unwrap_or(config.risk.high_margin_pct);
        config.risk.medium_spread_pct = env_decimal("RISK_MEDIUM_SPREAD_PCT").unwrap_or(config.risk.medium_spread_pct);
        config.risk.medium_margin_pct = env_decimal("RISK_MEDIUM_MARGIN_PCT").unwrap_or(config.risk.medium_margin_pct);

        config.protection.max_protection_amount = env_decimal("PROTECTION_T1_AMOUNT")
            .unwrap_or(config.protection.max_protection_amount);
        config.protection.max_protection_confidence = env_parse("PROTECTION_T2_CONFIDENCE")
            .unwrap_or(config.protection.max_protection_confidence);
        config.protection.bundle_sandwich_confidence = env_parse("PROTECTION_T3_CONFIDENCE")
            .unwrap_or(config.protection.bundle_sandwich_confidence);
        config.protection.stealth_delay_confidence = env_parse("PROTECTION_T4_CONFIDENCE")
            .unwrap_or(config.protection.stealth_delay_confidence);

        if let Some(chain) = env_parse::<u64>("CHAIN_ID") {
            config.scoring.chain = ChainId(chain);
            config.detector.chain = ChainId(chain);
        }
        config.detector.window_blocks = env_parse("DETECTION_WINDOW_BLOCKS")
            .unwrap_or(config.detector.window_blocks)
            .min(MAX_WINDOW_BLOCKS);
        config.detector.jit_gas_threshold = env_parse("JIT_GAS_THRESHOLD")
            .unwrap_or(config.detector.jit_gas_threshold);

        config.cache.ttl_secs = env_parse("CACHE_TTL_SECS").unwrap_or(config.cache.ttl_secs);
        config.cache.capacity = env_parse("CACHE_CAPACITY").unwrap_or(config.cache.capacity);

        config
    }

    pub fn validate(&self) -> EngineResult<()> {
        let risk = &self.risk;
        for (field, value) in [
            ("risk.high_spread_pct", risk.high_spread_pct),
            ("risk.high_margin_pct", risk.high_margin_pct),
            ("risk.medium_spread_pct", risk.medium_spread_pct),
            ("risk.medium_margin_pct", risk.medium_margin_pct),
        ] {
            if value < Decimal::ZERO {
                return Err(EngineError::invalid_config(field, format!("must be non-negative, got {}", value)));
            }
        }
        if risk.high_spread_pct > risk.medium_spread_pct {
            return Err(EngineError::invalid_config(
                "risk.high_spread_pct",
                "HIGH spread cutoff must not exceed MEDIUM spread cutoff",
            ));
        }
        if risk.high_margin_pct > risk.medium_margin_pct {
            return Err(EngineError::invalid_config(
                "risk.high_margin_pct",
                "HIGH margin cutoff must not exceed MEDIUM margin cutoff",
            ));
        }

        for (field, value) in [
            ("scoring.utilization_cap", self.scoring.utilization_cap),
            ("scoring.liquidity_cap", self.scoring.liquidity_cap),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(EngineError::invalid_config(field, format!("must be within (0, 1], got {}", value)));
            }
        }
        if !self.fees.provider_fee_bps.contains_key(&self.fees.flashloan_provider) {
            return Err(EngineError::invalid_config(
                "fees.flashloan_provider",
                format!("no fee configured for provider '{}'", self.fees.flashloan_provider),
            ));
        }
        if self.scoring.hard_cap_usd <= Decimal::ZERO {
            return Err(EngineError::invalid_config("scoring.hard_cap_usd", "must be positive"));
        }
        if self.scoring.opportunity_ttl_secs == 0 {
            return Err(EngineError::invalid_config("scoring.opportunity_ttl_secs", "must be positive"));
        }

        let p = &self.protection;
        for (field, value) in [
            ("protection.max_protection_confidence", p.max_protection_confidence),
            ("protection.bundle_sandwich_confidence", p.bundle_sandwich_confidence),
            ("protection.stealth_delay_confidence", p.stealth_delay_confidence),
            ("protection.risky_confidence", p.risky_confidence),
        ] {
            if value > 100 {
                return Err(EngineError::invalid_config(field, format!("confidence must be <= 100, got {}", value)));
            }
        }

        let d = &self.detector;
        if d.window_blocks == 0 {
            return Err(EngineError::invalid_config("detector.window_blocks", "must be at least 1"));
        }
        if d.max_position_gap < 2 {
            return Err(EngineError::invalid_config("detector.max_position_gap", "must be at least 2"));
        }
        if d.buffer_max_size == 0 {
            return Err(EngineError::invalid_config("detector.buffer_max_size", "must be at least 1"));
        }
        if d.frontrun_gas_multiplier <= Decimal::ONE {
            return Err(EngineError::invalid_config("detector.frontrun_gas_multiplier", "must be greater than 1"));
        }
        let weights = d.activity_actor_weight as u32 + d.activity_gas_price_weight as u32 + d.activity_gas_usage_weight as u32;
        if weights != 100 {
            return Err(EngineError::invalid_config(
                "detector.activity_*_weight",
                format!("weights must sum to 100, got {}", weights),
            ));
        }

        if self.cache.ttl_secs == 0 || self.cache.bucket_secs == 0 || self.cache.capacity == 0 {
            return Err(EngineError::invalid_config("cache", "ttl, bucket and capacity must be positive"));
        }
        if self.polling.venue_timeout_ms == 0 {
            return Err(EngineError::invalid_config("polling.venue_timeout_ms", "must be positive"));
        }
        if self.cross_chain.max_risk_score <= Decimal::ZERO {
            return Err(EngineError::invalid_config("cross_chain.max_risk_score", "must be positive"));
        }

        Ok(())
    }
}
