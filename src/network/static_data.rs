//! In-memory data sources with fixed contents

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::RwLock;
use crate::{
    errors::{EngineError, EngineResult},
    network::{BridgeCatalog, MarketDataProvider, TransactionSource},
    types::{BlockRange, BridgeConfig, ChainId, TransactionRecord},
};

/// Deterministic market data table. Missing entries are `Unavailable`.
#[derive(Debug, Default)]
pub struct StaticMarketData {
    prices: RwLock<HashMap<(ChainId, String), Decimal>>,
    gas: RwLock<HashMap<ChainId, Decimal>>,
    native: RwLock<HashMap<ChainId, Decimal>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, chain: ChainId, token: &str, price: Decimal) -> Self {
        self.set_price(chain, token, price);
        self
    }

    pub fn with_gas(self, chain: ChainId, gwei: Decimal, native_usd: Decimal) -> Self {
        self.set_gas(chain, gwei, native_usd);
        self
    }

    pub fn set_price(&self, chain: ChainId, token: &str, price: Decimal) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert((chain, token.to_uppercase()), price);
    }

    pub fn set_gas(&self, chain: ChainId, gwei: Decimal, native_usd: Decimal) {
        self.gas.write().unwrap_or_else(|e| e.into_inner()).insert(chain, gwei);
        self.native.write().unwrap_or_else(|e| e.into_inner()).insert(chain, native_usd);
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn token_price(&self, chain: ChainId, token: &str) -> EngineResult<Decimal> {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        prices
            .get(&(chain, token.to_uppercase()))
            .copied()
            .ok_or_else(|| EngineError::unavailable(chain.to_string(), format!("no price for {}", token)))
    }

    async fn gas_price_gwei(&self, chain: ChainId) -> EngineResult<Decimal> {
        let gas = self.gas.read().unwrap_or_else(|e| e.into_inner());
        gas.get(&chain)
            .copied()
            .ok_or_else(|| EngineError::unavailable(chain.to_string(), "no gas price"))
    }

    async fn native_price_usd(&self, chain: ChainId) -> EngineResult<Decimal> {
        let native = self.native.read().unwrap_or_else(|e| e.into_inner());
        native
            .get(&chain)
            .copied()
            .ok_or_else(|| EngineError::unavailable(chain.to_string(), "no native token price"))
    }
}

/// Bridge catalog served from configuration.
#[derive(Debug, Clone)]
pub struct StaticBridgeCatalog {
    bridges: Vec<BridgeConfig>,
}

impl StaticBridgeCatalog {
    pub fn new(bridges: Vec<BridgeConfig>) -> Self {
        Self { bridges }
    }
}

impl Default for StaticBridgeCatalog {
    fn default() -> Self {
        let evm = vec![
            ChainId::ETHEREUM,
            ChainId::ARBITRUM,
            ChainId::OPTIMISM,
            ChainId::POLYGON,
            ChainId::BASE,
        ];
        let stables = vec!["USDC".to_string(), "USDT".to_string()];
        Self::new(vec![
            BridgeConfig {
                protocol: "stargate".to_string(),
                chains: [evm.clone(), vec![ChainId::BSC, ChainId::AVALANCHE]].concat(),
                tokens: stables.clone(),
                fee_bps: 6,
                fixed_fee_usd: dec!(1.5),
                processing_secs: 60,
            },
            BridgeConfig {
                protocol: "across".to_string(),
                chains: evm.clone(),
                tokens: [stables.clone(), vec!["WETH".to_string()]].concat(),
                fee_bps: 5,
                fixed_fee_usd: dec!(2),
                processing_secs: 30,
            },
            BridgeConfig {
                protocol: "hop".to_string(),
                chains: evm,
                tokens: [stables, vec!["WETH".to_string()]].concat(),
                fee_bps: 10,
                fixed_fee_usd: dec!(1),
                processing_secs: 120,
            },
        ])
    }
}

#[async_trait]
impl BridgeCatalog for StaticBridgeCatalog {
    async fn fetch_bridge_catalog(&self) -> EngineResult<Vec<BridgeConfig>> {
        Ok(self.bridges.clone())
    }
}

/// Fixed transaction history. An unset head makes the source unavailable.
#[derive(Debug, Default)]
pub struct StaticTransactionSource {
    head: RwLock<Option<u64>>,
    records: RwLock<Vec<TransactionRecord>>,
}

impl StaticTransactionSource {
    pub fn new(head: u64, records: Vec<TransactionRecord>) -> Self {
        Self {
            head: RwLock::new(Some(head)),
            records: RwLock::new(records),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn push(&self, record: TransactionRecord) {
        let mut head = self.head.write().unwrap_or_else(|e| e.into_inner());
        *head = Some(head.map_or(record.block_number, |h| h.max(record.block_number)));
        self.records.write().unwrap_or_else(|e| e.into_inner()).push(record);
    }
}

#[async_trait]
impl TransactionSource for StaticTransactionSource {
    async fn latest_block(&self, chain: ChainId) -> EngineResult<u64> {
        self.head
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .ok_or_else(|| EngineError::unavailable(chain.to_string(), "no blocks"))
    }

    async fn fetch_recent_transactions(
        &self,
        chain: ChainId,
        range: BlockRange,
    ) -> EngineResult<Vec<TransactionRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .iter()
            .filter(|r| r.chain == chain && range.contains(r.block_number))
            .cloned()
            .collect())
    }
}
