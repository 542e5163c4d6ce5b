//! External capabilities consumed by the engine

use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::{
    errors::EngineResult,
    types::{BlockRange, BridgeConfig, ChainId, Quote, TokenPair, TransactionRecord},
};

/// A single price source for token pairs.
#[async_trait]
pub trait VenueClient: Send + Sync {
    fn venue_id(&self) -> &str;

    async fn fetch_quote(&self, pair: &TokenPair) -> EngineResult<Quote>;
}

/// Live market data that would otherwise be guessed: per-chain token
/// prices, gas prices and the native token's USD price.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn token_price(&self, chain: ChainId, token: &str) -> EngineResult<Decimal>;

    async fn gas_price_gwei(&self, chain: ChainId) -> EngineResult<Decimal>;

    async fn native_price_usd(&self, chain: ChainId) -> EngineResult<Decimal>;
}

#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn latest_block(&self, chain: ChainId) -> EngineResult<u64>;

    async fn fetch_recent_transactions(
        &self,
        chain: ChainId,
        range: BlockRange,
    ) -> EngineResult<Vec<TransactionRecord>>;
}

#[async_trait]
pub trait BridgeCatalog: Send + Sync {
    async fn fetch_bridge_catalog(&self) -> EngineResult<Vec<BridgeConfig>>;
}
