//! Network-backed implementations of the engine's data sources

use alloy::{
    primitives::{Address, B256},
    providers::{Provider, ProviderBuilder},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::{
    errors::{EngineError, EngineResult},
    network::{
        retry::{retry_with_backoff, RetryConfig},
        MarketDataProvider, TransactionSource, VenueClient,
    },
    types::{BlockRange, ChainId, Quote, TokenPair, TransactionRecord},
    ConcreteProvider,
};

/// Reads a decimal from a JSON string or number.
pub fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        _ => None,
    }
}

fn hex_u128(value: &Value) -> Option<u128> {
    let s = value.as_str()?;
    u128::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

fn wei_to_decimal(wei: u128, scale_down: Decimal) -> Option<Decimal> {
    Decimal::from_u128(wei).map(|w| w / scale_down)
}

fn build_http_client(timeout: Duration, source_id: &str) -> EngineResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            warn!("⚠️ Failed to initialize HTTP client for {}: {}", source_id, e);
            EngineError::Unavailable {
                source_id: source_id.to_string(),
                message: "Failed to build HTTP client".to_string(),
                source: Some(e.into()),
            }
        })
}

/// Venue that serves `{"price": .., "liquidity": ..}` at a URL template
/// containing `{base}` and `{quote}` placeholders.
pub struct HttpVenueClient {
    venue_id: String,
    url_template: String,
    fee_bps: u32,
    client: reqwest::Client,
}

impl HttpVenueClient {
    pub fn new(
        venue_id: impl Into<String>,
        url_template: impl Into<String>,
        fee_bps: u32,
        timeout: Duration,
    ) -> EngineResult<Self> {
        let venue_id = venue_id.into();
        let client = build_http_client(timeout, &venue_id)?;
        Ok(Self {
            venue_id,
            url_template: url_template.into(),
            fee_bps,
            client,
        })
    }

    fn url_for(&self, pair: &TokenPair) -> String {
        self.url_template
            .replace("{base}", &pair.base)
            .replace("{quote}", &pair.quote)
    }

    fn unavailable(&self, message: impl Into<String>, source: Option<anyhow::Error>) -> EngineError {
        EngineError::Unavailable {
            source_id: self.venue_id.clone(),
            message: message.into(),
            source,
        }
    }
}

#[async_trait]
impl VenueClient for HttpVenueClient {
    fn venue_id(&self) -> &str {
        &self.venue_id
    }

    async fn fetch_quote(&self, pair: &TokenPair) -> EngineResult<Quote> {
        let response = self
            .client
            .get(self.url_for(pair))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout {
                        source_id: self.venue_id.clone(),
                        elapsed: Duration::ZERO,
                    }
                } else {
                    self.unavailable("HTTP request failed", Some(e.into()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("⚠️ Venue {} returned error status {}: {}", self.venue_id, status, body);
            return Err(self.unavailable(format!("status {}", status), None));
        }

        let json: Value = response.json().await.map_err(|e| EngineError::DataParsing {
            context: format!("quote body from {}", self.venue_id),
            source: e.into(),
        })?;

        let price = json_decimal(&json["price"]).ok_or_else(|| EngineError::DataParsing {
            context: format!("quote from {}", self.venue_id),
            source: anyhow::anyhow!("Missing or invalid 'price' field"),
        })?;
        let liquidity = json_decimal(&json["liquidity"]).unwrap_or(Decimal::ZERO);
        let fee_bps = json["fee_bps"]
            .as_u64()
            .map(|f| f as u32)
            .unwrap_or(self.fee_bps);

        Ok(Quote {
            venue_id: self.venue_id.clone(),
            pair: pair.clone(),
            price,
            liquidity,
            fee_bps,
            timestamp: Utc::now(),
        })
    }
}

/// Price service exposing `/price?chain=&token=`, `/gas?chain=` and
/// `/native?chain=`, each answering `{"value": ..}`.
pub struct HttpMarketData {
    base_url: String,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpMarketData {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> EngineResult<Self> {
        let client = build_http_client(timeout, "market-data")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 100,
                ..Default::default()
            },
        })
    }

    async fn fetch_value(&self, path: &str) -> EngineResult<Decimal> {
        let url = format!("{}{}", self.base_url, path);
        retry_with_backoff(
            || async {
                let response = self.client.get(&url).send().await.map_err(|e| EngineError::Unavailable {
                    source_id: url.clone(),
                    message: "HTTP request failed".to_string(),
                    source: Some(e.into()),
                })?;
                if !response.status().is_success() {
                    return Err(EngineError::unavailable(
                        &url,
                        format!("market data error status {}", response.status()),
                    ));
                }
                let json: Value = response.json().await.map_err(|e| EngineError::DataParsing {
                    context: format!("market data {}", path),
                    source: e.into(),
                })?;
                json_decimal(&json["value"]).ok_or_else(|| EngineError::DataParsing {
                    context: format!("market data {}", path),
                    source: anyhow::anyhow!("Missing 'value' field in response"),
                })
            },
            &self.retry,
            &format!("market data {}", path),
        ).await
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketData {
    async fn token_price(&self, chain: ChainId, token: &str) -> EngineResult<Decimal> {
        self.fetch_value(&format!("/price?chain={}&token={}", chain.0, token)).await
    }

    async fn gas_price_gwei(&self, chain: ChainId) -> EngineResult<Decimal> {
        self.fetch_value(&format!("/gas?chain={}", chain.0)).await
    }

    async fn native_price_usd(&self, chain: ChainId) -> EngineResult<Decimal> {
        self.fetch_value(&format!("/native?chain={}", chain.0)).await
    }
}

/// JSON-RPC access to one chain: head block, gas price and full blocks.
pub struct RpcChainClient {
    chain: ChainId,
    provider: Arc<ConcreteProvider>,
}

impl RpcChainClient {
    pub async fn connect(chain: ChainId, rpc_url: &str) -> EngineResult<Self> {
        let url = reqwest::Url::parse(rpc_url)
            .map_err(|e| EngineError::invalid_config("rpc_url", e.to_string()))?;
        let provider: Arc<ConcreteProvider> = Arc::new(ProviderBuilder::new().on_http(url).boxed());

        info!("🔗 Testing connection to {}...", chain);
        let block = retry_with_backoff(
            || async {
                provider.get_block_number().await.map_err(|e| EngineError::Unavailable {
                    source_id: chain.to_string(),
                    message: "Failed to get block number".to_string(),
                    source: Some(e.into()),
                })
            },
            &RetryConfig {
                max_attempts: 5,
                initial_delay_ms: 500,
                max_delay_ms: 10000,
                exponential_base: 2.0,
            },
            &format!("{} connection", chain),
        ).await?;

        info!("✅ Connected to {} at block {}", chain, block);
        Ok(Self { chain, provider })
    }

    fn check_chain(&self, chain: ChainId) -> EngineResult<()> {
        if chain != self.chain {
            return Err(EngineError::unavailable(
                chain.to_string(),
                format!("RPC client is bound to {}", self.chain),
            ));
        }
        Ok(())
    }

    fn rpc_error(&self, e: impl std::fmt::Display) -> EngineError {
        EngineError::Unavailable {
            source_id: self.chain.to_string(),
            message: "RPC call failed".to_string(),
            source: Some(anyhow::anyhow!("{}", e)),
        }
    }

    async fn block_with_receipts(&self, number: u64) -> EngineResult<(Value, HashMap<String, u64>)> {
        let tag = format!("0x{:x}", number);
        let block: Value = self
            .provider
            .raw_request("eth_getBlockByNumber".into(), (tag.clone(), true))
            .await
            .map_err(|e| self.rpc_error(e))?;

        let receipts: Value = match self
            .provider
            .raw_request("eth_getBlockReceipts".into(), (tag,))
            .await
        {
            Ok(receipts) => receipts,
            Err(e) => {
                warn!(chain = %self.chain, block = number, error = %e, "Receipts unavailable, gas used unknown for block");
                Value::Null
            }
        };

        let gas_used = receipts
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|r| {
                        let hash = r["transactionHash"].as_str()?.to_lowercase();
                        let used = hex_u128(&r["gasUsed"])? as u64;
                        Some((hash, used))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok((block, gas_used))
    }
}

/// Converts one `eth_getBlockByNumber` transaction object. Records that
/// cannot be parsed yield `None`.
pub fn parse_rpc_transaction(
    chain: ChainId,
    tx: &Value,
    block_number: u64,
    timestamp: DateTime<Utc>,
    gas_used: &HashMap<String, u64>,
) -> Option<TransactionRecord> {
    let hash_str = tx["hash"].as_str()?;
    let hash = B256::from_str(hash_str).ok()?;
    let from = Address::from_str(tx["from"].as_str()?).ok()?;
    let to = tx["to"].as_str().and_then(|s| Address::from_str(s).ok());
    let value = wei_to_decimal(hex_u128(&tx["value"])?, dec!(1_000_000_000_000_000_000))?;
    let gas_price_wei = hex_u128(&tx["gasPrice"]).or_else(|| hex_u128(&tx["maxFeePerGas"]))?;
    let gas_price_gwei = wei_to_decimal(gas_price_wei, dec!(1_000_000_000))?;
    let gas_limit = hex_u128(&tx["gas"])? as u64;
    let tx_index = hex_u128(&tx["transactionIndex"]).unwrap_or(0) as u32;

    Some(TransactionRecord {
        chain,
        hash,
        from,
        to,
        value,
        gas_price_gwei,
        gas_used: gas_used.get(&hash_str.to_lowercase()).copied(),
        gas_limit,
        block_number,
        tx_index,
        timestamp,
    })
}

#[async_trait]
impl TransactionSource for RpcChainClient {
    async fn latest_block(&self, chain: ChainId) -> EngineResult<u64> {
        self.check_chain(chain)?;
        self.provider.get_block_number().await.map_err(|e| self.rpc_error(e))
    }

    async fn fetch_recent_transactions(
        &self,
        chain: ChainId,
        range: BlockRange,
    ) -> EngineResult<Vec<TransactionRecord>> {
        self.check_chain(chain)?;
        let mut records = Vec::new();

        for number in range.from..=range.to {
            let (block, gas_used) = self.block_with_receipts(number).await?;
            if block.is_null() {
                debug!("Block {} not available yet on {}", number, chain);
                continue;
            }
            let timestamp = hex_u128(&block["timestamp"])
                .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
                .unwrap_or_else(Utc::now);

            let txs = block["transactions"].as_array().cloned().unwrap_or_default();
            for tx in &txs {
                match parse_rpc_transaction(chain, tx, number, timestamp, &gas_used) {
                    Some(record) => records.push(record),
                    None => warn!(
                        block = number,
                        hash = tx["hash"].as_str().unwrap_or("?"),
                        "Skipping unparseable transaction"
                    ),
                }
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl MarketDataProvider for RpcChainClient {
    async fn token_price(&self, chain: ChainId, token: &str) -> EngineResult<Decimal> {
        Err(EngineError::unavailable(
            chain.to_string(),
            format!("RPC client does not quote {}", token),
        ))
    }

    async fn gas_price_gwei(&self, chain: ChainId) -> EngineResult<Decimal> {
        self.check_chain(chain)?;
        let wei = self.provider.get_gas_price().await.map_err(|e| self.rpc_error(e))?;
        wei_to_decimal(wei, dec!(1_000_000_000)).ok_or_else(|| EngineError::DataParsing {
            context: "gas price".to_string(),
            source: anyhow::anyhow!("gas price {} out of range", wei),
        })
    }

    async fn native_price_usd(&self, chain: ChainId) -> EngineResult<Decimal> {
        Err(EngineError::unavailable(chain.to_string(), "RPC client has no USD prices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_decimal_accepts_strings_and_numbers() {
        assert_eq!(json_decimal(&json!("101.5")), Some(dec!(101.5)));
        assert_eq!(json_decimal(&json!(42)), Some(dec!(42)));
        assert_eq!(json_decimal(&json!(null)), None);
    }

    #[test]
    fn parses_rpc_transaction_object() {
        let tx = json!({
            "hash": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x00000000000000000000000000000000000000bb",
            "value": "0xde0b6b3a7640000",
            "gasPrice": "0x174876e800",
            "gas": "0x5208",
            "transactionIndex": "0x3"
        });
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let receipts = HashMap::from([(
            "0x0101010101010101010101010101010101010101010101010101010101010101".to_string(),
            21_000u64,
        )]);
        let record = parse_rpc_transaction(ChainId::ETHEREUM, &tx, 10, ts, &receipts).unwrap();

        assert_eq!(record.value, dec!(1));
        assert_eq!(record.gas_price_gwei, dec!(100));
        assert_eq!(record.gas_limit, 21_000);
        assert_eq!(record.gas_used, Some(21_000));
        assert_eq!(record.tx_index, 3);

        // No receipt: gas used stays unknown instead of borrowing the limit.
        let blind = parse_rpc_transaction(ChainId::ETHEREUM, &tx, 10, ts, &HashMap::new()).unwrap();
        assert_eq!(blind.gas_used, None);
        assert!(!blind.used_at_least(21_000));
    }

    #[test]
    fn unparseable_transaction_is_rejected() {
        let tx = json!({ "hash": "0xnothex", "from": "0x00000000000000000000000000000000000000aa" });
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(parse_rpc_transaction(ChainId::ETHEREUM, &tx, 10, ts, &HashMap::new()).is_none());
    }

    #[tokio::test]
    async fn http_venue_reads_price_and_liquidity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/quote/WETH/USDC")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": "2500.5", "liquidity": 1200000}"#)
            .create_async()
            .await;

        let client = HttpVenueClient::new(
            "mock-dex",
            format!("{}/quote/{{base}}/{{quote}}", server.url()),
            25,
            Duration::from_secs(2),
        ).unwrap();
        let quote = client.fetch_quote(&TokenPair::new("weth", "usdc")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(quote.venue_id, "mock-dex");
        assert_eq!(quote.price, dec!(2500.5));
        assert_eq!(quote.liquidity, dec!(1200000));
        assert_eq!(quote.fee_bps, 25);
    }

    #[tokio::test]
    async fn http_venue_error_status_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/quote/WETH/USDC")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpVenueClient::new(
            "down-dex",
            format!("{}/quote/{{base}}/{{quote}}", server.url()),
            30,
            Duration::from_secs(2),
        ).unwrap();
        let err = client.fetch_quote(&TokenPair::new("WETH", "USDC")).await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }));
    }
}
