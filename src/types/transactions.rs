//! Observed chain transaction records

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::ChainId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub chain: ChainId,
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    /// Value in native token units.
    pub value: Decimal,
    pub gas_price_gwei: Decimal,
    /// From the receipt; `None` when the node returned none.
    pub gas_used: Option<u64>,
    pub gas_limit: u64,
    pub block_number: u64,
    pub tx_index: u32,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Returns a description of the first structural problem, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.gas_price_gwei <= Decimal::ZERO {
            return Err(format!("non-positive gas price {}", self.gas_price_gwei));
        }
        if self.gas_limit == 0 {
            return Err("zero gas limit".to_string());
        }
        if let Some(used) = self.gas_used.filter(|used| *used > self.gas_limit) {
            return Err(format!("gas used {} exceeds gas limit {}", used, self.gas_limit));
        }
        if self.value < Decimal::ZERO {
            return Err(format!("negative value {}", self.value));
        }
        Ok(())
    }

    /// False when gas used is unknown.
    pub fn used_at_least(&self, gas: u64) -> bool {
        self.gas_used.is_some_and(|used| used >= gas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    /// The `window` most recent blocks ending at `head`, inclusive.
    pub fn trailing(head: u64, window: u64) -> Self {
        let window = window.max(1);
        Self {
            from: head.saturating_sub(window - 1),
            to: head,
        }
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.from && block <= self.to
    }

    pub fn len(&self) -> u64 {
        self.to.saturating_sub(self.from) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}
