//! Venue quote and aggregated price types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenPair {
    pub base: String,
    pub quote: String,
}

impl TokenPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// Parses `BASE/QUOTE`.
    pub fn parse(s: &str) -> Option<Self> {
        let (base, quote) = s.split_once('/')?;
        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        Some(Self::new(base, quote))
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub venue_id: String,
    pub pair: TokenPair,
    pub price: Decimal,
    pub liquidity: Decimal,
    pub fee_bps: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedQuote {
    pub pair: TokenPair,
    /// Sorted ascending by price.
    pub quotes: Vec<Quote>,
    pub weighted_price: Decimal,
    pub spread_pct: Decimal,
    pub best_bid: Option<Quote>,
    pub best_ask: Option<Quote>,
    pub is_arbitrageable: bool,
    pub failed_venues: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl AggregatedQuote {
    pub fn total_liquidity(&self) -> Decimal {
        self.quotes.iter().map(|q| q.liquidity).sum()
    }

    pub fn venue_count(&self) -> usize {
        self.quotes.len()
    }

    pub fn quote_for(&self, venue_id: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.venue_id == venue_id)
    }
}
