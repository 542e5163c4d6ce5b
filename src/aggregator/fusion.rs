//! Quote fusion into a single aggregated view

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::{
    errors::{EngineError, EngineResult},
    types::{AggregatedQuote, Quote, TokenPair},
    utils::spread_pct,
};

pub const MIN_ARBITRAGE_VENUES: usize = 2;

/// Liquidity-weighted mean when any liquidity is quoted, arithmetic mean
/// otherwise. Zero for no quotes.
pub fn weighted_price(quotes: &[Quote]) -> Decimal {
    if quotes.is_empty() {
        return Decimal::ZERO;
    }
    let total_liquidity: Decimal = quotes.iter().map(|q| q.liquidity).sum();
    if total_liquidity > Decimal::ZERO {
        quotes.iter().map(|q| q.price * q.liquidity).sum::<Decimal>() / total_liquidity
    } else {
        quotes.iter().map(|q| q.price).sum::<Decimal>() / Decimal::from(quotes.len())
    }
}

pub fn aggregate_quotes(
    pair: &TokenPair,
    mut quotes: Vec<Quote>,
    failed_venues: Vec<String>,
    now: DateTime<Utc>,
) -> AggregatedQuote {
    // Venue id breaks price ties so the order never depends on arrival.
    quotes.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.venue_id.cmp(&b.venue_id)));

    let best_ask = quotes.first().cloned();
    let best_bid = quotes.last().cloned();
    let spread = match (&best_ask, &best_bid) {
        (Some(low), Some(high)) => spread_pct(low.price, high.price),
        _ => Decimal::ZERO,
    };

    AggregatedQuote {
        pair: pair.clone(),
        weighted_price: weighted_price(&quotes),
        spread_pct: spread,
        is_arbitrageable: quotes.len() >= MIN_ARBITRAGE_VENUES,
        quotes,
        best_bid,
        best_ask,
        failed_venues,
        computed_at: now,
    }
}

/// `InsufficientData` unless the aggregate carries enough venues to trade.
pub fn require_arbitrageable(aggregate: &AggregatedQuote) -> EngineResult<()> {
    if aggregate.is_arbitrageable {
        return Ok(());
    }
    Err(EngineError::InsufficientData {
        context: format!("aggregate {}", aggregate.pair),
        available: aggregate.quotes.len(),
        required: MIN_ARBITRAGE_VENUES,
    })
}
