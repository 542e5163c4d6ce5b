//! Concurrent multi-venue quote polling

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use crate::{
    aggregator::aggregate_quotes,
    config::PollingConfig,
    errors::{CircuitBreaker, EngineError, EngineResult},
    network::VenueClient,
    types::{AggregatedQuote, Quote, TokenPair, VenueHealth},
    utils::Clock,
    validation::validate_quote,
};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

struct VenueState {
    breaker: CircuitBreaker,
    last_success: Option<chrono::DateTime<chrono::Utc>>,
}

pub struct PriceAggregator {
    venues: Vec<Arc<dyn VenueClient>>,
    clock: Arc<dyn Clock>,
    venue_timeout: Duration,
    venue_state: Mutex<HashMap<String, VenueState>>,
    latest: RwLock<HashMap<TokenPair, AggregatedQuote>>,
    updates: broadcast::Sender<AggregatedQuote>,
}

impl PriceAggregator {
    pub fn new(venues: Vec<Arc<dyn VenueClient>>, clock: Arc<dyn Clock>, polling: &PollingConfig) -> Self {
        let venue_state = venues
            .iter()
            .map(|v| {
                (
                    v.venue_id().to_string(),
                    VenueState {
                        breaker: CircuitBreaker::new(
                            polling.max_consecutive_failures,
                            polling.circuit_breaker_cooldown_secs,
                        ),
                        last_success: None,
                    },
                )
            })
            .collect();
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            venues,
            clock,
            venue_timeout: Duration::from_millis(polling.venue_timeout_ms),
            venue_state: Mutex::new(venue_state),
            latest: RwLock::new(HashMap::new()),
            updates,
        }
    }

    pub fn venue_count(&self) -> usize {
        self.venues.len()
    }

    /// Receives every aggregate published by [`poll`](Self::poll).
    pub fn subscribe(&self) -> broadcast::Receiver<AggregatedQuote> {
        self.updates.subscribe()
    }

    pub async fn latest(&self, pair: &TokenPair) -> Option<AggregatedQuote> {
        self.latest.read().await.get(pair).cloned()
    }

    pub async fn latest_all(&self) -> Vec<AggregatedQuote> {
        let mut all: Vec<AggregatedQuote> = self.latest.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.pair.cmp(&b.pair));
        all
    }

    async fn fetch_one(&self, venue: Arc<dyn VenueClient>, pair: &TokenPair) -> (String, EngineResult<Quote>) {
        let venue_id = venue.venue_id().to_string();
        let result = match tokio::time::timeout(self.venue_timeout, venue.fetch_quote(pair)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                source_id: venue_id.clone(),
                elapsed: self.venue_timeout,
            }),
        };
        (venue_id, result)
    }

    /// Runs one poll cycle for `pair`. Venue failures are excluded from the
    /// cycle; the returned aggregate replaces the previous one wholesale.
    pub async fn poll(&self, pair: &TokenPair) -> AggregatedQuote {
        let now = self.clock.now();

        let eligible: Vec<Arc<dyn VenueClient>> = {
            let mut state = self.venue_state.lock().await;
            self.venues
                .iter()
                .filter(|v| {
                    state
                        .get_mut(v.venue_id())
                        .map(|s| s.breaker.can_proceed(now, v.venue_id()))
                        .unwrap_or(true)
                })
                .cloned()
                .collect()
        };

        let skipped = self.venues.len() - eligible.len();
        if skipped > 0 {
            debug!(pair = %pair, skipped, "Skipping venues with open circuit breaker");
        }

        let results = join_all(eligible.into_iter().map(|venue| self.fetch_one(venue, pair))).await;

        let mut quotes = Vec::new();
        let mut failed = Vec::new();
        {
            let mut state = self.venue_state.lock().await;
            for (venue_id, result) in results {
                let checked = result.and_then(|quote| {
                    validate_quote(&quote, pair)
                        .map(|_| quote)
                        .map_err(|e| EngineError::DataParsing {
                            context: format!("quote from {}", venue_id),
                            source: e,
                        })
                });
                let entry = state.get_mut(&venue_id);
                match checked {
                    Ok(quote) => {
                        if let Some(s) = entry {
                            s.breaker.record_success();
                            s.last_success = Some(now);
                        }
                        quotes.push(quote);
                    }
                    Err(e) => {
                        warn!(venue = %venue_id, pair = %pair, error = %e, "Venue excluded from cycle");
                        if let Some(s) = entry {
                            s.breaker.record_error(now, &venue_id);
                        }
                        failed.push(venue_id);
                    }
                }
            }
        }
        failed.sort();

        let aggregate = aggregate_quotes(pair, quotes, failed, now);
        if aggregate.is_arbitrageable {
            debug!(
                pair = %pair,
                venues = aggregate.venue_count(),
                spread_pct = %aggregate.spread_pct.round_dp(4),
                "Aggregated quotes"
            );
        } else {
            info!(pair = %pair, venues = aggregate.venue_count(), "Not enough quotes to arbitrage this cycle");
        }

        self.latest.write().await.insert(pair.clone(), aggregate.clone());
        // No subscribers is not an error.
        let _ = self.updates.send(aggregate.clone());
        aggregate
    }

    /// Pairs are polled one after another so each venue has at most one
    /// request in flight.
    pub async fn poll_all(&self, pairs: &[TokenPair]) -> Vec<AggregatedQuote> {
        let mut aggregates = Vec::with_capacity(pairs.len());
        for pair in pairs {
            aggregates.push(self.poll(pair).await);
        }
        aggregates
    }

    pub async fn venue_health(&self) -> Vec<VenueHealth> {
        let state = self.venue_state.lock().await;
        let mut health: Vec<VenueHealth> = state
            .iter()
            .map(|(id, s)| VenueHealth {
                venue_id: id.clone(),
                consecutive_failures: s.breaker.consecutive_errors,
                circuit_open: s.breaker.is_open,
                last_success: s.last_success,
            })
            .collect();
        health.sort_by(|a, b| a.venue_id.cmp(&b.venue_id));
        health
    }
}
