//! Periodic detection cycle over the configured chain

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use crate::{
    config::DetectorConfig,
    errors::{EngineError, EngineResult},
    mev::{ActivityBreakdown, ActorRegistry, PatternBuffer, TransactionPatternDetector},
    network::TransactionSource,
    types::{AttackPattern, BlockRange},
    utils::Clock,
};

#[derive(Debug, Clone)]
pub struct DetectionSummary {
    pub range: BlockRange,
    pub scanned: usize,
    pub skipped_malformed: usize,
    pub detected: usize,
    pub inserted: usize,
    pub activity_score: u8,
}

pub struct MevMonitor {
    detector: TransactionPatternDetector,
    source: Arc<dyn TransactionSource>,
    registry: Arc<dyn ActorRegistry>,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
    buffer: Mutex<PatternBuffer>,
    activity: RwLock<ActivityBreakdown>,
}

impl MevMonitor {
    pub fn new(
        config: DetectorConfig,
        source: Arc<dyn TransactionSource>,
        registry: Arc<dyn ActorRegistry>,
        clock: Arc<dyn Clock>,
        fetch_timeout: Duration,
    ) -> Self {
        let buffer = PatternBuffer::from_config(&config);
        Self {
            detector: TransactionPatternDetector::new(config),
            source,
            registry,
            clock,
            fetch_timeout,
            buffer: Mutex::new(buffer),
            activity: RwLock::new(ActivityBreakdown::default()),
        }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl std::future::Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        tokio::time::timeout(self.fetch_timeout, fut)
            .await
            .map_err(|_| EngineError::Timeout {
                source_id: format!("{} {}", self.detector.config().chain, what),
                elapsed: self.fetch_timeout,
            })?
    }

    /// Rescans the trailing window and merges new patterns into the buffer.
    pub async fn run_cycle(&self) -> EngineResult<DetectionSummary> {
        let config = self.detector.config();
        let chain = config.chain;

        let head = self.bounded("latest block", self.source.latest_block(chain)).await?;
        let range = BlockRange::trailing(head, config.window_blocks);
        let records = self
            .bounded("transactions", self.source.fetch_recent_transactions(chain, range))
            .await?;

        let known = self.registry.snapshot().await;
        let now = self.clock.now();
        let report = self.detector.scan(&records, range, &known, now);

        let detected = report.patterns.len();
        let inserted = self.buffer.lock().await.extend(report.patterns, now);
        let activity_score = report.activity.score;
        *self.activity.write().await = report.activity;

        if report.skipped_malformed > 0 {
            warn!(chain = %chain, skipped = report.skipped_malformed, "Malformed records skipped this cycle");
        }
        info!(
            chain = %chain,
            from_block = range.from,
            to_block = range.to,
            scanned = report.scanned,
            detected,
            inserted,
            activity_score,
            "Detection cycle complete"
        );

        Ok(DetectionSummary {
            range,
            scanned: report.scanned,
            skipped_malformed: report.skipped_malformed,
            detected,
            inserted,
            activity_score,
        })
    }

    /// Newest first, expired patterns excluded.
    pub async fn attack_patterns(&self, limit: usize) -> Vec<AttackPattern> {
        let mut buffer = self.buffer.lock().await;
        buffer.evict_expired(self.clock.now());
        buffer.recent(limit)
    }

    pub async fn recent_patterns(&self) -> Vec<AttackPattern> {
        let mut buffer = self.buffer.lock().await;
        buffer.evict_expired(self.clock.now());
        buffer.recent(buffer.len())
    }

    pub async fn activity(&self) -> ActivityBreakdown {
        self.activity.read().await.clone()
    }

    pub fn detector(&self) -> &TransactionPatternDetector {
        &self.detector
    }
}
