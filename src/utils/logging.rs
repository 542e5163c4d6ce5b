//! Console and rolling JSON file logging

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparseable. Transport crates log every
/// request at debug and drown the detection output.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,alloy_transport_http=warn";

pub const LOG_FILE_PREFIX: &str = "mev-arb-scout.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// `RUST_LOG` wins when it parses; otherwise [`DEFAULT_LOG_FILTER`].
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub fn setup_logging(log_dir: impl AsRef<Path>) -> Result<Arc<LoggingGuard>> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::hourly(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_directives = std::env::var("RUST_LOG").ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(true)
                .compact()
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .json()
                .with_current_span(false)
        )
        .with(log_filter(env_directives.as_deref()))
        .try_init()?;

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directives_are_kept() {
        let filter = log_filter(Some("mev_arb_scout=debug")).to_string();
        assert!(filter.contains("mev_arb_scout=debug"), "{}", filter);
        assert!(!filter.contains("hyper"), "{}", filter);
    }

    #[test]
    fn missing_or_bad_directives_fall_back_to_default() {
        for directives in [None, Some("mev_arb_scout=loud")] {
            let filter = log_filter(directives).to_string();
            assert!(filter.contains("hyper=warn"), "{}", filter);
            assert!(filter.contains("info"), "{}", filter);
        }
    }
}
