//! Per-source circuit breaker

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

/// Trips after `max_consecutive_errors` failures and stays open for the
/// cooldown, measured on the caller-supplied clock.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    pub consecutive_errors: u32,
    pub is_open: bool,
    pub last_error_time: Option<DateTime<Utc>>,
    pub max_consecutive_errors: u32,
    pub cooldown_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(max_consecutive_errors: u32, cooldown_secs: u64) -> Self {
        Self {
            consecutive_errors: 0,
            is_open: false,
            last_error_time: None,
            max_consecutive_errors: max_consecutive_errors.max(1),
            cooldown_duration: Duration::seconds(cooldown_secs as i64),
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.is_open = false;
    }

    /// Returns true when this error opened the breaker.
    pub fn record_error(&mut self, now: DateTime<Utc>, name: &str) -> bool {
        self.consecutive_errors += 1;
        self.last_error_time = Some(now);

        if !self.is_open && self.consecutive_errors >= self.max_consecutive_errors {
            self.is_open = true;
            error!("Circuit breaker OPEN for {} after {} consecutive errors", name, self.consecutive_errors);
            return true;
        }
        false
    }

    pub fn can_proceed(&mut self, now: DateTime<Utc>, name: &str) -> bool {
        if !self.is_open {
            return true;
        }

        if let Some(last_error) = self.last_error_time {
            if now - last_error >= self.cooldown_duration {
                info!("Circuit breaker cooldown complete for {}, resetting", name);
                self.is_open = false;
                self.consecutive_errors = 0;
                return true;
            }
        }
        false
    }
}
