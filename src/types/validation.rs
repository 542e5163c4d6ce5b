//! Validation result types

use serde::Serialize;

#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationResult {
    pub not_expired: bool,
    pub venues_present: bool,
    pub prices_within_tolerance: bool,
    pub spread_still_positive: bool,
    pub all_passed: bool,
    pub warnings: Vec<String>,
}
