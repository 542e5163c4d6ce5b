//! Engine health types

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VenueHealth {
    pub venue_id: String,
    pub consecutive_failures: u32,
    pub circuit_open: bool,
    pub last_success: Option<DateTime<Utc>>,
}
