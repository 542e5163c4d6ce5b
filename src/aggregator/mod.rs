//! Multi-venue price aggregation

pub mod fusion;
pub mod price_aggregator;

pub use fusion::*;
pub use price_aggregator::*;
