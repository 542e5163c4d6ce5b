//! MEV Arb Scout - multi-venue arbitrage detection and MEV risk scoring
//!
//! Fuses venue quotes into ranked, cost-adjusted arbitrage opportunities,
//! scans recent blocks for sandwich, frontrun, backrun and JIT-liquidity
//! patterns, and recommends an execution protection strategy. Recommendations
//! only; nothing here signs or submits transactions.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod aggregator;
pub mod arbitrage;
pub mod cache;
pub mod mev;
pub mod protection;
pub mod cross_chain;
pub mod validation;
pub mod engine;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use engine::{Engine, EngineDeps};
pub use errors::{EngineError, EngineResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
