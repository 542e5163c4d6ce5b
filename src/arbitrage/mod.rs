//! Arbitrage scoring: cost model, risk classification and ranking

pub mod calculator;
pub mod risk;
pub mod scorer;

pub use calculator::*;
pub use risk::*;
pub use scorer::*;
