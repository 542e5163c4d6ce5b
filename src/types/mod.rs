//! Core data types and structures

pub mod quotes;
pub mod arbitrage;
pub mod transactions;
pub mod patterns;
pub mod protection;
pub mod cross_chain;
pub mod health;
pub mod validation;

pub use quotes::*;
pub use arbitrage::*;
pub use transactions::*;
pub use patterns::*;
pub use protection::*;
pub use cross_chain::*;
pub use health::*;
pub use validation::*;
