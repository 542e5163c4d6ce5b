//! Cross-chain opportunity matching

pub mod matcher;

pub use matcher::*;
