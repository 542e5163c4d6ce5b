//! Validation functions for quotes and opportunities

pub mod price;
pub mod opportunity;

pub use price::*;
pub use opportunity::*;
