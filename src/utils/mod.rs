//! Utility functions and helpers

pub mod math;
pub mod clock;
pub mod logging;
pub mod display;

pub use math::*;
pub use clock::*;
pub use logging::*;
pub use display::*;
