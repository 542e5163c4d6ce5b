//! MEV attack detection

pub mod registry;
pub mod activity;
pub mod buffer;
pub mod detector;
pub mod monitor;

pub use registry::*;
pub use activity::*;
pub use buffer::*;
pub use detector::*;
pub use monitor::*;
