//! Engine composition root and schedules

pub mod service;

pub use service::*;
