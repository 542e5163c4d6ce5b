//! Short-lived caching of derived results

pub mod result_cache;

pub use result_cache::*;
