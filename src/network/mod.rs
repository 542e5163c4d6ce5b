//! External data sources and connection management

pub mod traits;
pub mod providers;
pub mod static_data;
pub mod retry;

pub use traits::*;
pub use providers::*;
pub use static_data::*;
pub use retry::*;
