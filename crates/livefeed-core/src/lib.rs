pub mod config;
pub mod error;

pub use config::{GatewayConfig, HubConfig, LivefeedConfig};
pub use error::{LivefeedError, Result};
