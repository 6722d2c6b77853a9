use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const HEARTBEAT_INTERVAL_MS: u64 = 15_000; // ping cadence per subscriber
pub const MAX_BODY_BYTES: usize = 1024 * 1024; // 1 MB cap on publish bodies
pub const DEFAULT_SINK_CAPACITY: usize = 1024; // frames queued per subscriber before it is dropped

/// Top-level config (livefeed.toml + LIVEFEED_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivefeedConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted `/ingest` body. Larger requests get a 413.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            body_limit_bytes: MAX_BODY_BYTES,
        }
    }
}

/// Broadcast hub tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Period between `ping` frames on every open stream.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Bounded queue length per subscriber. A subscriber whose queue is full
    /// when a frame is written is treated as gone and disconnected, so this
    /// is also the largest publish burst a reader may fall behind by.
    /// Queued frames share one encoded buffer per publish.
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
}

impl HubConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_body_limit() -> usize {
    MAX_BODY_BYTES
}
fn default_heartbeat_interval_ms() -> u64 {
    HEARTBEAT_INTERVAL_MS
}
fn default_sink_capacity() -> usize {
    DEFAULT_SINK_CAPACITY
}

impl LivefeedConfig {
    /// Load config layered over the built-in defaults.
    ///
    /// Layers, later wins:
    ///   1. Defaults
    ///   2. TOML file: explicit path argument, else ~/.livefeed/livefeed.toml
    ///   3. LIVEFEED_* env vars, `__` between sections (LIVEFEED_HUB__SINK_CAPACITY)
    ///   4. Bare `PORT` env var, as set by most hosting platforms
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        if Path::new(&path).is_file() {
            debug!(path = %path, "reading config file");
        } else {
            debug!(path = %path, "no config file, using defaults and env");
        }

        let config: Self = Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::LivefeedError::Config(e.to_string()))?;
        info!(
            bind = %config.gateway.bind,
            port = config.gateway.port,
            heartbeat_ms = config.hub.heartbeat_interval_ms,
            sink_capacity = config.hub.sink_capacity,
            "config loaded"
        );
        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(LivefeedConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LIVEFEED_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "gateway.port".into()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.livefeed/livefeed.toml", home)
}
