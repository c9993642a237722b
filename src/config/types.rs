//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration (optional, in-memory stores when absent)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Stream protocol tuning
    #[serde(default)]
    pub stream: StreamSettings,
    /// Pricing config cache tuning
    #[serde(default)]
    pub pricing: PricingSettings,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration for the sequence log and config store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    /// Run bundled migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_run_migrations() -> bool {
    true
}

/// Per-connection stream protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Reconnect backoff hint sent to clients, in milliseconds
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
    /// Interval between keep-alive comment frames, in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
    /// Maximum rows returned by one backfill read
    #[serde(default = "default_backfill_page_size")]
    pub backfill_page_size: i64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            retry_ms: default_retry_ms(),
            keep_alive_seconds: default_keep_alive(),
            backfill_page_size: default_backfill_page_size(),
        }
    }
}

impl StreamSettings {
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds.max(1))
    }
}

fn default_retry_ms() -> u64 {
    3000
}

fn default_keep_alive() -> u64 {
    15
}

fn default_backfill_page_size() -> i64 {
    100
}

/// Pricing config cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// How long a loaded pricing config stays fresh, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl PricingSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn default_cache_ttl() -> u64 {
    30
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
