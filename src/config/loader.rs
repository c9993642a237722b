//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{OddsError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP__, e.g. `APP__SERVER__PORT`)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Pick up a .env file before reading the environment
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| OddsError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| OddsError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Some("/nonexistent/odds_stream.toml")).unwrap();
        assert_eq!(config.stream.backfill_page_size, 100);
        assert_eq!(config.pricing.cache_ttl_seconds, 30);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = std::env::temp_dir().join(format!("odds_stream_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[stream]\nkeep_alive_seconds = 5\n\n[pricing]\ncache_ttl_seconds = 60\n"
        )
        .unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.stream.keep_alive_seconds, 5);
        assert_eq!(config.stream.retry_ms, 3000);
        assert_eq!(config.pricing.cache_ttl_seconds, 60);

        std::fs::remove_dir_all(&dir).ok();
    }
}
