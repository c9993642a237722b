//! Error types for the odds engine

use thiserror::Error;

/// Result type alias using our OddsError
pub type Result<T> = std::result::Result<T, OddsError>;

/// Main error type for pricing, persistence and streaming operations
#[derive(Error, Debug)]
pub enum OddsError {
    /// Configuration errors (app config file, env vars)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The persisted pricing config could not be loaded
    #[error("Config store error: {0}")]
    ConfigStore(String),

    /// A snapshot could not be written to or read from the sequence store
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Market not found
    #[error("Market not found: {0}")]
    MarketNotFound(String),

    /// Database driver errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stream frame could not be turned into an event
    #[error("Event encoding error: {0}")]
    EventEncoding(#[from] axum::Error),

    /// Socket and listener errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for OddsError {
    fn from(err: config::ConfigError) -> Self {
        OddsError::Configuration(err.to_string())
    }
}
