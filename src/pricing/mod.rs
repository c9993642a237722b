//! Odds pricing
//!
//! - [`PricingEngine`]: pure odds and slippage functions
//! - [`PricingConfig`]: tunable parameters with built-in defaults
//! - [`ConfigProvider`]: TTL cache over a persisted [`ConfigStore`](crate::common::traits::ConfigStore)

mod config;
mod engine;
mod provider;
mod store;

pub use config::{PricingConfig, PricingConfigRow};
pub use engine::{ImpactAdjustedStake, PricingEngine};
pub use provider::ConfigProvider;
pub use store::{InMemoryConfigStore, PgConfigStore};
