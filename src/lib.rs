//! odds_stream Library
//!
//! Odds pricing for binary prediction markets, a durable per-market
//! sequence log of odds snapshots, and a resumable server-sent event
//! stream that delivers every update to every viewer exactly once and in
//! order, across reconnects.

pub mod broadcast;
pub mod common;
pub mod config;
pub mod market;
pub mod pricing;
pub mod sequence;
pub mod server;
pub mod stream;

// Re-export commonly used types
pub use broadcast::{EventBroker, Subscription};
pub use common::errors::{OddsError, Result};
pub use common::types::{MarketOdds, NewOddsSnapshot, OddsSnapshot, OddsUpdate, Side, TradeImpact};
pub use config::types::AppConfig;
pub use market::{MarketBook, OddsPublisher, PublishedOdds, TradeRequest};
pub use pricing::{ConfigProvider, PricingConfig, PricingEngine};
pub use sequence::SequenceLog;
pub use server::AppState;
pub use stream::{Frame, StreamHandler};
