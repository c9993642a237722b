//! Market pool state and the repricing pipeline

mod book;
mod publisher;

pub use book::{MarketBook, Pools};
pub use publisher::{OddsPublisher, PublishedOdds, TradeRequest};
