//! Trait definitions for the persisted stores and collaborators

use async_trait::async_trait;

use super::errors::Result;
use super::types::{MarketOdds, NewOddsSnapshot, OddsSnapshot};
use crate::pricing::PricingConfigRow;

/// Persisted single-row store of pricing parameters
///
/// Implementations return the most recently updated row, or `None` when
/// the table is empty. Field validation is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the most recently updated config row
    async fn load_latest(&self) -> Result<Option<PricingConfigRow>>;
}

/// Append-only store of odds snapshots keyed by market and ascending id
///
/// Rows are immutable once inserted. Ids are minted by the store and are
/// strictly increasing in write order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Append one snapshot and return the persisted row with its id
    async fn insert(&self, snapshot: &NewOddsSnapshot) -> Result<OddsSnapshot>;

    /// Rows of `market_id` with `id > after_id`, ascending, at most `limit`
    async fn range_after(
        &self,
        market_id: &str,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<OddsSnapshot>>;

    /// The row with the highest id for `market_id`
    async fn latest(&self, market_id: &str) -> Result<Option<OddsSnapshot>>;
}

/// The Market Service's view of a market's live pool state
///
/// Only consulted for markets that have no sequence history yet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketOddsSource: Send + Sync {
    /// Current odds and pools for a market
    async fn current_odds(&self, market_id: &str) -> Result<MarketOdds>;
}
