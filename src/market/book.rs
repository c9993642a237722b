use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::common::errors::{OddsError, Result};
use crate::common::traits::MarketOddsSource;
use crate::common::types::{MarketOdds, Side};
use crate::pricing::{ConfigProvider, PricingEngine};

/// Current pool sizes of one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pools {
    pub yes_pool: f64,
    pub no_pool: f64,
}

impl Pools {
    pub fn new(yes_pool: f64, no_pool: f64) -> Self {
        Self { yes_pool, no_pool }
    }

    pub fn side(&self, side: Side) -> f64 {
        match side {
            Side::Yes => self.yes_pool,
            Side::No => self.no_pool,
        }
    }
}

/// In-process record of each market's live pools
///
/// Stands in for the Market Service: fed by the pool-ingest path and read
/// when a stream needs odds for a market with no sequence history.
pub struct MarketBook {
    pools: DashMap<String, Pools>,
    provider: Arc<ConfigProvider>,
}

impl MarketBook {
    pub fn new(provider: Arc<ConfigProvider>) -> Self {
        Self {
            pools: DashMap::new(),
            provider,
        }
    }

    /// Store new pools, returning the previous ones if the market was known
    pub fn set_pools(&self, market_id: &str, pools: Pools) -> Option<Pools> {
        self.pools.insert(market_id.to_string(), pools)
    }

    pub fn pools(&self, market_id: &str) -> Option<Pools> {
        self.pools.get(market_id).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[async_trait]
impl MarketOddsSource for MarketBook {
    async fn current_odds(&self, market_id: &str) -> Result<MarketOdds> {
        let pools = self
            .pools(market_id)
            .ok_or_else(|| OddsError::MarketNotFound(market_id.to_string()))?;
        let config = self.provider.get(false).await;
        Ok(PricingEngine::compute_market_odds(
            pools.yes_pool,
            pools.no_pool,
            &config,
        ))
    }
}
