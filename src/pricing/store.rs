//! Config store backends

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::config::PricingConfigRow;
use crate::common::errors::{OddsError, Result};
use crate::common::traits::ConfigStore;

/// Process-local config store, for tests and database-less deployments
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    row: RwLock<Option<PricingConfigRow>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored row
    pub async fn set(&self, row: PricingConfigRow) {
        *self.row.write().await = Some(row);
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load_latest(&self) -> Result<Option<PricingConfigRow>> {
        Ok(self.row.read().await.clone())
    }
}

/// PostgreSQL config store over the `pricing_config` table
#[derive(Debug, Clone)]
pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn load_latest(&self) -> Result<Option<PricingConfigRow>> {
        sqlx::query_as::<_, PricingConfigRow>(
            r#"
            SELECT side_cap_ratio, other_floor_ratio, min_pool_ratio, min_absolute_pool,
                   impact_fee_coefficient, impact_min_pool, impact_max_multiplier,
                   min_odds, max_odds, default_odds
            FROM pricing_config
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OddsError::ConfigStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryConfigStore::new();
        assert!(store.load_latest().await.unwrap().is_none());

        let row = PricingConfigRow {
            max_odds: Some(12.0),
            ..PricingConfigRow::default()
        };
        store.set(row.clone()).await;
        assert_eq!(store.load_latest().await.unwrap(), Some(row));
    }
}
