//! PostgreSQL sequence store.
//!
//! Rows live in `odds_sequence`; the `BIGSERIAL` id is the sequence id.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::errors::{OddsError, Result};
use crate::common::traits::SequenceStore;
use crate::common::types::{NewOddsSnapshot, OddsSnapshot};

/// Repository for odds snapshot rows.
#[derive(Debug, Clone)]
pub struct PgSequenceStore {
    pool: PgPool,
}

impl PgSequenceStore {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceStore for PgSequenceStore {
    async fn insert(&self, snapshot: &NewOddsSnapshot) -> Result<OddsSnapshot> {
        sqlx::query_as::<_, OddsSnapshot>(
            r#"
            INSERT INTO odds_sequence
                (market_id, yes_odds, no_odds, yes_pool, no_pool, total_pool, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, market_id, yes_odds, no_odds, yes_pool, no_pool, total_pool, created_at
            "#,
        )
        .bind(&snapshot.market_id)
        .bind(snapshot.odds.yes_odds)
        .bind(snapshot.odds.no_odds)
        .bind(snapshot.odds.yes_pool)
        .bind(snapshot.odds.no_pool)
        .bind(snapshot.odds.total_pool)
        .bind(snapshot.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OddsError::Persistence(e.to_string()))
    }

    async fn range_after(
        &self,
        market_id: &str,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<OddsSnapshot>> {
        let rows = sqlx::query_as::<_, OddsSnapshot>(
            r#"
            SELECT id, market_id, yes_odds, no_odds, yes_pool, no_pool, total_pool, created_at
            FROM odds_sequence
            WHERE market_id = $1 AND id > $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(market_id)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn latest(&self, market_id: &str) -> Result<Option<OddsSnapshot>> {
        let row = sqlx::query_as::<_, OddsSnapshot>(
            r#"
            SELECT id, market_id, yes_odds, no_odds, yes_pool, no_pool, total_pool, created_at
            FROM odds_sequence
            WHERE market_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
