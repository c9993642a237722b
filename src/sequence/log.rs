use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::common::errors::Result;
use crate::common::traits::SequenceStore;
use crate::common::types::{NewOddsSnapshot, OddsSnapshot};

/// Append-only, per-market log of odds snapshots
///
/// Wraps a [`SequenceStore`] with the contract the pricing path and the
/// stream handler rely on: writes never fail the caller, reads are bounded.
#[derive(Clone)]
pub struct SequenceLog {
    store: Arc<dyn SequenceStore>,
    page_size: i64,
}

impl SequenceLog {
    /// Default maximum rows per `since` call
    pub const DEFAULT_PAGE_SIZE: i64 = 100;

    pub fn new(store: Arc<dyn SequenceStore>) -> Self {
        Self::with_page_size(store, Self::DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<dyn SequenceStore>, page_size: i64) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Append one snapshot and return it with its minted id
    ///
    /// A persistence failure is logged and reported as `None`; it never
    /// aborts the bet-processing flow that triggered the repricing.
    #[instrument(skip(self, snapshot), fields(market_id = %snapshot.market_id))]
    pub async fn record(&self, snapshot: NewOddsSnapshot) -> Option<OddsSnapshot> {
        match self.store.insert(&snapshot).await {
            Ok(row) => {
                debug!(sequence_id = row.sequence_id, "Recorded odds snapshot");
                Some(row)
            }
            Err(e) => {
                error!("Failed to record odds snapshot: {}", e);
                None
            }
        }
    }

    /// Rows with `id > after_id`, ascending, at most one page
    pub async fn since(&self, market_id: &str, after_id: i64) -> Result<Vec<OddsSnapshot>> {
        self.store
            .range_after(market_id, after_id, self.page_size)
            .await
    }

    /// Most recent row for a market
    pub async fn latest(&self, market_id: &str) -> Result<Option<OddsSnapshot>> {
        self.store.latest(market_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::OddsError;
    use crate::common::traits::MockSequenceStore;
    use crate::common::types::MarketOdds;
    use crate::sequence::InMemorySequenceStore;

    fn pending(market_id: &str) -> NewOddsSnapshot {
        NewOddsSnapshot::new(
            market_id,
            MarketOdds {
                yes_odds: 1.8,
                no_odds: 2.25,
                yes_pool: 500.0,
                no_pool: 400.0,
                total_pool: 900.0,
            },
        )
    }

    #[tokio::test]
    async fn test_record_failure_returns_none() {
        let mut store = MockSequenceStore::new();
        store
            .expect_insert()
            .returning(|_| Err(OddsError::Persistence("disk full".to_string())));

        let log = SequenceLog::new(Arc::new(store));
        assert!(log.record(pending("m")).await.is_none());
    }

    #[tokio::test]
    async fn test_since_passes_page_size() {
        let mut store = MockSequenceStore::new();
        store
            .expect_range_after()
            .withf(|market_id, after_id, limit| market_id == "m" && *after_id == 41 && *limit == 25)
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        let log = SequenceLog::with_page_size(Arc::new(store), 25);
        assert!(log.since("m", 41).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_since_never_returns_ids_at_or_below_cursor() {
        let log = SequenceLog::new(Arc::new(InMemorySequenceStore::new()));
        for _ in 0..250 {
            log.record(pending("m")).await.unwrap();
        }

        let page = log.since("m", 120).await.unwrap();
        assert_eq!(page.len(), 100);
        assert!(page.iter().all(|row| row.sequence_id > 120));
        assert!(page.windows(2).all(|w| w[0].sequence_id < w[1].sequence_id));
        assert_eq!(page[0].sequence_id, 121);
    }
}
