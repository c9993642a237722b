use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::common::errors::Result;
use crate::common::traits::SequenceStore;
use crate::common::types::{NewOddsSnapshot, OddsSnapshot};

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    markets: HashMap<String, BTreeMap<i64, OddsSnapshot>>,
}

/// Process-local sequence store
///
/// Ids come from one counter shared by every market, minted under the same
/// lock that appends the row, so write order and id order always agree.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    inner: RwLock<Inner>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored for a market
    pub async fn len(&self, market_id: &str) -> usize {
        self.inner
            .read()
            .await
            .markets
            .get(market_id)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn insert(&self, snapshot: &NewOddsSnapshot) -> Result<OddsSnapshot> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let row = OddsSnapshot::from_new(inner.last_id, snapshot);
        inner
            .markets
            .entry(row.market_id.clone())
            .or_default()
            .insert(row.sequence_id, row.clone());
        Ok(row)
    }

    async fn range_after(
        &self,
        market_id: &str,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<OddsSnapshot>> {
        let inner = self.inner.read().await;
        let Some(rows) = inner.markets.get(market_id) else {
            return Ok(Vec::new());
        };

        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(rows
            .range((Bound::Excluded(after_id), Bound::Unbounded))
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn latest(&self, market_id: &str) -> Result<Option<OddsSnapshot>> {
        let inner = self.inner.read().await;
        Ok(inner
            .markets
            .get(market_id)
            .and_then(|rows| rows.values().next_back().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::MarketOdds;

    fn pending(market_id: &str, yes_pool: f64) -> NewOddsSnapshot {
        NewOddsSnapshot::new(
            market_id,
            MarketOdds {
                yes_odds: 2.0,
                no_odds: 2.0,
                yes_pool,
                no_pool: 100.0,
                total_pool: yes_pool + 100.0,
            },
        )
    }

    #[tokio::test]
    async fn test_ids_increase_across_markets() {
        let store = InMemorySequenceStore::new();
        let a = store.insert(&pending("a", 1.0)).await.unwrap();
        let b = store.insert(&pending("b", 1.0)).await.unwrap();
        let a2 = store.insert(&pending("a", 2.0)).await.unwrap();

        assert!(a.sequence_id < b.sequence_id);
        assert!(b.sequence_id < a2.sequence_id);
        assert_eq!(store.len("a").await, 2);
    }

    #[tokio::test]
    async fn test_range_after_is_exclusive_ascending_and_bounded() {
        let store = InMemorySequenceStore::new();
        for i in 0..10 {
            store.insert(&pending("m", i as f64)).await.unwrap();
        }

        let rows = store.range_after("m", 3, 4).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.sequence_id).collect();
        assert_eq!(ids, vec![4, 5, 6, 7]);

        assert!(store.range_after("m", 10, 100).await.unwrap().is_empty());
        assert!(store.range_after("unknown", 0, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_returns_highest_id() {
        let store = InMemorySequenceStore::new();
        assert!(store.latest("m").await.unwrap().is_none());

        store.insert(&pending("m", 1.0)).await.unwrap();
        let last = store.insert(&pending("m", 2.0)).await.unwrap();
        store.insert(&pending("other", 3.0)).await.unwrap();

        assert_eq!(store.latest("m").await.unwrap(), Some(last));
    }
}
