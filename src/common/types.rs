//! Types shared by the pricing, sequence-log and streaming layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Yes => write!(f, "yes"),
            Side::No => write!(f, "no"),
        }
    }
}

/// Odds and pool sizes of a market at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOdds {
    pub yes_odds: f64,
    pub no_odds: f64,
    pub yes_pool: f64,
    pub no_pool: f64,
    pub total_pool: f64,
}

/// A snapshot that has not yet been assigned a sequence id
#[derive(Debug, Clone, PartialEq)]
pub struct NewOddsSnapshot {
    pub market_id: String,
    pub odds: MarketOdds,
    pub created_at: DateTime<Utc>,
}

impl NewOddsSnapshot {
    pub fn new(market_id: impl Into<String>, odds: MarketOdds) -> Self {
        Self {
            market_id: market_id.into(),
            odds,
            created_at: Utc::now(),
        }
    }
}

/// A persisted row of the sequence log. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OddsSnapshot {
    /// Monotonic per market, never reused
    #[sqlx(rename = "id")]
    pub sequence_id: i64,
    pub market_id: String,
    pub yes_odds: f64,
    pub no_odds: f64,
    pub yes_pool: f64,
    pub no_pool: f64,
    pub total_pool: f64,
    pub created_at: DateTime<Utc>,
}

impl OddsSnapshot {
    /// Attach a freshly minted id to a pending snapshot
    pub fn from_new(sequence_id: i64, snapshot: &NewOddsSnapshot) -> Self {
        Self {
            sequence_id,
            market_id: snapshot.market_id.clone(),
            yes_odds: snapshot.odds.yes_odds,
            no_odds: snapshot.odds.no_odds,
            yes_pool: snapshot.odds.yes_pool,
            no_pool: snapshot.odds.no_pool,
            total_pool: snapshot.odds.total_pool,
            created_at: snapshot.created_at,
        }
    }

    pub fn odds(&self) -> MarketOdds {
        MarketOdds {
            yes_odds: self.yes_odds,
            no_odds: self.no_odds,
            yes_pool: self.yes_pool,
            no_pool: self.no_pool,
            total_pool: self.total_pool,
        }
    }
}

/// Details of the trade that caused a repricing. Transient, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeImpact {
    pub side: Side,
    pub amount: f64,
    pub net_contribution: f64,
    pub impact_fee: f64,
    pub impact_multiplier: f64,
    pub fee_amount: f64,
}

/// Event carried by the broadcaster to every listening stream
#[derive(Debug, Clone, PartialEq)]
pub struct OddsUpdate {
    pub snapshot: OddsSnapshot,
    pub trade: Option<TradeImpact>,
    /// False only for snapshots synthesized from live pool state
    pub durable: bool,
}

impl OddsUpdate {
    /// Update for a row read back from (or just written to) the sequence log
    pub fn durable(snapshot: OddsSnapshot) -> Self {
        Self {
            snapshot,
            trade: None,
            durable: true,
        }
    }

    pub fn with_trade(mut self, trade: TradeImpact) -> Self {
        self.trade = Some(trade);
        self
    }

    pub fn market_id(&self) -> &str {
        &self.snapshot.market_id
    }

    pub fn sequence_id(&self) -> i64 {
        self.snapshot.sequence_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_new_keeps_odds() {
        let odds = MarketOdds {
            yes_odds: 2.5,
            no_odds: 1.67,
            yes_pool: 400.0,
            no_pool: 600.0,
            total_pool: 1000.0,
        };
        let pending = NewOddsSnapshot::new("m1", odds);
        let row = OddsSnapshot::from_new(7, &pending);

        assert_eq!(row.sequence_id, 7);
        assert_eq!(row.market_id, "m1");
        assert_eq!(row.odds(), odds);
        assert_eq!(row.created_at, pending.created_at);
    }

    #[test]
    fn test_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Yes).unwrap(), "\"yes\"");
        assert_eq!(Side::No.to_string(), "no");
    }
}
