//! Outbound frames of the odds event stream
//!
//! Every event written to a stream connection comes from [`Frame::to_event`].

use std::time::Duration;

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::errors::Result;
use crate::common::types::{OddsUpdate, TradeImpact};

/// Event name carried by every odds frame
pub const ODDS_EVENT: &str = "odds";

/// Comment text of keep-alive frames
pub const KEEP_ALIVE_COMMENT: &str = "keep-alive";

/// JSON body of an odds frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsPayload {
    pub sequence: i64,
    pub market_id: String,
    pub yes_odds: f64,
    pub no_odds: f64,
    pub yes_pool: f64,
    pub no_pool: f64,
    pub total_pool: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub trade: Option<TradeImpact>,
    /// Only written when false
    #[serde(default = "durable_default", skip_serializing_if = "is_durable")]
    pub durable: bool,
}

fn durable_default() -> bool {
    true
}

fn is_durable(durable: &bool) -> bool {
    *durable
}

impl From<&OddsUpdate> for OddsPayload {
    fn from(update: &OddsUpdate) -> Self {
        let row = &update.snapshot;
        Self {
            sequence: row.sequence_id,
            market_id: row.market_id.clone(),
            yes_odds: row.yes_odds,
            no_odds: row.no_odds,
            yes_pool: row.yes_pool,
            no_pool: row.no_pool,
            total_pool: row.total_pool,
            timestamp: row.created_at,
            trade: update.trade,
            durable: update.durable,
        }
    }
}

/// One unit of the outbound stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Reconnect backoff hint, in milliseconds
    Retry(u64),
    /// An odds update. `id` is `None` for non-durable snapshots so clients
    /// never resume from an id the log does not contain.
    Odds {
        id: Option<i64>,
        payload: OddsPayload,
    },
    /// Comment line that keeps idle proxies from closing the connection
    KeepAlive,
}

impl Frame {
    pub fn odds(update: &OddsUpdate) -> Self {
        Frame::Odds {
            id: update.durable.then_some(update.snapshot.sequence_id),
            payload: OddsPayload::from(update),
        }
    }

    /// Sequence id a client will track for this frame
    pub fn sequence_id(&self) -> Option<i64> {
        match self {
            Frame::Odds { id, .. } => *id,
            _ => None,
        }
    }

    /// Convert to the event written on the wire
    pub fn to_event(&self) -> Result<Event> {
        match self {
            Frame::Retry(ms) => Ok(Event::default().retry(Duration::from_millis(*ms))),
            Frame::Odds { id, payload } => {
                let mut event = Event::default();
                if let Some(id) = id {
                    event = event.id(id.to_string());
                }
                Ok(event.event(ODDS_EVENT).json_data(payload)?)
            }
            Frame::KeepAlive => Ok(Event::default().comment(KEEP_ALIVE_COMMENT)),
        }
    }
}
