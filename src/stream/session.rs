use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace};

use super::frame::Frame;
use crate::common::types::OddsUpdate;

/// Protocol phase of one stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Headers and retry hint not yet sent
    Init,
    /// Replaying history; live updates are held back
    Backfilling,
    /// Forwarding live updates as they arrive
    Live,
    /// Connection gone
    Closed,
}

/// Per-connection delivery state
///
/// Merges two sources (backfill rows and broadcaster updates) into one
/// stream in which durable sequence ids strictly increase. Every emission
/// goes through the same guard: an id at or below the last one sent is
/// dropped, and the cursor only moves when a frame is actually produced.
#[derive(Debug)]
pub struct StreamSession {
    market_id: String,
    phase: StreamPhase,
    last_sequence_sent: Option<i64>,
    pending: VecDeque<Arc<OddsUpdate>>,
}

impl StreamSession {
    /// `resume_from` is the last id the client reports having received
    pub fn new(market_id: impl Into<String>, resume_from: Option<i64>) -> Self {
        Self {
            market_id: market_id.into(),
            phase: StreamPhase::Init,
            last_sequence_sent: resume_from,
            pending: VecDeque::new(),
        }
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn last_sequence_sent(&self) -> Option<i64> {
        self.last_sequence_sent
    }

    pub fn history_delivered(&self) -> bool {
        matches!(self.phase, StreamPhase::Live | StreamPhase::Closed)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Leave `Init`; live updates offered from now on are buffered
    pub fn begin_backfill(&mut self) {
        if self.phase == StreamPhase::Init {
            self.phase = StreamPhase::Backfilling;
        }
    }

    /// Emit one historical row
    pub fn backfill(&mut self, update: &OddsUpdate) -> Option<Frame> {
        self.forward(update)
    }

    /// Offer a broadcaster update
    ///
    /// Buffered while backfilling, guarded and forwarded once live,
    /// discarded before `Init` ends or after close.
    pub fn offer(&mut self, update: Arc<OddsUpdate>) -> Option<Frame> {
        match self.phase {
            StreamPhase::Backfilling => {
                trace!(sequence_id = update.sequence_id(), "Buffering live update");
                self.pending.push_back(update);
                None
            }
            StreamPhase::Live => self.forward(&update),
            StreamPhase::Init | StreamPhase::Closed => None,
        }
    }

    /// Switch to `Live`, flushing buffered updates in arrival order
    pub fn go_live(&mut self) -> Vec<Frame> {
        if self.phase != StreamPhase::Backfilling {
            return Vec::new();
        }
        self.phase = StreamPhase::Live;

        let pending = std::mem::take(&mut self.pending);
        let buffered = pending.len();
        let frames: Vec<Frame> = pending
            .iter()
            .filter_map(|update| self.forward(update))
            .collect();

        debug!(
            market_id = %self.market_id,
            buffered,
            flushed = frames.len(),
            "Stream is live"
        );
        frames
    }

    pub fn close(&mut self) {
        self.phase = StreamPhase::Closed;
        self.pending.clear();
    }

    fn forward(&mut self, update: &OddsUpdate) -> Option<Frame> {
        if self.phase == StreamPhase::Closed {
            return None;
        }

        // Synthesized snapshots carry no log position: sent as-is, cursor untouched
        if !update.durable {
            return Some(Frame::odds(update));
        }

        let id = update.sequence_id();
        if self.last_sequence_sent.is_some_and(|last| id <= last) {
            trace!(sequence_id = id, "Dropping already delivered update");
            return None;
        }

        self.last_sequence_sent = Some(id);
        Some(Frame::odds(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::OddsSnapshot;
    use chrono::Utc;

    fn update(sequence_id: i64) -> OddsUpdate {
        OddsUpdate::durable(OddsSnapshot {
            sequence_id,
            market_id: "m".to_string(),
            yes_odds: 2.0,
            no_odds: 2.0,
            yes_pool: 10.0,
            no_pool: 10.0,
            total_pool: 20.0,
            created_at: Utc::now(),
        })
    }

    fn ids(frames: &[Frame]) -> Vec<i64> {
        frames.iter().filter_map(Frame::sequence_id).collect()
    }

    #[test]
    fn test_resume_point_filters_backfill() {
        let mut session = StreamSession::new("m", Some(2));
        session.begin_backfill();

        let frames: Vec<Frame> = (1..=5)
            .filter_map(|id| session.backfill(&update(id)))
            .collect();

        assert_eq!(ids(&frames), vec![3, 4, 5]);
        assert_eq!(session.last_sequence_sent(), Some(5));
    }

    #[test]
    fn test_live_updates_are_held_until_backfill_completes() {
        let mut session = StreamSession::new("m", Some(2));
        session.begin_backfill();

        assert!(session.offer(Arc::new(update(6))).is_none());
        assert_eq!(session.pending_len(), 1);

        let history: Vec<Frame> = (3..=5)
            .filter_map(|id| session.backfill(&update(id)))
            .collect();
        let flushed = session.go_live();

        assert_eq!(ids(&history), vec![3, 4, 5]);
        assert_eq!(ids(&flushed), vec![6]);
        assert!(session.history_delivered());
    }

    #[test]
    fn test_buffered_overlap_with_backfill_is_deduplicated() {
        let mut session = StreamSession::new("m", None);
        session.begin_backfill();

        // Published while the backfill read was in flight and also returned by it
        session.offer(Arc::new(update(4)));
        session.offer(Arc::new(update(5)));

        let history: Vec<Frame> = (3..=5)
            .filter_map(|id| session.backfill(&update(id)))
            .collect();
        let flushed = session.go_live();

        assert_eq!(ids(&history), vec![3, 4, 5]);
        assert!(flushed.is_empty());
    }

    #[test]
    fn test_live_guard_drops_duplicates_and_regressions() {
        let mut session = StreamSession::new("m", None);
        session.begin_backfill();
        session.go_live();

        assert!(session.offer(Arc::new(update(7))).is_some());
        assert!(session.offer(Arc::new(update(7))).is_none());
        assert!(session.offer(Arc::new(update(3))).is_none());
        assert!(session.offer(Arc::new(update(8))).is_some());
        assert_eq!(session.last_sequence_sent(), Some(8));
    }

    #[test]
    fn test_synthetic_snapshot_does_not_move_cursor() {
        let mut session = StreamSession::new("m", None);
        session.begin_backfill();

        let mut synthetic = update(1_700_000_000_000);
        synthetic.durable = false;
        let frame = session.backfill(&synthetic).unwrap();

        assert_eq!(frame.sequence_id(), None);
        assert_eq!(session.last_sequence_sent(), None);

        session.go_live();
        assert!(session.offer(Arc::new(update(1))).is_some());
    }

    #[test]
    fn test_offers_before_backfill_or_after_close_are_ignored() {
        let mut session = StreamSession::new("m", None);
        assert!(session.offer(Arc::new(update(1))).is_none());
        assert_eq!(session.pending_len(), 0);

        session.begin_backfill();
        session.go_live();
        session.close();

        assert_eq!(session.phase(), StreamPhase::Closed);
        assert!(session.offer(Arc::new(update(2))).is_none());
        assert!(session.go_live().is_empty());
    }
}
