//! Per-connection driver of the resumable odds stream

use std::sync::Arc;

use async_stream::stream;
use chrono::Utc;
use futures_util::Stream;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::frame::Frame;
use super::session::StreamSession;
use crate::broadcast::EventBroker;
use crate::common::traits::MarketOddsSource;
use crate::common::types::{OddsSnapshot, OddsUpdate};
use crate::config::types::StreamSettings;
use crate::sequence::SequenceLog;

/// Resume point from the `Last-Event-ID` header, else the query parameter
///
/// Malformed or negative values count as absent: resumption is best-effort.
pub fn parse_resume_point(header: Option<&str>, query: Option<&str>) -> Option<i64> {
    fn parse(raw: &str) -> Option<i64> {
        raw.trim().parse::<i64>().ok().filter(|id| *id >= 0)
    }
    header.and_then(parse).or_else(|| query.and_then(parse))
}

/// Builds one gap-free, duplicate-free frame stream per connection
#[derive(Clone)]
pub struct StreamHandler {
    log: SequenceLog,
    broker: EventBroker,
    market: Arc<dyn MarketOddsSource>,
    settings: StreamSettings,
}

enum Step {
    Update(Arc<OddsUpdate>),
    KeepAlive,
    BrokerClosed,
}

/// Logs the end of a connection exactly once, however the stream ends
struct ConnectionGuard {
    market_id: String,
    opened_at: Instant,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        info!(
            market_id = %self.market_id,
            duration_ms = self.opened_at.elapsed().as_millis() as u64,
            "Odds stream closed"
        );
    }
}

impl StreamHandler {
    pub fn new(
        log: SequenceLog,
        broker: EventBroker,
        market: Arc<dyn MarketOddsSource>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            log,
            broker,
            market,
            settings,
        }
    }

    /// Frame stream for one connection
    ///
    /// The broker subscription is taken before any history is read, so an
    /// update published while the read is in flight waits in the session
    /// buffer instead of being lost. Dropping the stream (client gone)
    /// releases the subscription and the keep-alive timer.
    ///
    /// If a history page cannot be read the stream ends after the rows
    /// already sent, and the client reconnects from the last id it saw.
    pub fn open(
        &self,
        market_id: String,
        resume_from: Option<i64>,
    ) -> impl Stream<Item = Frame> + Send + 'static {
        let handler = self.clone();

        stream! {
            let _guard = ConnectionGuard {
                market_id: market_id.clone(),
                opened_at: Instant::now(),
            };
            info!(market_id = %market_id, ?resume_from, "Odds stream opened");

            let mut session = StreamSession::new(market_id.clone(), resume_from);
            yield Frame::Retry(handler.settings.retry_ms);

            session.begin_backfill();
            let mut subscription = handler.broker.subscribe(&market_id);

            match resume_from {
                Some(after) => {
                    let mut cursor = after;
                    loop {
                        let rows = match handler.log.since(&market_id, cursor).await {
                            Ok(rows) => rows,
                            Err(e) => {
                                // Rows after `cursor` are unread; the client resumes from its last id
                                warn!(
                                    market_id = %market_id,
                                    cursor,
                                    "Backfill read failed, ending stream: {}", e
                                );
                                session.close();
                                return;
                            }
                        };

                        let page_full = rows.len() as i64 >= handler.log.page_size();
                        for row in rows {
                            cursor = row.sequence_id;
                            if let Some(frame) = session.backfill(&OddsUpdate::durable(row)) {
                                yield frame;
                            }
                        }
                        if !page_full {
                            break;
                        }
                        debug!(market_id = %market_id, cursor, "Backfill page full, reading next page");
                    }
                }
                None => {
                    let initial = match handler.log.latest(&market_id).await {
                        Ok(Some(row)) => Some(OddsUpdate::durable(row)),
                        Ok(None) => handler.synthesize(&market_id).await,
                        Err(e) => {
                            warn!(market_id = %market_id, "Latest snapshot read failed: {}", e);
                            handler.synthesize(&market_id).await
                        }
                    };
                    if let Some(update) = initial {
                        if let Some(frame) = session.backfill(&update) {
                            yield frame;
                        }
                    }
                }
            }

            while let Some(update) = subscription.try_recv() {
                session.offer(update);
            }
            for frame in session.go_live() {
                yield frame;
            }

            let period = handler.settings.keep_alive_interval();
            let mut keep_alive = interval_at(Instant::now() + period, period);
            keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let step = tokio::select! {
                    update = subscription.recv() => match update {
                        Some(update) => Step::Update(update),
                        None => Step::BrokerClosed,
                    },
                    _ = keep_alive.tick() => Step::KeepAlive,
                };

                match step {
                    Step::Update(update) => {
                        if let Some(frame) = session.offer(update) {
                            yield frame;
                        }
                    }
                    Step::KeepAlive => yield Frame::KeepAlive,
                    Step::BrokerClosed => break,
                }
            }

            session.close();
        }
    }

    /// One-off snapshot from the market's live pool state
    ///
    /// Used only when the log has nothing to offer. The id is wall-clock
    /// milliseconds and the update is flagged non-durable, so it never
    /// advances a session's cursor or reaches a client as a resume id.
    async fn synthesize(&self, market_id: &str) -> Option<OddsUpdate> {
        match self.market.current_odds(market_id).await {
            Ok(odds) => {
                let now = Utc::now();
                debug!(market_id, "Synthesizing bootstrap snapshot");
                Some(OddsUpdate {
                    snapshot: OddsSnapshot {
                        sequence_id: now.timestamp_millis(),
                        market_id: market_id.to_string(),
                        yes_odds: odds.yes_odds,
                        no_odds: odds.no_odds,
                        yes_pool: odds.yes_pool,
                        no_pool: odds.no_pool,
                        total_pool: odds.total_pool,
                        created_at: now,
                    },
                    trade: None,
                    durable: false,
                })
            }
            Err(e) => {
                warn!(market_id, "No current odds for bootstrap snapshot: {}", e);
                None
            }
        }
    }
}
