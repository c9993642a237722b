use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::book::{MarketBook, Pools};
use crate::broadcast::EventBroker;
use crate::common::types::{NewOddsSnapshot, OddsSnapshot, OddsUpdate, Side, TradeImpact};
use crate::pricing::{ConfigProvider, PricingEngine};
use crate::sequence::SequenceLog;

/// The bet that moved a market's pools
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub side: Side,
    pub amount: f64,
    #[serde(default)]
    pub fee_amount: f64,
}

/// Result of one repricing
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedOdds {
    pub update: OddsUpdate,
    /// False when the log write failed; such updates are not broadcast
    pub persisted: bool,
}

/// Price, persist, publish
///
/// The only writer to the sequence log and the broker. A failed log write
/// never fails the caller: the priced update is still returned, but it is
/// kept off the broker so no stream ever sees an id the log lacks.
#[derive(Clone)]
pub struct OddsPublisher {
    provider: Arc<ConfigProvider>,
    book: Arc<MarketBook>,
    log: SequenceLog,
    broker: EventBroker,
}

impl OddsPublisher {
    pub fn new(
        provider: Arc<ConfigProvider>,
        book: Arc<MarketBook>,
        log: SequenceLog,
        broker: EventBroker,
    ) -> Self {
        Self {
            provider,
            book,
            log,
            broker,
        }
    }

    pub fn book(&self) -> &Arc<MarketBook> {
        &self.book
    }

    #[instrument(skip(self, trade))]
    pub async fn apply_pools(
        &self,
        market_id: &str,
        yes_pool: f64,
        no_pool: f64,
        trade: Option<TradeRequest>,
    ) -> PublishedOdds {
        let config = self.provider.get(false).await;
        let pools = Pools::new(yes_pool, no_pool);
        let previous = self.book.set_pools(market_id, pools);

        let impact = trade.map(|trade| {
            let pool_before = previous
                .map(|p| p.side(trade.side))
                .unwrap_or_else(|| (pools.side(trade.side) - trade.amount).max(0.0));
            PricingEngine::trade_impact(
                trade.side,
                trade.amount,
                trade.fee_amount,
                pool_before,
                &config,
            )
        });

        let odds = PricingEngine::compute_market_odds(yes_pool, no_pool, &config);
        let pending = NewOddsSnapshot::new(market_id, odds);

        let Some(row) = self.log.record(pending.clone()).await else {
            warn!(market_id, "Odds not persisted, skipping broadcast");
            return PublishedOdds {
                update: OddsUpdate {
                    snapshot: OddsSnapshot::from_new(0, &pending),
                    trade: impact,
                    durable: false,
                },
                persisted: false,
            };
        };

        let mut update = OddsUpdate::durable(row);
        update.trade = impact;
        let delivered = self.broker.publish(update.clone());

        info!(
            market_id,
            sequence_id = update.sequence_id(),
            yes_odds = odds.yes_odds,
            no_odds = odds.no_odds,
            delivered,
            "Odds updated"
        );

        PublishedOdds {
            update,
            persisted: true,
        }
    }

    /// Impact details of a prospective trade against the current pools
    pub async fn quote_trade(&self, market_id: &str, trade: TradeRequest) -> TradeImpact {
        let config = self.provider.get(false).await;
        let pool_before = self
            .book
            .pools(market_id)
            .map_or(0.0, |pools| pools.side(trade.side));
        PricingEngine::trade_impact(
            trade.side,
            trade.amount,
            trade.fee_amount,
            pool_before,
            &config,
        )
    }
}
