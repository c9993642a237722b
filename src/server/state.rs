use std::sync::Arc;

use crate::broadcast::EventBroker;
use crate::common::traits::{ConfigStore, MarketOddsSource, SequenceStore};
use crate::config::types::AppConfig;
use crate::market::{MarketBook, OddsPublisher};
use crate::pricing::{ConfigProvider, InMemoryConfigStore};
use crate::sequence::{InMemorySequenceStore, SequenceLog};
use crate::stream::StreamHandler;

/// Shared state handed to every route
///
/// Everything here is an explicit instance wired once at startup; clones
/// share the same broker, log and provider.
#[derive(Clone)]
pub struct AppState {
    pub streams: StreamHandler,
    pub publisher: OddsPublisher,
    pub log: SequenceLog,
    pub market: Arc<dyn MarketOddsSource>,
    pub broker: EventBroker,
}

impl AppState {
    /// Wire the components over the given stores
    pub fn build(
        config_store: Arc<dyn ConfigStore>,
        sequence_store: Arc<dyn SequenceStore>,
        config: &AppConfig,
    ) -> Self {
        let provider = Arc::new(ConfigProvider::with_ttl(
            config_store,
            config.pricing.cache_ttl(),
        ));
        let book = Arc::new(MarketBook::new(provider.clone()));
        let log = SequenceLog::with_page_size(sequence_store, config.stream.backfill_page_size);
        let broker = EventBroker::new();

        let streams = StreamHandler::new(
            log.clone(),
            broker.clone(),
            book.clone(),
            config.stream.clone(),
        );
        let publisher = OddsPublisher::new(provider, book.clone(), log.clone(), broker.clone());

        Self {
            streams,
            publisher,
            log,
            market: book,
            broker,
        }
    }

    /// Process-local stores, for tests and database-less runs
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::build(
            Arc::new(InMemoryConfigStore::new()),
            Arc::new(InMemorySequenceStore::new()),
            config,
        )
    }
}
