use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::config::PricingConfig;
use crate::common::traits::ConfigStore;

#[derive(Debug, Clone, Copy)]
struct CachedConfig {
    config: PricingConfig,
    loaded_at: Instant,
}

/// Time-cached view of the persisted pricing config
///
/// Each provider owns its cache, so independent providers (one per test,
/// or one per store) never share state. Concurrent refreshes are allowed:
/// they read the same logical row and converge on the same value.
pub struct ConfigProvider {
    store: Arc<dyn ConfigStore>,
    ttl: Duration,
    cache: RwLock<Option<CachedConfig>>,
}

impl ConfigProvider {
    /// Default time a loaded config stays fresh
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self::with_ttl(store, Self::DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn ConfigStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current config, re-fetched when the cache is older than the TTL
    /// or when `force` is set
    pub async fn get(&self, force: bool) -> PricingConfig {
        if !force {
            if let Some(cached) = *self.cache.read().await {
                if cached.loaded_at.elapsed() < self.ttl {
                    return cached.config;
                }
            }
        }
        self.refresh().await
    }

    /// Re-read the store and replace the cached config
    ///
    /// Never fails: a store error or an empty table yields the built-in
    /// defaults, and the cache is still stamped as fresh so an unreachable
    /// store is not hammered on every call.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> PricingConfig {
        let config = match self.store.load_latest().await {
            Ok(Some(row)) => PricingConfig::from_row(&row),
            Ok(None) => {
                debug!("No pricing config row stored, using defaults");
                PricingConfig::default()
            }
            Err(e) => {
                warn!("Failed to load pricing config, using defaults: {}", e);
                PricingConfig::default()
            }
        };

        *self.cache.write().await = Some(CachedConfig {
            config,
            loaded_at: Instant::now(),
        });

        config
    }
}
