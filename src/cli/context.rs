//! Runtime wiring shared by the commands

use crate::clock::SystemClock;
use crate::config::{Config, ConfigManager};
use crate::content::FileStorage;
use crate::error::DepotResult;
use crate::filter::{load_rule_filters, FilterChain};
use crate::promote::PromotionManager;
use crate::store::{GroupResolver, MemoryStoreRegistry};
use crate::tracking::{FileRecordPersistence, TrackingCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configured registry and storage for one CLI invocation
pub struct Depot {
    pub config: Config,
    pub manager: ConfigManager,
    pub registry: Arc<MemoryStoreRegistry>,
    pub storage: Arc<FileStorage>,
}

impl Depot {
    pub fn new(manager: ConfigManager, config: Config) -> DepotResult<Self> {
        let registry = Arc::new(manager.registry(&config)?);
        let storage = Arc::new(FileStorage::new(config.storage.root.clone()));
        debug!("Content root: {}", config.storage.root.display());

        Ok(Self {
            config,
            manager,
            registry,
            storage,
        })
    }

    pub fn resolver(&self) -> GroupResolver {
        GroupResolver::new(self.registry.clone())
    }

    pub fn promotion(&self) -> PromotionManager {
        PromotionManager::new(self.registry.clone(), self.storage.clone())
    }

    pub fn tracking_cache(&self) -> TrackingCache {
        let tracking = &self.config.tracking;
        TrackingCache::new(
            Arc::new(FileRecordPersistence::new(tracking.dir.clone())),
            Arc::new(SystemClock),
        )
        .with_timeout(Duration::from_secs(tracking.timeout_secs))
        .with_max_entries(tracking.max_entries)
    }

    /// Built-in filters plus any rules from the configured rule directory
    pub async fn filter_chain(&self) -> DepotResult<FilterChain> {
        let mut chain = FilterChain::with_defaults();
        if let Some(dir) = &self.config.filters.rules_dir {
            for rule in load_rule_filters(dir).await? {
                chain.register(Arc::new(rule));
            }
        }
        Ok(chain)
    }
}
