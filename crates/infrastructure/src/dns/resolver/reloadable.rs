use super::ResolverMap;
use crate::dns::cache::DnsCache;
use crate::dns::release::wait_for_release;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use weir_dns_domain::Config;

/// The current [`ResolverMap`], replaced wholesale when host or zone files
/// change. Queries in flight keep the map they started with.
pub struct ReloadableResolverMap {
    current: ArcSwap<ResolverMap>,
    config: ArcSwap<Config>,
    cache: Arc<DnsCache>,
    generation: AtomicU64,
}

impl ReloadableResolverMap {
    pub fn new(config: Config, cache: Arc<DnsCache>) -> Self {
        let map = ResolverMap::from_config(&config, Arc::clone(&cache));
        Self {
            current: ArcSwap::from_pointee(map),
            config: ArcSwap::from_pointee(config),
            cache,
            generation: AtomicU64::new(1),
        }
    }

    /// Snapshot of the current map.
    pub fn load(&self) -> Arc<ResolverMap> {
        self.current.load_full()
    }

    pub fn cache(&self) -> &Arc<DnsCache> {
        &self.cache
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the configuration used by the next [`rebuild`](Self::rebuild).
    pub fn set_config(&self, config: Config) {
        self.config.store(Arc::new(config));
    }

    /// Build a new map from the stored configuration, swap it in and clear
    /// the shared cache. The old map is closed once its last user drops it.
    pub fn rebuild(&self) -> u64 {
        let config = self.config.load_full();
        let map = ResolverMap::from_config(&config, Arc::clone(&self.cache));

        let old = self.current.swap(Arc::new(map));
        self.cache.clear();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        info!(generation, "Resolver map rebuilt");

        tokio::spawn(async move {
            let old = wait_for_release(old).await;
            old.close().await;
            debug!("Previous resolver map closed");
        });

        generation
    }
}
