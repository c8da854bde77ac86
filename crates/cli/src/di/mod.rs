use futures::future::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use weir_dns_application::ports::RuleEnginePort;
use weir_dns_application::use_cases::CheckDomainUseCase;
use weir_dns_domain::Config;
use weir_dns_infrastructure::dns::source::SourceFactory;
use weir_dns_infrastructure::dns::{
    wait_for_release, DnsCache, ReloadableResolverMap, RuleEngine, SourceKind,
};
use weir_dns_jobs::{rule_engine_reload, CacheSweepJob, ReloadCallback, ReloadCoordinator};

const CLOSE_DEADLINE: Duration = Duration::from_secs(5);

/// Everything a command needs, wired from one configuration.
pub struct Services {
    pub config: Arc<Config>,
    pub engine: Arc<RuleEngine>,
    pub check_domain: CheckDomainUseCase,
    pub cache: Arc<DnsCache>,
    pub resolvers: Arc<ReloadableResolverMap>,
}

impl Services {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let engine = Arc::new(RuleEngine::build(config.clone()).await?);
        let check_domain = CheckDomainUseCase::new(engine.clone() as Arc<dyn RuleEnginePort>);
        let cache = Arc::new(DnsCache::new());
        let resolvers = Arc::new(ReloadableResolverMap::new(config.clone(), cache.clone()));

        info!(
            generation = engine.current().id(),
            rules = engine.current().summary().total,
            "Services initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            engine,
            check_domain,
            cache,
            resolvers,
        })
    }

    /// Register list files with the rule engine and host and zone files
    /// with the resolver map.
    pub async fn register_reloads(&self, coordinator: &ReloadCoordinator) {
        let rules = rule_engine_reload(self.engine.clone() as Arc<dyn RuleEnginePort>);
        for list in self.config.filter_lists() {
            coordinator.register(&list.path, Arc::clone(&rules)).await;
        }

        let resolvers = Arc::clone(&self.resolvers);
        let rebuild: ReloadCallback = Arc::new(move || {
            let resolvers = Arc::clone(&resolvers);
            async move {
                resolvers.rebuild();
            }
            .boxed()
        });
        for path in source_files(&self.config) {
            coordinator.register(&path, Arc::clone(&rebuild)).await;
        }
    }

    pub fn cache_sweep_job(&self) -> CacheSweepJob {
        CacheSweepJob::new(
            self.cache.clone(),
            Duration::from_secs(self.config.cache.max_entry_age_secs),
        )
        .with_interval(self.config.cache.sweep_interval_secs)
    }

    /// Close upstream pools, then the rule engine once background jobs have
    /// let go of it.
    pub async fn close(self) {
        let Services {
            engine,
            check_domain,
            resolvers,
            ..
        } = self;
        drop(check_domain);

        resolvers.load().close().await;
        match tokio::time::timeout(CLOSE_DEADLINE, wait_for_release(engine)).await {
            Ok(engine) => engine.close().await,
            Err(_) => warn!("Rule engine still in use, leaving its session on disk"),
        }
    }
}

/// Host and zone files referenced by resolvers or named sources.
fn source_files(config: &Config) -> Vec<PathBuf> {
    let factory = SourceFactory::from_config(&config.upstream, &config.sources);
    let specs = config
        .resolvers
        .iter()
        .flat_map(|resolver| resolver.sources.iter())
        .chain(config.sources.iter().flat_map(|source| source.specs.iter()));

    let mut files: Vec<PathBuf> = specs
        .filter(|spec| matches!(factory.classify(spec), SourceKind::HostFile | SourceKind::Zone))
        .map(|spec| PathBuf::from(spec.trim()))
        .collect();
    files.sort();
    files.dedup();
    files
}
