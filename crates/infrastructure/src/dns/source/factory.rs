use super::{
    DnsSource, HostFileSource, LoadBalancedSource, MultiSource, ResolvConfSource,
    ResolverRefSource, Source, SourceKind, SystemSource, ZoneSource,
};
use crate::dns::pool::PoolRegistry;
use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use weir_dns_domain::config::{SourceConfig, UpstreamConfig};
use weir_dns_domain::DomainError;

const RESOLV_PREFIX: &str = "resolv:";
const ZONE_EXTENSIONS: &[&str] = &["db", "zone"];

/// Everything a source specification may need at construction time.
///
/// Named sources are built once and shared by every resolver that mentions
/// them, so a load balanced group keeps a single rotation.
pub struct SourceFactory {
    registry: Arc<PoolRegistry>,
    backoff: Duration,
    named: FxHashMap<String, SourceConfig>,
    built: DashMap<String, Arc<dyn Source>, FxBuildHasher>,
}

impl SourceFactory {
    pub fn new(registry: Arc<PoolRegistry>, backoff: Duration, named: &[SourceConfig]) -> Self {
        Self {
            registry,
            backoff,
            named: named
                .iter()
                .map(|source| (source.name.clone(), source.clone()))
                .collect(),
            built: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn from_config(upstream: &UpstreamConfig, named: &[SourceConfig]) -> Self {
        Self::new(
            Arc::new(PoolRegistry::from_config(upstream)),
            Duration::from_secs(upstream.backoff_secs),
            named,
        )
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Which kind of source `spec` describes. Checks run in a fixed order:
    /// `system`, resolv files, existing zone or host files, upstream
    /// addresses, named sources, and finally resolver names.
    pub fn classify(&self, spec: &str) -> SourceKind {
        let spec = spec.trim();

        if spec == "system" {
            return SourceKind::System;
        }
        if spec.starts_with(RESOLV_PREFIX) {
            return SourceKind::ResolvConf;
        }

        let path = Path::new(spec);
        if path.is_file() {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if file_name.starts_with("resolv") {
                return SourceKind::ResolvConf;
            }
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_ascii_lowercase();
            if ZONE_EXTENSIONS.contains(&extension.as_str()) {
                return SourceKind::Zone;
            }
            return SourceKind::HostFile;
        }

        if spec.parse::<IpAddr>().is_ok() || spec.contains(':') || spec.contains('/') {
            return SourceKind::Dns;
        }

        match self.named.get(spec) {
            Some(named) if named.load_balance => SourceKind::LoadBalanced,
            Some(_) => SourceKind::Multi,
            None => SourceKind::ResolverRef,
        }
    }

    fn build(&self, spec: &str, building: &mut Vec<String>) -> Result<Arc<dyn Source>, DomainError> {
        let spec = spec.trim();
        let kind = self.classify(spec);

        let source: Arc<dyn Source> = match kind {
            SourceKind::System => Arc::new(SystemSource::new()),
            SourceKind::ResolvConf => {
                let path = spec.strip_prefix(RESOLV_PREFIX).unwrap_or(spec);
                Arc::new(ResolvConfSource::load(path, self.registry.clone(), self.backoff)?)
            }
            SourceKind::Zone => Arc::new(ZoneSource::load(spec)?),
            SourceKind::HostFile => Arc::new(HostFileSource::load(spec)?),
            SourceKind::Dns => Arc::new(DnsSource::load(spec, self.registry.clone(), self.backoff)?),
            SourceKind::Multi | SourceKind::LoadBalanced => self.build_named(spec, building)?,
            SourceKind::ResolverRef => Arc::new(ResolverRefSource::new(spec)),
        };

        debug!(spec, kind = %kind, name = %source.name(), "Source created");
        Ok(source)
    }

    fn build_named(&self, name: &str, building: &mut Vec<String>) -> Result<Arc<dyn Source>, DomainError> {
        if let Some(existing) = self.built.get(name) {
            return Ok(existing.clone());
        }
        if building.iter().any(|n| n == name) {
            return Err(DomainError::InvalidSourceSpec(format!(
                "named source {name} refers to itself"
            )));
        }
        let Some(config) = self.named.get(name) else {
            return Err(DomainError::NotFound(name.to_string()));
        };

        building.push(name.to_string());
        let mut sources = Vec::with_capacity(config.specs.len());
        for spec in &config.specs {
            sources.push(self.build(spec, building)?);
        }
        building.pop();

        let source: Arc<dyn Source> = match sources.len() {
            0 => {
                return Err(DomainError::InvalidSourceSpec(format!(
                    "named source {name} has no specs"
                )))
            }
            1 if !config.load_balance => sources.remove(0),
            _ if config.load_balance => Arc::new(LoadBalancedSource::new(name, sources)?),
            _ => Arc::new(MultiSource::new(name, sources)),
        };

        self.built.insert(name.to_string(), source.clone());
        Ok(source)
    }
}

/// Build the source a specification string describes.
pub fn create_source(spec: &str, factory: &SourceFactory) -> Result<Arc<dyn Source>, DomainError> {
    factory.build(spec, &mut Vec::new())
}
