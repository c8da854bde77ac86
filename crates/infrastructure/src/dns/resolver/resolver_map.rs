use super::Resolver;
use crate::dns::cache::DnsCache;
use crate::dns::pool::PoolRegistry;
use crate::dns::source::{RequestContext, ResolutionContext, SourceFactory};
use futures::future::BoxFuture;
use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use weir_dns_domain::{Config, DomainError};

/// How a response was obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub cached: bool,
    pub source: String,
    pub resolver: String,
}

impl ResolutionResult {
    fn from_context(ctx: &ResolutionContext<'_>) -> Self {
        Self {
            cached: ctx.cached,
            source: ctx.source_used.clone().unwrap_or_default(),
            resolver: ctx.resolver_used.clone().unwrap_or_default(),
        }
    }
}

/// Every resolver of one configuration generation plus their shared cache.
pub struct ResolverMap {
    resolvers: FxHashMap<String, Resolver>,
    cache: Arc<DnsCache>,
    cache_enabled: bool,
    registry: Arc<PoolRegistry>,
}

impl ResolverMap {
    pub fn new(resolvers: Vec<Resolver>, cache: Arc<DnsCache>, registry: Arc<PoolRegistry>) -> Self {
        Self {
            resolvers: resolvers
                .into_iter()
                .map(|resolver| (resolver.name().to_string(), resolver))
                .collect(),
            cache,
            cache_enabled: true,
            registry,
        }
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Build every configured resolver. Named sources are shared across
    /// resolvers and all upstream connections come from one pool registry.
    pub fn from_config(config: &Config, cache: Arc<DnsCache>) -> Self {
        info!(
            resolvers = config.resolvers.len(),
            named_sources = config.sources.len(),
            cache = config.cache.enabled,
            "Building resolver map"
        );

        let factory = SourceFactory::from_config(&config.upstream, &config.sources);
        let resolvers = config
            .resolvers
            .iter()
            .map(|resolver| Resolver::from_config(resolver, &factory))
            .collect();

        Self::new(resolvers, cache, factory.registry().clone())
            .with_cache_enabled(config.cache.enabled)
    }

    pub fn resolver(&self, name: &str) -> Option<&Resolver> {
        self.resolvers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub fn cache(&self) -> &Arc<DnsCache> {
        &self.cache
    }

    pub(crate) fn active_cache(&self) -> Option<&DnsCache> {
        self.cache_enabled.then_some(self.cache.as_ref())
    }

    /// Answer through a single resolver with a fresh resolution context.
    pub async fn answer(
        &self,
        rcon: &RequestContext,
        resolver: &str,
        request: &Message,
    ) -> Result<Option<(Message, ResolutionResult)>, DomainError> {
        let mut ctx = ResolutionContext::with_map(self);
        let response = self.answer_with_context(rcon, &mut ctx, resolver, request).await?;
        Ok(response.map(|message| (message, ResolutionResult::from_context(&ctx))))
    }

    /// Try resolvers in order with one shared context. Resolvers already
    /// visited through a chain are not asked again. Errors only surface
    /// when no resolver produced an answer.
    pub async fn answer_multi_resolvers(
        &self,
        rcon: &RequestContext,
        resolvers: &[String],
        request: &Message,
    ) -> Result<Option<(Message, ResolutionResult)>, DomainError> {
        let mut ctx = ResolutionContext::with_map(self);
        let mut errors = Vec::new();

        for name in resolvers {
            if ctx.has_visited(name) {
                continue;
            }
            match self.answer_with_context(rcon, &mut ctx, name, request).await {
                Ok(Some(response)) => {
                    let result = ResolutionResult::from_context(&ctx);
                    debug!(
                        resolver = %result.resolver,
                        source = %result.source,
                        cached = result.cached,
                        "Query answered"
                    );
                    return Ok(Some((response, result)));
                }
                Ok(None) => {}
                Err(e) => errors.push(format!("{name}: {e}")),
            }
        }

        if errors.is_empty() {
            Ok(None)
        } else {
            Err(DomainError::ResolutionFailed(errors.join("; ")))
        }
    }

    /// Entry point for chained resolution. Unknown and already visited
    /// resolvers answer nothing, which is what breaks reference cycles.
    pub fn answer_with_context<'b, 'a: 'b>(
        &'b self,
        rcon: &'b RequestContext,
        ctx: &'b mut ResolutionContext<'a>,
        resolver: &'b str,
        request: &'b Message,
    ) -> BoxFuture<'b, Result<Option<Message>, DomainError>> {
        Box::pin(async move {
            let Some(target) = self.resolvers.get(resolver) else {
                return Ok(None);
            };
            if ctx.has_visited(resolver) {
                return Ok(None);
            }
            target.answer(rcon, ctx, request).await
        })
    }

    /// Close every source and shut the upstream pools down.
    pub async fn close(&self) {
        for resolver in self.resolvers.values() {
            resolver.close().await;
        }
        self.registry.shutdown_all();
    }
}
