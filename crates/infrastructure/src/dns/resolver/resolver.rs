use super::DomainFilter;
use crate::dns::message::{fqdn, is_empty_response, rename_records, with_question_name};
use crate::dns::source::{create_source, RequestContext, ResolutionContext, Source, SourceFactory};
use hickory_proto::op::Message;
use std::sync::Arc;
use tracing::{debug, warn};
use weir_dns_domain::config::ResolverConfig;
use weir_dns_domain::{normalize_domain, DomainError};

/// A named, ordered chain of sources behind a domain filter.
pub struct Resolver {
    name: String,
    filter: DomainFilter,
    sources: Vec<Arc<dyn Source>>,
    search: Vec<String>,
}

impl Resolver {
    /// `search` is extended with the search domains contributed by the
    /// sources themselves (resolv.conf files).
    pub fn new(
        name: impl Into<String>,
        domains: &[String],
        search: &[String],
        sources: Vec<Arc<dyn Source>>,
    ) -> Self {
        let mut suffixes: Vec<String> = Vec::new();
        let contributed = sources.iter().flat_map(|s| s.search_domains().iter());
        for suffix in search.iter().chain(contributed) {
            let suffix = normalize_domain(suffix);
            if !suffix.is_empty() && !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }

        Self {
            name: name.into(),
            filter: DomainFilter::new(domains),
            sources,
            search: suffixes,
        }
    }

    /// Sources that cannot be built are skipped with a warning.
    pub fn from_config(config: &ResolverConfig, factory: &SourceFactory) -> Self {
        let mut sources = Vec::with_capacity(config.sources.len());
        for spec in &config.sources {
            match create_source(spec, factory) {
                Ok(source) => sources.push(source),
                Err(e) => warn!(
                    resolver = %config.name,
                    spec = %spec,
                    error = %e,
                    "Skipping source that could not be loaded"
                ),
            }
        }

        Self::new(&config.name, &config.domains, &config.search, sources)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub fn search_domains(&self) -> &[String] {
        &self.search
    }

    /// Answer `request`, trying the search suffixes when the name itself
    /// finds nothing. Records of a suffixed answer are renamed back to the
    /// name the client asked for.
    pub async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let Some(question) = request.queries().first() else {
            return Ok(None);
        };

        ctx.visited.push(self.name.clone());

        let asked = question.name().clone();
        let domain = normalize_domain(&asked.to_ascii());
        if !self.filter.matches(&domain) {
            return Ok(None);
        }

        if let Some(response) = self.resolve(rcon, ctx, request).await? {
            return Ok(Some(response));
        }

        for suffix in &self.search {
            let Ok(searched) = fqdn(&format!("{domain}.{suffix}")) else {
                continue;
            };
            let search_request = with_question_name(request, &searched);

            if let Some(mut response) = self.resolve(rcon, ctx, &search_request).await? {
                debug!(resolver = %self.name, name = %domain, suffix = %suffix, "Answered through search domain");
                rename_records(&mut response, &searched, &asked);
                response.take_queries();
                response.add_queries(request.queries().iter().cloned());
                return Ok(Some(response));
            }
        }

        Ok(None)
    }

    async fn resolve(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let cache = ctx.resolver_map.and_then(|map| map.active_cache());

        if let Some(cached) = cache.and_then(|cache| cache.query(&self.name, request)) {
            ctx.cached = true;
            ctx.stored = true;
            if ctx.resolver_used.is_none() {
                ctx.resolver_used = Some(self.name.clone());
            }
            return Ok(Some(cached));
        }

        for source in &self.sources {
            let response = match source.answer(rcon, ctx, request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!(resolver = %self.name, source = %source.name(), error = %e, "Source failed");
                    continue;
                }
            };

            if is_empty_response(response.as_ref()) {
                continue;
            }
            let Some(response) = response else {
                continue;
            };

            if ctx.resolver_used.is_none() {
                ctx.resolver_used = Some(self.name.clone());
            }
            if !ctx.stored {
                if let Some(cache) = cache {
                    cache.store(&self.name, request, &response);
                    ctx.stored = true;
                }
            }
            return Ok(Some(response));
        }

        Ok(None)
    }

    pub async fn close(&self) {
        for source in &self.sources {
            source.close().await;
        }
    }
}
