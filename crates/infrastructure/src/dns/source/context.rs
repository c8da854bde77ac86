use crate::dns::resolver::ResolverMap;
use crate::dns::transport::Protocol;

/// Facts about the client request that sources may adapt to.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    pub protocol: Protocol,
}

impl RequestContext {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

/// Per-query bookkeeping, owned by exactly one resolution call stack.
#[derive(Default)]
pub struct ResolutionContext<'a> {
    /// Map that started the resolution; enables caching and resolver chaining.
    pub resolver_map: Option<&'a ResolverMap>,
    /// Resolver names already entered, in order.
    pub visited: Vec<String>,
    /// Set once the answer is in the cache or must never be cached.
    pub stored: bool,
    pub cached: bool,
    pub resolver_used: Option<String>,
    pub source_used: Option<String>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(resolver_map: &'a ResolverMap) -> Self {
        Self {
            resolver_map: Some(resolver_map),
            ..Self::default()
        }
    }

    pub fn has_visited(&self, resolver: &str) -> bool {
        self.visited.iter().any(|name| name == resolver)
    }

    pub fn set_source_used_if_unset(&mut self, source: impl Into<String>) {
        if self.source_used.is_none() {
            self.source_used = Some(source.into());
        }
    }
}
