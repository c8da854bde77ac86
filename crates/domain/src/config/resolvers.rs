use serde::{Deserialize, Serialize};

/// One `[[resolvers]]` entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    pub name: String,

    /// Only answer for these domains (exact, subdomain, or glob with `*`).
    /// Empty means every domain.
    #[serde(default)]
    pub domains: Vec<String>,

    /// Suffixes appended to the query name when nothing answers
    #[serde(default)]
    pub search: Vec<String>,

    /// Ordered source specifications
    pub sources: Vec<String>,
}

/// A named group of source specifications usable from any resolver
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,

    pub specs: Vec<String>,

    /// Round robin over `specs` instead of trying them in order
    #[serde(default)]
    pub load_balance: bool,
}

/// Resolver asked when a consumer names none.
pub const DEFAULT_RESOLVER: &str = "default";

pub(crate) fn default_resolvers() -> Vec<ResolverConfig> {
    vec![ResolverConfig {
        name: DEFAULT_RESOLVER.to_string(),
        domains: Vec::new(),
        search: Vec::new(),
        sources: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
    }]
}
