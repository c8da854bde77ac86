use super::errors::ConfigError;
use super::resolvers::default_resolvers;
use super::{
    CacheConfig, EngineConfig, GroupConfig, ListConfig, LoggingConfig, ReloadConfig,
    ResolverConfig, SourceConfig, StoreConfig, UpstreamConfig, STORE_KINDS,
};
use crate::filter_list::FilterList;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Name of the group used when none is configured or requested.
pub const DEFAULT_GROUP: &str = "default";

const SEARCH_PATHS: &[&str] = &["weir.toml", "/etc/weir/weir.toml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub reload: ReloadConfig,

    #[serde(default)]
    pub lists: Vec<ListConfig>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<ResolverConfig>,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
            reload: ReloadConfig::default(),
            lists: Vec::new(),
            groups: Vec::new(),
            resolvers: default_resolvers(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `config_path`, or the first file found on the search path,
    /// or fall back to defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::from_file(path);
        }

        for candidate in SEARCH_PATHS {
            if Path::new(candidate).exists() {
                return Self::from_file(candidate);
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.store.kind.to_ascii_lowercase();
        if !STORE_KINDS.contains(&kind.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown store kind '{}'",
                self.store.kind
            )));
        }
        if let Some(backing) = &self.store.backing {
            let backing = backing.to_ascii_lowercase();
            if !STORE_KINDS.contains(&backing.as_str()) || backing == "bloom" {
                return Err(ConfigError::Validation(format!(
                    "store backing '{}' is not a usable backend",
                    backing
                )));
            }
        }
        let rate = self.store.bloom_false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(ConfigError::Validation(format!(
                "bloom_false_positive_rate must be between 0 and 1, got {}",
                rate
            )));
        }

        let mut resolver_names = HashSet::new();
        for resolver in &self.resolvers {
            if resolver.name.trim().is_empty() {
                return Err(ConfigError::Validation("resolver without a name".into()));
            }
            if !resolver_names.insert(resolver.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate resolver '{}'",
                    resolver.name
                )));
            }
            if resolver.sources.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "resolver '{}' has no sources",
                    resolver.name
                )));
            }
        }

        for source in &self.sources {
            if source.specs.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{}' has no specs",
                    source.name
                )));
            }
        }

        let mut list_names = HashSet::new();
        for list in &self.lists {
            if list.src.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "list '{}' has no src",
                    list.name
                )));
            }
            if !list_names.insert(list.canonical_name()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate list '{}'",
                    list.canonical_name()
                )));
            }
        }

        let group_names: HashSet<&str> = self.groups.iter().map(|g| g.name.as_str()).collect();
        for group in &self.groups {
            for name in &group.lists {
                if !list_names.contains(name.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "group '{}' references unknown list '{}'",
                        group.name, name
                    )));
                }
            }
            for parent in &group.inherit {
                if !group_names.contains(parent.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "group '{}' inherits unknown group '{}'",
                        group.name, parent
                    )));
                }
            }
        }

        Ok(())
    }

    /// Every configured list with its on-disk path resolved.
    pub fn filter_lists(&self) -> Vec<FilterList> {
        let lists_root = self.engine.lists_root();
        self.lists
            .iter()
            .map(|list| list.to_filter_list(&lists_root))
            .collect()
    }

    /// Canonical names of the lists assigned to a group, in configuration
    /// order. Lists are assigned by name, by shared tag, or through inherited
    /// groups. Without any configured groups, `default` gets every list.
    pub fn group_list_names(&self, group: &str) -> Option<Vec<String>> {
        if self.groups.is_empty() {
            return (group == DEFAULT_GROUP).then(|| {
                self.lists
                    .iter()
                    .map(|l| l.canonical_name().to_string())
                    .collect()
            });
        }

        let mut names = HashSet::new();
        let mut tags = HashSet::new();
        let mut visited = HashSet::new();
        if !self.collect_group(group, &mut names, &mut tags, &mut visited) {
            return None;
        }

        Some(
            self.lists
                .iter()
                .filter(|list| {
                    names.contains(list.canonical_name())
                        || list.tags.iter().any(|t| tags.contains(t.as_str()))
                })
                .map(|list| list.canonical_name().to_string())
                .collect(),
        )
    }

    fn collect_group<'a>(
        &'a self,
        group: &str,
        names: &mut HashSet<&'a str>,
        tags: &mut HashSet<&'a str>,
        visited: &mut HashSet<String>,
    ) -> bool {
        if !visited.insert(group.to_string()) {
            return true;
        }
        let Some(config) = self.groups.iter().find(|g| g.name == group) else {
            return false;
        };
        names.extend(config.lists.iter().map(String::as_str));
        tags.extend(config.tags.iter().map(String::as_str));
        for parent in &config.inherit {
            self.collect_group(parent, names, tags, visited);
        }
        true
    }
}
