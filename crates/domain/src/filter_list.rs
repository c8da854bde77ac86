use crate::rule::RuleType;
use serde::Serialize;
use std::path::PathBuf;

/// A named, typed collection of rules backed by a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterList {
    pub name: String,
    pub short_name: String,
    pub list_type: RuleType,
    pub tags: Vec<String>,
    pub source: String,
    pub path: PathBuf,
}

impl FilterList {
    pub fn new(
        name: impl Into<String>,
        list_type: RuleType,
        source: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        let name = name.into();
        let source = source.into();
        let canonical = if name.is_empty() { &source } else { &name };
        let short_name = short_name(canonical);
        Self {
            name,
            short_name,
            list_type,
            tags: Vec::new(),
            source,
            path: path.into(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// The configured name, or the source when no name was given.
    pub fn canonical_name(&self) -> &str {
        if self.name.is_empty() {
            &self.source
        } else {
            &self.name
        }
    }

    pub fn is_allow(&self) -> bool {
        self.list_type == RuleType::Allow
    }

    pub fn is_remote(&self) -> bool {
        is_remote_source(&self.source)
    }
}

pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Lowercase identifier safe for file and table names.
pub fn short_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if out.is_empty() {
        out.push_str("list");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_falls_back_to_source() {
        let named = FilterList::new("Ads", RuleType::Block, "/tmp/ads.txt", "/tmp/ads.txt");
        assert_eq!(named.canonical_name(), "Ads");

        let unnamed = FilterList::new("", RuleType::Block, "/tmp/ads.txt", "/tmp/ads.txt");
        assert_eq!(unnamed.canonical_name(), "/tmp/ads.txt");
        assert_eq!(unnamed.short_name, "tmp_ads_txt");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Test List 1"), "test_list_1");
        assert_eq!(short_name("--"), "list");
        assert_eq!(short_name("StevenBlack hosts!"), "stevenblack_hosts");
    }
}
