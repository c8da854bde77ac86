use crate::filter_list::{is_remote_source, FilterList};
use crate::rule::RuleType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One `[[lists]]` entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListConfig {
    #[serde(default)]
    pub name: String,

    /// "allow" or "block" (default: "block")
    #[serde(rename = "type", default)]
    pub list_type: RuleType,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Local path or http(s) URL
    pub src: String,
}

impl ListConfig {
    pub fn canonical_name(&self) -> &str {
        if self.name.is_empty() {
            &self.src
        } else {
            &self.name
        }
    }

    /// Remote lists live in `lists_root` under their canonical name.
    pub fn local_path(&self, lists_root: &Path) -> PathBuf {
        if is_remote_source(&self.src) {
            lists_root.join(format!("{}.list", self.canonical_name()))
        } else {
            PathBuf::from(&self.src)
        }
    }

    pub fn to_filter_list(&self, lists_root: &Path) -> FilterList {
        FilterList::new(
            self.name.clone(),
            self.list_type,
            self.src.clone(),
            self.local_path(lists_root),
        )
        .with_tags(self.tags.clone())
    }
}

/// One `[[groups]]` entry tying consumers to lists
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GroupConfig {
    pub name: String,

    /// Groups whose lists and tags are copied into this one
    #[serde(default)]
    pub inherit: Vec<String>,

    /// Lists assigned by name
    #[serde(default)]
    pub lists: Vec<String>,

    /// Lists assigned by sharing any of these tags
    #[serde(default)]
    pub tags: Vec<String>,
}
