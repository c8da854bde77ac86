use super::allow_then_block;
use crate::dns::rules::hashing::hash32;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{domain_hierarchy, DomainError, FilterList, RuleMatch};

/// Sorted 32-bit rule hashes per list, searched with binary search.
///
/// Half the footprint of [`Hash64Store`](super::Hash64Store) at the price of
/// more collisions. A delegate store, when given, receives every rule and
/// re-checks hash hits so that collisions never block anything.
pub struct Hash32Store {
    hashes: FxHashMap<String, Vec<u32>>,
    delegate: Option<Box<dyn RuleStore>>,
}

impl Hash32Store {
    pub fn new() -> Self {
        Self {
            hashes: FxHashMap::default(),
            delegate: None,
        }
    }

    pub fn with_delegate(delegate: Box<dyn RuleStore>) -> Self {
        Self {
            hashes: FxHashMap::default(),
            delegate: Some(delegate),
        }
    }

    fn contains(&self, list: &FilterList, name: &str) -> bool {
        self.hashes
            .get(list.canonical_name())
            .is_some_and(|sorted| sorted.binary_search(&hash32(name)).is_ok())
    }
}

impl Default for Hash32Store {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for Hash32Store {
    async fn init(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        self.hashes = lists
            .iter()
            .map(|list| (list.canonical_name().to_string(), Vec::new()))
            .collect();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.init(session_root, lists).await?;
        }
        Ok(())
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        if let Some(sorted) = self.hashes.get_mut(list.canonical_name()) {
            sorted.clear();
        }
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.clear(list).await?;
        }
        Ok(())
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        self.hashes
            .entry(list.canonical_name().to_string())
            .or_default()
            .push(hash32(rule));
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.load(list, rule).await?;
        }
        Ok(())
    }

    async fn finalize(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        for sorted in self.hashes.values_mut() {
            sorted.sort_unstable();
            sorted.dedup();
            sorted.shrink_to_fit();
        }
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.finalize(session_root, lists).await?;
        }
        Ok(())
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        let hierarchy = domain_hierarchy(domain);

        for list in allow_then_block(lists) {
            let Some(name) = hierarchy.iter().find(|&&name| self.contains(list, name)) else {
                continue;
            };

            let Some(delegate) = self.delegate.as_ref() else {
                return RuleMatch::from_list(list, *name);
            };

            let confirmed = delegate
                .find_match(std::slice::from_ref(list), domain)
                .await;
            if !confirmed.is_none() {
                return confirmed;
            }
        }

        RuleMatch::none()
    }

    async fn close(&mut self) {
        self.hashes = FxHashMap::default();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.close().await;
        }
    }

    fn kind(&self) -> &'static str {
        "hash32"
    }
}
