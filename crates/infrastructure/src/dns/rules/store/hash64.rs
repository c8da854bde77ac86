use super::first_match;
use crate::dns::rules::hashing::hash64;
use async_trait::async_trait;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{DomainError, FilterList, RuleMatch};

type HashSet64 = HashSet<u64, FxBuildHasher>;

/// One set of 64-bit rule hashes per list.
#[derive(Default)]
pub struct Hash64Store {
    hashes: FxHashMap<String, HashSet64>,
}

impl Hash64Store {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for Hash64Store {
    async fn init(&mut self, _: &Path, lists: &[Arc<FilterList>]) -> Result<(), DomainError> {
        self.hashes = lists
            .iter()
            .map(|list| (list.canonical_name().to_string(), HashSet64::default()))
            .collect();
        Ok(())
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        if let Some(set) = self.hashes.get_mut(list.canonical_name()) {
            set.clear();
        }
        Ok(())
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        self.hashes
            .entry(list.canonical_name().to_string())
            .or_default()
            .insert(hash64(rule));
        Ok(())
    }

    async fn finalize(&mut self, _: &Path, _: &[Arc<FilterList>]) -> Result<(), DomainError> {
        for set in self.hashes.values_mut() {
            set.shrink_to_fit();
        }
        Ok(())
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        first_match(lists, domain, |list, name| {
            self.hashes
                .get(list.canonical_name())
                .is_some_and(|set| set.contains(&hash64(name)))
        })
    }

    async fn close(&mut self) {
        self.hashes = FxHashMap::default();
    }

    fn kind(&self) -> &'static str {
        "hash64"
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[tokio::test]
    async fn test_shared_cases() {
        fixtures::check_store(|| Box::new(Hash64Store::new())).await;
    }

    #[tokio::test]
    async fn test_allow_precedence() {
        fixtures::check_allow_precedence(|| Box::new(Hash64Store::new())).await;
    }
}
