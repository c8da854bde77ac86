use super::allow_then_block;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{domain_hierarchy, DomainError, FilterList, RuleMatch, RuleType};

/// Plain map from rule text to the lists that carry it.
///
/// The reference backend: largest footprint, no false positives.
#[derive(Default)]
pub struct MemoryStore {
    rules: FxHashMap<String, FxHashMap<String, RuleType>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn init(&mut self, _: &Path, _: &[Arc<FilterList>]) -> Result<(), DomainError> {
        self.rules.clear();
        Ok(())
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        let name = list.canonical_name();
        self.rules.retain(|_, owners| {
            owners.remove(name);
            !owners.is_empty()
        });
        Ok(())
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        let rule_type = list.list_type;
        self.rules
            .entry(rule.to_ascii_lowercase())
            .or_default()
            .entry(list.canonical_name().to_string())
            .and_modify(|existing| {
                if *existing != RuleType::Allow {
                    *existing = rule_type;
                }
            })
            .or_insert(rule_type);
        Ok(())
    }

    async fn finalize(&mut self, _: &Path, _: &[Arc<FilterList>]) -> Result<(), DomainError> {
        self.rules.shrink_to_fit();
        Ok(())
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        let hierarchy = domain_hierarchy(domain);

        for list in allow_then_block(lists) {
            for name in &hierarchy {
                let found = self
                    .rules
                    .get(*name)
                    .and_then(|owners| owners.get(list.canonical_name()));
                if let Some(rule_type) = found {
                    return RuleMatch::new(rule_type.as_match(), list, *name);
                }
            }
        }

        RuleMatch::none()
    }

    async fn close(&mut self) {
        self.rules = FxHashMap::default();
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[tokio::test]
    async fn test_shared_cases() {
        fixtures::check_store(|| Box::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn test_allow_precedence() {
        fixtures::check_allow_precedence(|| Box::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn test_duplicate_loads_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let list = fixtures::list("ads", RuleType::Block, dir.path());

        let mut store = MemoryStore::new();
        store.init(dir.path(), &[Arc::clone(&list)]).await.unwrap();
        store.load(&list, "ads.com").await.unwrap();
        store.load(&list, "ADS.com").await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
