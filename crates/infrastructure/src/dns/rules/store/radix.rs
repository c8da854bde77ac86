use super::allow_then_block;
use super::radix_tree::RadixTree;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{domain_hierarchy, DomainError, FilterList, RuleMatch};

/// Lists a single tree can tell apart, one bit each.
pub const MAX_LISTS: usize = 64;

/// All lists share one radix tree over rule text; each key carries a bitmap
/// of the lists that hold it.
#[derive(Default)]
pub struct RadixStore {
    tree: RadixTree,
    ordinals: FxHashMap<String, u8>,
}

impl RadixStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn bit(&self, list: &FilterList) -> Option<u64> {
        self.ordinals
            .get(list.canonical_name())
            .map(|ordinal| 1u64 << *ordinal)
    }
}

#[async_trait]
impl RuleStore for RadixStore {
    async fn init(&mut self, _: &Path, lists: &[Arc<FilterList>]) -> Result<(), DomainError> {
        self.tree = RadixTree::new();
        self.ordinals.clear();

        for list in lists {
            if self.ordinals.contains_key(list.canonical_name()) {
                continue;
            }
            if self.ordinals.len() >= MAX_LISTS {
                warn!(
                    list = list.canonical_name(),
                    max = MAX_LISTS,
                    "Radix store is full, list will not be matched"
                );
                continue;
            }
            let ordinal = self.ordinals.len() as u8;
            self.ordinals
                .insert(list.canonical_name().to_string(), ordinal);
        }
        Ok(())
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        if let Some(bit) = self.bit(list) {
            self.tree.clear_bits(bit);
        }
        Ok(())
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        if let Some(bit) = self.bit(list) {
            self.tree.insert(&rule.to_ascii_lowercase(), bit);
        }
        Ok(())
    }

    async fn finalize(&mut self, _: &Path, _: &[Arc<FilterList>]) -> Result<(), DomainError> {
        Ok(())
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        // one tree lookup per level, from the full name up to the TLD
        let levels: SmallVec<[(&str, u64); 8]> = domain_hierarchy(domain)
            .into_iter()
            .map(|name| (name, self.tree.get(name)))
            .filter(|(_, mask)| *mask != 0)
            .collect();
        if levels.is_empty() {
            return RuleMatch::none();
        }

        for list in allow_then_block(lists) {
            let Some(bit) = self.bit(list) else {
                continue;
            };
            if let Some((name, _)) = levels.iter().find(|(_, mask)| mask & bit != 0) {
                return RuleMatch::from_list(list, *name);
            }
        }

        RuleMatch::none()
    }

    async fn close(&mut self) {
        self.tree = RadixTree::new();
        self.ordinals = FxHashMap::default();
    }

    fn kind(&self) -> &'static str {
        "radix"
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use weir_dns_domain::{Match, RuleType};

    #[tokio::test]
    async fn test_shared_cases() {
        fixtures::check_store(|| Box::new(RadixStore::new())).await;
    }

    #[tokio::test]
    async fn test_allow_precedence() {
        fixtures::check_allow_precedence(|| Box::new(RadixStore::new())).await;
    }

    #[tokio::test]
    async fn test_lists_beyond_capacity_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let lists: Vec<_> = (0..MAX_LISTS + 1)
            .map(|idx| fixtures::list(&format!("list{idx}"), RuleType::Block, dir.path()))
            .collect();

        let mut store = RadixStore::new();
        store.init(dir.path(), &lists).await.unwrap();
        for list in &lists {
            store.load(list, "ads.com").await.unwrap();
        }

        let last = &lists[MAX_LISTS];
        assert!(store
            .find_match(std::slice::from_ref(last), "ads.com")
            .await
            .is_none());

        let result = store.find_match(&lists, "ads.com").await;
        assert_eq!(result.decision, Match::Block);
        assert_eq!(result.list_name(), Some("list0"));

        let result = store
            .find_match(&lists[MAX_LISTS - 1..MAX_LISTS], "x.ads.com")
            .await;
        assert_eq!(result.list_name(), Some("list63"));
    }
}
