use super::allow_then_block;
use async_trait::async_trait;
use bloomfilter::Bloom;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{domain_hierarchy, DomainError, FilterList, RuleMatch};

pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.005;
pub const DEFAULT_ITEM_COUNT: usize = 100_000;

/// One bloom filter per list.
///
/// A filter hit only makes a rule a candidate. With a backing store, every
/// load is forwarded to it and each candidate is confirmed there; without
/// one, candidates are reported as matches and false positives go through.
pub struct BloomStore {
    filters: FxHashMap<String, Bloom<str>>,
    false_positive_rate: f64,
    default_count: usize,
    backing: Option<Box<dyn RuleStore>>,
}

impl BloomStore {
    pub fn new(false_positive_rate: f64, default_count: usize) -> Self {
        Self {
            filters: FxHashMap::default(),
            false_positive_rate,
            default_count: default_count.max(1),
            backing: None,
        }
    }

    pub fn with_backing(mut self, backing: Box<dyn RuleStore>) -> Self {
        self.backing = Some(backing);
        self
    }

    fn new_filter(&self, items: usize) -> Result<Bloom<str>, DomainError> {
        Bloom::new_for_fp_rate(items.max(1), self.false_positive_rate)
            .map_err(|e| DomainError::StoreError(format!("bloom filter: {e}")))
    }

    fn candidate(&self, list: &FilterList, name: &str) -> bool {
        self.filters
            .get(list.canonical_name())
            .is_some_and(|filter| filter.check(name))
    }
}

impl Default for BloomStore {
    fn default() -> Self {
        Self::new(DEFAULT_FALSE_POSITIVE_RATE, DEFAULT_ITEM_COUNT)
    }
}

/// Lines in the list file, used to size its filter.
async fn count_lines(path: &Path) -> std::io::Result<usize> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut count = 0;
    while lines.next_line().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

#[async_trait]
impl RuleStore for BloomStore {
    async fn init(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        self.filters.clear();
        for list in lists {
            let items = match count_lines(&list.path).await {
                Ok(count) => count,
                Err(e) => {
                    debug!(
                        list = list.canonical_name(),
                        error = %e,
                        default = self.default_count,
                        "Sizing bloom filter with default count"
                    );
                    self.default_count
                }
            };
            let filter = self.new_filter(items)?;
            self.filters.insert(list.canonical_name().to_string(), filter);
        }

        if let Some(backing) = self.backing.as_mut() {
            backing.init(session_root, lists).await?;
        }
        Ok(())
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        if let Some(filter) = self.filters.get_mut(list.canonical_name()) {
            filter.clear();
        }
        if let Some(backing) = self.backing.as_mut() {
            backing.clear(list).await?;
        }
        Ok(())
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        if !self.filters.contains_key(list.canonical_name()) {
            warn!(list = list.canonical_name(), "Loading into a list that was not initialised");
            let filter = self.new_filter(self.default_count)?;
            self.filters.insert(list.canonical_name().to_string(), filter);
        }
        if let Some(filter) = self.filters.get_mut(list.canonical_name()) {
            filter.set(rule);
        }
        if let Some(backing) = self.backing.as_mut() {
            backing.load(list, rule).await?;
        }
        Ok(())
    }

    async fn finalize(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        if let Some(backing) = self.backing.as_mut() {
            backing.finalize(session_root, lists).await?;
        }
        Ok(())
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        let hierarchy = domain_hierarchy(domain);

        for list in allow_then_block(lists) {
            let Some(name) = hierarchy.iter().find(|&&name| self.candidate(list, name)) else {
                continue;
            };

            let Some(backing) = self.backing.as_ref() else {
                return RuleMatch::from_list(list, *name);
            };

            let confirmed = backing.find_match(std::slice::from_ref(list), domain).await;
            if !confirmed.is_none() {
                return confirmed;
            }
        }

        RuleMatch::none()
    }

    async fn close(&mut self) {
        self.filters = FxHashMap::default();
        if let Some(backing) = self.backing.as_mut() {
            backing.close().await;
        }
    }

    fn kind(&self) -> &'static str {
        "bloom"
    }
}
