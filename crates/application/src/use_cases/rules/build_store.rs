use crate::ports::RuleStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use weir_dns_domain::{parse_line, DomainError, FilterList};

/// Rules loaded per list during one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub lists: Vec<(String, usize)>,
    pub total: usize,
}

impl LoadSummary {
    pub fn count_for(&self, list_name: &str) -> Option<usize> {
        self.lists
            .iter()
            .find(|(name, _)| name == list_name)
            .map(|(_, count)| *count)
    }
}

/// Streams every list file through `parse_line` into a fresh store.
pub struct BuildRuleStoreUseCase;

impl BuildRuleStoreUseCase {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        store: &mut dyn RuleStore,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<LoadSummary, DomainError> {
        tokio::fs::create_dir_all(session_root).await?;
        store.init(session_root, lists).await?;

        let mut summary = LoadSummary::default();
        for list in lists {
            let count = match Self::load_list(store, list).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(
                        list = list.canonical_name(),
                        path = %list.path.display(),
                        error = %e,
                        "Skipping list that could not be loaded"
                    );
                    store.clear(list).await?;
                    0
                }
            };

            debug!(list = list.canonical_name(), rules = count, "List loaded");
            summary.total += count;
            summary
                .lists
                .push((list.canonical_name().to_string(), count));
        }

        store.finalize(session_root, lists).await?;

        info!(
            store = store.kind(),
            lists = lists.len(),
            rules = summary.total,
            "Rule store built"
        );

        Ok(summary)
    }

    async fn load_list(store: &mut dyn RuleStore, list: &FilterList) -> Result<usize, DomainError> {
        let file = tokio::fs::File::open(&list.path).await?;
        let mut lines = BufReader::new(file).split(b'\n');

        let mut count = 0;
        let mut number = 0usize;
        while let Some(raw) = lines.next_segment().await? {
            number += 1;
            let Ok(line) = std::str::from_utf8(&raw) else {
                debug!(
                    list = list.canonical_name(),
                    line = number,
                    "Skipping line that is not valid UTF-8"
                );
                continue;
            };
            if let Some(rule) = parse_line(line) {
                store.load(list, &rule).await?;
                count += 1;
            }
        }

        Ok(count)
    }
}

impl Default for BuildRuleStoreUseCase {
    fn default() -> Self {
        Self::new()
    }
}
