use super::factory::create_store;
use crate::dns::release::wait_for_release;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use weir_dns_application::ports::{RuleEnginePort, RuleStore};
use weir_dns_application::use_cases::{BuildRuleStoreUseCase, LoadSummary};
use weir_dns_domain::{normalize_domain, Config, DomainError, FilterList, RuleMatch};

/// One complete, read-only build of every configured list.
pub struct RuleGeneration {
    id: u64,
    store: Box<dyn RuleStore>,
    lists: Vec<Arc<FilterList>>,
    session_root: PathBuf,
    summary: LoadSummary,
}

impl RuleGeneration {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn lists(&self) -> &[Arc<FilterList>] {
        &self.lists
    }

    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    pub fn session_root(&self) -> &Path {
        &self.session_root
    }

    /// This generation's lists whose canonical name is in `names`, in
    /// configuration order.
    pub fn select(&self, names: &[String]) -> Vec<Arc<FilterList>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        self.lists
            .iter()
            .filter(|list| wanted.contains(list.canonical_name()))
            .cloned()
            .collect()
    }

    pub async fn find_match(&self, names: &[String], domain: &str) -> RuleMatch {
        let selected = self.select(names);
        if selected.is_empty() {
            return RuleMatch::none();
        }
        let domain = normalize_domain(domain);
        self.store.find_match(&selected, &domain).await
    }

    async fn retire(mut self) {
        self.store.close().await;
        if let Err(e) = tokio::fs::remove_dir_all(&self.session_root).await {
            warn!(
                generation = self.id,
                path = %self.session_root.display(),
                error = %e,
                "Could not remove session directory"
            );
        }
    }
}

/// Serves rule lookups from the current generation and swaps in new ones.
///
/// Readers load a snapshot and evaluate entirely against it, so a reload
/// never shows them a half-built store. A replaced generation is closed,
/// and its session directory removed, once the last reader lets go of it.
pub struct RuleEngine {
    config: ArcSwap<Config>,
    current: ArcSwap<RuleGeneration>,
    next_id: AtomicU64,
    reload_lock: Mutex<()>,
}

impl RuleEngine {
    /// Build the first generation from `config`.
    pub async fn build(config: Config) -> Result<Self, DomainError> {
        info!(
            store = %config.store.kind,
            lists = config.lists.len(),
            home = %config.engine.home,
            "Building rule engine"
        );

        // sessions of an earlier process are never reused
        let sessions_root = config.engine.sessions_root();
        if tokio::fs::try_exists(&sessions_root).await.unwrap_or(false) {
            debug!(path = %sessions_root.display(), "Removing stale sessions");
            tokio::fs::remove_dir_all(&sessions_root).await?;
        }

        let generation = build_generation(&config, 1).await?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            current: ArcSwap::from_pointee(generation),
            next_id: AtomicU64::new(2),
            reload_lock: Mutex::new(()),
        })
    }

    /// Snapshot of the generation serving reads.
    pub fn current(&self) -> Arc<RuleGeneration> {
        self.current.load_full()
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Replace the configuration used by the next [`reload`](Self::reload).
    pub fn set_config(&self, config: Config) {
        self.config.store(Arc::new(config));
    }

    pub async fn find_match(&self, list_names: &[String], domain: &str) -> RuleMatch {
        let generation = self.current();
        generation.find_match(list_names, domain).await
    }

    /// Evaluate against the lists assigned to `group`.
    pub async fn find_match_for_group(
        &self,
        group: &str,
        domain: &str,
    ) -> Result<RuleMatch, DomainError> {
        let names = self
            .config()
            .group_list_names(group)
            .ok_or_else(|| DomainError::GroupNotFound(group.to_string()))?;
        Ok(self.find_match(&names, domain).await)
    }

    /// Build the next generation and swap it in. Concurrent reloads are
    /// serialised; reads continue on the old generation meanwhile.
    pub async fn reload(&self) -> Result<LoadSummary, DomainError> {
        let _guard = self.reload_lock.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let config = self.config();
        let generation = build_generation(&config, id).await?;
        let summary = generation.summary.clone();

        let old = self.current.swap(Arc::new(generation));
        info!(
            generation = id,
            previous = old.id,
            rules = summary.total,
            "Rule generation swapped in"
        );

        tokio::spawn(async move {
            let old = wait_for_release(old).await;
            let id = old.id;
            old.retire().await;
            debug!(generation = id, "Previous rule generation closed");
        });

        Ok(summary)
    }

    /// Close the current generation once no reader holds it.
    pub async fn close(self) {
        let generation = wait_for_release(self.current.into_inner()).await;
        generation.retire().await;
    }
}

async fn build_generation(config: &Config, id: u64) -> Result<RuleGeneration, DomainError> {
    let lists: Vec<Arc<FilterList>> = config.filter_lists().into_iter().map(Arc::new).collect();
    let session_root = config.engine.sessions_root().join(id.to_string());

    // left over from an earlier run
    if tokio::fs::try_exists(&session_root).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(&session_root).await?;
    }

    let mut store = create_store(&config.store)?;
    let result = BuildRuleStoreUseCase::new()
        .execute(store.as_mut(), &session_root, &lists)
        .await;

    match result {
        Ok(summary) => Ok(RuleGeneration {
            id,
            store,
            lists,
            session_root,
            summary,
        }),
        Err(e) => {
            warn!(generation = id, error = %e, "Rule generation build failed");
            store.close().await;
            let _ = tokio::fs::remove_dir_all(&session_root).await;
            Err(e)
        }
    }
}

#[async_trait]
impl RuleEnginePort for RuleEngine {
    async fn find_match(&self, list_names: &[String], domain: &str) -> RuleMatch {
        RuleEngine::find_match(self, list_names, domain).await
    }

    async fn reload(&self) -> Result<LoadSummary, DomainError> {
        RuleEngine::reload(self).await
    }

    fn generation(&self) -> u64 {
        self.current.load().id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use weir_dns_domain::config::ListConfig;
    use weir_dns_domain::{Match, RuleType};

    fn config_for(home: &Path, kind: &str, lists: &[(&str, RuleType, &Path)]) -> Config {
        let mut config = Config::default();
        config.engine.home = home.display().to_string();
        config.store.kind = kind.to_string();
        config.lists = lists
            .iter()
            .map(|(name, list_type, path)| ListConfig {
                name: name.to_string(),
                list_type: *list_type,
                tags: Vec::new(),
                src: path.display().to_string(),
            })
            .collect();
        config
    }

    #[tokio::test]
    async fn test_build_and_match() {
        let dir = tempfile::tempdir().unwrap();
        let block = dir.path().join("block.txt");
        let allow = dir.path().join("allow.txt");
        std::fs::write(&block, "0.0.0.0 ads.example.com\ntracker.net\n*.doubleclick.net\n").unwrap();
        std::fs::write(&allow, "good.ads.example.com # keep\n").unwrap();

        let config = config_for(
            dir.path(),
            "memory",
            &[("ads", RuleType::Block, block.as_path()), ("ok", RuleType::Allow, allow.as_path())],
        );
        let engine = RuleEngine::build(config).await.unwrap();
        let names = vec!["ads".to_string(), "ok".to_string()];

        assert_eq!(engine.current().summary().count_for("ads"), Some(3));
        assert_eq!(
            engine.find_match(&names, "x.ads.example.com").await.decision,
            Match::Block
        );
        assert_eq!(
            engine.find_match(&names, "good.ads.example.com").await.decision,
            Match::Allow
        );
        assert_eq!(
            engine.find_match(&names, "ad.doubleclick.net").await.decision,
            Match::Block
        );
        assert!(engine.find_match(&names, "example.org").await.is_none());
        assert!(engine
            .find_match(&["ok".to_string()], "x.ads.example.com")
            .await
            .is_none());
        assert!(engine
            .find_match(&["unknown".to_string()], "tracker.net")
            .await
            .is_none());

        let hit = engine
            .find_match_for_group("default", "tracker.net")
            .await
            .unwrap();
        assert_eq!(hit.decision, Match::Block);
        assert!(engine.find_match_for_group("nobody", "tracker.net").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_list_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let config = config_for(dir.path(), "hash64", &[("gone", RuleType::Block, missing.as_path())]);

        let engine = RuleEngine::build(config).await.unwrap();
        assert_eq!(engine.current().summary().count_for("gone"), Some(0));
    }

    #[tokio::test]
    async fn test_reload_swaps_generation_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let block = dir.path().join("block.txt");
        std::fs::write(&block, "first.com\n").unwrap();

        let config = config_for(dir.path(), "sqlite", &[("ads", RuleType::Block, block.as_path())]);
        let engine = RuleEngine::build(config).await.unwrap();
        let names = vec!["ads".to_string()];
        let first_root = engine.current().session_root().to_path_buf();
        assert!(first_root.join("rules.db").exists());
        assert_eq!(RuleEnginePort::generation(&engine), 1);

        std::fs::write(&block, "second.com\n").unwrap();
        engine.reload().await.unwrap();

        assert_eq!(RuleEnginePort::generation(&engine), 2);
        assert!(engine.find_match(&names, "first.com").await.is_none());
        assert_eq!(
            engine.find_match(&names, "second.com").await.decision,
            Match::Block
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while first_root.exists() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!first_root.exists());

        engine.close().await;
    }

    #[tokio::test]
    async fn test_old_generation_outlives_reload_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let block = dir.path().join("block.txt");
        std::fs::write(&block, "old.com\n").unwrap();

        let config = config_for(dir.path(), "memory", &[("ads", RuleType::Block, block.as_path())]);
        let engine = RuleEngine::build(config).await.unwrap();
        let names = vec!["ads".to_string()];

        let held = engine.current();
        std::fs::write(&block, "new.com\n").unwrap();
        engine.reload().await.unwrap();

        // the snapshot keeps answering from its own generation
        assert_eq!(held.find_match(&names, "old.com").await.decision, Match::Block);
        assert!(held.find_match(&names, "new.com").await.is_none());
        assert!(held.session_root().exists());
        drop(held);

        assert!(engine.find_match(&names, "old.com").await.is_none());
    }

    #[tokio::test]
    async fn test_stale_sessions_are_removed_on_build() {
        let dir = tempfile::tempdir().unwrap();
        let block = dir.path().join("block.txt");
        std::fs::write(&block, "stale.com\n").unwrap();
        let stale = dir.path().join("sessions").join("7");
        std::fs::create_dir_all(&stale).unwrap();

        let config = config_for(dir.path(), "hash64", &[("ads", RuleType::Block, block.as_path())]);
        let engine = RuleEngine::build(config).await.unwrap();

        assert!(!stale.exists());
        assert!(engine.current().session_root().ends_with("sessions/1"));
    }

    #[tokio::test]
    async fn test_lookup_ignores_case_and_root_dot_on_every_store() {
        let dir = tempfile::tempdir().unwrap();
        let block = dir.path().join("block.txt");
        std::fs::write(&block, "ads.example.com\n").unwrap();
        let names = vec!["ads".to_string()];

        for kind in ["memory", "hash64", "hash32", "bloom", "radix", "sqlite"] {
            let home = dir.path().join(kind);
            let config = config_for(&home, kind, &[("ads", RuleType::Block, block.as_path())]);
            let engine = RuleEngine::build(config).await.unwrap();

            let hit = engine.find_match(&names, "X.Ads.Example.COM.").await;
            assert_eq!(hit.decision, Match::Block, "store {kind}");
            engine.close().await;
        }
    }
}
