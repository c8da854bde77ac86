use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weir_dns_domain::config::ListConfig;
use weir_dns_domain::{Config, Match, RuleType};
use weir_dns_infrastructure::dns::RuleEngine;

fn engine_config(home: &Path, kind: &str, list: &Path) -> Config {
    let mut config = Config::default();
    config.engine.home = home.display().to_string();
    config.store.kind = kind.to_string();
    config.lists = vec![ListConfig {
        name: "flip".to_string(),
        list_type: RuleType::Block,
        tags: Vec::new(),
        src: list.display().to_string(),
    }];
    config
}

// ============================================================================
// Readers never observe a half built generation
// ============================================================================

async fn run_swap_under_load(kind: &str) {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("flip.txt");
    std::fs::write(&list, "a.com\n").unwrap();

    let engine = Arc::new(
        RuleEngine::build(engine_config(dir.path(), kind, &list))
            .await
            .unwrap(),
    );
    let names = vec!["flip".to_string()];
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        let names = names.clone();
        let done = Arc::clone(&done);
        readers.push(tokio::spawn(async move {
            let mut checks = 0usize;
            while !done.load(Ordering::SeqCst) {
                let generation = engine.current();
                let a = generation.find_match(&names, "a.com").await.decision;
                let b = generation.find_match(&names, "b.com").await.decision;
                assert!(
                    (a == Match::Block) ^ (b == Match::Block),
                    "generation {} matched a={a:?} b={b:?}",
                    generation.id()
                );
                checks += 1;
                tokio::task::yield_now().await;
            }
            checks
        }));
    }

    for round in 0..10 {
        let content = if round % 2 == 0 { "b.com\n" } else { "a.com\n" };
        std::fs::write(&list, content).unwrap();
        let summary = engine.reload().await.unwrap();
        assert_eq!(summary.count_for("flip"), Some(1));
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }
    assert_eq!(engine.current().id(), 11);
    assert_eq!(
        engine.find_match(&names, "a.com").await.decision,
        Match::Block
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_during_reload_memory() {
    run_swap_under_load("memory").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_during_reload_sqlite() {
    run_swap_under_load("sqlite").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retired_sessions_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("flip.txt");
    std::fs::write(&list, "a.com\n").unwrap();

    let engine = RuleEngine::build(engine_config(dir.path(), "sqlite", &list))
        .await
        .unwrap();
    let first_root = engine.current().session_root().to_path_buf();
    assert!(first_root.exists());

    engine.reload().await.unwrap();
    engine.reload().await.unwrap();
    let live_root = engine.current().session_root().to_path_buf();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while first_root.exists() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!first_root.exists());
    assert!(live_root.exists());

    engine.close().await;
    assert!(!live_root.exists());
}
