use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use weir_dns_application::ports::RuleEnginePort;
use weir_dns_jobs::{rule_engine_reload, ReloadCoordinator};

mod helpers;
use helpers::{counting_callback, MockRuleEngine};

// ============================================================================
// Tests: change detection
// ============================================================================

#[tokio::test]
async fn test_unchanged_file_fires_nothing() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");
    std::fs::write(&path, "ads.example.com\n").unwrap();
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    let (callback, count) = counting_callback();
    coordinator.register(&path, callback).await;

    // Act
    let changed = coordinator.check_once().await;

    // Assert
    assert_eq!(changed, 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_content_change_fires_once() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");
    std::fs::write(&path, "ads.example.com\n").unwrap();
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    let (callback, count) = counting_callback();
    coordinator.register(&path, callback).await;

    // Act
    std::fs::write(&path, "ads.example.com\ntracker.net\n").unwrap();
    let first = coordinator.check_once().await;
    let second = coordinator.check_once().await;

    // Assert - the new content becomes the baseline
    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rewrite_with_same_content_is_ignored() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hosts");
    std::fs::write(&path, "10.0.0.1 nas.lan\n").unwrap();
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    let (callback, count) = counting_callback();
    coordinator.register(&path, callback).await;

    // Act
    std::fs::write(&path, "10.0.0.1 nas.lan\n").unwrap();

    // Assert
    assert_eq!(coordinator.check_once().await, 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_removal_and_creation_count_as_changes() {
    // Arrange - file absent at registration
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.txt");
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    let (callback, count) = counting_callback();
    coordinator.register(&path, callback).await;

    // Act + Assert - appears
    std::fs::write(&path, "late.example\n").unwrap();
    assert_eq!(coordinator.check_once().await, 1);

    // Act + Assert - disappears
    std::fs::remove_file(&path).unwrap();
    assert_eq!(coordinator.check_once().await, 1);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_shared_callback_fires_once_per_check() {
    // Arrange - one callback on two files
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.txt");
    let second = dir.path().join("b.txt");
    std::fs::write(&first, "a\n").unwrap();
    std::fs::write(&second, "b\n").unwrap();
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    let (callback, count) = counting_callback();
    coordinator.register(&first, Arc::clone(&callback)).await;
    coordinator.register(&second, callback).await;

    // Act
    std::fs::write(&first, "a2\n").unwrap();
    std::fs::write(&second, "b2\n").unwrap();
    let changed = coordinator.check_once().await;

    // Assert
    assert_eq!(changed, 2);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_same_path_accumulates_callbacks() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zone.db");
    std::fs::write(&path, "$ORIGIN lan.\n").unwrap();
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    let (first, first_count) = counting_callback();
    let (second, second_count) = counting_callback();
    coordinator.register(&path, first).await;
    coordinator.register(&path, second).await;

    // Act
    std::fs::write(&path, "$ORIGIN home.\n").unwrap();
    coordinator.check_once().await;

    // Assert
    assert_eq!(coordinator.watched().await, 1);
    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Tests: rule engine callback
// ============================================================================

#[tokio::test]
async fn test_rule_engine_callback_reloads() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");
    std::fs::write(&path, "ads.example.com\n").unwrap();
    let engine = Arc::new(MockRuleEngine::new());
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    coordinator
        .register(&path, rule_engine_reload(engine.clone() as Arc<dyn RuleEnginePort>))
        .await;

    // Act
    std::fs::write(&path, "tracker.net\n").unwrap();
    coordinator.check_once().await;

    // Assert
    assert_eq!(engine.generation(), 2);
}

#[tokio::test]
async fn test_failed_reload_is_contained() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");
    std::fs::write(&path, "ads.example.com\n").unwrap();
    let engine = Arc::new(MockRuleEngine::failing());
    let coordinator = ReloadCoordinator::new(Duration::from_secs(60));
    coordinator
        .register(&path, rule_engine_reload(engine.clone() as Arc<dyn RuleEnginePort>))
        .await;

    // Act
    std::fs::write(&path, "tracker.net\n").unwrap();
    let changed = coordinator.check_once().await;

    // Assert - change recorded, generation untouched
    assert_eq!(changed, 1);
    assert_eq!(engine.generation(), 1);
}

// ============================================================================
// Tests: background polling
// ============================================================================

#[tokio::test]
async fn test_polling_detects_change_and_stops_on_cancel() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");
    std::fs::write(&path, "one\n").unwrap();
    let token = CancellationToken::new();
    let coordinator = Arc::new(
        ReloadCoordinator::new(Duration::from_millis(20)).with_cancellation(token.clone()),
    );
    let (callback, count) = counting_callback();
    coordinator.register(&path, callback).await;

    // Act
    coordinator.clone().start().await;
    std::fs::write(&path, "two\n").unwrap();

    let mut waited = 0;
    while count.load(Ordering::SeqCst) == 0 && waited < 100 {
        sleep(Duration::from_millis(20)).await;
        waited += 1;
    }

    // Assert
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Act - changes after cancellation go unnoticed
    token.cancel();
    sleep(Duration::from_millis(60)).await;
    std::fs::write(&path, "three\n").unwrap();
    sleep(Duration::from_millis(100)).await;

    // Assert
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
