#![allow(dead_code)]

use async_trait::async_trait;
use futures::future::FutureExt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use weir_dns_application::ports::RuleEnginePort;
use weir_dns_application::use_cases::LoadSummary;
use weir_dns_domain::{DomainError, RuleMatch};
use weir_dns_jobs::ReloadCallback;

// ============================================================================
// Counting callback
// ============================================================================

pub fn counting_callback() -> (ReloadCallback, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let callback: ReloadCallback = Arc::new(move || {
        let seen = Arc::clone(&seen);
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    });
    (callback, count)
}

// ============================================================================
// Mock RuleEnginePort
// ============================================================================

pub struct MockRuleEngine {
    generation: AtomicU64,
    should_fail: bool,
}

impl MockRuleEngine {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(1),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            generation: AtomicU64::new(1),
            should_fail: true,
        }
    }
}

#[async_trait]
impl RuleEnginePort for MockRuleEngine {
    async fn find_match(&self, _list_names: &[String], _domain: &str) -> RuleMatch {
        RuleMatch::none()
    }

    async fn reload(&self) -> Result<LoadSummary, DomainError> {
        if self.should_fail {
            return Err(DomainError::IoError("list directory gone".into()));
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(LoadSummary {
            lists: vec![("ads".to_string(), 3)],
            total: 3,
        })
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
