use crate::{CacheSweepJob, ReloadCoordinator};
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for all background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_reload(coordinator)
///     .with_cache_sweep(CacheSweepJob::new(cache, Duration::from_secs(300)))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    reload: Option<Arc<ReloadCoordinator>>,
    cache_sweep: Option<CacheSweepJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            reload: None,
            cache_sweep: None,
        }
    }

    /// The coordinator stays shared so callers can keep registering files.
    pub fn with_reload(mut self, coordinator: Arc<ReloadCoordinator>) -> Self {
        self.reload = Some(coordinator);
        self
    }

    pub fn with_cache_sweep(mut self, job: CacheSweepJob) -> Self {
        self.cache_sweep = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(coordinator) = self.reload {
            coordinator.start().await;
        }

        if let Some(job) = self.cache_sweep {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
