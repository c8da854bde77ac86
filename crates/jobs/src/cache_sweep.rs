use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use weir_dns_infrastructure::dns::DnsCache;

/// Periodically drops answers older than `max_age` from the shared cache.
pub struct CacheSweepJob {
    cache: Arc<DnsCache>,
    max_age: Duration,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheSweepJob {
    pub fn new(cache: Arc<DnsCache>, max_age: Duration) -> Self {
        Self {
            cache,
            max_age,
            interval_secs: 60,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// One sweep; returns the number of entries removed.
    pub fn run_once(&self) -> usize {
        let removed = self.cache.sweep(self.max_age);
        if removed > 0 {
            info!(removed, remaining = self.cache.len(), "Cache sweep completed");
        } else {
            debug!(entries = self.cache.len(), "Cache sweep found nothing to remove");
        }
        removed
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            max_age_secs = self.max_age.as_secs(),
            "Starting cache sweep job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("CacheSweepJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once();
                    }
                }
            }
        });
    }
}
