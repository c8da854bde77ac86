use futures::future::{BoxFuture, FutureExt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use weir_dns_application::ports::RuleEnginePort;

/// Invoked after a watched file's content changed.
pub type ReloadCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

type ContentHash = [u8; 32];

struct Watch {
    path: PathBuf,
    hash: Option<ContentHash>,
    callbacks: Vec<ReloadCallback>,
}

/// Polls registered files and fires their callbacks when the content hash
/// changes. A file that disappears or appears also counts as a change.
pub struct ReloadCoordinator {
    watches: Mutex<Vec<Watch>>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReloadCoordinator {
    pub fn new(interval: Duration) -> Self {
        Self {
            watches: Mutex::new(Vec::new()),
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Watch `path`, remembering its current content as the baseline.
    pub async fn register(&self, path: impl AsRef<Path>, callback: ReloadCallback) {
        let path = path.as_ref();
        let mut watches = self.watches.lock().await;

        if let Some(watch) = watches.iter_mut().find(|watch| watch.path == path) {
            watch.callbacks.push(callback);
            return;
        }

        let hash = content_hash(path).await;
        debug!(path = %path.display(), exists = hash.is_some(), "Watching file");
        watches.push(Watch {
            path: path.to_path_buf(),
            hash,
            callbacks: vec![callback],
        });
    }

    pub async fn watched(&self) -> usize {
        self.watches.lock().await.len()
    }

    /// Hash every watched file once and fire callbacks for the changed ones.
    /// Returns how many files changed.
    pub async fn check_once(&self) -> usize {
        let mut fired: Vec<ReloadCallback> = Vec::new();
        let mut changed = 0;

        {
            let mut watches = self.watches.lock().await;
            for watch in watches.iter_mut() {
                let hash = content_hash(&watch.path).await;
                if hash == watch.hash {
                    continue;
                }

                info!(path = %watch.path.display(), "Watched file changed");
                watch.hash = hash;
                changed += 1;
                for callback in &watch.callbacks {
                    if !fired.iter().any(|seen| Arc::ptr_eq(seen, callback)) {
                        fired.push(Arc::clone(callback));
                    }
                }
            }
        }

        for callback in fired {
            callback().await;
        }

        changed
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            files = self.watched().await,
            "Starting reload coordinator"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("ReloadCoordinator: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let changed = self.check_once().await;
                        if changed > 0 {
                            debug!(changed, "ReloadCoordinator: callbacks fired");
                        }
                    }
                }
            }
        });
    }
}

/// Callback that rebuilds the rule engine and logs the outcome.
pub fn rule_engine_reload(engine: Arc<dyn RuleEnginePort>) -> ReloadCallback {
    Arc::new(move || {
        let engine = Arc::clone(&engine);
        async move {
            match engine.reload().await {
                Ok(summary) => info!(
                    generation = engine.generation(),
                    rules = summary.total,
                    "ReloadCoordinator: rule engine reloaded"
                ),
                Err(e) => error!(error = %e, "ReloadCoordinator: rule engine reload failed"),
            }
        }
        .boxed()
    })
}

async fn content_hash(path: &Path) -> Option<ContentHash> {
    match tokio::fs::read(path).await {
        Ok(content) => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&Sha256::digest(&content));
            Some(hash)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read watched file");
            None
        }
    }
}
