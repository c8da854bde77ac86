use crate::di::Services;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use weir_dns_jobs::{JobRunner, ReloadCoordinator};

/// Start background jobs and keep serving reloads until ctrl-c.
pub async fn run_watch(services: &Services) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let mut runner = JobRunner::new();

    if services.config.reload.enabled {
        let coordinator = Arc::new(
            ReloadCoordinator::new(Duration::from_millis(services.config.reload.poll_interval_ms))
                .with_cancellation(shutdown.clone()),
        );
        services.register_reloads(&coordinator).await;
        runner = runner.with_reload(coordinator);
    }

    if services.config.cache.enabled {
        runner = runner.with_cache_sweep(services.cache_sweep_job().with_cancellation(shutdown.clone()));
    }

    runner.start().await;
    info!("Watching for changes, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    Ok(())
}
