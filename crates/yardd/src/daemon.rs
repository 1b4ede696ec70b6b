//! Daemon lifecycle: build, restore, run, shut down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use yard_core::YardgridConfig;
use yardgrid_service::YardService;
use yardgrid_state::ResidentRecord;

pub async fn run(config: YardgridConfig, snapshot: Option<PathBuf>) -> anyhow::Result<()> {
    info!("yardgrid daemon starting");

    let service = Arc::new(YardService::new(config)?);

    if let Some(path) = snapshot {
        let residents = load_snapshot(&path)?;
        let report = service.restore(residents).await;
        info!(
            path = %path.display(),
            restored = report.restored,
            replaced = report.replaced,
            rejected = report.rejected.len(),
            "snapshot loaded"
        );
    }

    // ── Background loops ───────────────────────────────────────

    let handles = service.spawn_background();
    info!(
        reoptimize_secs = service.config().reoptimize.interval_secs,
        learning = service.training_progress().is_some(),
        "yardgrid daemon running"
    );

    // ── Shutdown ───────────────────────────────────────────────

    tokio::signal::ctrl_c()
        .await
        .context("failed to install CTRL+C handler")?;
    info!("shutdown signal received");
    service.shutdown();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    let metrics = service.metrics().await;
    info!(
        containers = metrics.total_containers,
        utilization = metrics.yard_utilization,
        overdue = metrics.overdue_containers,
        "yardgrid daemon stopped"
    );
    Ok(())
}

/// Read a JSON array of residents, as written by the persistence layer.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Vec<ResidentRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let residents = serde_json::from_str(&raw)
        .with_context(|| format!("malformed snapshot {}", path.display()))?;
    Ok(residents)
}
