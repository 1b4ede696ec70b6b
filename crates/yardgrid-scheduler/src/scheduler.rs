//! Reoptimization scheduler — plans and commits passes over the live yard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, warn};
use yardgrid_placement::PlacementPolicy;
use yardgrid_state::{YardState, today};

use crate::plan::{PlannedMove, ReoptimizationPlan, compute_plan};

/// Outcome of one reoptimization pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Moves the plan proposed.
    pub planned: usize,
    /// Moves skipped because the yard changed underneath the plan.
    pub skipped: usize,
    /// Moves applied to the live yard, in commit order.
    pub applied: Vec<PlannedMove>,
    /// The pass stopped early on shutdown.
    pub interrupted: bool,
}

impl PassReport {
    pub fn moved(&self) -> usize {
        self.applied.len()
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary {
            planned: self.planned,
            moved: self.moved(),
            skipped: self.skipped,
            interrupted: self.interrupted,
        }
    }
}

/// Serializable counts of a [`PassReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub planned: usize,
    pub moved: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

pub struct ReoptimizationScheduler {
    yard: Arc<RwLock<YardState>>,
    policy: Arc<PlacementPolicy>,
    trigger: Notify,
    stopping: AtomicBool,
    /// Serialises passes; a triggered pass waits for a running one.
    pass_guard: Mutex<()>,
}

impl ReoptimizationScheduler {
    pub fn new(yard: Arc<RwLock<YardState>>, policy: Arc<PlacementPolicy>) -> Self {
        Self {
            yard,
            policy,
            trigger: Notify::new(),
            stopping: AtomicBool::new(false),
            pass_guard: Mutex::new(()),
        }
    }

    /// Ask the background loop to run a pass as soon as possible.
    pub fn request(&self) {
        self.trigger.notify_one();
    }

    /// Stop any running pass after its current move. Further passes are
    /// no-ops.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.trigger.notify_one();
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Run one full pass against today's date.
    pub async fn run_pass(&self) -> PassReport {
        self.run_pass_on(today()).await
    }

    pub async fn run_pass_on(&self, today: NaiveDate) -> PassReport {
        let _pass = self.pass_guard.lock().await;
        if self.is_stopping() {
            return PassReport {
                interrupted: true,
                ..PassReport::default()
            };
        }

        let snapshot = self.yard.read().await.clone();
        let policy = self.policy.clone();
        let planned = tokio::task::spawn_blocking(move || compute_plan(&snapshot, &policy, today)).await;
        let plan = match planned {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "reoptimization planning failed");
                return PassReport::default();
            }
        };

        self.commit(plan).await
    }

    /// Apply `plan` to the live yard, one write-locked move at a time.
    ///
    /// Move history is reset in the first write section, so only moves
    /// made from then on count as this pass's movement.
    pub async fn commit(&self, plan: ReoptimizationPlan) -> PassReport {
        let mut report = PassReport {
            planned: plan.len(),
            ..PassReport::default()
        };
        let mut history_cleared = false;

        for mv in plan.moves {
            if self.is_stopping() {
                report.interrupted = true;
                break;
            }

            let mut yard = self.yard.write().await;
            if !history_cleared {
                yard.clear_move_history();
                history_cleared = true;
            }
            if yard.position(&mv.container_id) != Some(mv.from) {
                debug!(container = %mv.container_id, "container changed since planning, skipping");
                report.skipped += 1;
                continue;
            }
            match yard.move_container(&mv.container_id, mv.to) {
                Ok(()) => report.applied.push(mv),
                Err(e) => {
                    debug!(container = %mv.container_id, error = %e, "planned move no longer legal, skipping");
                    report.skipped += 1;
                }
            }
        }
        if !history_cleared && !report.interrupted {
            self.yard.write().await.clear_move_history();
        }

        info!(
            planned = report.planned,
            moved = report.moved(),
            skipped = report.skipped,
            interrupted = report.interrupted,
            "reoptimization pass complete"
        );
        report
    }

    /// Run passes every `interval` and whenever [`request`](Self::request)
    /// is called, until shutdown. `on_pass` sees every completed report.
    pub async fn run<F>(&self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>, on_pass: F)
    where
        F: Fn(&PassReport),
    {
        info!(interval_secs = interval.as_secs(), "reoptimization scheduler started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.trigger.notified() => {}
                _ = shutdown.changed() => {
                    info!("reoptimization scheduler shutting down");
                    break;
                }
            }
            if self.is_stopping() {
                break;
            }
            let report = self.run_pass().await;
            on_pass(&report);
        }
    }
}
