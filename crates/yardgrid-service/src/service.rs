//! The yard service and its background loops.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use yard_core::YardgridConfig;
use yardgrid_learning::{
    Experience, ExperienceBuffer, LearningModel, LinearModel, ModelSettings, Trainer, TrainingProgress,
};
use yardgrid_metrics::{MetricsEngine, MetricsSnapshot};
use yardgrid_placement::{Placement, PlacementPolicy, ScoringWeights};
use yardgrid_scheduler::{PassReport, ReoptimizationScheduler};
use yardgrid_state::{
    Container, ContainerRecord, ContainerUpdate, Position, YardError, YardResult, YardState, today,
};

/// Optimistic attempts `add_container` makes under the read lock before
/// deciding under the write lock.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 3;

/// A resident container with its cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resident {
    #[serde(flatten)]
    pub container: Container,
    pub position: Position,
}

struct Learning {
    model: Arc<LinearModel>,
    buffer: Arc<ExperienceBuffer>,
    trainer: Arc<Trainer>,
}

pub struct YardService {
    config: YardgridConfig,
    yard: Arc<RwLock<YardState>>,
    policy: Arc<PlacementPolicy>,
    scheduler: Arc<ReoptimizationScheduler>,
    metrics: MetricsEngine,
    learning: Option<Learning>,
    shutdown: watch::Sender<bool>,
}

impl YardService {
    /// Build a service over an empty yard.
    ///
    /// With learning enabled, the model is loaded from `model_path` when
    /// the file exists.
    pub fn new(config: YardgridConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let learning = if config.learning.enabled {
            let settings = ModelSettings::from(&config.learning);
            let model = match &config.learning.model_path {
                Some(path) => LinearModel::load_or_init(path, settings)
                    .with_context(|| format!("failed to load placement model from {}", path.display()))?,
                None => LinearModel::new(settings),
            };
            let model = Arc::new(model);
            let buffer = Arc::new(ExperienceBuffer::new(config.learning.buffer_capacity));
            let mut trainer = Trainer::new(
                model.clone(),
                buffer.clone(),
                config.learning.batch_size,
                config.learning.seed,
            );
            if let Some(path) = &config.learning.model_path {
                trainer = trainer.with_model_path(path.clone());
            }
            Some(Learning {
                model,
                buffer,
                trainer: Arc::new(trainer),
            })
        } else {
            None
        };

        let mut policy = PlacementPolicy::new(ScoringWeights::from(&config.placement));
        if let Some(learning) = &learning {
            policy = policy.with_scorer(learning.model.clone(), config.learning.seed);
        }
        let policy = Arc::new(policy);

        let yard = Arc::new(RwLock::new(YardState::new(config.yard.clone())));
        let scheduler = Arc::new(ReoptimizationScheduler::new(yard.clone(), policy.clone()));
        let (shutdown, _) = watch::channel(false);

        info!(
            length = config.yard.length,
            width = config.yard.width,
            height = config.yard.height,
            learning = learning.is_some(),
            "yard service created"
        );

        Ok(Self {
            metrics: MetricsEngine::new(config.metrics.clone()),
            config,
            yard,
            policy,
            scheduler,
            learning,
            shutdown,
        })
    }

    pub fn config(&self) -> &YardgridConfig {
        &self.config
    }

    pub fn yard(&self) -> &Arc<RwLock<YardState>> {
        &self.yard
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    // ── Placement ──────────────────────────────────────────────

    /// Place a new container where the policy sees fit.
    ///
    /// Decisions are made under the read lock and committed under the
    /// write lock. When every optimistic attempt loses its cell to a
    /// concurrent writer, the final decision and commit happen under one
    /// write lock, so `NoAvailablePlacement` always means the policy saw
    /// no legal cell.
    pub async fn add_container(&self, record: ContainerRecord) -> YardResult<Position> {
        let container = Container::from_record(record)?;

        for attempt in 1..=MAX_PLACEMENT_ATTEMPTS {
            let placement = {
                let yard = self.yard.read().await;
                if yard.contains(&container.id) {
                    return Err(YardError::DuplicateContainerId(container.id.clone()));
                }
                self.policy
                    .place(&container, &yard, today())
                    .ok_or_else(|| YardError::NoAvailablePlacement(container.id.clone()))?
            };

            let result = self.yard.write().await.add(container.clone(), placement.position);
            match result {
                Ok(()) => return Ok(self.placed(&container, placement)),
                Err(YardError::OccupiedCell(_) | YardError::WeightLimitExceeded { .. }) => {
                    debug!(container = %container.id, attempt, "chosen cell taken concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(container = %container.id, "placing under the write lock");
        let placement = {
            let mut yard = self.yard.write().await;
            if yard.contains(&container.id) {
                return Err(YardError::DuplicateContainerId(container.id.clone()));
            }
            let placement = self
                .policy
                .place(&container, &yard, today())
                .ok_or_else(|| YardError::NoAvailablePlacement(container.id.clone()))?;
            yard.add(container.clone(), placement.position)?;
            placement
        };
        Ok(self.placed(&container, placement))
    }

    fn placed(&self, container: &Container, placement: Placement) -> Position {
        info!(container = %container.id, position = %placement.position, "container placed");
        self.record_placement(&placement);
        placement.position
    }

    /// Place a new container at an explicit cell.
    pub async fn add_container_at(&self, record: ContainerRecord, position: Position) -> YardResult<()> {
        let container = Container::from_record(record)?;
        let id = container.id.clone();
        self.yard.write().await.add(container, position)?;
        info!(container = %id, %position, "container placed manually");
        Ok(())
    }

    pub async fn remove_container(&self, id: &str) -> bool {
        let removed = self.yard.write().await.remove(id);
        match removed {
            Some(_) => {
                info!(container = %id, "container removed");
                true
            }
            None => {
                debug!(container = %id, "remove of unknown container");
                false
            }
        }
    }

    /// Move a container; `false` on any rejection, with the yard unchanged.
    pub async fn move_container(&self, id: &str, to: Position) -> bool {
        self.try_move_container(id, to).await.is_ok()
    }

    pub async fn try_move_container(&self, id: &str, to: Position) -> YardResult<()> {
        let result = self.yard.write().await.move_container(id, to);
        match &result {
            Ok(()) => info!(container = %id, position = %to, "container moved"),
            Err(e) => debug!(container = %id, position = %to, error = %e, "move rejected"),
        }
        result
    }

    pub async fn update_container(&self, id: &str, update: &ContainerUpdate) -> YardResult<()> {
        self.yard.write().await.update(id, update)?;
        debug!(container = %id, "container updated");
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────

    pub async fn get_position(&self, id: &str) -> Option<Position> {
        self.yard.read().await.position(id)
    }

    pub async fn get_container(&self, id: &str) -> Option<Container> {
        self.yard.read().await.get(id).cloned()
    }

    /// All residents, sorted by id.
    pub async fn list_containers(&self) -> Vec<Resident> {
        let yard = self.yard.read().await;
        let mut residents: Vec<Resident> = yard
            .residents()
            .map(|(container, position)| Resident {
                container: container.clone(),
                position,
            })
            .collect();
        residents.sort_by(|a, b| a.container.id.cmp(&b.container.id));
        residents
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        let yard = self.yard.read().await;
        self.metrics.snapshot(&yard, today())
    }

    pub fn training_progress(&self) -> Option<TrainingProgress> {
        self.learning.as_ref().map(|l| l.model.progress())
    }

    /// Experiences waiting in the buffer; zero when learning is disabled.
    pub fn experience_count(&self) -> usize {
        self.learning.as_ref().map_or(0, |l| l.buffer.len())
    }

    pub fn trainer(&self) -> Option<&Arc<Trainer>> {
        self.learning.as_ref().map(|l| &l.trainer)
    }

    // ── Reoptimization ─────────────────────────────────────────

    /// Run a reoptimization pass now and return how many containers moved.
    pub async fn reoptimize(&self) -> usize {
        let report = self.scheduler.run_pass().await;
        self.record_pass(&report);
        report.moved()
    }

    /// Wake the background reoptimization loop.
    pub fn request_reoptimization(&self) {
        self.scheduler.request();
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Spawn the reoptimization loop and, with learning enabled, the
    /// trainer. Both stop on [`shutdown`](Self::shutdown).
    pub fn spawn_background(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let service = self.clone();
        let rx = self.shutdown.subscribe();
        let interval = Duration::from_secs(self.config.reoptimize.interval_secs);
        handles.push(tokio::spawn(async move {
            let scheduler = service.scheduler.clone();
            scheduler
                .run(interval, rx, |report| {
                    service.record_pass(report);
                    service.log_metrics();
                })
                .await;
        }));

        if let Some(learning) = &self.learning {
            let trainer = learning.trainer.clone();
            let rx = self.shutdown.subscribe();
            let interval = Duration::from_secs(self.config.learning.train_interval_secs);
            handles.push(tokio::spawn(async move { trainer.run(interval, rx).await }));
        }

        handles
    }

    /// Stop background work. A pass in flight finishes its current move
    /// and stops; later passes do nothing.
    pub fn shutdown(&self) {
        info!("yard service shutting down");
        self.scheduler.stop();
        self.shutdown.send_replace(true);
    }

    fn record_pass(&self, report: &PassReport) {
        for mv in &report.applied {
            self.record_placement(&mv.placement);
        }
    }

    fn record_placement(&self, placement: &Placement) {
        if let Some(learning) = &self.learning
            && placement.heuristic_score.is_finite()
        {
            learning.buffer.push(Experience {
                state: placement.features,
                action: placement.position,
                outcome: placement.heuristic_score,
            });
        }
    }

    fn log_metrics(&self) {
        // Skip rather than wait when a writer holds the yard.
        let Ok(yard) = self.yard.try_read() else {
            return;
        };
        let m = self.metrics.snapshot(&yard, today());
        info!(
            containers = m.total_containers,
            utilization = m.yard_utilization,
            overdue = m.overdue_containers,
            moved = m.moved_containers,
            move_cost = m.total_move_cost,
            energy = m.energy_consumption,
            carbon = m.carbon_emissions,
            "yard metrics"
        );
    }
}
