//! Background trainer.
//!
//! Periodically samples a batch from the [`ExperienceBuffer`], runs one
//! training round and persists the model when a path is configured.
//! Rounds with an empty buffer are skipped, so ε only decays once the
//! model has actually seen data.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};

use crate::buffer::ExperienceBuffer;
use crate::error::LearningResult;
use crate::model::{LearningModel, TrainingReport};

pub struct Trainer {
    model: Arc<dyn LearningModel>,
    buffer: Arc<ExperienceBuffer>,
    batch_size: usize,
    model_path: Option<PathBuf>,
    rng: Mutex<ChaCha8Rng>,
}

impl Trainer {
    pub fn new(model: Arc<dyn LearningModel>, buffer: Arc<ExperienceBuffer>, batch_size: usize, seed: u64) -> Self {
        Self {
            model,
            buffer,
            batch_size: batch_size.max(1),
            model_path: None,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Save the model to `path` after every round and on shutdown.
    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.model_path = Some(path);
        self
    }

    /// Run a single training round.
    ///
    /// Returns `Ok(None)` when the buffer is empty.
    pub fn train_once(&self) -> LearningResult<Option<TrainingReport>> {
        let batch = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            self.buffer.sample(self.batch_size, &mut *rng)
        };
        let Some(report) = self.model.train(&batch) else {
            debug!("experience buffer empty, skipping training round");
            return Ok(None);
        };

        if let Some(path) = &self.model_path {
            self.model.save(path)?;
        }
        Ok(Some(report))
    }

    /// Run the training loop until shutdown is signalled.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            batch_size = self.batch_size,
            "trainer started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.train_once() {
                        Ok(Some(report)) => {
                            let progress = self.model.progress();
                            info!(
                                round = progress.rounds,
                                loss = report.loss,
                                accuracy = report.accuracy,
                                epsilon = progress.epsilon,
                                "trained placement model"
                            );
                        }
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "training round failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("trainer shutting down");
                    if let Some(path) = &self.model_path
                        && let Err(e) = self.model.save(path)
                    {
                        error!(error = %e, "failed to save model on shutdown");
                    }
                    break;
                }
            }
        }
    }
}
