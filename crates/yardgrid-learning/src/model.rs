//! Trainable cell scorers.
//!
//! [`LinearModel`] predicts a cell's placement quality as a weighted sum
//! of its features and is fitted with mini-batch gradient descent on the
//! squared error. Every completed round decays the exploration rate
//! towards its floor.

use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use yard_core::config::LearningConfig;
use yardgrid_placement::{CellFeatures, FEATURE_COUNT, Scorer, StateVector};

use crate::buffer::Experience;
use crate::error::{LearningError, LearningResult};

/// Outcome of one training round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Mean squared error on the batch, before the update.
    pub loss: f64,
    /// Share of the batch predicted within the accuracy tolerance.
    pub accuracy: f64,
    pub samples: usize,
}

/// Training state observable from outside the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingProgress {
    pub rounds: u64,
    pub epsilon: f64,
    pub last_loss: Option<f64>,
    pub last_accuracy: Option<f64>,
}

/// A [`Scorer`] that can learn from experience.
pub trait LearningModel: Scorer {
    /// Fit one round on `batch`. `None` for an empty batch, which leaves
    /// the model untouched.
    fn train(&self, batch: &[Experience]) -> Option<TrainingReport>;

    fn progress(&self) -> TrainingProgress;

    /// Persist the learned parameters.
    fn save(&self, path: &Path) -> LearningResult<()>;
}

/// Persisted model state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub epsilon: f64,
    pub rounds: u64,
    #[serde(default)]
    pub last_loss: Option<f64>,
    #[serde(default)]
    pub last_accuracy: Option<f64>,
}

impl ModelParameters {
    fn fresh(epsilon: f64) -> Self {
        Self {
            weights: vec![0.0; FEATURE_COUNT],
            bias: 0.0,
            epsilon,
            rounds: 0,
            last_loss: None,
            last_accuracy: None,
        }
    }

    fn predict_one(&self, features: &CellFeatures) -> f64 {
        self.bias
            + self
                .weights
                .iter()
                .zip(features.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Hyper-parameters that are not persisted with the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub learning_rate: f64,
    pub epsilon_start: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    pub accuracy_tolerance: f64,
}

impl From<&LearningConfig> for ModelSettings {
    fn from(config: &LearningConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            epsilon_start: config.epsilon_start,
            epsilon_decay: config.epsilon_decay,
            epsilon_min: config.epsilon_min,
            accuracy_tolerance: config.accuracy_tolerance,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::from(&LearningConfig::default())
    }
}

pub struct LinearModel {
    params: RwLock<ModelParameters>,
    settings: ModelSettings,
    /// Serialises training rounds; `params` is only write-locked for the swap.
    train_guard: Mutex<()>,
}

impl LinearModel {
    /// An untrained model: zero weights, ε at its starting value.
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            params: RwLock::new(ModelParameters::fresh(settings.epsilon_start)),
            settings,
            train_guard: Mutex::new(()),
        }
    }

    pub fn from_parameters(params: ModelParameters, settings: ModelSettings) -> LearningResult<Self> {
        if params.weights.len() != FEATURE_COUNT {
            return Err(LearningError::FeatureMismatch {
                expected: FEATURE_COUNT,
                found: params.weights.len(),
            });
        }
        Ok(Self {
            params: RwLock::new(params),
            settings,
            train_guard: Mutex::new(()),
        })
    }

    /// Load parameters from `path`, or start fresh if the file is absent.
    pub fn load_or_init(path: &Path, settings: ModelSettings) -> LearningResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no saved model, starting fresh");
            return Ok(Self::new(settings));
        }
        let raw = std::fs::read_to_string(path)?;
        let params: ModelParameters =
            serde_json::from_str(&raw).map_err(|e| LearningError::Deserialize(e.to_string()))?;
        info!(
            path = %path.display(),
            rounds = params.rounds,
            epsilon = params.epsilon,
            "loaded model"
        );
        Self::from_parameters(params, settings)
    }

    pub fn parameters(&self) -> ModelParameters {
        self.params.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

impl Scorer for LinearModel {
    fn predict(&self, state: &StateVector) -> Vec<f64> {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        state.features.iter().map(|f| params.predict_one(f)).collect()
    }

    fn exploration_rate(&self) -> f64 {
        self.params.read().unwrap_or_else(PoisonError::into_inner).epsilon
    }
}

impl LearningModel for LinearModel {
    fn train(&self, batch: &[Experience]) -> Option<TrainingReport> {
        if batch.is_empty() {
            return None;
        }
        let _round = self.train_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut params = self.parameters();

        let n = batch.len() as f64;
        let mut grad = [0.0; FEATURE_COUNT];
        let mut grad_bias = 0.0;
        let mut squared = 0.0;
        let mut within = 0usize;

        for exp in batch {
            let error = params.predict_one(&exp.state) - exp.outcome;
            squared += error * error;
            if error.abs() <= self.settings.accuracy_tolerance {
                within += 1;
            }
            for (g, x) in grad.iter_mut().zip(exp.state.iter()) {
                *g += 2.0 * error * x / n;
            }
            grad_bias += 2.0 * error / n;
        }

        let lr = self.settings.learning_rate;
        for (w, g) in params.weights.iter_mut().zip(grad.iter()) {
            *w -= lr * g;
        }
        params.bias -= lr * grad_bias;

        let report = TrainingReport {
            loss: squared / n,
            accuracy: within as f64 / n,
            samples: batch.len(),
        };
        params.rounds += 1;
        params.epsilon = (params.epsilon * self.settings.epsilon_decay).max(self.settings.epsilon_min);
        params.last_loss = Some(report.loss);
        params.last_accuracy = Some(report.accuracy);

        debug!(
            round = params.rounds,
            loss = report.loss,
            accuracy = report.accuracy,
            epsilon = params.epsilon,
            "training round complete"
        );
        *self.params.write().unwrap_or_else(PoisonError::into_inner) = params;
        Some(report)
    }

    fn progress(&self) -> TrainingProgress {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        TrainingProgress {
            rounds: params.rounds,
            epsilon: params.epsilon,
            last_loss: params.last_loss,
            last_accuracy: params.last_accuracy,
        }
    }

    fn save(&self, path: &Path) -> LearningResult<()> {
        let json = serde_json::to_string_pretty(&self.parameters())
            .map_err(|e| LearningError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated model.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "model saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yard_core::Position;

    fn settings() -> ModelSettings {
        ModelSettings {
            learning_rate: 0.1,
            epsilon_start: 1.0,
            epsilon_decay: 0.5,
            epsilon_min: 0.1,
            accuracy_tolerance: 1.0,
        }
    }

    /// Outcomes follow the default heuristic on (level, supported).
    fn batch() -> Vec<Experience> {
        let mut batch = Vec::new();
        for level in [0.0, 0.5, 1.0] {
            for supported in [0.0, 1.0] {
                let mut state = [0.0; FEATURE_COUNT];
                state[0] = 1.0;
                state[1] = level;
                state[2] = supported;
                batch.push(Experience {
                    state,
                    action: Position::new(0, 0, 0),
                    outcome: -20.0 * level + 5.0 * supported,
                });
            }
        }
        batch
    }

    #[test]
    fn fresh_model_predicts_zero() {
        let model = LinearModel::new(settings());
        let state = StateVector {
            positions: vec![Position::new(0, 0, 0), Position::new(1, 0, 0)],
            features: vec![[1.0; FEATURE_COUNT]; 2],
        };
        assert_eq!(model.predict(&state), vec![0.0, 0.0]);
        assert_eq!(model.exploration_rate(), 1.0);
    }

    #[test]
    fn training_reduces_loss() {
        let model = LinearModel::new(settings());
        let batch = batch();

        let first = model.train(&batch).unwrap();
        let mut last = first;
        for _ in 0..2000 {
            last = model.train(&batch).unwrap();
        }

        assert!(first.loss > 50.0);
        assert!(last.loss < 0.1, "loss {}", last.loss);
        assert_eq!(last.accuracy, 1.0);
        assert_eq!(last.samples, 6);
    }

    #[test]
    fn epsilon_decays_to_floor() {
        let model = LinearModel::new(settings());
        let batch = batch();

        model.train(&batch).unwrap();
        assert_eq!(model.exploration_rate(), 0.5);
        for _ in 0..10 {
            model.train(&batch).unwrap();
        }
        assert_eq!(model.exploration_rate(), 0.1);

        let progress = model.progress();
        assert_eq!(progress.rounds, 11);
        assert!(progress.last_loss.is_some());
    }

    #[test]
    fn concurrent_rounds_are_not_lost() {
        let model = std::sync::Arc::new(LinearModel::new(settings()));
        let batch = std::sync::Arc::new(batch());

        let trainers: Vec<_> = (0..4)
            .map(|_| {
                let model = model.clone();
                let batch = batch.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        model.train(&batch).unwrap();
                    }
                })
            })
            .collect();

        let state = StateVector {
            positions: vec![Position::new(0, 0, 0)],
            features: vec![batch[0].state],
        };
        for _ in 0..200 {
            assert!(model.predict(&state)[0].is_finite());
        }
        for t in trainers {
            t.join().unwrap();
        }

        assert_eq!(model.progress().rounds, 200);
        assert_eq!(model.exploration_rate(), 0.1);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let model = LinearModel::new(settings());
        assert!(model.train(&[]).is_none());
        let progress = model.progress();
        assert_eq!(progress.rounds, 0);
        assert_eq!(progress.epsilon, 1.0);
        assert_eq!(progress.last_loss, None);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("placement.json");

        let model = LinearModel::new(settings());
        let batch = batch();
        for _ in 0..5 {
            model.train(&batch).unwrap();
        }
        model.save(&path).unwrap();

        let reloaded = LinearModel::load_or_init(&path, settings()).unwrap();
        assert_eq!(reloaded.parameters(), model.parameters());
        assert_eq!(reloaded.progress().rounds, 5);
    }

    #[test]
    fn missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let model = LinearModel::load_or_init(&dir.path().join("absent.json"), settings()).unwrap();
        assert_eq!(model.progress().rounds, 0);
        assert_eq!(model.exploration_rate(), 1.0);
    }

    #[test]
    fn wrong_feature_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        let mut params = ModelParameters::fresh(0.5);
        params.weights.truncate(3);
        std::fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();

        let err = LinearModel::load_or_init(&path, settings()).err().unwrap();
        assert!(matches!(
            err,
            LearningError::FeatureMismatch { expected: FEATURE_COUNT, found: 3 }
        ));
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LinearModel::load_or_init(&path, settings()),
            Err(LearningError::Deserialize(_))
        ));
    }
}
