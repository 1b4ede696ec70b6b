//! Placement policy — picks the cell a container should occupy.
//!
//! Two strategies share one entry point:
//! 1. **Heuristic** (default): best [`score_cell`](crate::scorer::score_cell),
//!    ties to the lowest `(x, y, z)`.
//! 2. **Learned** (when a [`Scorer`] is attached): ε-greedy over legal
//!    cells. With probability ε a uniformly random legal cell, otherwise
//!    the cell with the highest predicted score.
//!
//! "No placement" is always `None`; it is never mapped to a position.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use yardgrid_state::{Container, Position, YardState};

use crate::features::{CellFeatures, StateVector, cell_features, state_vector};
use crate::scorer::{ScoringWeights, legal_cells, rank_cells, score_cell};

/// A trainable cell scorer pluggable into the policy.
///
/// `predict` must be deterministic for identical parameters and input
/// and return exactly one score per candidate in `state`.
pub trait Scorer: Send + Sync {
    fn predict(&self, state: &StateVector) -> Vec<f64>;

    /// Current exploration probability ε in `[0, 1]`.
    fn exploration_rate(&self) -> f64;
}

/// How a placement was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Heuristic,
    Learned,
    Explored,
}

/// A placement decision for a single container.
#[derive(Debug, Clone)]
pub struct Placement {
    pub position: Position,
    /// Heuristic score of the chosen cell, whatever the strategy.
    pub heuristic_score: f64,
    /// Features of the chosen cell.
    pub features: CellFeatures,
    pub strategy: Strategy,
}

pub struct PlacementPolicy {
    weights: ScoringWeights,
    scorer: Option<Arc<dyn Scorer>>,
    /// Exploration randomness; seedable so tests can force determinism.
    rng: Mutex<ChaCha8Rng>,
}

impl PlacementPolicy {
    /// A heuristic-only policy.
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            scorer: None,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(0)),
        }
    }

    /// Attach a learned scorer with a seeded exploration RNG.
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>, seed: u64) -> Self {
        self.scorer = Some(scorer);
        self.rng = Mutex::new(ChaCha8Rng::seed_from_u64(seed));
        self
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn has_scorer(&self) -> bool {
        self.scorer.is_some()
    }

    /// Decide where `container` should go in `yard`.
    ///
    /// The container itself must not be resident in `yard`.
    pub fn place(&self, container: &Container, yard: &YardState, today: NaiveDate) -> Option<Placement> {
        let decision = match &self.scorer {
            Some(scorer) => self.place_learned(scorer.as_ref(), container, yard, today),
            None => self.place_heuristic(container, yard, today),
        };

        match &decision {
            Some(p) => debug!(
                container = %container.id,
                position = %p.position,
                score = p.heuristic_score,
                strategy = ?p.strategy,
                "placement chosen"
            ),
            None => debug!(container = %container.id, "no legal placement"),
        }
        decision
    }

    fn place_heuristic(&self, container: &Container, yard: &YardState, today: NaiveDate) -> Option<Placement> {
        let best = rank_cells(yard, container, &self.weights, today).into_iter().next()?;
        Some(Placement {
            position: best.position,
            heuristic_score: best.score,
            features: cell_features(yard, container, &best.position, today),
            strategy: Strategy::Heuristic,
        })
    }

    fn place_learned(
        &self,
        scorer: &dyn Scorer,
        container: &Container,
        yard: &YardState,
        today: NaiveDate,
    ) -> Option<Placement> {
        let candidates = legal_cells(yard, container);
        if candidates.is_empty() {
            return None;
        }

        // A non-finite rate would make `gen_bool` panic; treat it as greedy.
        let epsilon = match scorer.exploration_rate() {
            rate if rate.is_finite() => rate.clamp(0.0, 1.0),
            _ => 0.0,
        };
        let explored = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            if rng.gen_bool(epsilon) {
                candidates.choose(&mut *rng).copied()
            } else {
                None
            }
        };

        let (position, strategy) = match explored {
            Some(pos) => (pos, Strategy::Explored),
            None => {
                let state = state_vector(yard, container, &candidates, today);
                let scores = scorer.predict(&state);
                if scores.len() != state.len() {
                    warn!(
                        expected = state.len(),
                        got = scores.len(),
                        "scorer returned misaligned predictions, using heuristic"
                    );
                    return self.place_heuristic(container, yard, today);
                }
                (best_predicted(&state, &scores)?, Strategy::Learned)
            }
        };

        let heuristic_score = score_cell(yard, container, &position, &self.weights, today)
            .map(|s| s.score)
            .unwrap_or(f64::NEG_INFINITY);
        Some(Placement {
            position,
            heuristic_score,
            features: cell_features(yard, container, &position, today),
            strategy,
        })
    }
}

/// Highest predicted score; NaN loses, ties go to the earliest candidate.
fn best_predicted(state: &StateVector, scores: &[f64]) -> Option<Position> {
    let mut best: Option<(Position, f64)> = None;
    for (pos, &score) in state.positions.iter().zip(scores) {
        let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
        match best {
            Some((_, b)) if score <= b => {}
            _ => best = Some((*pos, score)),
        }
    }
    best.map(|(pos, _)| pos)
}
