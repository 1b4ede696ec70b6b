//! Bounded experience buffer.
//!
//! A fixed-capacity ring: pushing onto a full buffer evicts the oldest
//! entry. Guarded by its own mutex so recording never waits on training
//! for longer than a copy of the sampled batch.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use serde::{Deserialize, Serialize};
use yard_core::Position;
use yardgrid_placement::CellFeatures;

/// One (state, action, outcome) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Features of the chosen cell.
    pub state: CellFeatures,
    /// The cell that was committed.
    pub action: Position,
    /// Observed quality of the placement.
    pub outcome: f64,
}

pub struct ExperienceBuffer {
    entries: Mutex<VecDeque<Experience>>,
    capacity: usize,
}

impl ExperienceBuffer {
    /// Create a buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
        }
    }

    pub fn push(&self, experience: Experience) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Up to `batch_size` distinct entries chosen uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Experience> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let amount = batch_size.min(entries.len());
        rand::seq::index::sample(rng, entries.len(), amount)
            .into_iter()
            .filter_map(|i| entries.get(i).cloned())
            .collect()
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<Experience> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
