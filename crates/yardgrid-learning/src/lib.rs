//! yardgrid-learning — an optional trainable scorer for placement.
//!
//! The model plugs into [`PlacementPolicy`](yardgrid_placement::PlacementPolicy)
//! through the [`Scorer`](yardgrid_placement::Scorer) capability and
//! learns from a bounded history of committed placements.
//!
//! # Architecture
//!
//! ```text
//! YardService ──record()──▶ ExperienceBuffer (own lock, ring buffer)
//!                                  │ sample(batch_size)
//!                                  ▼
//!                              Trainer::run() ── periodic ──▶ LearningModel::train()
//!                                                              │ (own lock)
//!                                                              ├── decay ε
//!                                                              └── save parameters
//! PlacementPolicy ──predict()──▶ LearningModel
//! ```
//!
//! Neither lock is ever held together with the yard lock.

pub mod buffer;
pub mod error;
pub mod model;
pub mod trainer;

pub use buffer::{Experience, ExperienceBuffer};
pub use error::{LearningError, LearningResult};
pub use model::{LearningModel, LinearModel, ModelParameters, ModelSettings, TrainingProgress, TrainingReport};
pub use trainer::Trainer;
