//! Yardgrid placement — decides which cell a container should occupy.
//!
//! The policy is a pure decision function over a read-only view of a
//! [`YardState`](yardgrid_state::YardState). It never mutates the yard;
//! callers commit the returned position themselves.
//!
//! # Components
//!
//! - **`scorer`** — Heuristic cell scoring (height, support, overdue proximity)
//! - **`features`** — Per-cell feature vectors for learned scorers
//! - **`policy`** — `PlacementPolicy` and the pluggable `Scorer` capability

pub mod features;
pub mod policy;
pub mod scorer;

pub use features::{CellFeatures, FEATURE_COUNT, StateVector, cell_features, state_vector};
pub use policy::{Placement, PlacementPolicy, Scorer, Strategy};
pub use scorer::{CellScore, ScoreBreakdown, ScoringWeights, legal_cells, rank_cells, score_cell};
