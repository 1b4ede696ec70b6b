//! yardgrid-state — the spatial allocator for Yardgrid.
//!
//! Owns the dense 3-D grid of cells and the container index, and
//! enforces the placement invariants on every mutation:
//!
//! 1. A container occupies at most one cell; a cell holds at most one container.
//! 2. Every occupied coordinate is inside the yard bounds.
//! 3. No prefix of any column exceeds `max_weight_per_stack`.
//! 4. The id index, the id→position index, and the grid agree exactly.
//!
//! # Architecture
//!
//! ```text
//! YardState
//!   ├── cells: Vec<Option<ContainerId>>     (dense, lexicographic x,y,z)
//!   ├── containers: HashMap<ContainerId, Container>
//!   ├── positions: HashMap<ContainerId, Position>   (incremental reverse index)
//!   └── prior_positions: HashMap<ContainerId, Position>  (move history for metrics)
//! ```
//!
//! `YardState` is a plain value: callers wrap it in a lock and clone it
//! when they need a snapshot.

pub mod error;
pub mod types;
pub mod yard;

pub use error::{YardError, YardResult};
pub use types::*;
pub use yard::YardState;
pub use yard_core::{Position, YardConfig};
