//! yardgrid-service — the explicit service object for a container yard.
//!
//! [`YardService`] owns the yard and everything that acts on it, and is
//! what a command surface (HTTP, CLI, message bus) and the background
//! timers are handed. There is no process-global state.
//!
//! # Command surface
//!
//! | Operation | Returns |
//! |---|---|
//! | `add_container(record)` | `Position` or `NoAvailablePlacement` / `DuplicateContainerId` |
//! | `add_container_at(record, position)` | typed placement error |
//! | `remove_container(id)` | `bool` |
//! | `move_container(id, position)` | `bool` (`try_move_container` for the error) |
//! | `update_container(id, update)` | typed validation error |
//! | `get_position(id)` / `get_container(id)` / `list_containers()` | queries |
//! | `reoptimize()` | moved count |
//! | `metrics()` | `MetricsSnapshot` |
//! | `training_progress()` | `TrainingProgress` when learning is enabled |
//!
//! # Architecture
//!
//! ```text
//! YardService
//!   ├── Arc<RwLock<YardState>>          (single lock for grid + index)
//!   ├── Arc<PlacementPolicy>            (heuristic, or ε-greedy over a LearningModel)
//!   ├── Arc<ReoptimizationScheduler>    (snapshot → plan → per-move commit)
//!   ├── MetricsEngine                   (read lock only)
//!   └── Learning (optional)
//!       ├── Arc<LinearModel>            (own lock)
//!       ├── Arc<ExperienceBuffer>       (own lock)
//!       └── Arc<Trainer>
//! ```

pub mod restore;
pub mod service;

pub use restore::{RejectedResident, RestoreReport};
pub use service::{MAX_PLACEMENT_ATTEMPTS, Resident, YardService};
