//! yardgrid-scheduler — periodic reoptimization of the yard.
//!
//! A pass snapshots the yard, plans a better arrangement on a private
//! working copy, then commits the planned moves one at a time:
//!
//! - Containers are visited in priority order: overdue first, then by
//!   ascending days until departure, unknown departures last.
//! - Each visited container is lifted from the working copy and
//!   re-placed with the [`PlacementPolicy`](yardgrid_placement::PlacementPolicy).
//! - Each move takes the yard write lock on its own, so placement
//!   requests interleave with a long pass.
//! - A move whose container has since been removed, moved, or whose
//!   target has been taken is skipped, never forced.
//!
//! # Architecture
//!
//! ```text
//! ReoptimizationScheduler::run()
//!   ├── interval tick ──┐
//!   ├── Notify trigger ─┼──▶ run_pass()
//!   │                   │      ├── read lock → snapshot (clone)
//!   │                   │      ├── compute_plan(snapshot)   (no lock)
//!   │                   │      └── commit(plan)             (write lock per move)
//!   └── shutdown watch ─┘
//! ```

pub mod plan;
pub mod scheduler;

pub use plan::{PlannedMove, ReoptimizationPlan, compute_plan, priority_order};
pub use scheduler::{PassReport, ReoptimizationScheduler};
