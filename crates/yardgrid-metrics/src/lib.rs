//! yardgrid-metrics — read-only figures derived from a yard snapshot.
//!
//! Everything here is a pure function of a [`YardState`](yardgrid_state::YardState),
//! the date, and configuration; callers hold at most a read lock while
//! computing a snapshot.
//!
//! # Architecture
//!
//! ```text
//! MetricsEngine::snapshot(&YardState, today)
//!   ├── occupancy: counts, weight, stack heights, utilization
//!   ├── movement: prior → current distance, crane time, energy, carbon
//!   ├── storage cost
//!   └── BaselineComparison (fixed-ratio estimate, not a simulation)
//! ```

pub mod engine;

pub use engine::{BaselineComparison, MetricsEngine, MetricsSnapshot};
