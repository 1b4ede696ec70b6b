//! Feature extraction for learned scorers.
//!
//! Turns a (yard, container, candidate cell) triple into a fixed-length
//! vector. The layout is part of the persisted model format, so new
//! features go at the end and bump [`FEATURE_COUNT`].

use chrono::NaiveDate;
use yardgrid_state::{Container, Position, YardState};

use crate::scorer::overdue_proximity;

pub const FEATURE_COUNT: usize = 8;

/// Largest possible overdue proximity: 6 face, 12 edge and 8 corner
/// neighbours.
const MAX_PROXIMITY: f64 = 6.0 + 12.0 / 2.0 + 8.0 / 3.0;

pub type CellFeatures = [f64; FEATURE_COUNT];

/// Candidate cells for one decision and their features, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct StateVector {
    pub positions: Vec<Position>,
    pub features: Vec<CellFeatures>,
}

impl StateVector {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Features of placing `container` at `pos`:
///
/// | # | feature |
/// |---|---|
/// | 0 | bias (1.0) |
/// | 1 | level / top level |
/// | 2 | cell below occupied |
/// | 3 | overdue proximity, normalised |
/// | 4 | column weight after placement / stack limit |
/// | 5 | container weight / stack limit |
/// | 6 | departure urgency `1 / (1 + days)`, 0 when unknown |
/// | 7 | refrigerated |
pub fn cell_features(yard: &YardState, container: &Container, pos: &Position, today: NaiveDate) -> CellFeatures {
    let config = yard.config();
    let top = f64::from(config.height.saturating_sub(1).max(1));
    let limit = config.max_weight_per_stack.max(f64::EPSILON);

    let supported = pos.below().is_some_and(|b| yard.is_occupied(&b));
    let proximity = overdue_proximity(yard, pos, today, &container.id) / MAX_PROXIMITY;
    let column_weight = yard
        .column(pos.x, pos.y)
        .filter(|(_, c)| c.id != container.id)
        .map(|(_, c)| c.weight)
        .sum::<f64>()
        + container.weight;
    let urgency = container
        .days_until_departure(today)
        .map(|d| 1.0 / (1.0 + f64::from(d)))
        .unwrap_or(0.0);

    [
        1.0,
        f64::from(pos.z) / top,
        if supported { 1.0 } else { 0.0 },
        proximity,
        column_weight / limit,
        container.weight / limit,
        urgency,
        if container.refrigerated { 1.0 } else { 0.0 },
    ]
}

/// Build the state vector for a set of candidate cells.
pub fn state_vector(
    yard: &YardState,
    container: &Container,
    candidates: &[Position],
    today: NaiveDate,
) -> StateVector {
    StateVector {
        positions: candidates.to_vec(),
        features: candidates
            .iter()
            .map(|pos| cell_features(yard, container, pos, today))
            .collect(),
    }
}
