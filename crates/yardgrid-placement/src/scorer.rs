//! Cell scoring for placement decisions.
//!
//! Evaluates candidate cells using a weighted combination of:
//! - **Height**: lower levels are preferred
//! - **Support**: resting on another container earns a bonus
//! - **Overdue proximity**: cells next to overdue containers are penalised
//! - **Legality**: occupied cells and cells that would overload the
//!   column are rejected outright

use chrono::NaiveDate;
use yard_core::config::PlacementConfig;
use yardgrid_state::{Container, Position, YardState};

/// Scored placement candidate.
#[derive(Debug, Clone)]
pub struct CellScore {
    pub position: Position,
    /// Composite score (higher = better).
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Individual score components for debugging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// Negative, grows with the level.
    pub height: f64,
    /// Positive when the cell below is occupied.
    pub support: f64,
    /// Negative, grows with overdue neighbours.
    pub overdue: f64,
}

/// Weights for the scoring components.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub height_penalty: f64,
    pub support_bonus: f64,
    pub overdue_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::from(&PlacementConfig::default())
    }
}

impl From<&PlacementConfig> for ScoringWeights {
    fn from(config: &PlacementConfig) -> Self {
        Self {
            height_penalty: config.height_penalty,
            support_bonus: config.support_bonus,
            overdue_penalty: config.overdue_penalty,
        }
    }
}

/// Whether `container` may legally be placed at `pos` right now.
pub fn is_legal(yard: &YardState, container: &Container, pos: &Position) -> bool {
    yard.config().contains(pos)
        && !yard.is_occupied(pos)
        && yard.fits_weight(pos, container.weight, Some(&container.id))
}

/// All legal cells for `container`, in lexicographic order.
pub fn legal_cells(yard: &YardState, container: &Container) -> Vec<Position> {
    yard.empty_cells()
        .filter(|pos| yard.fits_weight(pos, container.weight, Some(&container.id)))
        .collect()
}

/// Proximity of `pos` to overdue containers in its 26-neighbourhood.
///
/// Each overdue neighbour contributes `1 / manhattan`, so face neighbours
/// weigh 1, edge neighbours 1/2 and corner neighbours 1/3. The container
/// named by `exclude` is ignored.
pub fn overdue_proximity(yard: &YardState, pos: &Position, today: NaiveDate, exclude: &str) -> f64 {
    let mut proximity = 0.0;
    for dx in -1i64..=1 {
        for dy in -1i64..=1 {
            for dz in -1i64..=1 {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                let Some(neighbour) = offset(pos, dx, dy, dz) else {
                    continue;
                };
                if let Some(c) = yard.container_at(&neighbour)
                    && c.id != exclude
                    && c.is_overdue(today)
                {
                    proximity += 1.0 / f64::from(pos.manhattan(&neighbour));
                }
            }
        }
    }
    proximity
}

/// Score a single cell for `container`. `None` when the cell is illegal.
pub fn score_cell(
    yard: &YardState,
    container: &Container,
    pos: &Position,
    weights: &ScoringWeights,
    today: NaiveDate,
) -> Option<CellScore> {
    if !is_legal(yard, container, pos) {
        return None;
    }

    let height = -weights.height_penalty * f64::from(pos.z);
    let support = match pos.below() {
        Some(below) if yard.is_occupied(&below) => weights.support_bonus,
        _ => 0.0,
    };
    let overdue = -weights.overdue_penalty * overdue_proximity(yard, pos, today, &container.id);

    Some(CellScore {
        position: *pos,
        score: height + support + overdue,
        breakdown: ScoreBreakdown {
            height,
            support,
            overdue,
        },
    })
}

/// Score every legal cell and return them best first.
///
/// Equal scores are ordered by lowest `(x, y, z)`.
pub fn rank_cells(
    yard: &YardState,
    container: &Container,
    weights: &ScoringWeights,
    today: NaiveDate,
) -> Vec<CellScore> {
    let mut scores: Vec<CellScore> = yard
        .empty_cells()
        .filter_map(|pos| score_cell(yard, container, &pos, weights, today))
        .collect();

    scores.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.position.cmp(&b.position))
    });
    scores
}

fn offset(pos: &Position, dx: i64, dy: i64, dz: i64) -> Option<Position> {
    let x = u32::try_from(i64::from(pos.x) + dx).ok()?;
    let y = u32::try_from(i64::from(pos.y) + dy).ok()?;
    let z = u32::try_from(i64::from(pos.z) + dz).ok()?;
    Some(Position::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use yardgrid_state::{ContainerRecord, YardConfig};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn yard() -> YardState {
        YardState::new(YardConfig {
            length: 5,
            width: 5,
            height: 3,
            max_weight_per_stack: 5000.0,
            ..YardConfig::default()
        })
    }

    fn container(id: &str, weight: f64, departs_in: i64) -> Container {
        let departure = if departs_in >= 0 {
            today().checked_add_days(Days::new(departs_in as u64))
        } else {
            today().checked_sub_days(Days::new(departs_in.unsigned_abs()))
        };
        Container::from_record(ContainerRecord {
            id: id.to_string(),
            weight,
            destination: "Port A".to_string(),
            arrival_date: None,
            departure_date: departure.map(|d| d.format("%Y-%m-%d").to_string()),
            content_type: "general".to_string(),
            refrigerated: false,
            priority: 0,
        })
        .unwrap()
    }

    #[test]
    fn rejects_occupied_cell() {
        let mut yard = yard();
        yard.add(container("A", 100.0, 5), Position::new(0, 0, 0)).unwrap();
        let c = container("B", 100.0, 5);
        let w = ScoringWeights::default();
        assert!(score_cell(&yard, &c, &Position::new(0, 0, 0), &w, today()).is_none());
    }

    #[test]
    fn rejects_overweight_column() {
        let mut yard = yard();
        yard.add(container("A", 4000.0, 5), Position::new(0, 0, 0)).unwrap();
        let c = container("B", 1500.0, 5);
        let w = ScoringWeights::default();
        assert!(score_cell(&yard, &c, &Position::new(0, 0, 1), &w, today()).is_none());
        assert!(score_cell(&yard, &c, &Position::new(1, 0, 1), &w, today()).is_some());
    }

    #[test]
    fn lower_levels_score_higher() {
        let yard = yard();
        let c = container("A", 100.0, 5);
        let w = ScoringWeights::default();
        let ground = score_cell(&yard, &c, &Position::new(2, 2, 0), &w, today()).unwrap();
        let floating = score_cell(&yard, &c, &Position::new(2, 2, 2), &w, today()).unwrap();
        assert!(ground.score > floating.score);
        assert_eq!(floating.breakdown.height, -20.0);
    }

    #[test]
    fn support_bonus_applies_atop_container() {
        let mut yard = yard();
        yard.add(container("A", 100.0, 5), Position::new(0, 0, 0)).unwrap();
        let c = container("B", 100.0, 5);
        let w = ScoringWeights::default();

        let stacked = score_cell(&yard, &c, &Position::new(0, 0, 1), &w, today()).unwrap();
        let floating = score_cell(&yard, &c, &Position::new(3, 3, 1), &w, today()).unwrap();
        assert_eq!(stacked.breakdown.support, 5.0);
        assert_eq!(floating.breakdown.support, 0.0);
        assert!(stacked.score > floating.score);
    }

    #[test]
    fn overdue_neighbours_penalise_by_distance() {
        let mut yard = yard();
        yard.add(container("LATE", 100.0, -3), Position::new(2, 2, 0)).unwrap();
        let c = container("NEW", 100.0, 5);
        let w = ScoringWeights::default();

        let face = score_cell(&yard, &c, &Position::new(3, 2, 0), &w, today()).unwrap();
        let edge = score_cell(&yard, &c, &Position::new(3, 3, 0), &w, today()).unwrap();
        let far = score_cell(&yard, &c, &Position::new(4, 4, 0), &w, today()).unwrap();

        assert_eq!(face.breakdown.overdue, -3.0);
        assert_eq!(edge.breakdown.overdue, -1.5);
        assert_eq!(far.breakdown.overdue, 0.0);
        assert!(far.score > edge.score && edge.score > face.score);
    }

    #[test]
    fn rank_breaks_ties_lexicographically() {
        let yard = yard();
        let c = container("A", 100.0, 5);
        let ranked = rank_cells(&yard, &c, &ScoringWeights::default(), today());

        assert_eq!(ranked.len(), 75);
        assert_eq!(ranked[0].position, Position::new(0, 0, 0));
        assert_eq!(ranked[1].position, Position::new(0, 1, 0));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn legal_cells_respect_weight() {
        let mut yard = yard();
        yard.add(container("A", 4000.0, 5), Position::new(0, 0, 0)).unwrap();
        let heavy = container("B", 1500.0, 5);
        let cells = legal_cells(&yard, &heavy);
        assert!(cells.iter().all(|p| p.column() != (0, 0)));
        assert_eq!(cells.len(), 72);
    }
}
