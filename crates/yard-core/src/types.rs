//! Shared types used across Yardgrid crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell coordinate in the yard grid.
///
/// Ordering is lexicographic on `(x, y, z)`, which is also the order
/// used to break placement ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    /// The `(x, y)` column this cell belongs to.
    pub fn column(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    /// The cell directly beneath this one, if any.
    pub fn below(&self) -> Option<Position> {
        self.z.checked_sub(1).map(|z| Position::new(self.x, self.y, z))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(u32, u32, u32)> for Position {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self { x, y, z }
    }
}

/// Physical and environmental parameters of a yard.
///
/// Created once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YardConfig {
    /// Grid extent along x.
    pub length: u32,
    /// Grid extent along y.
    pub width: u32,
    /// Grid extent along z (stack levels).
    pub height: u32,
    /// Maximum cumulative weight of any stack prefix.
    pub max_weight_per_stack: f64,
    /// Crane travel speed in cells per time unit.
    pub crane_speed: f64,
    /// Crane energy per time unit of travel.
    pub crane_energy_consumption: f64,
    /// Energy per cell of travel (distance-based energy mode).
    pub energy_consumption_rate: f64,
    /// kg CO2 per unit of energy.
    pub carbon_emission_factor: f64,
}

impl Default for YardConfig {
    fn default() -> Self {
        Self {
            length: 10,
            width: 10,
            height: 5,
            max_weight_per_stack: 10_000.0,
            crane_speed: 2.0,
            crane_energy_consumption: 5.0,
            energy_consumption_rate: 0.1,
            carbon_emission_factor: 0.5,
        }
    }
}

impl YardConfig {
    /// Total number of cells in the grid.
    pub fn total_cells(&self) -> usize {
        self.length as usize * self.width as usize * self.height as usize
    }

    /// Number of `(x, y)` columns.
    pub fn total_columns(&self) -> usize {
        self.length as usize * self.width as usize
    }

    pub fn contains(&self, pos: &Position) -> bool {
        pos.x < self.length && pos.y < self.width && pos.z < self.height
    }

    /// Dense index of a cell, `None` when out of bounds.
    ///
    /// Indices grow in lexicographic `(x, y, z)` order.
    pub fn index_of(&self, pos: &Position) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        Some((pos.x as usize * w + pos.y as usize) * h + pos.z as usize)
    }

    /// Inverse of [`YardConfig::index_of`].
    pub fn position_at(&self, index: usize) -> Position {
        let (w, h) = (self.width as usize, self.height as usize);
        let z = index % h;
        let y = (index / h) % w;
        let x = index / (h * w);
        Position::new(x as u32, y as u32, z as u32)
    }

    /// Crane travel time between two cells.
    pub fn move_time(&self, from: &Position, to: &Position) -> f64 {
        if self.crane_speed <= 0.0 {
            return 0.0;
        }
        f64::from(from.manhattan(to)) / self.crane_speed
    }

    /// Crane energy for a single move between two cells.
    pub fn move_energy(&self, from: &Position, to: &Position) -> f64 {
        self.move_time(from, to) * self.crane_energy_consumption
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> YardConfig {
        YardConfig {
            length: 5,
            width: 5,
            height: 3,
            max_weight_per_stack: 5000.0,
            ..YardConfig::default()
        }
    }

    #[test]
    fn index_roundtrips_every_cell() {
        let config = small();
        assert_eq!(config.total_cells(), 75);
        for idx in 0..config.total_cells() {
            let pos = config.position_at(idx);
            assert_eq!(config.index_of(&pos), Some(idx));
        }
    }

    #[test]
    fn index_order_is_lexicographic() {
        let config = small();
        let positions: Vec<Position> = (0..config.total_cells()).map(|i| config.position_at(i)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn out_of_bounds_has_no_index() {
        let config = small();
        assert_eq!(config.index_of(&Position::new(5, 0, 0)), None);
        assert_eq!(config.index_of(&Position::new(0, 5, 0)), None);
        assert_eq!(config.index_of(&Position::new(0, 0, 3)), None);
    }

    #[test]
    fn crane_move_figures() {
        let config = small();
        let from = Position::new(0, 0, 0);
        let to = Position::new(2, 1, 1);
        assert_eq!(from.manhattan(&to), 4);
        assert_eq!(config.move_time(&from, &to), 2.0);
        assert_eq!(config.move_energy(&from, &to), 10.0);
    }

    #[test]
    fn below_stops_at_ground() {
        assert_eq!(Position::new(1, 1, 0).below(), None);
        assert_eq!(Position::new(1, 1, 2).below(), Some(Position::new(1, 1, 1)));
    }
}
