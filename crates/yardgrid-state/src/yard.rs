//! YardState — the dense container grid and its indexes.
//!
//! Every mutating method validates first and mutates second, so a
//! returned error always means nothing changed.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use yard_core::{Position, YardConfig};

use crate::error::{YardError, YardResult};
use crate::types::{Container, ContainerId, ContainerUpdate};

/// The 3-D grid plus the id index and the id→position reverse index.
#[derive(Debug, Clone)]
pub struct YardState {
    config: YardConfig,
    /// Dense cells in lexicographic `(x, y, z)` order.
    cells: Vec<Option<ContainerId>>,
    containers: HashMap<ContainerId, Container>,
    positions: HashMap<ContainerId, Position>,
    /// Position each moved container held before its first move since the
    /// history was last cleared.
    prior_positions: HashMap<ContainerId, Position>,
}

impl YardState {
    pub fn new(config: YardConfig) -> Self {
        let cells = vec![None; config.total_cells()];
        Self {
            config,
            cells,
            containers: HashMap::new(),
            positions: HashMap::new(),
            prior_positions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &YardConfig {
        &self.config
    }

    // ── Mutations ─────────────────────────────────────────────────

    /// Place a new container at `pos`.
    pub fn add(&mut self, mut container: Container, pos: Position) -> YardResult<()> {
        let idx = self.index(&pos)?;
        if self.containers.contains_key(&container.id) {
            return Err(YardError::DuplicateContainerId(container.id));
        }
        if self.cells[idx].is_some() {
            return Err(YardError::OccupiedCell(pos));
        }
        self.check_weight(&pos, container.weight, None)?;

        container.last_moved = Some(epoch_secs());
        let id = container.id.clone();
        self.cells[idx] = Some(id.clone());
        self.positions.insert(id.clone(), pos);
        self.containers.insert(id.clone(), container);
        debug!(container = %id, x = pos.x, y = pos.y, z = pos.z, "container added");
        Ok(())
    }

    /// Detach a container from the yard, returning it.
    pub fn remove(&mut self, id: &str) -> Option<Container> {
        let pos = self.positions.remove(id)?;
        if let Some(idx) = self.config.index_of(&pos) {
            self.cells[idx] = None;
        }
        self.prior_positions.remove(id);
        let container = self.containers.remove(id);
        debug!(container = %id, x = pos.x, y = pos.y, z = pos.z, "container removed");
        container
    }

    /// Relocate a resident container to an empty cell in one step.
    pub fn move_container(&mut self, id: &str, to: Position) -> YardResult<()> {
        let from = self
            .positions
            .get(id)
            .copied()
            .ok_or_else(|| YardError::UnknownContainerId(id.to_string()))?;
        let to_idx = self.index(&to)?;
        if self.cells[to_idx].is_some() {
            return Err(YardError::OccupiedCell(to));
        }
        let weight = self
            .containers
            .get(id)
            .map(|c| c.weight)
            .ok_or_else(|| YardError::UnknownContainerId(id.to_string()))?;
        self.check_weight(&to, weight, Some(id))?;
        let from_idx = self.index(&from)?;

        let owned = self.cells[from_idx].take();
        self.cells[to_idx] = owned;
        self.positions.insert(id.to_string(), to);
        self.prior_positions.entry(id.to_string()).or_insert(from);
        if let Some(container) = self.containers.get_mut(id) {
            container.last_moved = Some(epoch_secs());
        }
        debug!(container = %id, %from, %to, "container moved");
        Ok(())
    }

    /// Amend a resident container in place; a new weight must still fit
    /// its column.
    pub fn update(&mut self, id: &str, update: &ContainerUpdate) -> YardResult<()> {
        let pos = self
            .positions
            .get(id)
            .copied()
            .ok_or_else(|| YardError::UnknownContainerId(id.to_string()))?;
        let current = self
            .containers
            .get(id)
            .ok_or_else(|| YardError::UnknownContainerId(id.to_string()))?;

        let mut amended = current.clone();
        amended.amend(update)?;
        self.check_weight(&pos, amended.weight, Some(id))?;
        self.containers.insert(id.to_string(), amended);
        debug!(container = %id, "container amended");
        Ok(())
    }

    /// Forget the move history used for move-cost accounting.
    pub fn clear_move_history(&mut self) {
        self.prior_positions.clear();
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.containers.contains_key(id)
    }

    pub fn container_at(&self, pos: &Position) -> Option<&Container> {
        let idx = self.config.index_of(pos)?;
        self.cells[idx].as_ref().and_then(|id| self.containers.get(id))
    }

    pub fn is_occupied(&self, pos: &Position) -> bool {
        self.config
            .index_of(pos)
            .is_some_and(|idx| self.cells[idx].is_some())
    }

    /// Recorded position before the container's first move since the
    /// history was cleared.
    pub fn prior_position(&self, id: &str) -> Option<Position> {
        self.prior_positions.get(id).copied()
    }

    /// Number of resident containers (equals the number of occupied cells).
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Every resident with its position.
    pub fn residents(&self) -> impl Iterator<Item = (&Container, Position)> {
        self.containers
            .values()
            .filter_map(|c| self.positions.get(&c.id).map(|p| (c, *p)))
    }

    /// Empty cells in lexicographic order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(idx, _)| self.config.position_at(idx))
    }

    /// Containers in the `(x, y)` column, bottom to top.
    pub fn column(&self, x: u32, y: u32) -> impl Iterator<Item = (u32, &Container)> + '_ {
        (0..self.config.height).filter_map(move |z| {
            self.container_at(&Position::new(x, y, z)).map(|c| (z, c))
        })
    }

    /// Total weight currently in a column.
    pub fn stack_weight(&self, x: u32, y: u32) -> f64 {
        self.column(x, y).map(|(_, c)| c.weight).sum()
    }

    /// Whether `weight` can sit at `pos` without breaking any prefix of
    /// its column. The cell itself is not checked for occupancy.
    pub fn fits_weight(&self, pos: &Position, weight: f64, ignore: Option<&str>) -> bool {
        self.check_weight(pos, weight, ignore).is_ok()
    }

    /// Evaluate every prefix of the target column with `weight` at
    /// `pos.z`, skipping the container named by `ignore`.
    ///
    /// Always computed from the live grid, never cached.
    pub fn check_weight(&self, pos: &Position, weight: f64, ignore: Option<&str>) -> YardResult<()> {
        let limit = self.config.max_weight_per_stack;
        let mut prefix = 0.0;
        for z in 0..self.config.height {
            if z == pos.z {
                prefix += weight;
            } else if let Some(c) = self.container_at(&Position::new(pos.x, pos.y, z))
                && ignore != Some(c.id.as_str())
            {
                prefix += c.weight;
            }
            if prefix > limit {
                return Err(YardError::WeightLimitExceeded {
                    position: *pos,
                    stack_weight: prefix,
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Exhaustive scan of the grid against both indexes.
    ///
    /// Independent of the id→position index so tests can use it to
    /// validate incremental maintenance.
    pub fn verify_invariants(&self) -> Result<(), String> {
        let mut seen: HashMap<&str, Position> = HashMap::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            let Some(id) = cell else { continue };
            let pos = self.config.position_at(idx);
            if let Some(prev) = seen.insert(id.as_str(), pos) {
                return Err(format!("container {id} occupies both {prev} and {pos}"));
            }
            if !self.containers.contains_key(id) {
                return Err(format!("cell {pos} holds unindexed container {id}"));
            }
            if self.positions.get(id) != Some(&pos) {
                return Err(format!(
                    "position index for {id} is {:?}, grid says {pos}",
                    self.positions.get(id)
                ));
            }
        }
        if seen.len() != self.containers.len() || seen.len() != self.positions.len() {
            return Err(format!(
                "grid holds {} containers, id index {}, position index {}",
                seen.len(),
                self.containers.len(),
                self.positions.len()
            ));
        }

        let limit = self.config.max_weight_per_stack;
        for x in 0..self.config.length {
            for y in 0..self.config.width {
                let mut prefix = 0.0;
                for (z, c) in self.column(x, y) {
                    prefix += c.weight;
                    if prefix > limit {
                        return Err(format!(
                            "column ({x}, {y}) weighs {prefix} at level {z}, limit {limit}"
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn index(&self, pos: &Position) -> YardResult<usize> {
        self.config
            .index_of(pos)
            .ok_or(YardError::InvalidPosition(*pos))
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
