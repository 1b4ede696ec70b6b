//! Move planning on a working copy.

use std::cmp::Ordering;

use chrono::NaiveDate;
use tracing::{debug, warn};
use yardgrid_placement::{Placement, PlacementPolicy};
use yardgrid_state::{Container, ContainerId, Position, YardState};

/// A single relocation produced by planning.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub container_id: ContainerId,
    pub from: Position,
    pub to: Position,
    /// The decision that produced `to`.
    pub placement: Placement,
}

/// Ordered moves for one pass. Applying them in order to the snapshot
/// they were planned from never collides.
#[derive(Debug, Clone, Default)]
pub struct ReoptimizationPlan {
    pub moves: Vec<PlannedMove>,
    /// Containers visited during planning.
    pub considered: usize,
}

impl ReoptimizationPlan {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }
}

/// Resident container ids in reoptimization order.
///
/// Overdue containers come first, then ascending days until departure.
/// Containers without a departure date go last; ties are broken by id.
pub fn priority_order(yard: &YardState, today: NaiveDate) -> Vec<ContainerId> {
    let mut containers: Vec<&Container> = yard.containers().collect();
    containers.sort_by(|a, b| {
        b.is_overdue(today)
            .cmp(&a.is_overdue(today))
            .then_with(|| by_departure(a, b))
            .then_with(|| a.id.cmp(&b.id))
    });
    containers.into_iter().map(|c| c.id.clone()).collect()
}

fn by_departure(a: &Container, b: &Container) -> Ordering {
    match (a.departure_date, b.departure_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Plan a pass over `snapshot` without touching it.
///
/// Each container, in priority order, is lifted out of a working copy and
/// re-placed. If the policy finds no cell, or picks the one it came
/// from, the container stays put.
pub fn compute_plan(snapshot: &YardState, policy: &PlacementPolicy, today: NaiveDate) -> ReoptimizationPlan {
    let mut work = snapshot.clone();
    let mut plan = ReoptimizationPlan::default();

    for id in priority_order(snapshot, today) {
        let Some(from) = work.position(&id) else {
            continue;
        };
        let Some(container) = work.remove(&id) else {
            continue;
        };
        plan.considered += 1;

        let decision = policy.place(&container, &work, today);
        let to = match &decision {
            Some(p) if p.position != from => p.position,
            _ => from,
        };

        if let Err(e) = work.add(container, to) {
            // Only reachable if the policy returned an illegal cell.
            warn!(container = %id, error = %e, "planning lost a container from the working copy");
            continue;
        }
        if let Some(placement) = decision
            && to != from
        {
            plan.moves.push(PlannedMove {
                container_id: id,
                from,
                to,
                placement,
            });
        }
    }

    debug!(considered = plan.considered, moves = plan.moves.len(), "reoptimization planned");
    plan
}
