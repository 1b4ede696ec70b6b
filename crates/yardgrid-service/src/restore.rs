//! Rehydration from a persisted resident set.

use serde::Serialize;
use tracing::{debug, info, warn};
use yardgrid_state::{Container, ContainerId, ResidentRecord, YardError, today};

use crate::service::YardService;

/// A resident that could not be brought back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedResident {
    pub id: ContainerId,
    pub reason: String,
}

/// Outcome of [`YardService::restore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    /// Placed at their stored position.
    pub restored: usize,
    /// Placed by the policy because the stored position was absent or
    /// no longer legal.
    pub replaced: usize,
    pub rejected: Vec<RejectedResident>,
}

impl YardService {
    /// Load a full resident set, typically at startup.
    ///
    /// Holds the write lock for the whole batch so no request observes a
    /// half-restored yard. Failures are collected, never fatal.
    pub async fn restore(&self, residents: Vec<ResidentRecord>) -> RestoreReport {
        let mut report = RestoreReport::default();
        let today = today();
        let mut yard = self.yard().write().await;

        for resident in residents {
            let id = resident.record.id.clone();
            let reject = |report: &mut RestoreReport, error: YardError| {
                warn!(container = %id, error = %error, "resident rejected");
                report.rejected.push(RejectedResident {
                    id: id.clone(),
                    reason: error.to_string(),
                });
            };

            let container = match Container::from_record(resident.record) {
                Ok(c) => c,
                Err(e) => {
                    reject(&mut report, e);
                    continue;
                }
            };
            if yard.contains(&id) {
                reject(&mut report, YardError::DuplicateContainerId(id.clone()));
                continue;
            }

            if let Some(pos) = resident.position {
                match yard.add(container.clone(), pos) {
                    Ok(()) => {
                        report.restored += 1;
                        continue;
                    }
                    Err(e) => debug!(container = %id, error = %e, "stored position no longer legal"),
                }
            }

            match self.policy().place(&container, &yard, today) {
                Some(placement) => match yard.add(container, placement.position) {
                    Ok(()) => report.replaced += 1,
                    Err(e) => reject(&mut report, e),
                },
                None => reject(&mut report, YardError::NoAvailablePlacement(id.clone())),
            }
        }

        yard.clear_move_history();
        info!(
            restored = report.restored,
            replaced = report.replaced,
            rejected = report.rejected.len(),
            "yard restored"
        );
        report
    }
}
