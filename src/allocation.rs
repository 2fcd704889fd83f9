use std::sync::Arc;

use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::models::{HardwareSet, Project};
use crate::services::{Reserve, Store};

/// Post-update counts returned by check-out and check-in: the hardware
/// set's `available` and the project's allocation for that set.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct AllocationSnapshot {
    pub available: i64,
    pub checked_out: i64,
}

/// The accounting core: moves units between a hardware set's available pool
/// and a project's allocation map, keeping
/// `available + sum of project allocations == capacity` for every set.
///
/// Each operation is a pair of single-document atomic updates. The guard
/// side (conditional decrement, clamped restock) lives in the store; the
/// engine orders the writes, rolls the first one back when the second one
/// cannot land, and surfaces a torn state when even the rollback fails.
#[derive(Clone)]
pub struct AllocationEngine {
    store: Arc<dyn Store>,
}

impl AllocationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Moves `amount` units from the pool into the project's allocation.
    /// Fails with `Insufficient` when the pool cannot cover the full
    /// amount, leaving both documents untouched.
    pub async fn check_out(
        &self,
        hwset: &str,
        amount: i64,
        project_id: &str,
    ) -> AppResult<AllocationSnapshot> {
        ensure_positive(amount)?;
        self.require_project(project_id).await?;

        match self.store.reserve(hwset, amount).await? {
            Reserve::Missing => Err(AppError::NotFound(format!("hardware set {}", hwset))),
            Reserve::Insufficient { available } => {
                tracing::warn!(
                    "check-out of {} x {} for {} rejected, only {} available",
                    amount,
                    hwset,
                    project_id,
                    available
                );
                Err(AppError::Insufficient {
                    requested: amount,
                    available,
                })
            }
            Reserve::Reserved { available } => {
                let credited = self.store.adjust_allocation(project_id, hwset, amount).await;
                if let Ok(Some(checked_out)) = credited {
                    tracing::info!(
                        "checked out {} x {} to {}, {} left in pool",
                        amount,
                        hwset,
                        project_id,
                        available
                    );
                    return Ok(AllocationSnapshot {
                        available,
                        checked_out,
                    });
                }

                // The pool was debited but the project was never credited;
                // put the units back before reporting the failure.
                let cause = match credited {
                    Err(e) => AppError::Store(e),
                    _ => AppError::NotFound(format!("project {}", project_id)),
                };
                match self.store.restock(hwset, amount).await {
                    Ok(Some(_)) => Err(cause),
                    _ => Err(AppError::TornState(format!(
                        "{} unit(s) of {} debited without a project credit ({})",
                        amount, hwset, cause
                    ))),
                }
            }
        }
    }

    /// Returns `amount` units from the project's allocation to the pool.
    /// The pool is clamped at capacity and the stored allocation floors at
    /// zero, so over-returning can never mint units or drive a count
    /// negative.
    pub async fn check_in(
        &self,
        hwset: &str,
        amount: i64,
        project_id: &str,
    ) -> AppResult<AllocationSnapshot> {
        ensure_positive(amount)?;
        self.require_project(project_id).await?;

        let restocked = self
            .store
            .restock(hwset, amount)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("hardware set {}", hwset)))?;

        let debited = self
            .store
            .adjust_allocation(project_id, hwset, -amount)
            .await;
        if let Ok(Some(checked_out)) = debited {
            tracing::info!(
                "checked in {} x {} from {}, {} now in pool",
                amount,
                hwset,
                project_id,
                restocked.available
            );
            return Ok(AllocationSnapshot {
                available: restocked.available,
                checked_out,
            });
        }

        // Undo exactly what the clamped restock added.
        let cause = match debited {
            Err(e) => AppError::Store(e),
            _ => AppError::NotFound(format!("project {}", project_id)),
        };
        let rolled_back = restocked.added == 0
            || matches!(
                self.store.reserve(hwset, restocked.added).await,
                Ok(Reserve::Reserved { .. })
            );
        if rolled_back {
            Err(cause)
        } else {
            Err(AppError::TornState(format!(
                "{} unit(s) of {} restocked without a project debit ({})",
                restocked.added, hwset, cause
            )))
        }
    }

    /// Provisions a new hardware set with a full pool.
    pub async fn provision_hardware_set(
        &self,
        name: &str,
        capacity: i64,
    ) -> AppResult<HardwareSet> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("hardware set name is required".into()));
        }
        if capacity <= 0 {
            return Err(AppError::Validation("capacity must be positive".into()));
        }
        let set = HardwareSet {
            name: name.to_string(),
            available: capacity,
            capacity,
        };
        if !self.store.insert_hardware_set(&set).await? {
            return Err(AppError::Conflict(format!(
                "hardware set {} already exists",
                name
            )));
        }
        tracing::info!("provisioned hardware set {} with capacity {}", name, capacity);
        Ok(set)
    }

    pub async fn hardware_sets(&self) -> AppResult<Vec<HardwareSet>> {
        Ok(self.store.list_hardware_sets().await?)
    }

    /// Creates a project owned by `owner`. The owner's project counter is
    /// bumped atomically before the insert, so the minted id is reserved
    /// even if the insert never lands; sequential creations always get
    /// distinct ids.
    pub async fn create_project(
        &self,
        owner: &str,
        name: &str,
        description: &str,
    ) -> AppResult<Project> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("project name is required".into()));
        }
        let seq = self
            .store
            .next_project_seq(owner)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", owner)))?;

        let project = Project {
            id: format!("{}_{}", owner, seq),
            name: name.to_string(),
            description: description.to_string(),
            members: [owner.to_string()].into_iter().collect(),
            hardware: Default::default(),
        };
        if !self.store.insert_project(&project).await? {
            return Err(AppError::Conflict(format!(
                "project {} already exists",
                project.id
            )));
        }
        tracing::info!("user {} created project {}", owner, project.id);
        Ok(project)
    }

    /// Joins the project if `user` is not a member, leaves it otherwise.
    /// Returns the post-toggle membership status. Allocations are untouched
    /// either way; hardware belongs to the project, not the member.
    pub async fn toggle_membership(&self, user: &str, project_id: &str) -> AppResult<bool> {
        let project = self.require_project(project_id).await?;
        let join = !project.members.contains(user);
        let status = self
            .store
            .set_membership(project_id, user, join)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {}", project_id)))?;
        tracing::info!(
            "user {} {} project {}",
            user,
            if status { "joined" } else { "left" },
            project_id
        );
        Ok(status)
    }

    /// All projects, or only those `member` belongs to. Zero allocations
    /// are dropped from every entry's hardware map.
    pub async fn projects(&self, member: Option<&str>) -> AppResult<Vec<Project>> {
        let mut projects = self.store.list_projects().await?;
        if let Some(user) = member {
            projects.retain(|p| p.members.contains(user));
        }
        Ok(projects.into_iter().map(Project::for_display).collect())
    }

    async fn require_project(&self, project_id: &str) -> AppResult<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {}", project_id)))
    }
}

fn ensure_positive(amount: i64) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::Validation("amount must be positive".into()));
    }
    Ok(())
}
