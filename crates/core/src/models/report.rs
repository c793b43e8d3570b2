//! Phase-two output: per-record execution outcomes and the aggregated report.

use serde::{Deserialize, Serialize};

use super::plan::{MigrationPlan, PlanEntry};

/// Top-level outcome of executing one `to_migrate` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The account was created in this run.
    Created,
    /// The account was already present (earlier run, or created out of band).
    AlreadyExists,
    /// The account could not be created or its existence could not be checked.
    Failed { error: String },
    /// Dry run: the account would have been created.
    WouldCreate,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists | Self::WouldCreate)
    }
}

/// Result of the group membership step. Never changes the record's outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupAssignment {
    /// No group mapping for the department, or the account was not migrated.
    NotApplicable,
    Assigned { group: String },
    Failed { group: String, error: String },
}

/// Everything the engine knows about one executed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordResult {
    pub entry: PlanEntry,
    pub outcome: ExecutionOutcome,
    pub group: GroupAssignment,
    /// Temporary password set on a newly created account.
    pub initial_password: Option<String>,
}

/// A failed record in the persisted report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedEntry {
    pub upn: String,
    pub error: String,
}

/// The persisted post-migration report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: Vec<PlanEntry>,
    pub conflicts: Vec<PlanEntry>,
    pub disabled: Vec<PlanEntry>,
    pub failed: Vec<FailedEntry>,
}

impl MigrationReport {
    /// Aggregate per-record results, carrying conflicts and disabled
    /// entries over from the plan unchanged.
    pub fn from_results(plan: &MigrationPlan, results: &[RecordResult]) -> Self {
        let mut report = Self {
            migrated: Vec::new(),
            conflicts: plan.conflicts.clone(),
            disabled: plan.disabled.clone(),
            failed: Vec::new(),
        };

        for result in results {
            match &result.outcome {
                ExecutionOutcome::Failed { error } => report.failed.push(FailedEntry {
                    upn: result.entry.new_upn.clone(),
                    error: error.clone(),
                }),
                _ => report.migrated.push(result.entry.clone()),
            }
        }

        report
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
