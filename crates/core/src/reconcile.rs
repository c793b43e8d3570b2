//! Phase-one reconciliation: classify every source record against the
//! principal names already present in the destination directory.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::identity::map_identity;
use crate::models::directory::DirectoryUser;
use crate::models::plan::{Classification, ExclusionReason, MigrationPlan};
use crate::models::source::{SourceExport, SourceRecord};

/// Lowercased set of principal names that exist in the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingPrincipals(HashSet<String>);

impl ExistingPrincipals {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        )
    }

    pub fn from_users(users: &[DirectoryUser]) -> Self {
        Self::new(users.iter().map(|u| u.principal_name.as_str()))
    }

    pub fn contains(&self, principal_name: &str) -> bool {
        self.0.contains(&principal_name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Classify a single record. Disabled accounts are excluded before any
/// conflict check.
pub fn classify_record(
    record: &SourceRecord,
    existing: &ExistingPrincipals,
    domain: &str,
) -> Classification {
    let identity = map_identity(record, domain);

    if !record.enabled {
        Classification::Excluded {
            identity,
            record: record.clone(),
            reason: ExclusionReason::Disabled,
        }
    } else if existing.contains(&identity.principal_name) {
        Classification::Conflict {
            identity,
            record: record.clone(),
        }
    } else {
        Classification::ToMigrate {
            identity,
            record: record.clone(),
        }
    }
}

/// Classify every user of an export, in export order, into a plan.
pub fn classify(
    export: &SourceExport,
    existing: &ExistingPrincipals,
    domain: &str,
) -> MigrationPlan {
    let mut plan = MigrationPlan {
        total_users: export.users.len(),
        groups: export.groups.clone(),
        ..Default::default()
    };

    for record in &export.users {
        let classification = classify_record(record, existing, domain);
        let upn = classification.identity().principal_name.clone();
        match &classification {
            Classification::ToMigrate { .. } => info!(upn = %upn, "to migrate"),
            Classification::Conflict { .. } => info!(upn = %upn, "conflict: account already exists"),
            Classification::Excluded { record, .. } => {
                info!(username = %record.username, "disabled, skipping")
            }
        }
        plan.push(classification);
    }

    debug!(
        total = plan.total_users,
        to_migrate = plan.to_migrate.len(),
        conflicts = plan.conflicts.len(),
        disabled = plan.disabled.len(),
        "classification complete"
    );

    plan
}
