//! Phase-one output: every source record classified exactly once.

use serde::{Deserialize, Serialize};

use super::identity::CanonicalIdentity;
use super::source::{SourceGroup, SourceRecord};

/// Why a record was excluded from migration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    Disabled,
}

/// Classification of a single source record against destination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    ToMigrate {
        identity: CanonicalIdentity,
        record: SourceRecord,
    },
    Conflict {
        identity: CanonicalIdentity,
        record: SourceRecord,
    },
    Excluded {
        identity: CanonicalIdentity,
        record: SourceRecord,
        reason: ExclusionReason,
    },
}

impl Classification {
    pub fn identity(&self) -> &CanonicalIdentity {
        match self {
            Self::ToMigrate { identity, .. }
            | Self::Conflict { identity, .. }
            | Self::Excluded { identity, .. } => identity,
        }
    }

    pub fn into_entry(self) -> PlanEntry {
        match self {
            Self::ToMigrate { identity, record } | Self::Conflict { identity, record } => {
                PlanEntry::new(record, identity)
            }
            Self::Excluded {
                identity, record, ..
            } => PlanEntry::new(record, identity),
        }
    }
}

/// Persisted form of a classified record: the source fields plus the
/// destination identity computed for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    #[serde(flatten)]
    pub record: SourceRecord,
    pub new_upn: String,
    pub display_name: String,
    pub mail_nickname: String,
}

impl PlanEntry {
    pub fn new(record: SourceRecord, identity: CanonicalIdentity) -> Self {
        Self {
            record,
            new_upn: identity.principal_name,
            display_name: identity.display_name,
            mail_nickname: identity.mail_nickname,
        }
    }
}

/// The hand-off artifact between the classify and execute phases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationPlan {
    pub total_users: usize,
    pub to_migrate: Vec<PlanEntry>,
    pub conflicts: Vec<PlanEntry>,
    pub disabled: Vec<PlanEntry>,
    #[serde(default)]
    pub groups: Vec<SourceGroup>,
    /// Environment the plan was analyzed for.
    #[serde(default)]
    pub environment: Option<String>,
    /// Source user limit in force during analysis.
    #[serde(default)]
    pub user_limit: Option<usize>,
}

impl MigrationPlan {
    /// Append a classification to the bucket matching its variant.
    pub fn push(&mut self, classification: Classification) {
        match classification {
            c @ Classification::ToMigrate { .. } => self.to_migrate.push(c.into_entry()),
            c @ Classification::Conflict { .. } => self.conflicts.push(c.into_entry()),
            c @ Classification::Excluded { .. } => self.disabled.push(c.into_entry()),
        }
    }

    /// Record the environment and user limit the plan was built under.
    pub fn stamp(&mut self, environment: &str, user_limit: Option<usize>) {
        self.environment = Some(environment.to_string());
        self.user_limit = user_limit;
    }

    /// Number of classified records across all buckets.
    pub fn classified(&self) -> usize {
        self.to_migrate.len() + self.conflicts.len() + self.disabled.len()
    }
}
