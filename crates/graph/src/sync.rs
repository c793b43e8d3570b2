//! Migration engine: analysis against the destination directory and
//! sequential execution of a migration plan.

use std::time::Duration;

use tracing::{error, info, warn};

use cloudlift_core::config::{CloudliftConfig, EnvironmentConfig, GroupMapping};
use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::error::Result;
use cloudlift_core::models::directory::{DirectoryUser, NewUser};
use cloudlift_core::models::plan::{MigrationPlan, PlanEntry};
use cloudlift_core::models::report::{
    ExecutionOutcome, GroupAssignment, MigrationReport, RecordResult,
};
use cloudlift_core::models::source::SourceExport;
use cloudlift_core::reconcile::{classify, ExistingPrincipals};

use crate::groups::GroupCache;
use crate::password::{generate_random_password, DEFAULT_PASSWORD_LENGTH};
use crate::retry::RetryPolicy;

/// Execution settings for one run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Wait after each account creation before touching group membership.
    pub settle_delay: Duration,
    pub membership_retry: RetryPolicy,
    /// Fixed temporary password; a random one per account when `None`.
    pub initial_password: Option<String>,
    pub group_mapping: GroupMapping,
    pub group_prefix: String,
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            membership_retry: RetryPolicy::default(),
            initial_password: None,
            group_mapping: GroupMapping::default(),
            group_prefix: String::new(),
            dry_run: false,
        }
    }
}

impl MigrationOptions {
    pub fn from_config(config: &CloudliftConfig, env: &EnvironmentConfig, dry_run: bool) -> Self {
        Self {
            settle_delay: Duration::from_secs(config.migration.settle_delay_secs),
            membership_retry: config.migration.membership_retry.clone().into(),
            initial_password: config.migration.initial_password.clone(),
            group_mapping: config.groups.clone(),
            group_prefix: env.group_prefix.clone(),
            dry_run,
        }
    }
}

/// Everything produced by executing a plan.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub report: MigrationReport,
    pub results: Vec<RecordResult>,
    pub groups_created: usize,
    pub dry_run: bool,
}

impl MigrationRun {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ExecutionOutcome::Created))
    }

    pub fn already_existing(&self) -> usize {
        self.count(|o| matches!(o, ExecutionOutcome::AlreadyExists))
    }

    pub fn would_create(&self) -> usize {
        self.count(|o| matches!(o, ExecutionOutcome::WouldCreate))
    }

    pub fn failed(&self) -> usize {
        self.report.failed.len()
    }

    /// Accounts created in this run together with their temporary password.
    pub fn issued_passwords(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|r| {
            r.initial_password
                .as_deref()
                .map(|pw| (r.entry.new_upn.as_str(), pw))
        })
    }

    fn count(&self, f: impl Fn(&ExecutionOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| f(&r.outcome)).count()
    }
}

/// Provisions destination accounts for a migration plan.
pub struct MigrationEngine<D: DirectoryClient> {
    client: D,
    options: MigrationOptions,
}

impl<D: DirectoryClient> MigrationEngine<D> {
    pub fn new(client: D, options: MigrationOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &D {
        &self.client
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Classify an export against the principal names currently present in
    /// the destination.
    pub async fn analyze(&self, export: &SourceExport, domain: &str) -> Result<MigrationPlan> {
        let users = self.client.list_users().await?;
        let existing = ExistingPrincipals::from_users(&users);
        info!(
            existing = existing.len(),
            source_users = export.users.len(),
            "loaded destination principals"
        );
        Ok(classify(export, &existing, domain))
    }

    /// Execute the `to_migrate` entries of a plan in order. Per-record
    /// failures are recorded in the report; the run always completes.
    pub async fn execute(&self, plan: &MigrationPlan) -> MigrationRun {
        let dry_run = self.options.dry_run;
        info!(
            to_migrate = plan.to_migrate.len(),
            dry_run, "starting migration"
        );

        let mut groups = GroupCache::new();
        let mut results = Vec::with_capacity(plan.to_migrate.len());
        for entry in &plan.to_migrate {
            results.push(self.execute_entry(entry, &mut groups).await);
        }

        let report = MigrationReport::from_results(plan, &results);
        let run = MigrationRun {
            report,
            results,
            groups_created: groups.created(),
            dry_run,
        };

        info!(
            created = run.created(),
            already_existing = run.already_existing(),
            would_create = run.would_create(),
            failed = run.failed(),
            groups_created = run.groups_created,
            dry_run,
            "migration completed"
        );
        run
    }

    async fn execute_entry(&self, entry: &PlanEntry, groups: &mut GroupCache) -> RecordResult {
        let upn = entry.new_upn.as_str();
        let mut result = RecordResult {
            entry: entry.clone(),
            outcome: ExecutionOutcome::WouldCreate,
            group: GroupAssignment::NotApplicable,
            initial_password: None,
        };

        let existing = match self.client.get_user(upn).await {
            Ok(existing) => existing,
            Err(e) => {
                error!(upn = %upn, error = %e, "existence check failed");
                result.outcome = ExecutionOutcome::Failed {
                    error: e.to_string(),
                };
                return result;
            }
        };

        let user = match existing {
            Some(user) => {
                info!(upn = %upn, "account already exists, skipping creation");
                result.outcome = ExecutionOutcome::AlreadyExists;
                user
            }
            None if self.options.dry_run => {
                info!(upn = %upn, "dry run: would create account");
                return result;
            }
            None => {
                let password = self.temporary_password();
                match self.client.create_user(&new_user(entry, &password)).await {
                    Ok(user) => {
                        info!(upn = %upn, id = %user.id, "created account");
                        result.outcome = ExecutionOutcome::Created;
                        result.initial_password = Some(password);
                        if !self.options.settle_delay.is_zero() {
                            info!(
                                upn = %upn,
                                delay_secs = self.options.settle_delay.as_secs(),
                                "waiting for directory replication"
                            );
                            tokio::time::sleep(self.options.settle_delay).await;
                        }
                        user
                    }
                    Err(e) => {
                        error!(upn = %upn, error = %e, "account creation failed");
                        result.outcome = ExecutionOutcome::Failed {
                            error: e.to_string(),
                        };
                        return result;
                    }
                }
            }
        };

        if !self.options.dry_run {
            result.group = self.assign_group(entry, &user, groups).await;
        }
        result
    }

    async fn assign_group(
        &self,
        entry: &PlanEntry,
        user: &DirectoryUser,
        groups: &mut GroupCache,
    ) -> GroupAssignment {
        let Some(group_name) = self
            .options
            .group_mapping
            .resolve(entry.record.department.as_deref(), &self.options.group_prefix)
        else {
            return GroupAssignment::NotApplicable;
        };

        match self.add_to_group(&group_name, user, groups).await {
            Ok(()) => {
                info!(upn = %entry.new_upn, group = %group_name, "group membership ensured");
                GroupAssignment::Assigned { group: group_name }
            }
            Err(e) => {
                warn!(
                    upn = %entry.new_upn,
                    group = %group_name,
                    error = %e,
                    "group assignment failed"
                );
                GroupAssignment::Failed {
                    group: group_name,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn add_to_group(
        &self,
        group_name: &str,
        user: &DirectoryUser,
        groups: &mut GroupCache,
    ) -> Result<()> {
        let group = groups.ensure(&self.client, group_name).await?;

        let client = &self.client;
        let group_id = group.id.as_str();
        let user_id = user.id.as_str();
        let added = self
            .options
            .membership_retry
            .execute("add_member", move || client.add_member(group_id, user_id))
            .await;

        match added {
            Err(e) if e.is_already_exists() => Ok(()),
            other => other,
        }
    }

    fn temporary_password(&self) -> String {
        self.options
            .initial_password
            .clone()
            .unwrap_or_else(|| generate_random_password(DEFAULT_PASSWORD_LENGTH))
    }
}

fn new_user(entry: &PlanEntry, password: &str) -> NewUser {
    NewUser {
        display_name: entry.display_name.clone(),
        principal_name: entry.new_upn.clone(),
        mail_nickname: entry.mail_nickname.clone(),
        given_name: entry.record.first_name.clone(),
        surname: entry.record.last_name.clone(),
        department: entry.record.department.clone(),
        job_title: entry.record.job_title.clone(),
        account_enabled: true,
        initial_password: password.to_string(),
        force_password_change: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;
    use cloudlift_core::models::directory::DirectoryGroup;
    use cloudlift_core::models::source::SourceRecord;

    const DOMAIN: &str = "example.com";

    fn record(username: &str, first: &str, last: &str, dept: Option<&str>, enabled: bool) -> SourceRecord {
        SourceRecord {
            username: username.into(),
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            department: dept.map(String::from),
            job_title: None,
            enabled,
        }
    }

    fn export() -> SourceExport {
        SourceExport {
            users: vec![
                record("jdupont", "Jean", "Dupont", Some("IT"), true),
                record("asmith", "Anna", "Smith", Some("RH"), true),
                record("bjones", "Bob", "Jones", Some("IT"), false),
                record("mmartin", "Marie", "Martin", Some("Sales"), true),
            ],
            groups: vec![],
        }
    }

    fn options() -> MigrationOptions {
        MigrationOptions {
            membership_retry: RetryPolicy {
                max_retries: 3,
                base_delay_secs: 0,
                max_delay_secs: 0,
            },
            initial_password: Some("Temp-Passw0rd!".into()),
            ..Default::default()
        }
    }

    async fn plan_for(engine: &MigrationEngine<FakeDirectory>) -> MigrationPlan {
        engine.analyze(&export(), DOMAIN).await.unwrap()
    }

    #[tokio::test]
    async fn analyze_classifies_against_destination() {
        let engine = MigrationEngine::new(
            FakeDirectory::with_users(&["Anna.Smith@example.com"]),
            options(),
        );
        let plan = plan_for(&engine).await;

        assert_eq!(plan.total_users, 4);
        assert_eq!(plan.conflicts[0].new_upn, "anna.smith@example.com");
        assert_eq!(plan.disabled[0].record.username, "bjones");
        let upns: Vec<&str> = plan.to_migrate.iter().map(|e| e.new_upn.as_str()).collect();
        assert_eq!(upns, vec!["jean.dupont@example.com", "marie.martin@example.com"]);
        assert_eq!(engine.client().snapshot(|s| s.list_users_calls), 1);
    }

    #[tokio::test]
    async fn creates_accounts_and_assigns_mapped_group() {
        let engine = MigrationEngine::new(FakeDirectory::default(), options());
        let plan = plan_for(&engine).await;
        let run = engine.execute(&plan).await;

        assert_eq!(run.created(), 3);
        assert_eq!(run.failed(), 0);
        assert_eq!(run.report.migrated.len(), 3);
        assert_eq!(run.report.disabled.len(), 1);
        assert_eq!(run.groups_created, 2);

        let jean = &run.results[0];
        assert_eq!(jean.outcome, ExecutionOutcome::Created);
        assert_eq!(
            jean.group,
            GroupAssignment::Assigned {
                group: "GRP-IT".into()
            }
        );
        assert_eq!(jean.initial_password.as_deref(), Some("Temp-Passw0rd!"));

        // Sales has no mapping.
        let marie = &run.results[2];
        assert_eq!(marie.group, GroupAssignment::NotApplicable);

        engine.client().snapshot(|s| {
            let created = &s.created_users[0];
            assert_eq!(created.principal_name, "jean.dupont@example.com");
            assert_eq!(created.display_name, "Jean Dupont");
            assert_eq!(created.department.as_deref(), Some("IT"));
            assert!(created.account_enabled);
            assert!(created.force_password_change);
            assert_eq!(s.members.len(), 2);
        });
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let engine = MigrationEngine::new(FakeDirectory::default(), options());
        let plan = plan_for(&engine).await;

        let first = engine.execute(&plan).await;
        assert_eq!(first.created(), 3);
        let creates_after_first = engine.client().snapshot(|s| s.create_user_calls);

        let second = engine.execute(&plan).await;
        assert_eq!(second.created(), 0);
        assert_eq!(second.already_existing(), 3);
        assert!(second
            .results
            .iter()
            .all(|r| r.outcome == ExecutionOutcome::AlreadyExists));
        assert_eq!(second.report.migrated.len(), 3);
        assert_eq!(
            engine.client().snapshot(|s| s.create_user_calls),
            creates_after_first
        );
        // "already a member" on re-run is success.
        assert!(matches!(
            second.results[0].group,
            GroupAssignment::Assigned { .. }
        ));
        assert_eq!(second.issued_passwords().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_only_follows_creation() {
        let engine = MigrationEngine::new(
            FakeDirectory::default(),
            MigrationOptions {
                settle_delay: Duration::from_secs(5),
                ..options()
            },
        );
        let plan = classify(
            &SourceExport {
                users: vec![record("jdupont", "Jean", "Dupont", Some("IT"), true)],
                groups: vec![],
            },
            &ExistingPrincipals::default(),
            DOMAIN,
        );

        let first = engine.execute(&plan).await;
        assert_eq!(first.results[0].outcome, ExecutionOutcome::Created);
        engine.client().snapshot(|s| {
            let calls: Vec<&str> = s.timeline.iter().map(|(name, _)| *name).collect();
            assert_eq!(calls, vec!["create_user", "add_member"]);
            assert_eq!(s.timeline[1].1 - s.timeline[0].1, Duration::from_secs(5));
        });

        let started = tokio::time::Instant::now();
        let second = engine.execute(&plan).await;
        assert_eq!(second.results[0].outcome, ExecutionOutcome::AlreadyExists);
        assert_eq!(started.elapsed(), Duration::ZERO);
        engine.client().snapshot(|s| {
            assert_eq!(s.create_user_calls, 1);
            assert_eq!(s.timeline.last().map(|(name, _)| *name), Some("add_member"));
        });
    }

    #[tokio::test]
    async fn existing_account_gets_missing_membership_repaired() {
        let engine = MigrationEngine::new(
            FakeDirectory::with_users(&["jean.dupont@example.com"]),
            options(),
        );
        let plan = classify(
            &SourceExport {
                users: vec![record("jdupont", "Jean", "Dupont", Some("IT"), true)],
                groups: vec![],
            },
            &ExistingPrincipals::default(),
            DOMAIN,
        );

        let run = engine.execute(&plan).await;
        assert_eq!(run.results[0].outcome, ExecutionOutcome::AlreadyExists);
        assert_eq!(
            run.results[0].group,
            GroupAssignment::Assigned {
                group: "GRP-IT".into()
            }
        );
        engine.client().snapshot(|s| {
            assert_eq!(s.create_user_calls, 0);
            assert_eq!(s.members, vec![("group-0".to_string(), "existing-0".to_string())]);
        });
    }

    #[tokio::test]
    async fn lookup_error_is_failure_not_absence() {
        let engine = MigrationEngine::new(
            FakeDirectory::default().with_state(|s| {
                s.failing_lookups.insert("jean.dupont@example.com".into());
            }),
            options(),
        );
        let plan = plan_for(&engine).await;
        let run = engine.execute(&plan).await;

        assert!(matches!(
            run.results[0].outcome,
            ExecutionOutcome::Failed { .. }
        ));
        assert_eq!(run.report.failed[0].upn, "jean.dupont@example.com");
        assert!(run.report.failed[0].error.contains("503"));
        engine.client().snapshot(|s| {
            assert!(s
                .created_users
                .iter()
                .all(|u| u.principal_name != "jean.dupont@example.com"));
        });
    }

    #[tokio::test]
    async fn creation_failure_does_not_stop_the_run() {
        let engine = MigrationEngine::new(
            FakeDirectory::default().with_state(|s| {
                s.failing_creates.insert("jean.dupont@example.com".into());
            }),
            options(),
        );
        let plan = plan_for(&engine).await;
        let run = engine.execute(&plan).await;

        assert_eq!(run.failed(), 1);
        assert_eq!(run.created(), 2);
        assert_eq!(run.results[0].group, GroupAssignment::NotApplicable);
        assert!(run.report.has_failures());
        assert_eq!(run.report.migrated.len(), 2);
    }

    #[tokio::test]
    async fn membership_failure_keeps_success_and_is_not_retried() {
        let engine = MigrationEngine::new(
            FakeDirectory::default().with_state(|s| {
                s.add_member_error = Some((403, "Insufficient privileges".into()));
            }),
            options(),
        );
        let plan = classify(
            &SourceExport {
                users: vec![record("jdupont", "Jean", "Dupont", Some("IT"), true)],
                groups: vec![],
            },
            &ExistingPrincipals::default(),
            DOMAIN,
        );
        let run = engine.execute(&plan).await;

        assert_eq!(run.results[0].outcome, ExecutionOutcome::Created);
        assert!(matches!(
            &run.results[0].group,
            GroupAssignment::Failed { group, .. } if group == "GRP-IT"
        ));
        assert!(!run.report.has_failures());
        assert_eq!(engine.client().snapshot(|s| s.add_member_calls), 1);
    }

    #[tokio::test]
    async fn membership_retries_until_user_is_visible() {
        let engine = MigrationEngine::new(
            FakeDirectory::default().with_state(|s| s.invisible_adds = 2),
            options(),
        );
        let plan = classify(
            &SourceExport {
                users: vec![record("jdupont", "Jean", "Dupont", Some("IT"), true)],
                groups: vec![],
            },
            &ExistingPrincipals::default(),
            DOMAIN,
        );
        let run = engine.execute(&plan).await;

        assert!(matches!(
            run.results[0].group,
            GroupAssignment::Assigned { .. }
        ));
        engine.client().snapshot(|s| {
            assert_eq!(s.add_member_calls, 3);
            assert_eq!(s.members.len(), 1);
        });
    }

    #[tokio::test]
    async fn environment_prefix_selects_group() {
        let engine = MigrationEngine::new(
            FakeDirectory::default().with_state(|s| {
                s.groups.push(DirectoryGroup {
                    id: "g-plain".into(),
                    display_name: "GRP-IT".into(),
                })
            }),
            MigrationOptions {
                group_prefix: "STG-".into(),
                ..options()
            },
        );
        let plan = plan_for(&engine).await;
        let run = engine.execute(&plan).await;

        assert_eq!(
            run.results[0].group,
            GroupAssignment::Assigned {
                group: "STG-GRP-IT".into()
            }
        );
        engine.client().snapshot(|s| {
            assert!(s.groups.iter().any(|g| g.display_name == "STG-GRP-IT"));
            assert!(s.members.iter().all(|(g, _)| g != "g-plain"));
        });
    }

    #[tokio::test]
    async fn dry_run_only_reads() {
        let engine = MigrationEngine::new(
            FakeDirectory::with_users(&["marie.martin@example.com"]),
            MigrationOptions {
                dry_run: true,
                ..options()
            },
        );
        let plan = classify(&export(), &ExistingPrincipals::default(), DOMAIN);
        let run = engine.execute(&plan).await;

        assert!(run.dry_run);
        assert_eq!(run.would_create(), 2);
        assert_eq!(run.already_existing(), 1);
        assert_eq!(run.created(), 0);
        engine.client().snapshot(|s| {
            assert_eq!(s.get_user_calls, 3);
            assert_eq!(s.create_user_calls, 0);
            assert_eq!(s.list_groups_calls, 0);
            assert_eq!(s.create_group_calls, 0);
            assert_eq!(s.add_member_calls, 0);
        });
    }

    #[tokio::test]
    async fn random_password_when_none_configured() {
        let engine = MigrationEngine::new(
            FakeDirectory::default(),
            MigrationOptions {
                initial_password: None,
                ..options()
            },
        );
        let plan = plan_for(&engine).await;
        let run = engine.execute(&plan).await;

        let passwords: Vec<(&str, &str)> = run.issued_passwords().collect();
        assert_eq!(passwords.len(), 3);
        assert!(passwords
            .iter()
            .all(|(_, pw)| pw.len() == DEFAULT_PASSWORD_LENGTH));
        engine.client().snapshot(|s| {
            assert_eq!(s.created_users[0].initial_password, passwords[0].1);
        });
    }

    #[test]
    fn options_from_config() {
        let mut config = CloudliftConfig::generate_default("example.com");
        config.migration.settle_delay_secs = 3;
        let env = EnvironmentConfig::builtin("staging").unwrap();

        let opts = MigrationOptions::from_config(&config, &env, true);
        assert_eq!(opts.settle_delay, Duration::from_secs(3));
        assert_eq!(opts.group_prefix, "STG-");
        assert_eq!(opts.membership_retry, RetryPolicy::default());
        assert!(opts.dry_run);
    }
}
