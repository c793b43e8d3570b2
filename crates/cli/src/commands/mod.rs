pub mod analyze;
pub mod init;
pub mod migrate;
pub mod report;
pub mod run;

use std::path::{Path, PathBuf};

use chrono::Utc;
use cloudlift_core::config::{CloudliftConfig, Credentials, EnvironmentConfig};
use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::export::read_export;
use cloudlift_core::models::source::SourceExport;
use cloudlift_core::report::{ArtifactPaths, ReportMeta};
use cloudlift_graph::client::GraphClient;
use cloudlift_graph::sync::{MigrationEngine, MigrationOptions};
use tracing::{info, warn};

pub const DESTINATION_LABEL: &str = "Microsoft Entra ID";

/// Validated configuration plus the selected environment.
pub struct Context {
    pub config: CloudliftConfig,
    pub env: EnvironmentConfig,
}

impl Context {
    pub fn load(config_path: &str, env_name: &str) -> anyhow::Result<Self> {
        let config = CloudliftConfig::load(Path::new(config_path))?;
        config.validate()?;
        let env = config.environment(env_name)?;

        info!(
            config = %config_path,
            environment = %env.environment,
            production = env.is_production(),
            "loaded configuration"
        );

        Ok(Self { config, env })
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&PathBuf::from(&self.config.migration.reports_dir))
    }

    /// Read the source export, truncated to the environment's user limit.
    pub fn load_export(&self) -> anyhow::Result<SourceExport> {
        let mut export = read_export(Path::new(&self.config.source.path))?;
        if let Some(limit) = self.env.user_limit() {
            if export.users.len() > limit {
                warn!(
                    environment = %self.env.environment,
                    limit,
                    total = export.users.len(),
                    "limiting source users for non-production run"
                );
                export.truncate_users(limit);
            }
        }
        Ok(export)
    }

    /// Build the Graph client from configuration and environment credentials.
    pub fn connect(&self) -> anyhow::Result<GraphClient> {
        let credentials = Credentials::resolve(&self.config.directory)?;
        Ok(GraphClient::from_config(&self.config.directory, credentials)?)
    }

    pub fn engine<D: DirectoryClient>(&self, client: D, dry_run: bool) -> MigrationEngine<D> {
        MigrationEngine::new(
            client,
            MigrationOptions::from_config(&self.config, &self.env, dry_run),
        )
    }

    pub fn report_meta(&self) -> ReportMeta {
        ReportMeta {
            generated_at: Utc::now(),
            environment: format!("{} ({})", self.env.environment, self.env.description),
            source: self.config.source.label.clone(),
            destination: format!("{DESTINATION_LABEL} ({})", self.config.directory.domain),
        }
    }
}

/// Whether a finished run must end the process with a failure status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub failed: usize,
    pub fatal: bool,
}

impl Verdict {
    pub fn new(env: &EnvironmentConfig, failed: usize) -> Self {
        Self {
            failed,
            fatal: env.should_fail_run(failed),
        }
    }

    pub fn success() -> Self {
        Self {
            failed: 0,
            fatal: false,
        }
    }
}
