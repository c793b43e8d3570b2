//! TOML-based configuration system for Cloudlift.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CloudliftError, Result};

const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

/// Top-level Cloudlift configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudliftConfig {
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub groups: GroupMapping,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentSettings>,
}

/// Destination directory (Microsoft Entra ID) connection settings.
///
/// The client secret is never read from the file; see [`Credentials::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Verified domain used to build principal names.
    pub domain: String,
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

fn default_graph_url() -> String {
    DEFAULT_GRAPH_URL.into()
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.into()
}

/// Where the on-premise export lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: String,
    /// Human-readable name of the source directory, used in reports.
    #[serde(default = "default_source_label")]
    pub label: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            label: default_source_label(),
        }
    }
}

fn default_source_path() -> String {
    "data/on_premise_ad.json".into()
}

fn default_source_label() -> String {
    "On-premise Active Directory".into()
}

/// Execution-phase settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    /// Wait after each account creation before touching group membership.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    /// Temporary password for new accounts. A random one is generated per
    /// account when unset.
    #[serde(default)]
    pub initial_password: Option<String>,
    #[serde(default)]
    pub membership_retry: RetryConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            settle_delay_secs: default_settle_delay(),
            initial_password: None,
            membership_retry: RetryConfig::default(),
        }
    }
}

fn default_reports_dir() -> String {
    "reports".into()
}

fn default_settle_delay() -> u64 {
    8
}

/// Bounded exponential backoff for membership assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    4
}

fn default_base_delay() -> u64 {
    2
}

fn default_max_delay() -> u64 {
    30
}

/// Department label → destination group display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GroupMapping(pub BTreeMap<String, String>);

impl Default for GroupMapping {
    fn default() -> Self {
        Self(
            [
                ("IT", "GRP-IT"),
                ("DEV", "GRP-DEV"),
                ("RH", "GRP-RH"),
                ("FINANCE", "GRP-FINANCE"),
                ("MANAGEMENT", "GRP-MANAGEMENT"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        )
    }
}

impl GroupMapping {
    /// Resolve the destination group for a department, applying the
    /// environment prefix. `None` means no group assignment.
    pub fn resolve(&self, department: Option<&str>, prefix: &str) -> Option<String> {
        let base = self.0.get(department?.trim())?;
        Some(format!("{prefix}{base}"))
    }
}

/// Per-environment settings as written in the `[environments.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentSettings {
    #[serde(default)]
    pub description: String,
    /// `-1` means unlimited.
    #[serde(default = "default_max_users")]
    pub max_users: i64,
    #[serde(default)]
    pub group_prefix: String,
}

fn default_max_users() -> i64 {
    -1
}

/// A resolved environment: its name plus its settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub description: String,
    pub max_users: i64,
    pub group_prefix: String,
}

impl EnvironmentConfig {
    pub fn new(name: &str, settings: &EnvironmentSettings) -> Self {
        Self {
            environment: name.to_string(),
            description: settings.description.clone(),
            max_users: settings.max_users,
            group_prefix: settings.group_prefix.clone(),
        }
    }

    /// Built-in settings for the conventional environment names.
    pub fn builtin(name: &str) -> Option<Self> {
        let (description, max_users, group_prefix) = match name {
            "dev" => ("Development tenant, limited run", 5, "DEV-"),
            "staging" => ("Staging tenant, full run", -1, "STG-"),
            "prod" | "production" => ("Production tenant", -1, ""),
            _ => return None,
        };
        Some(Self {
            environment: name.to_string(),
            description: description.to_string(),
            max_users,
            group_prefix: group_prefix.to_string(),
        })
    }

    pub fn is_production(&self) -> bool {
        let name = self.environment.to_lowercase();
        name == "prod" || name == "production"
    }

    /// Maximum number of source records to process. Production always
    /// processes everything.
    pub fn user_limit(&self) -> Option<usize> {
        if self.is_production() || self.max_users < 0 {
            None
        } else {
            usize::try_from(self.max_users).ok()
        }
    }

    /// The run fails only in production, and only when records failed.
    pub fn should_fail_run(&self, failed: usize) -> bool {
        self.is_production() && failed > 0
    }
}

/// Client-credential secrets for the destination directory.
#[derive(Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials from the process environment, falling back to the
    /// config file for the non-secret identifiers.
    pub fn resolve(directory: &DirectoryConfig) -> Result<Self> {
        Self::resolve_with(directory, |key| std::env::var(key).ok())
    }

    /// Like [`Credentials::resolve`] with an injectable variable lookup.
    pub fn resolve_with<F>(directory: &DirectoryConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |names: &[&str]| {
            names
                .iter()
                .filter_map(|n| lookup(n))
                .find(|v| !v.trim().is_empty())
        };

        let tenant_id = var(&["CLOUDLIFT_TENANT_ID", "ARM_TENANT_ID"])
            .or_else(|| directory.tenant_id.clone())
            .ok_or_else(|| {
                CloudliftError::Config(
                    "tenant id missing: set directory.tenant_id or CLOUDLIFT_TENANT_ID".into(),
                )
            })?;
        let client_id = var(&["CLOUDLIFT_CLIENT_ID", "ARM_CLIENT_ID"])
            .or_else(|| directory.client_id.clone())
            .ok_or_else(|| {
                CloudliftError::Config(
                    "client id missing: set directory.client_id or CLOUDLIFT_CLIENT_ID".into(),
                )
            })?;
        let client_secret =
            var(&["CLOUDLIFT_CLIENT_SECRET", "ARM_CLIENT_SECRET"]).ok_or_else(|| {
                CloudliftError::Config("client secret missing: set CLOUDLIFT_CLIENT_SECRET".into())
            })?;

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
        })
    }
}

impl CloudliftConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CloudliftError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid values.
    pub fn validate(&self) -> Result<()> {
        validate_domain(&self.directory.domain)?;

        if self.directory.graph_url.is_empty() {
            return Err(CloudliftError::Config(
                "directory.graph_url must not be empty".into(),
            ));
        }

        if self.source.path.is_empty() {
            return Err(CloudliftError::Config(
                "source.path must not be empty".into(),
            ));
        }

        if self.migration.reports_dir.is_empty() {
            return Err(CloudliftError::Config(
                "migration.reports_dir must not be empty".into(),
            ));
        }

        if let Some(ref password) = self.migration.initial_password {
            if password.len() < 8 {
                return Err(CloudliftError::Config(
                    "migration.initial_password must be at least 8 characters".into(),
                ));
            }
        }

        let retry = &self.migration.membership_retry;
        if retry.base_delay_secs > retry.max_delay_secs {
            return Err(CloudliftError::Config(
                "migration.membership_retry.base_delay_secs must not exceed max_delay_secs".into(),
            ));
        }

        for (name, env) in &self.environments {
            if env.max_users < -1 {
                return Err(CloudliftError::Config(format!(
                    "environments.{name}.max_users must be -1 (unlimited) or >= 0"
                )));
            }
        }

        Ok(())
    }

    /// Resolve an environment by name: the `[environments.<name>]` table if
    /// present, otherwise the built-in defaults.
    pub fn environment(&self, name: &str) -> Result<EnvironmentConfig> {
        if let Some(settings) = self.environments.get(name) {
            return Ok(EnvironmentConfig::new(name, settings));
        }
        EnvironmentConfig::builtin(name).ok_or_else(|| {
            CloudliftError::Config(format!(
                "unknown environment '{name}': add an [environments.{name}] table"
            ))
        })
    }

    /// Generate a sensible default configuration.
    pub fn generate_default(domain: &str) -> Self {
        let environments = ["dev", "staging", "prod"]
            .iter()
            .filter_map(|name| EnvironmentConfig::builtin(name))
            .map(|env| {
                (
                    env.environment.clone(),
                    EnvironmentSettings {
                        description: env.description,
                        max_users: env.max_users,
                        group_prefix: env.group_prefix,
                    },
                )
            })
            .collect();

        Self {
            directory: DirectoryConfig {
                tenant_id: None,
                client_id: None,
                domain: domain.to_string(),
                graph_url: default_graph_url(),
                login_url: default_login_url(),
            },
            source: SourceConfig::default(),
            migration: MigrationConfig::default(),
            groups: GroupMapping::default(),
            environments,
        }
    }
}

/// A domain must be a bare DNS name: non-empty, dotted, no `@` or whitespace.
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(CloudliftError::Config(
            "directory.domain must not be empty".into(),
        ));
    }
    if domain.contains('@') || domain.chars().any(char::is_whitespace) {
        return Err(CloudliftError::Config(format!(
            "directory.domain is not a bare domain name: '{domain}'"
        )));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(CloudliftError::Config(format!(
            "directory.domain must be a dotted domain name: '{domain}'"
        )));
    }
    Ok(())
}
