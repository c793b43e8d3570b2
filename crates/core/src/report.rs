//! Migration artifacts: JSON persistence and the plain-text final report.

use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CloudliftError, Result};
use crate::models::plan::MigrationPlan;
use crate::models::report::MigrationReport;

pub const PLAN_FILE: &str = "pre_migration_report.json";
pub const REPORT_FILE: &str = "migration_report.json";
pub const TEXT_REPORT_FILE: &str = "final_report.txt";

const RULE: &str = "--------------------------------------------------------------";
const BANNER: &str = "==============================================================";

/// Header information for the text report.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub generated_at: DateTime<Utc>,
    pub environment: String,
    pub source: String,
    pub destination: String,
}

/// Paths of the artifacts inside a reports directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub plan: PathBuf,
    pub report: PathBuf,
    pub text: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            plan: dir.join(PLAN_FILE),
            report: dir.join(REPORT_FILE),
            text: dir.join(TEXT_REPORT_FILE),
        }
    }
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a JSON artifact written by [`write_json`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        CloudliftError::Serialization(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write the rendered text report, creating parent directories.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Render the fixed-layout final report.
pub fn render_text(plan: &MigrationPlan, report: &MigrationReport, meta: &ReportMeta) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, plan, report, meta)
        .map_err(|e| CloudliftError::Serialization(format!("failed to render report: {e}")))?;
    Ok(out)
}

fn write_report(
    out: &mut impl Write,
    plan: &MigrationPlan,
    report: &MigrationReport,
    meta: &ReportMeta,
) -> fmt::Result {
    writeln!(out, "{BANNER}")?;
    writeln!(out, "  DIRECTORY MIGRATION REPORT: ON-PREMISE -> CLOUD")?;
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;
    writeln!(
        out,
        "Date         : {}",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "Environment  : {}", meta.environment)?;
    writeln!(out, "Source       : {}", meta.source)?;
    writeln!(out, "Destination  : {}", meta.destination)?;

    section(out, "SUMMARY")?;
    writeln!(out, "  Total source users  : {}", plan.total_users)?;
    writeln!(out, "  Migrated            : {}", report.migrated.len())?;
    writeln!(out, "  Conflicts           : {}", report.conflicts.len())?;
    writeln!(out, "  Disabled (skipped)  : {}", report.disabled.len())?;
    writeln!(out, "  Failed              : {}", report.failed.len())?;

    section(out, "MIGRATED USERS")?;
    if report.migrated.is_empty() {
        writeln!(out, "  No users migrated")?;
    }
    for entry in &report.migrated {
        writeln!(
            out,
            "  * {} ({}) -> {}",
            entry.display_name,
            entry.record.department.as_deref().unwrap_or("no department"),
            entry.new_upn
        )?;
    }

    section(out, "CONFLICTS")?;
    if report.conflicts.is_empty() {
        writeln!(out, "  No conflicts detected")?;
    }
    for entry in &report.conflicts {
        writeln!(
            out,
            "  * {} -> {} (existing account)",
            entry.display_name, entry.new_upn
        )?;
    }

    section(out, "DISABLED ACCOUNTS (NOT MIGRATED)")?;
    if report.disabled.is_empty() {
        writeln!(out, "  No disabled accounts")?;
    }
    for entry in &report.disabled {
        writeln!(
            out,
            "  * {} (disabled in source directory)",
            entry.record.username
        )?;
    }

    section(out, "FAILURES")?;
    if report.failed.is_empty() {
        writeln!(out, "  No failures")?;
    }
    for failed in &report.failed {
        writeln!(out, "  * {} -> {}", failed.upn, failed.error)?;
    }

    writeln!(out)?;
    writeln!(out, "{BANNER}")
}

fn section(out: &mut impl Write, title: &str) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}
