use std::path::Path;

use crate::error::{CloudliftError, Result};
use crate::models::source::SourceExport;

use super::rows::AdUserCsvRow;

/// Read a source export, choosing the format from the file extension.
pub fn read_export(path: &Path) -> Result<SourceExport> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("json") => read_json_export(path),
        Some("csv") => read_csv_export(path),
        _ => Err(CloudliftError::Config(format!(
            "unsupported export format: {} (expected .json or .csv)",
            path.display()
        ))),
    }
}

/// Read a JSON export of the form `{"users": [...], "groups": [...]}`.
pub fn read_json_export(path: &Path) -> Result<SourceExport> {
    let content = std::fs::read_to_string(path)?;
    let export: SourceExport = serde_json::from_str(&content).map_err(|e| {
        CloudliftError::Serialization(format!("JSON parse error in {}: {e}", path.display()))
    })?;

    for (idx, user) in export.users.iter().enumerate() {
        if user.username.trim().is_empty() {
            return Err(CloudliftError::Serialization(format!(
                "user #{} in {}: username is required",
                idx + 1,
                path.display()
            )));
        }
    }

    Ok(export)
}

/// Read a CSV export of AD user rows. CSV exports carry no groups.
pub fn read_csv_export(path: &Path) -> Result<SourceExport> {
    let mut rdr = csv::Reader::from_path(path)?;

    let mut users = Vec::new();
    for (idx, result) in rdr.deserialize::<AdUserCsvRow>().enumerate() {
        let row = result.map_err(|e| {
            CloudliftError::Serialization(format!("CSV parse error in {}: {e}", path.display()))
        })?;
        // header is line 1
        users.push(row.to_model(idx + 2)?);
    }

    Ok(SourceExport {
        users,
        groups: Vec::new(),
    })
}
