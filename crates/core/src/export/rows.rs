//! CSV row struct matching the column names of an Active Directory user export.

use serde::Deserialize;

use crate::error::{CloudliftError, Result};
use crate::models::source::{non_blank, SourceRecord};

/// One row of `Get-ADUser ... | Export-Csv` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdUserCsvRow {
    #[serde(default)]
    pub sam_account_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub enabled: String,
}

impl AdUserCsvRow {
    /// Convert into a source record. `line` is used in error messages.
    pub fn to_model(self, line: usize) -> Result<SourceRecord> {
        let username = self.sam_account_name.trim().to_string();
        if username.is_empty() {
            return Err(CloudliftError::Serialization(format!(
                "row {line}: SamAccountName is required"
            )));
        }

        let enabled = csv_to_bool(&self.enabled).ok_or_else(|| {
            CloudliftError::Serialization(format!(
                "row {line}: invalid Enabled value '{}'",
                self.enabled
            ))
        })?;

        Ok(SourceRecord {
            username,
            first_name: non_blank(self.given_name),
            last_name: non_blank(self.surname),
            department: non_blank(self.department),
            job_title: non_blank(self.title),
            enabled,
        })
    }
}

fn csv_to_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
