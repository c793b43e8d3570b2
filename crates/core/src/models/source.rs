use serde::{Deserialize, Deserializer, Serialize};

/// One identity from the on-premise directory export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    /// sAMAccountName in the source directory.
    pub username: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub job_title: Option<String>,
    pub enabled: bool,
}

/// A group definition carried over from the source export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

/// A parsed source export: users in file order plus group definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceExport {
    pub users: Vec<SourceRecord>,
    #[serde(default)]
    pub groups: Vec<SourceGroup>,
}

impl SourceExport {
    /// Keep only the first `max` users. Groups are left untouched.
    pub fn truncate_users(&mut self, max: usize) {
        self.users.truncate(max);
    }
}

/// Treat missing, null and blank strings the same way.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(value))
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
