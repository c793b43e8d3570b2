//! Destination directory objects, independent of any vendor wire format.

use serde::{Deserialize, Serialize};

/// A user account in the destination directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub principal_name: String,
}

/// A group in the destination directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub id: String,
    pub display_name: String,
}

/// Account creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub display_name: String,
    pub principal_name: String,
    pub mail_nickname: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub account_enabled: bool,
    pub initial_password: String,
    pub force_password_change: bool,
}

/// Group creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub display_name: String,
    pub mail_nickname: String,
    pub security_enabled: bool,
    pub mail_enabled: bool,
}

impl NewGroup {
    /// A security group that is not mail-enabled, with a nickname derived
    /// from the display name.
    pub fn security(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            mail_nickname: display_name.replace(' ', "-").to_lowercase(),
            security_enabled: true,
            mail_enabled: false,
        }
    }
}
