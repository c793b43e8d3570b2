//! Microsoft Graph wire types.

use serde::{Deserialize, Serialize};

use cloudlift_core::models::directory::{DirectoryGroup, DirectoryUser, NewGroup, NewUser};

/// A user as returned by `GET /users`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub id: String,
    pub user_principal_name: String,
}

impl From<GraphUser> for DirectoryUser {
    fn from(user: GraphUser) -> Self {
        Self {
            id: user.id,
            principal_name: user.user_principal_name,
        }
    }
}

/// A group as returned by `GET /groups`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphGroup {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl From<GraphGroup> for DirectoryGroup {
    fn from(group: GraphGroup) -> Self {
        Self {
            id: group.id,
            display_name: group.display_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
    pub password: String,
    pub force_change_password_next_sign_in: bool,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub account_enabled: bool,
    pub display_name: String,
    pub mail_nickname: String,
    pub user_principal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub password_profile: PasswordProfile,
}

impl From<&NewUser> for CreateUserRequest {
    fn from(user: &NewUser) -> Self {
        Self {
            account_enabled: user.account_enabled,
            display_name: user.display_name.clone(),
            mail_nickname: user.mail_nickname.clone(),
            user_principal_name: user.principal_name.clone(),
            given_name: user.given_name.clone(),
            surname: user.surname.clone(),
            department: user.department.clone(),
            job_title: user.job_title.clone(),
            password_profile: PasswordProfile {
                password: user.initial_password.clone(),
                force_change_password_next_sign_in: user.force_password_change,
            },
        }
    }
}

/// Body of `POST /groups`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub display_name: String,
    pub mail_nickname: String,
    pub security_enabled: bool,
    pub mail_enabled: bool,
}

impl From<&NewGroup> for CreateGroupRequest {
    fn from(group: &NewGroup) -> Self {
        Self {
            display_name: group.display_name.clone(),
            mail_nickname: group.mail_nickname.clone(),
            security_enabled: group.security_enabled,
            mail_enabled: group.mail_enabled,
        }
    }
}

/// Body of `POST /groups/{id}/members/$ref`.
#[derive(Debug, Clone, Serialize)]
pub struct MemberReference {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

/// One page of a collection response.
#[derive(Debug, Deserialize)]
pub struct ODataPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
}
