//! Typed reqwest wrapper for the Microsoft Graph directory endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use cloudlift_core::config::{Credentials, DirectoryConfig};
use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::error::{CloudliftError, Result};
use cloudlift_core::models::directory::{DirectoryGroup, DirectoryUser, NewGroup, NewUser};

use crate::auth::{GraphAuth, TokenCache};
use crate::models::{
    CreateGroupRequest, CreateUserRequest, GraphGroup, GraphUser, MemberReference, ODataError,
    ODataPage,
};

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 999;

/// HTTP client for Microsoft Graph user and group operations.
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    auth: GraphAuth,
}

impl GraphClient {
    /// Create a client with the given token source against the public Graph endpoint.
    pub fn new(auth: GraphAuth) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: GRAPH_API_BASE.to_string(),
            auth,
        })
    }

    /// Build a client-credentials client from configuration.
    pub fn from_config(directory: &DirectoryConfig, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let cache = TokenCache::new(http.clone(), &directory.login_url, credentials);
        Ok(Self {
            http,
            base_url: directory.graph_url.trim_end_matches('/').to_string(),
            auth: GraphAuth::ClientCredentials(cache),
        })
    }

    /// Override the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    fn user_url(&self, principal_name: &str) -> String {
        format!(
            "{}/users/{}",
            self.base_url,
            urlencoding::encode(principal_name)
        )
    }

    fn groups_url(&self) -> String {
        format!("{}/groups", self.base_url)
    }

    fn members_ref_url(&self, group_id: &str) -> String {
        format!("{}/groups/{}/members/$ref", self.base_url, group_id)
    }

    fn directory_object_url(&self, object_id: &str) -> String {
        format!("{}/directoryObjects/{}", self.base_url, object_id)
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<ODataPage<T>> {
        let token = self.auth.token().await?;
        let resp = self.http.get(url).bearer_auth(&token).send().await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json::<ODataPage<T>>().await?)
    }

    /// Fetch every page of a collection, following `@odata.nextLink`.
    async fn get_all<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            debug!(url = %url, "fetching page");
            let page = self.get_page::<T>(&url).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let token = self.auth.token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }
}

/// Turn a non-success response into `DirectoryApi`, keeping the Graph error
/// code when the body carries one.
async fn api_error(resp: Response) -> CloudliftError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ODataError>(&body) {
        Ok(odata) => CloudliftError::DirectoryApi {
            status: status.as_u16(),
            code: odata.error.code,
            message: odata.error.message,
        },
        Err(_) => CloudliftError::DirectoryApi {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: body,
        },
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        let url = format!(
            "{}?$select=id,userPrincipalName&$top={PAGE_SIZE}",
            self.users_url()
        );
        let users = self.get_all::<GraphUser>(url).await?;
        Ok(users.into_iter().map(DirectoryUser::from).collect())
    }

    async fn get_user(&self, principal_name: &str) -> Result<Option<DirectoryUser>> {
        let token = self.auth.token().await?;
        let resp = self
            .http
            .get(self.user_url(principal_name))
            .bearer_auth(&token)
            .query(&[("$select", "id,userPrincipalName")])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let user = resp.json::<GraphUser>().await?;
        Ok(Some(user.into()))
    }

    async fn create_user(&self, user: &NewUser) -> Result<DirectoryUser> {
        let body = CreateUserRequest::from(user);
        let created: GraphUser = self.post_json(&self.users_url(), &body).await?;
        Ok(created.into())
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        let url = format!(
            "{}?$select=id,displayName&$top={PAGE_SIZE}",
            self.groups_url()
        );
        let groups = self.get_all::<GraphGroup>(url).await?;
        Ok(groups.into_iter().map(DirectoryGroup::from).collect())
    }

    async fn create_group(&self, group: &NewGroup) -> Result<DirectoryGroup> {
        let body = CreateGroupRequest::from(group);
        let created: GraphGroup = self.post_json(&self.groups_url(), &body).await?;
        Ok(created.into())
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        let token = self.auth.token().await?;
        let body = MemberReference {
            odata_id: self.directory_object_url(user_id),
        };
        let resp = self
            .http
            .post(self.members_ref_url(group_id))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(())
    }
}
