//! OAuth2 client-credentials authentication against the Microsoft identity
//! platform, with an in-memory token cache.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use cloudlift_core::config::Credentials;
use cloudlift_core::error::{CloudliftError, Result};

/// Scope requesting every application permission granted to the app.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

/// Source of bearer tokens for Graph requests.
pub enum GraphAuth {
    /// A fixed token, used for tests and externally obtained tokens.
    Static(String),
    /// Client-credentials flow with caching.
    ClientCredentials(TokenCache),
}

impl GraphAuth {
    pub async fn token(&self) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ClientCredentials(cache) => cache.get_token().await,
        }
    }
}

/// Caches a client-credentials access token until shortly before expiry.
pub struct TokenCache {
    http: reqwest::Client,
    login_url: String,
    credentials: Credentials,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client, login_url: &str, credentials: Credentials) -> Self {
        Self {
            http,
            login_url: login_url.trim_end_matches('/').to_string(),
            credentials,
            cached: RwLock::new(None),
        }
    }

    /// Return a valid access token, fetching a new one when the cached token
    /// is missing or about to expire.
    pub async fn get_token(&self) -> Result<String> {
        let margin = Duration::minutes(REFRESH_MARGIN_MINUTES);
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired(margin) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let fresh = self.acquire_token().await?;
        let access_token = fresh.access_token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(access_token)
    }

    async fn acquire_token(&self) -> Result<CachedToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url, self.credentials.tenant_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
        ];

        let resp = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CloudliftError::Auth(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudliftError::Auth(format!(
                "token request failed ({status}): {body}"
            )));
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| CloudliftError::Auth(format!("token response parse failed: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(token.expires_in);
        debug!(expires_at = %expires_at, "acquired access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}
