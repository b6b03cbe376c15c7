//! OAuth access tokens for the Drive API.
//!
//! Credentials are provisioned out of band: the OAuth client file and a
//! previously authorised token file must already exist. This module only
//! loads them and refreshes the short-lived access token in memory.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::DriveError;
use crate::config::ConfigError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry to avoid racing it.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Supplies bearer tokens to the HTTP gateway.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, DriveError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Google client files nest the secret under `installed` or `web`.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Clone, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Whether a token with the given expiry should be refreshed at `now`.
/// Tokens without an expiry, or with the zero timestamp some tools write
/// (`0001-01-01T00:00:00Z`), never expire.
fn needs_refresh(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expiry {
        Some(expiry) if expiry.year() > 1 => {
            expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now
        }
        _ => false,
    }
}

pub struct OAuthTokenSource {
    http: reqwest::Client,
    secret: ClientSecret,
    token: Mutex<StoredToken>,
}

impl std::fmt::Debug for OAuthTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenSource")
            .field("client_id", &self.secret.client_id)
            .finish_non_exhaustive()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let missing = |reason: String| ConfigError::MissingCredentials {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| missing(e.to_string()))
}

impl OAuthTokenSource {
    /// Load the OAuth client and stored token. Missing or malformed files
    /// are fatal: there is no interactive flow to fall back on.
    pub fn from_files(
        credentials_path: &Path,
        token_path: &Path,
        http: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let file: ClientSecretFile = read_json(credentials_path)?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or_else(|| ConfigError::MissingCredentials {
                path: credentials_path.to_path_buf(),
                reason: "expected an 'installed' or 'web' client section".into(),
            })?;
        let token: StoredToken = read_json(token_path)?;
        Ok(Self {
            http,
            secret,
            token: Mutex::new(token),
        })
    }

    async fn refresh(&self, token: &mut StoredToken) -> Result<(), DriveError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| DriveError::Auth("access token expired and no refresh token is stored".into()))?;
        let uri = self
            .secret
            .token_uri
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_URI);

        tracing::debug!("Refreshing drive access token");
        let response = self
            .http
            .post(uri)
            .form(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!(
                "token refresh failed with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let refreshed: RefreshResponse = response.json().await?;
        token.access_token = refreshed.access_token;
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(())
    }
}

#[async_trait]
impl AccessTokenSource for OAuthTokenSource {
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut token = self.token.lock().await;
        if needs_refresh(token.expiry, Utc::now()) {
            self.refresh(&mut token).await?;
        }
        Ok(token.access_token.clone())
    }
}
