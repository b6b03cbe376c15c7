//! Google Drive v2 implementation of [`RemoteStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::auth::AccessTokenSource;
use super::error::DriveError;
use super::query::{DriveQuery, PROCESSED_PROPERTY};
use super::{RemoteStore, RenameCandidate};
use crate::ratelimit::RateLimiter;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v2";

/// Largest page the v2 listing endpoint accepts.
const PAGE_SIZE: &str = "1000";
const LIST_FIELDS: &str = "nextPageToken,items(id,title,createdDate)";

/// Connection settings for [`DriveClient`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub reads_per_minute: u32,
    pub writes_per_minute: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DRIVE_API_BASE.to_string(),
            reads_per_minute: 300,
            writes_per_minute: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    items: Vec<FileItem>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileItem {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "createdDate", default)]
    created_date: String,
}

pub struct DriveClient {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
    read_limiter: RateLimiter,
    write_limiter: RateLimiter,
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .field("read_limiter", &self.read_limiter)
            .field("write_limiter", &self.write_limiter)
            .finish_non_exhaustive()
    }
}

/// Turn a non-2xx response into [`DriveError::Status`] carrying the body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::Status {
        status: status.as_u16(),
        body,
    })
}

impl DriveClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            read_limiter: RateLimiter::per_minute(config.reads_per_minute),
            write_limiter: RateLimiter::per_minute(config.writes_per_minute),
        }
    }

    /// Fetch every page of a file listing. Any failed page fails the whole
    /// listing; partial results are discarded.
    async fn list_all(&self, query: &DriveQuery) -> Result<Vec<FileItem>, DriveError> {
        let q = query.to_string();
        let url = format!("{}/files", self.base_url);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            self.read_limiter.acquire().await;
            let token = self.tokens.access_token().await?;

            let mut request = self.http.get(&url).bearer_auth(token).query(&[
                ("q", q.as_str()),
                ("maxResults", PAGE_SIZE),
                ("fields", LIST_FIELDS),
            ]);
            if let Some(page_token) = &page_token {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }

            let response = check_status(request.send().await?).await?;
            let page: FileList = serde_json::from_slice(&response.bytes().await?)?;
            pages += 1;
            debug!(
                kind = ?query.kind(),
                parents = query.parents().len(),
                page = pages,
                items = page.items.len(),
                "Fetched drive listing page"
            );

            items.extend(page.items);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_child_folders(&self, query: &DriveQuery) -> Result<Vec<String>, DriveError> {
        Ok(self
            .list_all(query)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect())
    }

    async fn list_files(&self, query: &DriveQuery) -> Result<Vec<RenameCandidate>, DriveError> {
        Ok(self
            .list_all(query)
            .await?
            .into_iter()
            .map(|item| RenameCandidate {
                id: item.id,
                name: item.title,
                created_at: item.created_date,
            })
            .collect())
    }

    async fn update_file(&self, id: &str, new_name: &str) -> Result<(), DriveError> {
        self.write_limiter.acquire().await;
        let token = self.tokens.access_token().await?;
        let url = format!("{}/files/{}", self.base_url, urlencoding::encode(id));
        let body = json!({
            "title": new_name,
            "properties": [{
                "key": PROCESSED_PROPERTY,
                "value": "true",
                "visibility": "PUBLIC",
            }],
        });

        let response = self
            .http
            .patch(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
