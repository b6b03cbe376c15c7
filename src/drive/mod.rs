//! Remote drive gateway: the narrow listing/update contract the rename
//! pipeline depends on, and the Google Drive implementation of it.

pub mod auth;
pub mod client;
pub mod error;
pub mod query;

pub use client::{DriveClient, GatewayConfig};
pub use error::DriveError;
pub use query::DriveQuery;

use async_trait::async_trait;

/// A remote file eligible for renaming.
///
/// Produced fresh by every listing; only `name` is ever changed locally,
/// right before the file is handed to [`RemoteStore::update_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameCandidate {
    pub id: String,
    pub name: String,
    /// RFC 3339 creation timestamp as reported by the drive.
    pub created_at: String,
}

/// Paginated, rate-limited access to the remote drive.
///
/// Implementations return fully drained listings (all pages) and surface
/// any page failure as an error.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// IDs of the folders matching a [`DriveQuery::child_folders`] query.
    async fn list_child_folders(&self, query: &DriveQuery) -> Result<Vec<String>, DriveError>;

    /// Files matching a candidate or processed query.
    async fn list_files(&self, query: &DriveQuery) -> Result<Vec<RenameCandidate>, DriveError>;

    /// Rename a file and set its processed marker in one write.
    async fn update_file(&self, id: &str, new_name: &str) -> Result<(), DriveError>;
}
