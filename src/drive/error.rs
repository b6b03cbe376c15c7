use thiserror::Error;

/// Errors raised at the remote drive boundary.
///
/// Every one of these is treated as retryable by the next scheduled run;
/// nothing is retried inside a run. `is_transient()` is reported in the
/// rename error logs.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Drive API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DriveError {
    /// Whether the failure looks like a passing condition (throttling,
    /// server trouble, dropped connection) rather than a bad request.
    pub fn is_transient(&self) -> bool {
        match self {
            DriveError::Status { status, .. } => *status == 429 || *status >= 500,
            DriveError::Http(_) => true,
            DriveError::Auth(_) | DriveError::Json(_) | DriveError::Io(_) => false,
        }
    }
}
