use thiserror::Error;

use crate::drive::DriveError;

/// Failures inside a rename run.
///
/// `Retrieval` aborts the run it occurs in. The per-file kinds are logged
/// and the run moves on to the next file; the file stays unprocessed and is
/// picked up again by the next scheduled run.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Drive listing failed: {0}")]
    Retrieval(#[source] DriveError),

    #[error("Invalid creation timestamp '{value}': {source}")]
    TimestampParse {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Failed to update file {id} to '{name}': {source}")]
    Update {
        id: String,
        name: String,
        source: DriveError,
    },
}

impl RenameError {
    /// Whether the underlying drive failure looks temporary. Logged so an
    /// operator can tell throttling or outages apart from bad data.
    pub fn is_transient(&self) -> bool {
        match self {
            RenameError::Retrieval(source) | RenameError::Update { source, .. } => {
                source.is_transient()
            }
            RenameError::TimestampParse { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_auth_failure_is_not_transient() {
        let e = RenameError::Retrieval(DriveError::Auth("expired".into()));
        assert!(!e.is_transient());
    }

    #[test]
    fn test_update_server_error_is_transient() {
        let e = RenameError::Update {
            id: "1".into(),
            name: "a.mov".into(),
            source: DriveError::Status {
                status: 500,
                body: String::new(),
            },
        };
        assert!(e.is_transient());
        assert!(e.to_string().contains("'a.mov'"));
    }

    #[test]
    fn test_timestamp_is_not_transient() {
        let source = chrono::DateTime::parse_from_rfc3339("nope").unwrap_err();
        let e = RenameError::TimestampParse {
            value: "nope".into(),
            source,
        };
        assert!(!e.is_transient());
        assert!(e.to_string().starts_with("Invalid creation timestamp 'nope'"));
    }
}
