//! Names already taken by processed files in the folders being renamed.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::drive::{DriveQuery, RemoteStore};

/// Final file names (case-sensitive, extension included) that must not be
/// handed out again in this run.
///
/// Holds names of files already carrying the processed marker plus every
/// name assigned earlier in the same run. Rebuilt at the start of each run
/// so names freed by deleted files become available again.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessedSet {
    names: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Record a name. Returns `false` if it was already taken.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Load the names of processed files within `folders`.
///
/// Fails soft: a listing error is logged and an empty set is returned. The
/// worst outcome is a counter that starts lower than it could; a clash is
/// still reported by the update itself.
pub async fn load_processed(store: &dyn RemoteStore, folders: &[String]) -> ProcessedSet {
    match store.list_files(&DriveQuery::processed(folders)).await {
        Ok(files) => {
            let set: ProcessedSet = files.into_iter().map(|f| f.name).collect();
            if set.is_empty() {
                debug!("No processed files in scope yet");
            } else {
                debug!(count = set.len(), "Loaded processed file names");
            }
            set
        }
        Err(e) => {
            error!("Failed to load processed files, continuing with none: {}", e);
            ProcessedSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::testing::{Call, FakeDrive};

    fn folders(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_reports_duplicates() {
        let mut set = ProcessedSet::new();
        assert!(set.is_empty());
        assert!(set.insert("a.mov"));
        assert!(!set.insert("a.mov"));
        assert!(set.contains("a.mov"));
        assert!(!set.contains("A.mov"));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_loads_only_processed_in_scope() {
        let drive = FakeDrive::new()
            .processed_file("1", "2020_0828_0.mov", "root")
            .processed_file("2", "elsewhere_0.mov", "other")
            .file("3", "raw.mov", "root", "2020-08-28T19:33:44.561Z");

        let set = load_processed(&drive, &folders(&["root"])).await;

        assert_eq!(set, ProcessedSet::from_iter(["2020_0828_0.mov"]));
        assert_eq!(drive.calls(), vec![Call::Processed]);
    }

    #[tokio::test]
    async fn test_listing_failure_yields_empty_set() {
        let mut drive = FakeDrive::new().processed_file("1", "2020_0828_0.mov", "root");
        drive.fail_processed_listing = true;

        let set = load_processed(&drive, &folders(&["root"])).await;

        assert!(set.is_empty());
    }
}
