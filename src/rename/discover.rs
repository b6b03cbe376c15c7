//! Breadth-first discovery of the folder tree under the configured root.

use std::collections::HashSet;

use tracing::debug;

use crate::drive::{DriveError, DriveQuery, RemoteStore};

/// Collect the root folder and every folder beneath it.
///
/// Each pass asks for the children of the whole previous layer in a single
/// query, so the number of listings grows with tree depth rather than with
/// folder count. The result starts with `root` and lists folders in the
/// order they were discovered; a folder reachable through several parents
/// appears once.
pub async fn discover_folders(
    store: &dyn RemoteStore,
    root: &str,
) -> Result<Vec<String>, DriveError> {
    let mut folders = vec![root.to_string()];
    let mut seen: HashSet<String> = folders.iter().cloned().collect();
    let mut expanded = 0;
    let mut layer = 0u32;

    while expanded < folders.len() {
        let frontier = &folders[expanded..];
        let children = store
            .list_child_folders(&DriveQuery::child_folders(frontier))
            .await?;
        expanded = folders.len();
        layer += 1;

        let before = folders.len();
        for id in children {
            if seen.insert(id.clone()) {
                folders.push(id);
            }
        }
        debug!(layer, found = folders.len() - before, "Expanded folder layer");
    }

    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::testing::{Call, FakeDrive};

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_root_without_children() {
        let drive = FakeDrive::new();
        let folders = discover_folders(&drive, "root").await.unwrap();
        assert_eq!(folders, ids(&["root"]));
        assert_eq!(drive.calls(), vec![Call::Folders(ids(&["root"]))]);
    }

    #[tokio::test]
    async fn test_one_listing_per_layer() {
        let drive = FakeDrive::new()
            .folder("a", "root")
            .folder("b", "root")
            .folder("a1", "a")
            .folder("b1", "b")
            .folder("b2", "b")
            .folder("a1x", "a1");

        let folders = discover_folders(&drive, "root").await.unwrap();

        assert_eq!(folders, ids(&["root", "a", "b", "a1", "b1", "b2", "a1x"]));
        assert_eq!(
            drive.calls(),
            vec![
                Call::Folders(ids(&["root"])),
                Call::Folders(ids(&["a", "b"])),
                Call::Folders(ids(&["a1", "b1", "b2"])),
                Call::Folders(ids(&["a1x"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        let drive = FakeDrive::new()
            .folder("a", "root")
            .folder("b", "a")
            .folder("a", "b")
            .folder("root", "b");

        let folders = discover_folders(&drive, "root").await.unwrap();

        assert_eq!(folders, ids(&["root", "a", "b"]));
        assert_eq!(drive.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let mut drive = FakeDrive::new().folder("a", "root");
        drive.fail_folder_listing = true;
        let err = discover_folders(&drive, "root").await.unwrap_err();
        assert!(err.is_transient());
    }
}
