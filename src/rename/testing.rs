//! In-memory drive used by the rename tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::drive::query::QueryKind;
use crate::drive::{DriveError, DriveQuery, RemoteStore, RenameCandidate};

#[derive(Debug, Clone)]
pub(crate) struct FakeFile {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub created_at: String,
    pub processed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Folders(Vec<String>),
    Candidates,
    Processed,
    Update(String, String),
}

#[derive(Default)]
pub(crate) struct FakeDrive {
    folders: Vec<(String, String)>,
    files: Mutex<Vec<FakeFile>>,
    calls: Mutex<Vec<Call>>,
    pub fail_folder_listing: bool,
    pub fail_candidate_listing: bool,
    pub fail_processed_listing: bool,
    pub fail_updates_for: HashSet<String>,
}

fn unavailable() -> DriveError {
    DriveError::Status {
        status: 503,
        body: "backendError".into(),
    }
}

/// Mirrors Drive's `title contains '.ext'`, which is looser than a suffix
/// match (`clip.mov.txt` matches `mov`).
fn title_contains_any(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.contains(&format!(".{}", ext.to_lowercase())))
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(mut self, id: &str, parent: &str) -> Self {
        self.folders.push((id.to_string(), parent.to_string()));
        self
    }

    pub fn file(self, id: &str, name: &str, parent: &str, created_at: &str) -> Self {
        self.add_file(id, name, parent, created_at, false)
    }

    pub fn processed_file(self, id: &str, name: &str, parent: &str) -> Self {
        self.add_file(id, name, parent, "2010-01-11T00:00:00Z", true)
    }

    fn add_file(self, id: &str, name: &str, parent: &str, created_at: &str, processed: bool) -> Self {
        self.files.lock().unwrap().push(FakeFile {
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
            created_at: created_at.to_string(),
            processed,
        });
        self
    }

    pub fn files(&self) -> Vec<FakeFile> {
        self.files.lock().unwrap().clone()
    }

    pub fn file_named(&self, id: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.name.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(id, name) => Some((id, name)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteStore for FakeDrive {
    async fn list_child_folders(&self, query: &DriveQuery) -> Result<Vec<String>, DriveError> {
        assert_eq!(query.kind(), &QueryKind::Folders);
        self.calls
            .lock()
            .unwrap()
            .push(Call::Folders(query.parents().to_vec()));
        if self.fail_folder_listing {
            return Err(unavailable());
        }
        Ok(self
            .folders
            .iter()
            .filter(|(_, parent)| query.parents().contains(parent))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn list_files(&self, query: &DriveQuery) -> Result<Vec<RenameCandidate>, DriveError> {
        let files = self.files.lock().unwrap().clone();
        let in_scope = files
            .into_iter()
            .filter(|f| query.parents().contains(&f.parent));
        let matched: Vec<FakeFile> = match query.kind() {
            QueryKind::Candidates { extensions } => {
                self.calls.lock().unwrap().push(Call::Candidates);
                if self.fail_candidate_listing {
                    return Err(unavailable());
                }
                in_scope
                    .filter(|f| !f.processed && title_contains_any(&f.name, extensions))
                    .collect()
            }
            QueryKind::Processed => {
                self.calls.lock().unwrap().push(Call::Processed);
                if self.fail_processed_listing {
                    return Err(unavailable());
                }
                in_scope.filter(|f| f.processed).collect()
            }
            QueryKind::Folders => panic!("folder query sent to list_files"),
        };
        Ok(matched
            .into_iter()
            .map(|f| RenameCandidate {
                id: f.id,
                name: f.name,
                created_at: f.created_at,
            })
            .collect())
    }

    async fn update_file(&self, id: &str, new_name: &str) -> Result<(), DriveError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Update(id.to_string(), new_name.to_string()));
        if self.fail_updates_for.contains(id) {
            return Err(unavailable());
        }
        let mut files = self.files.lock().unwrap();
        match files.iter_mut().find(|f| f.id == id) {
            Some(file) => {
                file.name = new_name.to_string();
                file.processed = true;
                Ok(())
            }
            None => Err(DriveError::Status {
                status: 404,
                body: format!("File not found: {id}"),
            }),
        }
    }
}
