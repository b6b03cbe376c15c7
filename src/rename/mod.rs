//! Rename pipeline: one run walks the folder tree under the configured
//! root, lists files that still lack the processed marker, and gives each a
//! canonical name.
//!
//! Runs are self-contained: the folder set and processed-name set are
//! rebuilt every time and dropped at the end, so the only state carried
//! between runs is the processed marker stored on the drive. Files are
//! handled one at a time in listing order; a failure on one file is logged
//! and the run moves on.

pub mod discover;
pub mod error;
pub mod naming;
pub mod processed;

#[cfg(test)]
pub(crate) mod testing;

pub use error::RenameError;
pub use naming::NameGenerator;
pub use processed::ProcessedSet;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::drive::query::has_allowed_extension;
use crate::drive::{DriveQuery, RemoteStore, RenameCandidate};
use crate::schedule::Task;

/// Subset of application config consumed by the rename pipeline.
#[derive(Debug, Clone)]
pub struct RenameConfig {
    pub(crate) root_folder_id: String,
    /// Allow-listed extensions without the leading dot.
    pub(crate) extensions: Vec<String>,
    pub(crate) dry_run: bool,
}

impl RenameConfig {
    pub fn new(root_folder_id: impl Into<String>, extensions: Vec<String>, dry_run: bool) -> Self {
        Self {
            root_folder_id: root_folder_id.into(),
            extensions,
            dry_run,
        }
    }
}

/// Outcome counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Unprocessed files found in the folder tree.
    pub candidates: usize,
    /// Files renamed (or that would have been, in a dry run).
    pub renamed: usize,
    /// Files skipped because no name could be generated.
    pub skipped: usize,
    /// Files whose update was rejected by the drive.
    pub failed: usize,
}

pub struct Renamer {
    store: Arc<dyn RemoteStore>,
    names: NameGenerator,
    config: RenameConfig,
}

impl std::fmt::Debug for Renamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renamer")
            .field("names", &self.names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Renamer {
    pub fn new(store: Arc<dyn RemoteStore>, names: NameGenerator, config: RenameConfig) -> Self {
        Self {
            store,
            names,
            config,
        }
    }

    /// List unprocessed candidates in `folders`, dropping any whose name
    /// does not actually end in an allow-listed extension.
    async fn enumerate(&self, folders: &[String]) -> Result<Vec<RenameCandidate>, RenameError> {
        let query = DriveQuery::candidates(folders, &self.config.extensions);
        let files = self
            .store
            .list_files(&query)
            .await
            .map_err(RenameError::Retrieval)?;

        let candidates: Vec<RenameCandidate> = files
            .into_iter()
            .filter(|file| {
                let keep = has_allowed_extension(&file.name, &self.config.extensions);
                if !keep {
                    debug!(id = %file.id, name = %file.name, "Ignoring file without an allowed extension");
                }
                keep
            })
            .collect();

        if candidates.is_empty() {
            info!("Couldn't find any files to rename");
        } else {
            info!("Found {} files to rename", candidates.len());
        }
        Ok(candidates)
    }

    /// Name and update a single file. On success the new name is recorded
    /// in `processed` so later files in the run cannot receive it.
    async fn rename_one(
        &self,
        file: &mut RenameCandidate,
        processed: &mut ProcessedSet,
    ) -> Result<(), RenameError> {
        let new_name = self
            .names
            .generate(&file.name, &file.created_at, processed)?;
        let old_name = std::mem::replace(&mut file.name, new_name);

        if self.config.dry_run {
            info!(id = %file.id, "[DRY RUN] Would rename {} to {}", old_name, file.name);
        } else {
            self.store
                .update_file(&file.id, &file.name)
                .await
                .map_err(|source| RenameError::Update {
                    id: file.id.clone(),
                    name: file.name.clone(),
                    source,
                })?;
            info!(id = %file.id, "Renamed {} to {}", old_name, file.name);
        }

        processed.insert(file.name.clone());
        Ok(())
    }

    /// Execute one full run.
    ///
    /// Returns `Err` only when the folder tree or the candidate list cannot
    /// be fetched; everything after that is handled per file.
    pub async fn run(&self) -> Result<RunSummary, RenameError> {
        let started = Instant::now();
        info!("~~~~ Rename run started ~~~~");

        let folders = discover::discover_folders(self.store.as_ref(), &self.config.root_folder_id)
            .await
            .map_err(RenameError::Retrieval)?;
        debug!(folders = folders.len(), "Discovered folder tree");

        let candidates = self.enumerate(&folders).await?;
        let mut processed = processed::load_processed(self.store.as_ref(), &folders).await;

        let mut summary = RunSummary {
            candidates: candidates.len(),
            ..RunSummary::default()
        };

        for mut file in candidates {
            match self.rename_one(&mut file, &mut processed).await {
                Ok(()) => summary.renamed += 1,
                Err(e @ RenameError::TimestampParse { .. }) => {
                    error!(id = %file.id, "Error generating new name for {}: {}", file.name, e);
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(id = %file.id, transient = e.is_transient(), "Error updating file: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!("── Summary ──");
        info!(
            "  {} renamed, {} skipped, {} failed, {} candidates{}",
            summary.renamed,
            summary.skipped,
            summary.failed,
            summary.candidates,
            if self.config.dry_run { " (dry run)" } else { "" }
        );
        info!("  elapsed: {:.1}s", started.elapsed().as_secs_f64());
        info!("~~~~ Rename run ended ~~~~");
        Ok(summary)
    }
}

#[async_trait]
impl Task for Renamer {
    fn name(&self) -> &str {
        "file-renamer"
    }

    async fn execute(&self) {
        if let Err(e) = self.run().await {
            error!(
                transient = e.is_transient(),
                "Rename run aborted, retrying on the next schedule: {}", e
            );
        }
    }
}
