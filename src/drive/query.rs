//! Filter predicates for drive listings.
//!
//! Queries are built as structured values and rendered to the Drive `q`
//! syntax through `Display`. Rendering is pure: equal queries always render
//! to byte-identical strings, so the HTTP gateway and the test fakes see
//! exactly the same predicate.

use std::fmt;

/// Custom file property marking a file as already renamed.
pub const PROCESSED_PROPERTY: &str = "file-renamer-processed";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Folders whose parent is in the parent set.
    Folders,
    /// Unprocessed files in the parent set whose name carries one of the
    /// allow-listed extensions.
    Candidates { extensions: Vec<String> },
    /// Files in the parent set that carry the processed marker.
    Processed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveQuery {
    parents: Vec<String>,
    kind: QueryKind,
}

impl DriveQuery {
    pub fn child_folders(parents: &[String]) -> Self {
        Self {
            parents: parents.to_vec(),
            kind: QueryKind::Folders,
        }
    }

    pub fn candidates(parents: &[String], extensions: &[String]) -> Self {
        Self {
            parents: parents.to_vec(),
            kind: QueryKind::Candidates {
                extensions: extensions.to_vec(),
            },
        }
    }

    pub fn processed(parents: &[String]) -> Self {
        Self {
            parents: parents.to_vec(),
            kind: QueryKind::Processed,
        }
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn processed_clause() -> String {
    format!("properties has {{ key='{PROCESSED_PROPERTY}' and value='true' and visibility='PUBLIC' }}")
}

fn write_any_of<I, F>(f: &mut fmt::Formatter<'_>, items: I, clause: F) -> fmt::Result
where
    I: IntoIterator,
    F: Fn(I::Item) -> String,
{
    f.write_str("(")?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(" or ")?;
        }
        f.write_str(&clause(item))?;
    }
    f.write_str(")")
}

impl fmt::Display for DriveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_any_of(f, &self.parents, |id| format!("'{}' in parents", escape(id)))?;
        match &self.kind {
            QueryKind::Folders => {
                write!(f, " and mimeType = '{FOLDER_MIME_TYPE}'")?;
            }
            QueryKind::Candidates { extensions } => {
                f.write_str(" and ")?;
                write_any_of(f, extensions, |ext| {
                    format!("title contains '.{}'", escape(ext))
                })?;
                write!(f, " and not {}", processed_clause())?;
            }
            QueryKind::Processed => {
                write!(f, " and {}", processed_clause())?;
            }
        }
        f.write_str(" and trashed = false")
    }
}

/// Case-insensitive check that `name` ends with `.ext` for one of the
/// allow-listed extensions. Drive's `title contains` is looser than this.
pub fn has_allowed_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext.to_lowercase())))
}
