//! Canonical name generation.
//!
//! A new name is `<keywords><date><delimiter><counter><extension>`, e.g.
//! `foo_bar_2020_1019_0.mov`:
//! - keywords: every configured persistent word found (case-insensitively)
//!   in the current name, each followed by the delimiter, in configured
//!   order rather than the order they appear in the name;
//! - date: the creation timestamp as `YYYY_MMDD`;
//! - counter: the lowest non-negative integer giving a name not yet in the
//!   [`ProcessedSet`].

use chrono::DateTime;

use super::error::RenameError;
use super::processed::ProcessedSet;

const DATE_FORMAT: &str = "%Y_%m%d";

/// Reformat an RFC 3339 timestamp as `YYYY_MMDD`, keeping the timestamp's
/// own offset for the calendar date.
pub fn format_created_date(created_at: &str) -> Result<String, RenameError> {
    let parsed =
        DateTime::parse_from_rfc3339(created_at).map_err(|source| RenameError::TimestampParse {
            value: created_at.to_string(),
            source,
        })?;
    Ok(parsed.format(DATE_FORMAT).to_string())
}

/// Extension including its dot, or empty when the name has none.
fn extension(name: &str) -> &str {
    name.rfind('.').map_or("", |idx| &name[idx..])
}

#[derive(Debug, Clone)]
pub struct NameGenerator {
    persistent_words: Vec<String>,
    delimiter: String,
}

impl NameGenerator {
    pub fn new(persistent_words: Vec<String>, delimiter: impl Into<String>) -> Self {
        Self {
            persistent_words,
            delimiter: delimiter.into(),
        }
    }

    /// Everything before the counter: matched keywords and the date.
    fn prefix(&self, current_name: &str, created_at: &str) -> Result<String, RenameError> {
        let lower = current_name.to_lowercase();
        let mut prefix = String::new();
        for word in &self.persistent_words {
            if lower.contains(&word.to_lowercase()) {
                prefix.push_str(word);
                prefix.push_str(&self.delimiter);
            }
        }
        prefix.push_str(&format_created_date(created_at)?);
        prefix.push_str(&self.delimiter);
        Ok(prefix)
    }

    /// Derive the new name for a file. Does not record the result; the
    /// caller inserts it into `processed` once the name is committed.
    pub fn generate(
        &self,
        current_name: &str,
        created_at: &str,
        processed: &ProcessedSet,
    ) -> Result<String, RenameError> {
        let prefix = self.prefix(current_name, created_at)?;
        let ext = extension(current_name);
        let mut counter: u64 = 0;
        loop {
            let candidate = format!("{prefix}{counter}{ext}");
            if !processed.contains(&candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}
