use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::types::LogLevel;

const DEFAULT_READS_PER_MINUTE: u32 = 300;
const DEFAULT_WRITES_PER_MINUTE: u32 = 60;

/// Unrecoverable startup conditions. The process boundary decides to exit
/// on any of these; nothing here is retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid cron schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("Credentials unavailable at {path}: {reason}")]
    MissingCredentials { path: PathBuf, reason: String },
}

fn default_delimiter() -> String {
    "_".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("resources/credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("resources/token.json")
}

fn default_true() -> bool {
    true
}

fn default_reads_per_minute() -> u32 {
    DEFAULT_READS_PER_MINUTE
}

fn default_writes_per_minute() -> u32 {
    DEFAULT_WRITES_PER_MINUTE
}

/// Application configuration, read once at startup and never mutated.
#[derive(Deserialize)]
pub struct Config {
    #[serde(rename = "cronSchedules", default)]
    pub cron_schedules: Vec<String>,
    #[serde(rename = "parentDirID", default)]
    pub parent_dir_id: String,
    #[serde(rename = "persistentWords", default)]
    pub persistent_words: Vec<String>,
    #[serde(rename = "nameDelimiter", default = "default_delimiter")]
    pub name_delimiter: String,
    #[serde(rename = "fileExtensions", default)]
    pub file_extensions: Vec<String>,
    #[serde(rename = "logLevel", default)]
    pub log_level: LogLevel,
    #[serde(rename = "logLocation", default)]
    pub log_location: Option<PathBuf>,
    #[serde(rename = "credentialsPath", default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(rename = "tokenPath", default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(rename = "runAtLaunch", alias = "RunAtLaunch", default)]
    pub run_at_launch: bool,
    #[serde(rename = "logToConsole", default = "default_true")]
    pub log_to_console: bool,
    #[serde(rename = "readsPerMinute", default = "default_reads_per_minute")]
    pub reads_per_minute: u32,
    #[serde(rename = "writesPerMinute", default = "default_writes_per_minute")]
    pub writes_per_minute: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cron_schedules", &self.cron_schedules)
            .field("parent_dir_id", &self.parent_dir_id)
            .field("persistent_words", &self.persistent_words)
            .field("name_delimiter", &self.name_delimiter)
            .field("file_extensions", &self.file_extensions)
            .field("run_at_launch", &self.run_at_launch)
            .field("credentials_path", &"<redacted>")
            .field("token_path", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(stripped) = path.to_str().and_then(|p| p.strip_prefix("~/")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Strip a leading dot and drop empty entries, so `"mp4"` and `".MOV"` are
/// both accepted.
pub(crate) fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

impl Config {
    /// Read, parse and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.finish()
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.file_extensions = normalize_extensions(&self.file_extensions);
        self.credentials_path = expand_tilde(&self.credentials_path);
        self.token_path = expand_tilde(&self.token_path);
        self.log_location = self.log_location.as_deref().map(expand_tilde);
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parent_dir_id.trim().is_empty() {
            return Err(ConfigError::Invalid("parentDirID must be set".into()));
        }
        if self.file_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "fileExtensions must list at least one extension".into(),
            ));
        }
        if self.cron_schedules.is_empty() && !self.run_at_launch {
            return Err(ConfigError::Invalid(
                "no cronSchedules configured and runAtLaunch is false; nothing would run".into(),
            ));
        }
        if self.reads_per_minute == 0 || self.writes_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "readsPerMinute and writesPerMinute must be greater than zero".into(),
            ));
        }
        for expression in &self.cron_schedules {
            crate::schedule::parse_schedule(expression).map_err(|e| {
                ConfigError::InvalidSchedule {
                    expression: expression.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json).unwrap();
        config.finish()
    }

    const FULL: &str = r#"{
        "cronSchedules": ["*/5 * * * *"],
        "parentDirID": "root-id",
        "persistentWords": ["keep", "these"],
        "nameDelimiter": "-",
        "fileExtensions": ["mp4", ".MOV", ""],
        "logLevel": "3",
        "logLocation": "/var/log/renamer",
        "credentialsPath": "/secrets/credentials.json",
        "tokenPath": "/secrets/token.json",
        "RunAtLaunch": true,
        "logToConsole": false
    }"#;

    #[test]
    fn test_parse_full_config() {
        let cfg = parse(FULL).unwrap();
        assert_eq!(cfg.cron_schedules, vec!["*/5 * * * *"]);
        assert_eq!(cfg.parent_dir_id, "root-id");
        assert_eq!(cfg.persistent_words, vec!["keep", "these"]);
        assert_eq!(cfg.name_delimiter, "-");
        assert_eq!(cfg.file_extensions, vec!["mp4", "MOV"]);
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.log_location, Some(PathBuf::from("/var/log/renamer")));
        assert!(cfg.run_at_launch);
        assert!(!cfg.log_to_console);
        assert_eq!(cfg.reads_per_minute, DEFAULT_READS_PER_MINUTE);
        assert_eq!(cfg.writes_per_minute, DEFAULT_WRITES_PER_MINUTE);
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = parse(r#"{"parentDirID": "root", "fileExtensions": ["mov"], "runAtLaunch": true}"#)
            .unwrap();
        assert_eq!(cfg.name_delimiter, "_");
        assert!(cfg.log_to_console);
        assert!(cfg.cron_schedules.is_empty());
        assert_eq!(cfg.credentials_path, PathBuf::from("resources/credentials.json"));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let err = parse(r#"{"fileExtensions": ["mov"], "runAtLaunch": true}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_extensions_rejected() {
        let err = parse(r#"{"parentDirID": "root", "fileExtensions": ["."], "runAtLaunch": true}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_nothing_to_run_rejected() {
        let err = parse(r#"{"parentDirID": "root", "fileExtensions": ["mov"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_cron_rejected() {
        let err = parse(
            r#"{"parentDirID": "root", "fileExtensions": ["mov"], "cronSchedules": ["every tuesday"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = parse(
            r#"{"parentDirID": "root", "fileExtensions": ["mov"], "runAtLaunch": true, "writesPerMinute": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/drive-renamer/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = std::env::temp_dir().join("drive_renamer_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("malformed_config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let cfg = parse(FULL).unwrap();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("/secrets"));
        assert!(dbg.contains("root-id"));
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde(Path::new("/absolute/path")),
            PathBuf::from("/absolute/path")
        );
    }
}
