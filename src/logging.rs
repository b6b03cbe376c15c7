//! `tracing` subscriber setup: console output, a daily log file, or both.
//!
//! The file layer writes through `tracing-appender`: a new
//! `file-renamer.YYYY-MM-DD.log` is started every day (UTC), and lines are
//! handed to a background writer so logging never blocks a run on disk I/O.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::types::LogLevel;

/// Directory used when console logging is off and no location is given.
pub const DEFAULT_LOG_DIR: &str = "file_renamer_logs";

const LOG_FILE_PREFIX: &str = "file-renamer";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log directory {path}: {source}")]
    File { path: PathBuf, source: InitError },

    #[error("Failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: LogLevel,
    pub to_console: bool,
    pub location: Option<PathBuf>,
}

/// Keeps the background file writer alive. Dropping it flushes pending
/// lines, so hold it until the process exits.
#[must_use]
pub struct LogGuard {
    _writer: Option<WorkerGuard>,
    dir: Option<PathBuf>,
}

impl LogGuard {
    /// Directory receiving the daily log files, if file logging is on.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

/// Where the log files go, if anywhere. Files are written whenever a
/// location is configured, and always when the console is disabled.
pub fn log_dir(location: Option<&Path>, to_console: bool) -> Option<PathBuf> {
    match location {
        Some(dir) => Some(dir.to_path_buf()),
        None if !to_console => Some(PathBuf::from(DEFAULT_LOG_DIR)),
        None => None,
    }
}

/// Daily-rotating appender writing `file-renamer.<date>.log` under `dir`.
fn file_appender(dir: &Path) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(dir)
        .map_err(|source| LoggingError::File {
            path: dir.to_path_buf(),
            source,
        })
}

/// Install the global subscriber. `RUST_LOG` overrides `settings.level`.
pub fn init(settings: &LogSettings) -> Result<LogGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_filter()));

    let dir = log_dir(settings.location.as_deref(), settings.to_console);
    let (file_writer, guard) = match &dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(dir)?);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = settings
        .to_console
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(LogGuard {
        _writer: guard,
        dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_dir_selection() {
        assert_eq!(log_dir(None, true), None);
        assert_eq!(log_dir(None, false), Some(PathBuf::from(DEFAULT_LOG_DIR)));
        assert_eq!(
            log_dir(Some(Path::new("/var/log/renamer")), true),
            Some(PathBuf::from("/var/log/renamer"))
        );
    }

    #[test]
    fn test_appender_writes_dated_file() {
        let dir = std::env::temp_dir()
            .join("drive_renamer_tests")
            .join("logging")
            .join("daily");
        let _ = std::fs::remove_dir_all(&dir);

        let mut appender = file_appender(&dir).unwrap();
        appender.write_all(b"first\n").unwrap();
        appender.write_all(b"second\n").unwrap();
        appender.flush().unwrap();

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let expected = dir.join(format!("file-renamer.{today}.log"));
        assert_eq!(std::fs::read_to_string(&expected).unwrap(), "first\nsecond\n");

        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
