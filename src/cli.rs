use clap::Parser;
use std::path::PathBuf;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "drive-renamer",
    about = "Rename cloud drive files into a canonical, collision-free form on a schedule"
)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long, env = "DRIVE_RENAMER_CONFIG", default_value = "resources/config.json")]
    pub config: PathBuf,

    /// Log level (overrides `logLevel` from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Run the rename pipeline once and exit instead of scheduling it
    #[arg(long)]
    pub once: bool,

    /// Log the names that would be assigned without modifying the drive
    #[arg(long)]
    pub dry_run: bool,

    /// Send readiness and status notifications to systemd
    #[arg(long)]
    pub notify_systemd: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["drive-renamer"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("resources/config.json"));
        assert!(cli.log_level.is_none());
        assert!(!cli.once);
        assert!(!cli.dry_run);
        assert!(!cli.notify_systemd);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "drive-renamer",
            "--config",
            "/etc/renamer.json",
            "--log-level",
            "debug",
            "--once",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/renamer.json"));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert!(cli.once);
        assert!(cli.dry_run);
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["drive-renamer", "--log-level", "loud"]).is_err());
    }
}
