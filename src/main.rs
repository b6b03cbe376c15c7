//! drive-renamer: gives cloud-drive files deterministic, collision-free names.
//!
//! On every cron tick the folder tree under the configured root is walked,
//! files that still lack the processed marker are listed, and each is
//! renamed to `<keywords>_<YYYY>_<MMDD>_<n>.<ext>` and marked as processed.
//! Runs never overlap; shutdown waits for an in-flight run to finish.

#![warn(clippy::all)]

mod cli;
mod config;
mod drive;
mod logging;
mod ratelimit;
mod rename;
mod schedule;
mod shutdown;
mod systemd;
mod types;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use drive::auth::OAuthTokenSource;
use drive::{DriveClient, GatewayConfig, RemoteStore};
use rename::{NameGenerator, RenameConfig, Renamer};
use schedule::{Job, Scheduler};
use systemd::SystemdNotifier;

const USER_AGENT: &str = concat!("drive-renamer/", env!("CARGO_PKG_VERSION"));

fn build_renamer(config: &config::Config, dry_run: bool) -> anyhow::Result<Renamer> {
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;
    let tokens = OAuthTokenSource::from_files(&config.credentials_path, &config.token_path, http.clone())?;

    let gateway = GatewayConfig {
        reads_per_minute: config.reads_per_minute,
        writes_per_minute: config.writes_per_minute,
        ..GatewayConfig::default()
    };
    let store: Arc<dyn RemoteStore> = Arc::new(DriveClient::new(http, Arc::new(tokens), &gateway));

    Ok(Renamer::new(
        store,
        NameGenerator::new(config.persistent_words.clone(), config.name_delimiter.clone()),
        RenameConfig::new(
            config.parent_dir_id.clone(),
            config.file_extensions.clone(),
            dry_run,
        ),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::load(&cli.config)?;

    let log_guard = logging::init(&logging::LogSettings {
        level: cli.log_level.unwrap_or(config.log_level),
        to_console: config.log_to_console,
        location: config.log_location.clone(),
    })?;
    if let Some(dir) = log_guard.dir() {
        tracing::debug!(dir = %dir.display(), "Writing daily log files");
    }
    tracing::info!(?config, dry_run = cli.dry_run, "Starting drive-renamer");

    let renamer = Arc::new(build_renamer(&config, cli.dry_run)?);

    if cli.once {
        let summary = renamer.run().await?;
        tracing::debug!(?summary, "Single run finished");
        return Ok(());
    }

    let job = Job::new(renamer);
    let mut scheduler = Scheduler::new();
    for expression in &config.cron_schedules {
        scheduler.schedule_job(expression, &job)?;
    }
    if config.run_at_launch {
        scheduler.run_at_launch(&job);
    }

    let shutdown_token =
        shutdown::install_signal_handler().context("Failed to install signal handlers")?;

    let notifier = SystemdNotifier::new(cli.notify_systemd);
    notifier.notify_ready();
    notifier.notify_status(&format!(
        "Renaming on {} schedule(s)",
        config.cron_schedules.len()
    ));
    {
        let shutdown_token = shutdown_token.clone();
        tokio::spawn(async move {
            shutdown_token.cancelled().await;
            notifier.notify_stopping();
        });
    }

    scheduler.run(shutdown_token).await;
    tracing::info!("drive-renamer stopped");
    drop(log_guard);
    Ok(())
}
