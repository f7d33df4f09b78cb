//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{error, info, warn};

use gitwatch_directory_watcher::ChangeSource;
use gitwatch_notifier::{ChatTransport, TelegramTransport};
use gitwatch_pipeline::{Config, Coordinator, Pipeline};
use gitwatch_vcs::GitCli;

use crate::service::{self, ServiceKind, ServiceSpec};

/// Message sent by `gitwatch check --send-test`.
pub const TEST_MESSAGE: &str = "gitwatch: test message, notifications are working";

fn repository(config: &Config) -> GitCli {
    GitCli::new(config.watched_dir.clone())
        .with_remote(config.remote.clone())
        .with_timeout(config.git_timeout())
        .with_push_timeout(config.push_timeout())
}

/// Watch the repository until SIGINT/SIGTERM.
pub async fn run(config: &Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let git = repository(config);
    git.verify_repository()
        .await
        .context("Watched directory is not usable")?;
    if git.ensure_identity().await? {
        warn!("No git identity configured, using a repo-local fallback identity");
    }

    info!(
        watched_dir = %config.watched_dir.display(),
        remote = %config.remote,
        polling = config.use_polling,
        backup_secs = config.backup_interval_secs,
        "Starting gitwatch"
    );

    let coordinator = Coordinator::from_config(Pipeline::from_config(config), config);

    // The source must outlive the coordinator; dropping it stops the watch.
    let (_source, events) = if config.use_polling {
        info!(
            "Polling every {}s instead of watching the filesystem",
            config.poll_interval_secs
        );
        (None, None)
    } else {
        let (source, events) =
            ChangeSource::observe(config.watch_config()).context("Failed to start watching")?;
        (Some(source), Some(events))
    };

    coordinator
        .run(events, shutdown_signal())
        .await
        .context("Watcher stopped")?;

    info!("gitwatch stopped");
    Ok(())
}

/// Validate settings and the repository, print them, optionally send a
/// test message.
pub async fn check(config: &Config, send_test: bool) -> Result<()> {
    let target = config.chat_target();
    println!("watched_dir: {}", config.watched_dir.display());
    println!("remote:      {}", config.remote);
    println!("chat_id:     {}", target.chat_id);
    println!("bot_token:   {}", target.redacted_token());
    println!("log_level:   {}", config.log_level);
    println!(
        "mode:        {}",
        if config.use_polling {
            format!("polling every {}s", config.poll_interval_secs)
        } else {
            match config.backup_interval() {
                Some(backup) => format!(
                    "watching, {}ms debounce, backup check every {}s",
                    config.debounce_ms,
                    backup.as_secs()
                ),
                None => format!("watching, {}ms debounce", config.debounce_ms),
            }
        }
    );

    config.validate().context("Invalid configuration")?;
    repository(config)
        .verify_repository()
        .await
        .context("Watched directory is not usable")?;
    println!("configuration OK");

    if send_test {
        let transport = TelegramTransport::new(target.bot_token, target.chat_id)
            .with_timeout(config.send_timeout());
        transport
            .send(TEST_MESSAGE)
            .await
            .context("Failed to send test message")?;
        println!("test message sent");
    }
    Ok(())
}

/// Write the config file and the service definition for this platform.
pub fn install(
    config_path: &Path,
    watched_dir: &Path,
    bot_token: &str,
    chat_id: &str,
) -> Result<()> {
    let kind = match ServiceKind::detect() {
        Some(kind) => kind,
        None => bail!("Service install is supported on Linux and macOS only"),
    };

    let mut config = Config::from_file(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    config.watched_dir = std::fs::canonicalize(watched_dir)
        .with_context(|| format!("Directory does not exist: {}", watched_dir.display()))?;
    config.bot_token = bot_token.to_string();
    config.chat_id = chat_id.to_string();
    config.validate().context("Invalid configuration")?;
    config.save(config_path)?;
    println!("Wrote config: {}", config_path.display());

    let home = home_dir()?;
    let spec = ServiceSpec {
        executable: std::env::current_exe().context("Failed to locate the gitwatch executable")?,
        config_path: config_path.to_path_buf(),
        log_dir: crate::logging::log_dir()?,
    };
    let definition = service::install(kind, &spec, &home)?;
    println!("Wrote service definition: {}", definition.display());

    println!("\nTo start the service now, run:");
    for command in service::activation_commands(kind, &definition) {
        println!("  {command}");
    }
    Ok(())
}

fn home_dir() -> Result<PathBuf> {
    let state = gitwatch_pipeline::state_dir()?;
    match state.parent() {
        Some(home) => Ok(home.to_path_buf()),
        None => bail!("Could not determine the home directory"),
    }
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
