//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gitwatch - commit, push and report every change to a repository
#[derive(Debug, Parser)]
#[command(
    name = "gitwatch",
    version,
    about = "Watches a git working tree, commits and pushes each settled change, and sends the diff to Telegram",
    after_help = "Logs are written to: ~/.gitwatch/logs/gitwatch.log"
)]
pub struct Cli {
    /// Path to config file (default: ~/.gitwatch/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute (default: run)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the repository until interrupted
    Run,

    /// Validate configuration and repository, then exit
    Check {
        /// Also send a test message to the configured chat
        #[arg(long)]
        send_test: bool,
    },

    /// Write the config file and a per-user service definition
    Install {
        /// Repository working tree to watch
        #[arg(long)]
        watched_dir: PathBuf,

        /// Telegram bot token
        #[arg(long)]
        bot_token: String,

        /// Telegram chat id
        #[arg(long)]
        chat_id: String,
    },
}
