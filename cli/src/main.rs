use anyhow::{Context, Result};
use clap::Parser;

use gitwatch_cli::{Cli, Command, commands, logging};
use gitwatch_pipeline::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = Config::load(&config_path).context("Failed to load configuration")?;
            let _guard = logging::init(config.log_level, &logging::log_dir()?)
                .context("Failed to setup logging")?;
            commands::run(&config).await
        }
        Command::Check { send_test } => {
            let config = Config::load(&config_path).context("Failed to load configuration")?;
            commands::check(&config, send_test).await
        }
        Command::Install {
            watched_dir,
            bot_token,
            chat_id,
        } => commands::install(&config_path, &watched_dir, &bot_token, &chat_id),
    }
}
