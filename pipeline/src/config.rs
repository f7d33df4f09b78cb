//! Agent configuration.
//!
//! Settings come from a JSON file (`~/.gitwatch/config.json` by default) and
//! are then overridden by `GITWATCH_*` environment variables. The result is
//! validated once at startup and never re-read.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use gitwatch_directory_watcher::WatchConfig;

use crate::error::ConfigError;

/// Directory under the home directory holding config and logs.
pub const STATE_DIR: &str = ".gitwatch";

/// Config file name inside [`STATE_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the bot token.
pub const ENV_BOT_TOKEN: &str = "GITWATCH_BOT_TOKEN";
/// Environment variable overriding the chat id.
pub const ENV_CHAT_ID: &str = "GITWATCH_CHAT_ID";
/// Environment variable overriding the watched directory.
pub const ENV_WATCHED_DIR: &str = "GITWATCH_WATCHED_DIR";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "GITWATCH_LOG_LEVEL";
/// Environment variable switching to polling mode.
pub const ENV_USE_POLLING: &str = "GITWATCH_USE_POLLING";

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
    Critical,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bot credential and destination for notifications.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatTarget {
    /// Bot token.
    pub bot_token: String,

    /// Destination chat id.
    pub chat_id: String,
}

impl ChatTarget {
    /// Token with everything but the bot id hidden, for display.
    pub fn redacted_token(&self) -> String {
        match self.bot_token.split_once(':') {
            Some((bot_id, _)) => format!("{bot_id}:***"),
            None if self.bot_token.is_empty() => String::new(),
            None => "***".to_string(),
        }
    }
}

impl fmt::Debug for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatTarget")
            .field("bot_token", &self.redacted_token())
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Resolved agent configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository working tree to watch.
    pub watched_dir: PathBuf,

    /// Telegram bot token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bot_token: String,

    /// Telegram chat id.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub chat_id: String,

    /// Log verbosity.
    pub log_level: LogLevel,

    /// Quiet interval before a burst of changes counts as settled.
    pub debounce_ms: u64,

    /// Maximum message chunk, in UTF-16 code units.
    pub max_chunk: usize,

    /// Remote to push to.
    pub remote: String,

    /// Bound on each local git command.
    pub git_timeout_secs: u64,

    /// Bound on `git push`.
    pub push_timeout_secs: u64,

    /// Bound on each chat message send.
    pub send_timeout_secs: u64,

    /// Check for changes on a timer instead of watching the filesystem.
    pub use_polling: bool,

    /// Polling period.
    pub poll_interval_secs: u64,

    /// In watch mode, also check for changes this often in case events were
    /// lost. `0` disables the check.
    pub backup_interval_secs: u64,

    /// Wildcard patterns for paths that never trigger a run.
    pub exclude: Vec<String>,

    /// Commit anything pending as soon as the agent starts.
    pub run_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watched_dir: dirs::home_dir().unwrap_or_default(),
            bot_token: String::new(),
            chat_id: String::new(),
            log_level: LogLevel::default(),
            debounce_ms: 2000,
            max_chunk: 4000,
            remote: "origin".to_string(),
            git_timeout_secs: 30,
            push_timeout_secs: 120,
            send_timeout_secs: 15,
            use_polling: false,
            poll_interval_secs: 10,
            backup_interval_secs: 30,
            exclude: Vec::new(),
            run_on_start: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("watched_dir", &self.watched_dir)
            .field("chat", &self.chat_target())
            .field("log_level", &self.log_level)
            .field("debounce_ms", &self.debounce_ms)
            .field("max_chunk", &self.max_chunk)
            .field("remote", &self.remote)
            .field("use_polling", &self.use_polling)
            .field("backup_interval_secs", &self.backup_interval_secs)
            .field("run_on_start", &self.run_on_start)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(state_dir()?.join(CONFIG_FILE))
    }

    /// Load `path` and apply overrides from the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load `path` and apply overrides from `env`.
    ///
    /// A missing file yields the defaults. A file that exists but does not
    /// parse is an error.
    pub fn load_with_env<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_file(path)?;
        config.apply_env(env)?;
        Ok(config)
    }

    /// Read `path` without applying environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GITWATCH_*` overrides. Empty values are ignored.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var(ENV_BOT_TOKEN) {
            self.bot_token = token;
        }
        if let Some(chat_id) = var(ENV_CHAT_ID) {
            self.chat_id = chat_id;
        }
        if let Some(dir) = var(ENV_WATCHED_DIR) {
            self.watched_dir = PathBuf::from(dir);
        }
        if let Some(level) = var(ENV_LOG_LEVEL) {
            self.log_level = level.parse()?;
        }
        if let Some(polling) = var(ENV_USE_POLLING) {
            self.use_polling = matches!(
                polling.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }
        Ok(())
    }

    /// Check everything the agent needs before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("bot_token"));
        }
        if self.chat_id.trim().is_empty() {
            return Err(ConfigError::Missing("chat_id"));
        }

        for (name, value) in [
            ("debounce_ms", self.debounce_ms),
            ("max_chunk", self.max_chunk as u64),
            ("git_timeout_secs", self.git_timeout_secs),
            ("push_timeout_secs", self.push_timeout_secs),
            ("send_timeout_secs", self.send_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        if self.remote.trim().is_empty() {
            return Err(ConfigError::Missing("remote"));
        }

        let dir = &self.watched_dir;
        if !dir.exists() {
            return Err(ConfigError::WatchedDir {
                path: dir.clone(),
                reason: "does not exist",
            });
        }
        if !dir.is_dir() {
            return Err(ConfigError::WatchedDir {
                path: dir.clone(),
                reason: "is not a directory",
            });
        }
        if !dir.join(".git").exists() {
            return Err(ConfigError::WatchedDir {
                path: dir.clone(),
                reason: "is not a git repository (no .git)",
            });
        }
        Ok(())
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json + "\n").map_err(io_err)?;

        // The file holds the bot token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        Ok(())
    }

    /// Chat credential and destination.
    pub fn chat_target(&self) -> ChatTarget {
        ChatTarget {
            bot_token: self.bot_token.clone(),
            chat_id: self.chat_id.clone(),
        }
    }

    /// Change source settings for the watched directory.
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig::new(self.watched_dir.clone()).with_excludes(self.exclude.iter().cloned())
    }

    /// Debounce quiet interval.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Timeout for local git commands.
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    /// Timeout for `git push`.
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    /// Timeout for one chat send.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Polling period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Period of the backup check in watch mode, if enabled.
    pub fn backup_interval(&self) -> Option<Duration> {
        (self.backup_interval_secs > 0).then(|| Duration::from_secs(self.backup_interval_secs))
    }
}

/// `~/.gitwatch`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(STATE_DIR))
        .ok_or(ConfigError::NoHomeDir)
}
