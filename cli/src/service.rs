//! Per-user service definitions.
//!
//! `gitwatch install` writes a systemd user unit on Linux and a LaunchAgent
//! on macOS. Both run `gitwatch --config <file> run` and restart it if it
//! exits.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// systemd unit / launchd label name.
pub const SERVICE_NAME: &str = "gitwatch";

/// launchd job label.
pub const LAUNCHD_LABEL: &str = "com.gitwatch.agent";

/// Service manager to install for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// systemd user unit.
    Systemd,
    /// launchd LaunchAgent.
    LaunchAgent,
}

impl ServiceKind {
    /// Service manager for the current platform, if supported.
    pub fn detect() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(ServiceKind::LaunchAgent)
        } else if cfg!(target_os = "linux") {
            Some(ServiceKind::Systemd)
        } else {
            None
        }
    }

    /// Where the definition lives, relative to the home directory.
    pub fn definition_path(self, home: &Path) -> PathBuf {
        match self {
            ServiceKind::Systemd => home
                .join(".config/systemd/user")
                .join(format!("{SERVICE_NAME}.service")),
            ServiceKind::LaunchAgent => home
                .join("Library/LaunchAgents")
                .join(format!("{LAUNCHD_LABEL}.plist")),
        }
    }
}

/// What the service runs.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Agent executable.
    pub executable: PathBuf,

    /// Config file passed with `--config`.
    pub config_path: PathBuf,

    /// Directory for supervisor-captured stdout/stderr.
    pub log_dir: PathBuf,
}

impl ServiceSpec {
    fn arguments(&self) -> Vec<String> {
        vec![
            self.executable.display().to_string(),
            "--config".to_string(),
            self.config_path.display().to_string(),
            "run".to_string(),
        ]
    }

    /// Render the definition file for `kind`.
    pub fn render(&self, kind: ServiceKind) -> String {
        match kind {
            ServiceKind::Systemd => self.systemd_unit(),
            ServiceKind::LaunchAgent => self.launch_agent_plist(),
        }
    }

    fn systemd_unit(&self) -> String {
        let exec_start = self
            .arguments()
            .iter()
            .map(String::as_str)
            .map(systemd_quote)
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "[Unit]\n\
             Description=gitwatch - auto-commit and notify on file changes\n\
             After=network-online.target\n\
             Wants=network-online.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec_start}\n\
             Restart=always\n\
             RestartSec=5\n\
             \n\
             [Install]\n\
             WantedBy=default.target\n"
        )
    }

    fn launch_agent_plist(&self) -> String {
        let arguments: String = self
            .arguments()
            .iter()
            .map(|arg| format!("        <string>{}</string>\n", xml_escape(arg)))
            .collect();
        let stdout = xml_escape(&self.log_dir.join("launchd.out.log").display().to_string());
        let stderr = xml_escape(&self.log_dir.join("launchd.err.log").display().to_string());

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCHD_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
{arguments}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{stdout}</string>
    <key>StandardErrorPath</key>
    <string>{stderr}</string>
</dict>
</plist>
"#
        )
    }
}

/// Commands that load and start an installed definition.
pub fn activation_commands(kind: ServiceKind, definition: &Path) -> Vec<String> {
    match kind {
        ServiceKind::Systemd => vec![
            "systemctl --user daemon-reload".to_string(),
            format!("systemctl --user enable --now {SERVICE_NAME}.service"),
            format!("journalctl --user -u {SERVICE_NAME}.service -f"),
        ],
        ServiceKind::LaunchAgent => vec![
            format!("launchctl load -w {}", definition.display()),
            format!("launchctl unload -w {}", definition.display()),
        ],
    }
}

/// Write the definition for `kind` under `home`. Returns its path.
pub fn install(kind: ServiceKind, spec: &ServiceSpec, home: &Path) -> Result<PathBuf> {
    if !spec.executable.is_absolute() {
        bail!(
            "executable path must be absolute: {}",
            spec.executable.display()
        );
    }

    let path = kind.definition_path(home);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::create_dir_all(&spec.log_dir)
        .with_context(|| format!("Failed to create {}", spec.log_dir.display()))?;
    std::fs::write(&path, spec.render(kind))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn systemd_quote(arg: &str) -> String {
    if !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '%' | '$'))
    {
        return arg.to_string();
    }
    let escaped = arg
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('%', "%%")
        .replace('$', "$$");
    format!("\"{escaped}\"")
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
