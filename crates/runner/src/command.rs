//! Engine command assembly.
//!
//! A command is `<launcher> <fixed flags...> <configuration path>`. When no
//! usable launcher is configured the first token is left empty instead of
//! failing here: the shell then reports the problem through the normal
//! output stream, and the supervisor announces the [`LauncherStatus`]
//! before spawning.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;

/// Whether the configured launcher can be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherStatus {
    Ready(PathBuf),
    NotConfigured,
    /// A path is configured but nothing exists there.
    NotFound(PathBuf),
}

impl LauncherStatus {
    pub fn resolve(launcher: Option<&Path>) -> Self {
        match launcher {
            None => Self::NotConfigured,
            Some(path) if path.as_os_str().is_empty() => Self::NotConfigured,
            Some(path) if path.exists() => Self::Ready(path.to_path_buf()),
            Some(path) => Self::NotFound(path.to_path_buf()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl fmt::Display for LauncherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(path) => write!(f, "Java launcher: {}", path.display()),
            Self::NotConfigured => write!(f, "Java launcher is not configured"),
            Self::NotFound(path) => write!(f, "Java launcher not found: {}", path.display()),
        }
    }
}

/// Ordered command tokens for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    launcher: LauncherStatus,
    tokens: Vec<String>,
}

impl EngineCommand {
    pub fn launcher(&self) -> &LauncherStatus {
        &self.launcher
    }

    /// Launcher, flags, configuration path. The launcher token may be empty.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Tokens joined by single spaces, as handed to the shell.
    pub fn command_line(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

pub struct CommandBuilder;

impl CommandBuilder {
    /// Assemble the command. Flags are inserted verbatim; the launcher and
    /// configuration path are quoted when they contain whitespace.
    pub fn build(
        launcher: Option<&Path>,
        fixed_flags: &[String],
        config_path: &Path,
    ) -> EngineCommand {
        let status = LauncherStatus::resolve(launcher);
        let launcher_token = match &status {
            LauncherStatus::Ready(path) => quote_if_needed(&path.to_string_lossy()),
            LauncherStatus::NotConfigured | LauncherStatus::NotFound(_) => String::new(),
        };

        let mut tokens = Vec::with_capacity(fixed_flags.len() + 2);
        tokens.push(launcher_token);
        tokens.extend(fixed_flags.iter().cloned());
        tokens.push(quote_if_needed(&config_path.to_string_lossy()));

        EngineCommand {
            launcher: status,
            tokens,
        }
    }

    /// Build from an [`EngineConfig`]'s launcher and flags.
    pub fn from_config(config: &EngineConfig, config_path: &Path) -> EngineCommand {
        Self::build(
            config.java_path.as_deref(),
            &config.fixed_flags(),
            config_path,
        )
    }
}

fn quote_if_needed(token: &str) -> String {
    if token.chars().any(char::is_whitespace) {
        format!("\"{token}\"")
    } else {
        token.to_string()
    }
}
