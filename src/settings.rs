//! Persistent settings read from `isofilter.toml`.
//!
//! Settings are layered: the file supplies defaults, environment variables
//! override the file, and command-line flags override both.
//!
//! # File Format
//!
//! ```toml
//! [oracle]
//! command = "sort"
//! temp_dir = "/var/tmp"
//! buffer_size = "50%"
//!
//! [canon]
//! mode = "dense"
//! max_vertices = 1024
//! ```

use crate::canon::{CanonMode, DEFAULT_MAX_VERTICES};
use crate::orchestrator::DEFAULT_SORT_COMMAND;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "isofilter.toml";

/// Overrides `[oracle] command`.
pub const SORT_CMD_ENV: &str = "ISOFILTER_SORT_CMD";
/// Overrides `[oracle] temp_dir`.
pub const TMPDIR_ENV: &str = "ISOFILTER_TMPDIR";

/// Sort process settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Spill directory for the sort process (`-T`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Memory budget for the sort process (`-S`), e.g. "64M" or "50%"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<String>,
}

/// Canonicalizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonSettings {
    #[serde(default)]
    pub mode: CanonMode,
    #[serde(default = "default_max_vertices")]
    pub max_vertices: usize,
}

fn default_max_vertices() -> usize {
    DEFAULT_MAX_VERTICES
}

impl Default for CanonSettings {
    fn default() -> Self {
        Self {
            mode: CanonMode::default(),
            max_vertices: default_max_vertices(),
        }
    }
}

/// Root of `isofilter.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub canon: CanonSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse isofilter.toml")
    }

    /// `$XDG_CONFIG_HOME/isofilter/isofilter.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("isofilter").join(SETTINGS_FILE))
    }

    /// Load from `path` if given (it must exist), else from the default
    /// location if a file is there, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save settings to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize isofilter.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
        Ok(())
    }

    /// Sort command, with the environment overriding the file.
    pub fn sort_command(&self) -> String {
        std::env::var(SORT_CMD_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.oracle.command.clone())
            .unwrap_or_else(|| DEFAULT_SORT_COMMAND.to_string())
    }

    /// Sort spill directory, with the environment overriding the file.
    pub fn temp_dir(&self) -> Option<PathBuf> {
        std::env::var_os(TMPDIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.oracle.temp_dir.clone())
    }

    /// Check settings for problems. Returns one message per problem.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(command) = &self.oracle.command
            && command.trim().is_empty()
        {
            warnings.push("oracle.command is empty".to_string());
        }

        if let Some(size) = &self.oracle.buffer_size
            && !is_valid_buffer_size(size)
        {
            warnings.push(format!(
                "Invalid oracle.buffer_size '{}': should be a number followed by K, M, G or %",
                size
            ));
        }

        if let Some(dir) = &self.oracle.temp_dir
            && !dir.is_dir()
        {
            warnings.push(format!(
                "oracle.temp_dir '{}' is not a directory",
                dir.display()
            ));
        }

        if self.canon.max_vertices == 0 {
            warnings.push("canon.max_vertices must be at least 1".to_string());
        }

        warnings
    }
}

/// A sort memory budget: digits followed by exactly one of `K`, `M`, `G`
/// or `%`.
pub fn is_valid_buffer_size(size: &str) -> bool {
    let Some(unit) = size.chars().last() else {
        return false;
    };
    if !matches!(unit, 'K' | 'M' | 'G' | '%') {
        return false;
    }
    let digits = &size[..size.len() - 1];
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
