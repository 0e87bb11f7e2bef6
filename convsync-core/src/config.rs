//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/convsync/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/convsync/` (~/.config/convsync/)
//! - State/Logs: `$XDG_STATE_HOME/convsync/` (~/.local/state/convsync/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
pub(crate) fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transcript location overrides
    #[serde(default)]
    pub paths: PathOverrides,

    /// Rendered output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Version-control settings for the conversation directory
    #[serde(default)]
    pub git: GitConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Override paths for transcript discovery
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PathOverrides {
    /// Override for the Claude Code projects root (`~/.claude/projects`)
    pub claude_projects: Option<PathBuf>,
}

impl PathOverrides {
    /// Root searched when the hook input carries no usable transcript path.
    pub fn claude_projects_root(&self) -> PathBuf {
        self.claude_projects
            .clone()
            .unwrap_or_else(|| home_dir().join(".claude").join("projects"))
    }
}

/// Rendered output settings
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Name of the conversation directory created in the project root
    #[serde(default = "default_dir_name")]
    pub dir_name: String,

    /// Maximum characters of the first human line used as a summary
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,

    /// Maximum characters of the head summary used in chain headings
    #[serde(default = "default_chain_title_chars")]
    pub chain_title_chars: usize,

    /// Skip `agent-*.jsonl` logs during backfill
    #[serde(default = "default_true")]
    pub skip_agent_logs: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir_name: default_dir_name(),
            summary_chars: default_summary_chars(),
            chain_title_chars: default_chain_title_chars(),
            skip_agent_logs: true,
        }
    }
}

fn default_dir_name() -> String {
    ".conversations".to_string()
}

fn default_summary_chars() -> usize {
    100
}

fn default_chain_title_chars() -> usize {
    60
}

fn default_true() -> bool {
    true
}

/// Version-control settings
#[derive(Debug, Deserialize, Clone)]
pub struct GitConfig {
    /// Commit rendered output after each update
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-command timeout in seconds
    #[serde(default = "default_git_timeout")]
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_git_timeout(),
        }
    }
}

fn default_git_timeout() -> u64 {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.output.dir_name.trim().is_empty() {
            return Err(Error::Config("output.dir_name must not be empty".to_string()));
        }
        if self.output.summary_chars == 0 {
            return Err(Error::Config(
                "output.summary_chars must be greater than 0".to_string(),
            ));
        }
        if self.git.timeout_secs == 0 {
            return Err(Error::Config(
                "git.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/convsync/config.toml` (~/.config/convsync/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("convsync").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/convsync/` (~/.local/state/convsync/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("convsync")
    }
}
