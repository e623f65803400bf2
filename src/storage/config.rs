//! Configuration handling for tasklens
//!
//! Configuration is stored in `.tasklens/config.toml` (workspace) and
//! `~/.config/tasklens/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DuplicatePolicy;
use crate::engine::query::CANONICAL_PHASES;
use crate::engine::search;

/// Name of the per-workspace configuration directory
pub const WORKSPACE_DIR: &str = ".tasklens";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Search defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results returned when no limit is given
    pub default_limit: usize,

    /// Minimum similarity (0-100) for approximate matches
    pub fuzzy_threshold: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: search::DEFAULT_LIMIT,
            fuzzy_threshold: search::DEFAULT_THRESHOLD,
        }
    }
}

/// Workspace-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Task list document, relative to the workspace root
    pub tasks_file: PathBuf,

    /// Handling of repeated task IDs
    pub duplicates: DuplicatePolicy,

    /// Canonical phase order for sorting and grouping
    pub phase_order: Vec<String>,

    /// Character budget for descriptions in rendered graphs
    pub description_width: usize,

    /// Search settings
    pub search: SearchConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            tasks_file: PathBuf::from("tasks.md"),
            duplicates: DuplicatePolicy::LastWins,
            phase_order: CANONICAL_PHASES.iter().map(|p| p.to_string()).collect(),
            description_width: 40,
            search: SearchConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Checks values that parse but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.fuzzy_threshold > 100 {
            return Err(ConfigError::Invalid(format!(
                "search.fuzzy_threshold must be 0-100, got {}",
                self.search.fuzzy_threshold
            )));
        }
        if self.description_width < 4 {
            return Err(ConfigError::Invalid(format!(
                "description_width must be at least 4, got {}",
                self.description_width
            )));
        }
        if self.tasks_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("tasks_file must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + workspace)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub workspace_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for a specific workspace
    pub fn for_workspace(workspace_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(workspace_root)?;

        Ok(Self {
            project,
            global,
            workspace_root: Some(workspace_root.to_path_buf()),
        })
    }

    /// Defaults plus global configuration, for use outside any workspace
    pub fn without_workspace() -> Result<Self> {
        Ok(Self {
            project: ProjectConfig::default(),
            global: Self::load_global()?,
            workspace_root: None,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "tasklens", "tasklens")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads workspace configuration from a specific root
    fn load_project_config(workspace_root: &Path) -> Result<ProjectConfig> {
        let config_path = workspace_root.join(WORKSPACE_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path).with_context(|| {
            format!("Failed to read workspace config: {}", config_path.display())
        })?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse workspace config")?;

        config
            .validate()
            .with_context(|| format!("Invalid workspace config: {}", config_path.display()))?;
        Ok(config)
    }

    /// Finds the workspace root by looking for a `.tasklens/` directory
    pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns true if a workspace was found
    pub fn is_in_workspace(&self) -> bool {
        self.workspace_root.is_some()
    }
}
