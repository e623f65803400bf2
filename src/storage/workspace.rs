//! Workspace management
//!
//! A workspace is a directory holding a `.tasklens/` config directory. It
//! supplies the default task document and the settings commands run with.
//! Outside any workspace the current directory and built-in defaults apply.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{Config, WORKSPACE_DIR};
use super::document::TaskDocument;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a tasklens workspace. Run 'tasklens init' first.")]
    NotInWorkspace,
}

/// Default workspace configuration written by `tasklens init`
const DEFAULT_CONFIG: &str = r#"# tasklens configuration

# Task list document, relative to this workspace
tasks_file = "tasks.md"

# Repeated task IDs: "last_wins" or "reject"
duplicates = "last_wins"

# Phase order used for sorting and grouping
phase_order = ["setup", "foundational", "core", "integration", "testing", "polish"]

# Description budget for rendered graphs
description_width = 40

[search]
default_limit = 20
fuzzy_threshold = 70
"#;

/// A tasklens workspace
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_workspace(&root)?;
        Ok(Self { root, config })
    }

    /// Finds the workspace at `start` or a parent, falling back to `start` itself
    pub fn discover(start: &Path) -> Result<Self> {
        match Config::find_workspace_root(start) {
            Some(root) => {
                tracing::debug!(root = %root.display(), "Using workspace");
                Self::open(root)
            }
            None => {
                tracing::debug!(dir = %start.display(), "No workspace found, using defaults");
                Ok(Self {
                    root: start.to_path_buf(),
                    config: Config::without_workspace()?,
                })
            }
        }
    }

    /// Discovers the workspace from the current directory
    pub fn discover_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover(&cwd)
    }

    /// Initializes a new workspace at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let dir = root.join(WORKSPACE_DIR);

        fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create {} directory: {}", WORKSPACE_DIR, dir.display())
        })?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        Self::open(root)
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true if a `.tasklens/` directory backs this workspace
    pub fn is_initialized(&self) -> bool {
        self.config.is_in_workspace()
    }

    /// The configured task document path
    pub fn default_document(&self) -> PathBuf {
        self.root.join(&self.config.project.tasks_file)
    }

    /// Resolves an explicit document path, or the configured default
    pub fn resolve_document(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => self.default_document(),
        }
    }

    /// Loads the task document
    pub fn load_document(&self, explicit: Option<&Path>) -> Result<TaskDocument> {
        let path = self.resolve_document(explicit);
        Ok(TaskDocument::load(path)?)
    }
}
