//! # Storage Layer
//!
//! File access for tasklens. The markdown task list is the only state; the
//! workspace adds a small TOML config beside it.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | Markdown checklist | `tasks.md` (configurable, or `--file`) |
//! | Workspace config | TOML | `.tasklens/config.toml` |
//! | Global config | TOML | `~/.config/tasklens/config.toml` |
//!
//! ## Write Safety
//!
//! - [`TaskDocument`] rewrites only status characters of targeted lines
//! - Writes go to a locked temp file (`fs2`) that is renamed over the document
//!
//! ## Key Types
//!
//! - [`Workspace`] - Locates the workspace, its config, and the default document
//! - [`TaskDocument`] - Loads, parses, and rewrites the task list
//! - [`Config`] - Workspace and global configuration

mod config;
mod document;
mod workspace;

pub use config::{
    Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, SearchConfig, WORKSPACE_DIR,
};
pub use document::{DocumentError, TaskDocument};
pub use workspace::{Workspace, WorkspaceError};
