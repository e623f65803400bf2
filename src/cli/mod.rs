//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose | Examples |
//! |---------|---------|----------|
//! | Core | Workspace setup and listing | `init`, `list`, `list --lint` |
//! | Graph | Dependency projections | `graph mermaid`, `graph dot`, `graph tree` |
//! | Query | Filtering and presets | `filter --preset ready`, `filter --tag api` |
//! | Search | Field search | `search auth`, `search atuh --mode approximate` |
//! | Stats | Completion breakdowns | `stats --group-by phase --charts` |
//! | Write | Batch completion | `complete T001-T003 --strict` |
//!
//! ## Document Selection
//!
//! Commands read the workspace's configured tasks file unless `--file` (or
//! `TASKLENS_FILE`) names another one. The document is re-read on every
//! invocation.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! tasklens --verbose filter --preset blocked
//! ```
//!
//! `TASKLENS_LOG` takes a `tracing` filter directive and overrides the
//! level chosen by `--verbose`.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod session;
mod list;
mod graph;
mod query;
mod search;
mod stats;
mod complete;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
