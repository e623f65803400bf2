//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{complete, graph, list, query, search, stats};
use crate::domain::{Priority, TaskStatus};
use crate::engine::{GraphFormat, GroupBy, MatchMode, Preset, SearchField, SortOrder};
use crate::storage::Workspace;

#[derive(Parser)]
#[command(name = "tasklens")]
#[command(author, version, about = "Dependency analysis and queries over markdown task lists")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Task list document (defaults to the workspace's tasks file)
    #[arg(long, global = true, env = "TASKLENS_FILE")]
    pub file: Option<PathBuf>,

    /// Output format (defaults to the global config, else text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a tasklens workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List every task with its readiness
    List {
        /// Also list lines that look like tasks but failed to parse
        #[arg(long)]
        lint: bool,
    },

    /// Render the dependency graph
    Graph {
        /// Output format: mermaid, dot, tree
        #[arg(default_value = "mermaid")]
        kind: GraphFormat,

        /// Leave completed tasks out
        #[arg(long)]
        hide_completed: bool,

        /// Group nodes by phase
        #[arg(long)]
        group_by_phase: bool,

        /// Description character budget
        #[arg(long)]
        width: Option<usize>,
    },

    /// Filter and sort tasks
    Filter {
        /// Named preset: ready, blocked, in-progress, high-priority, remaining
        #[arg(long)]
        preset: Option<Preset>,

        /// Status (repeatable): pending, in_progress, completed
        #[arg(long = "status")]
        statuses: Vec<TaskStatus>,

        #[arg(long)]
        phase: Option<String>,

        #[arg(long = "type")]
        task_type: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,

        /// Required tag (repeatable, all must match)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only tasks waiting on open dependencies
        #[arg(long, conflicts_with = "unblocked")]
        blocked: bool,

        /// Only open tasks whose dependencies are all completed
        #[arg(long)]
        unblocked: bool,

        /// Sort order: id, priority, dependency, phase
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Maximum results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search task fields
    Search {
        /// Search query
        query: String,

        /// Field to search (repeatable): description, phase, type, tags
        #[arg(long = "field")]
        fields: Vec<SearchField>,

        /// Match mode: literal, pattern, approximate
        #[arg(long, default_value = "literal")]
        mode: MatchMode,

        #[arg(long)]
        case_sensitive: bool,

        /// Minimum similarity (0-100) for approximate matches
        #[arg(long)]
        threshold: Option<u8>,

        /// Maximum results (capped at 100)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show completion statistics
    Stats {
        /// Group by (repeatable): phase, type, priority
        #[arg(long = "group-by")]
        group_by: Vec<GroupBy>,

        /// Include text progress bars
        #[arg(long)]
        charts: bool,
    },

    /// Mark tasks completed (IDs, ranges like T001-T005, or comma lists)
    Complete {
        #[arg(required = true)]
        targets: Vec<String>,

        /// Abort without writing if any target is invalid or already completed
        #[arg(long)]
        strict: bool,

        /// Note recorded in the report
        #[arg(long)]
        notes: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tasklens=debug" } else { "tasklens=warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TASKLENS_LOG").unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Creates a workspace; runs before discovery since none may exist yet
fn init(output: &Output, path: &Path) -> Result<()> {
    output.verbose_ctx("init", &format!("Initializing workspace at: {}", path.display()));
    let workspace = Workspace::init(path)?;
    output.success(&format!(
        "Initialized tasklens workspace at {}",
        workspace.root().display()
    ));
    Ok(())
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Commands::Init { path } => {
            let output = Output::new(cli.format.unwrap_or_default(), cli.verbose);
            return init(&output, &path);
        }
        command => command,
    };

    let workspace = Workspace::discover_current()?;
    let format = cli
        .format
        .unwrap_or_else(|| workspace.config().global.default_format.into());
    let output = Output::new(format, cli.verbose);
    output.verbose_ctx(
        "workspace",
        &format!(
            "Root: {} ({})",
            workspace.root().display(),
            if workspace.is_initialized() { "initialized" } else { "defaults" }
        ),
    );

    let session = Session::new(workspace, cli.file);

    match command {
        Commands::Init { path } => init(&output, &path)?,

        Commands::List { lint } => list::run(&session, &output, lint)?,

        Commands::Graph {
            kind,
            hide_completed,
            group_by_phase,
            width,
        } => graph::run(
            &session,
            &output,
            graph::GraphArgs {
                kind,
                include_completed: !hide_completed,
                group_by_phase,
                width,
            },
        )?,

        Commands::Filter {
            preset,
            statuses,
            phase,
            task_type,
            priority,
            tags,
            blocked,
            unblocked,
            sort,
            limit,
        } => query::run(
            &session,
            &output,
            query::FilterArgs {
                preset,
                statuses,
                phase,
                task_type,
                priority,
                tags,
                blocked,
                unblocked,
                sort,
                limit,
            },
        )?,

        Commands::Search {
            query,
            fields,
            mode,
            case_sensitive,
            threshold,
            limit,
        } => search::run(
            &session,
            &output,
            search::SearchArgs {
                query,
                fields,
                mode,
                case_sensitive,
                threshold,
                limit,
            },
        )?,

        Commands::Stats { group_by, charts } => stats::run(&session, &output, group_by, charts)?,

        Commands::Complete {
            targets,
            strict,
            notes,
        } => complete::run(&session, &output, targets, strict, notes)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_filter_flags() {
        let cli = Cli::try_parse_from([
            "tasklens", "filter", "--status", "pending", "--status", "in-progress", "--tag", "api",
            "--unblocked", "--sort", "priority",
        ])
        .unwrap();

        match cli.command {
            Commands::Filter {
                statuses,
                tags,
                unblocked,
                sort,
                ..
            } => {
                assert_eq!(statuses, vec![TaskStatus::Pending, TaskStatus::InProgress]);
                assert_eq!(tags, vec!["api"]);
                assert!(unblocked);
                assert_eq!(sort, Some(SortOrder::Priority));
            }
            _ => panic!("expected filter"),
        }
    }

    #[test]
    fn blocked_and_unblocked_conflict() {
        assert!(Cli::try_parse_from(["tasklens", "filter", "--blocked", "--unblocked"]).is_err());
    }

    #[test]
    fn complete_requires_targets() {
        assert!(Cli::try_parse_from(["tasklens", "complete"]).is_err());
    }

    #[test]
    fn global_file_flag() {
        let cli = Cli::try_parse_from(["tasklens", "stats", "--file", "plan/tasks.md"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("plan/tasks.md")));
    }
}
