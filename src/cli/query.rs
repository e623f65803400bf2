//! Filter command
//!
//! Presets fill in a filter and sort order; explicit flags override them.

use anyhow::{Context, Result};

use super::output::Output;
use super::session::Session;
use crate::domain::{Priority, TaskStatus};
use crate::engine::render::truncate_str;
use crate::engine::{run_query, BlockState, Preset, SortOrder, TaskFilter, TaskQuery};

pub struct FilterArgs {
    pub preset: Option<Preset>,
    pub statuses: Vec<TaskStatus>,
    pub phase: Option<String>,
    pub task_type: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub blocked: bool,
    pub unblocked: bool,
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
}

impl FilterArgs {
    fn into_query(self) -> TaskQuery {
        let block_state = if self.blocked {
            Some(BlockState::Blocked)
        } else if self.unblocked {
            Some(BlockState::Unblocked)
        } else {
            None
        };

        TaskQuery {
            filter: TaskFilter {
                statuses: self.statuses,
                phase: self.phase,
                task_type: self.task_type,
                priority: self.priority,
                tags: self.tags,
                block_state,
            },
            sort: self.sort,
            limit: self.limit,
            preset: self.preset,
        }
    }
}

/// Filters and sorts tasks
pub fn run(session: &Session, output: &Output, args: FilterArgs) -> Result<()> {
    let document = session.document(output)?;
    let graph = session.graph(&document, output)?;

    let query = args.into_query();
    if let Some(preset) = query.preset {
        output.verbose_ctx("filter", &format!("Using preset: {}", preset));
    }

    let result = run_query(&graph, &query, &session.project().phase_order)
        .context("Cannot sort tasks")?;

    output.verbose_ctx(
        "filter",
        &format!(
            "Matched {} tasks, sorted by {}",
            result.total_matched, result.sort
        ),
    );

    if output.is_json() {
        output.data(&result);
        return Ok(());
    }

    let title = match result.preset {
        Some(preset) => format!("{} tasks", preset),
        None => "Matching tasks".to_string(),
    };

    if result.tasks.is_empty() {
        println!("No matching tasks.");
        return Ok(());
    }

    let width = session.project().description_width;
    if result.tasks.len() < result.total_matched {
        println!(
            "{} ({} of {}):",
            title,
            result.tasks.len(),
            result.total_matched
        );
    } else {
        println!("{} ({}):", title, result.tasks.len());
    }
    println!(
        "{:<8} {:<12} {:<8} {:<width$} BLOCKED BY",
        "ID", "STATUS", "PRIORITY", "DESCRIPTION"
    );
    println!("{}", "-".repeat(width + 45));
    for hit in &result.tasks {
        let blockers: Vec<_> = hit.blocked_by.iter().map(|id| id.to_string()).collect();
        println!(
            "{:<8} {:<12} {:<8} {:<width$} {}",
            hit.task.id.to_string(),
            hit.task.status.as_str(),
            hit.task.meta.priority.map(|p| p.as_str()).unwrap_or("-"),
            truncate_str(&hit.task.description, width),
            blockers.join(", ")
        );
    }

    Ok(())
}
