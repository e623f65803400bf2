//! Batch completion
//!
//! Marks many tasks completed in one call. Targets are identifiers or
//! closed ranges (`T001-T005`), optionally comma-separated within a token.
//! Targets are expanded, validated, and de-duplicated before the document
//! is read.
//!
//! In strict mode any invalid, missing, or already-completed target rejects
//! the whole batch and nothing is written. In lenient mode those targets are
//! reported as failed or skipped and the rest are completed.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    BlockerClassifier, DuplicatePolicy, GraphError, Task, TaskId, TaskRange, TaskStatus,
};
use crate::engine::stats::percentage;
use crate::storage::{DocumentError, TaskDocument};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No task identifiers given")]
    Empty,

    #[error("Batch rejected, nothing written: {}", .problems.join("; "))]
    Rejected { problems: Vec<String> },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A single expanded target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Task(TaskId),
    Invalid { token: String, reason: String },
}

/// Expands raw tokens into de-duplicated targets, in first-mention order
pub fn expand_targets(tokens: &[String]) -> Vec<Target> {
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut targets = Vec::new();

    for token in tokens.iter().flat_map(|t| t.split(',')) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let expanded = if token.contains('-') {
            token.parse::<TaskRange>().map(|range| range.expand())
        } else {
            token.parse::<TaskId>().map(|id| vec![id])
        };

        match expanded {
            Ok(ids) => {
                for id in ids {
                    if seen.insert(id.clone()) {
                        targets.push(Target::Task(id));
                    }
                }
            }
            Err(e) => targets.push(Target::Invalid {
                token: token.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    targets
}

/// A batch completion request
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Identifiers and ranges, as typed
    pub targets: Vec<String>,
    pub strict: bool,
    pub notes: Option<String>,
}

/// Per-target result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub target: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Result of a batch completion
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub strict: bool,
    pub items: Vec<ItemReport>,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Tasks completed while a dependency is still open
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Overall completion after the batch
    pub percentage: f64,
    pub generated_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn ids(&self, outcome: Outcome) -> Vec<&str> {
        self.items
            .iter()
            .filter(|i| i.outcome == outcome)
            .map(|i| i.target.as_str())
            .collect()
    }
}

/// Completes the requested tasks in the document at `path`
pub fn complete(
    path: &Path,
    request: &BatchRequest,
    policy: DuplicatePolicy,
) -> Result<BatchReport, BatchError> {
    let targets = expand_targets(&request.targets);
    if targets.is_empty() {
        return Err(BatchError::Empty);
    }

    if request.strict {
        let problems: Vec<String> = targets
            .iter()
            .filter_map(|t| match t {
                Target::Invalid { token, reason } => Some(format!("{}: {}", token, reason)),
                Target::Task(_) => None,
            })
            .collect();
        if !problems.is_empty() {
            return Err(BatchError::Rejected { problems });
        }
    }

    let document = TaskDocument::load(path)?;
    let graph = document.graph(policy)?;

    let mut items = Vec::with_capacity(targets.len());
    let mut planned: Vec<&Task> = Vec::new();
    let mut problems = Vec::new();

    for target in &targets {
        match target {
            Target::Invalid { token, reason } => items.push(ItemReport {
                target: token.clone(),
                outcome: Outcome::Failed,
                reason: Some(reason.clone()),
                line: None,
            }),
            Target::Task(id) => match graph.task(id) {
                None => {
                    problems.push(format!("{}: not found", id));
                    items.push(ItemReport {
                        target: id.to_string(),
                        outcome: Outcome::Failed,
                        reason: Some("not found".to_string()),
                        line: None,
                    });
                }
                Some(task) if task.status.is_complete() => {
                    problems.push(format!("{}: already completed", task.id));
                    items.push(ItemReport {
                        target: task.id.to_string(),
                        outcome: Outcome::Skipped,
                        reason: Some("already completed".to_string()),
                        line: Some(task.line),
                    });
                }
                Some(task) => {
                    planned.push(task);
                    items.push(ItemReport {
                        target: task.id.to_string(),
                        outcome: Outcome::Completed,
                        reason: None,
                        line: Some(task.line),
                    });
                }
            },
        }
    }

    if request.strict && !problems.is_empty() {
        tracing::debug!(problems = problems.len(), "Strict batch rejected");
        return Err(BatchError::Rejected { problems });
    }

    if !planned.is_empty() {
        let updates: Vec<(&Task, TaskStatus)> = planned
            .iter()
            .map(|task| (*task, TaskStatus::Completed))
            .collect();
        let text = document.with_statuses(&updates)?;
        document.write_text(&text)?;
    }

    let warnings = open_dependency_warnings(graph.tasks(), &planned);

    let already_done = graph.tasks().iter().filter(|t| t.status.is_complete()).count();
    let report = BatchReport {
        strict: request.strict,
        completed: planned.len(),
        skipped: items.iter().filter(|i| i.outcome == Outcome::Skipped).count(),
        failed: items.iter().filter(|i| i.outcome == Outcome::Failed).count(),
        items,
        warnings,
        notes: request.notes.clone(),
        percentage: percentage(already_done + planned.len(), graph.len()),
        generated_at: Utc::now(),
    };

    tracing::debug!(
        completed = report.completed,
        skipped = report.skipped,
        failed = report.failed,
        "Batch completion applied"
    );
    Ok(report)
}

/// Warnings for completed tasks whose dependencies remain open afterwards
fn open_dependency_warnings(tasks: &[Task], planned: &[&Task]) -> Vec<String> {
    let planned_ids: HashSet<&TaskId> = planned.iter().map(|t| &t.id).collect();
    let after: Vec<Task> = tasks
        .iter()
        .map(|t| {
            if planned_ids.contains(&t.id) {
                t.clone().with_status(TaskStatus::Completed)
            } else {
                t.clone()
            }
        })
        .collect();
    let classifier = BlockerClassifier::new(&after);

    planned
        .iter()
        .filter_map(|task| {
            let open: Vec<String> = task
                .meta
                .depends
                .iter()
                .filter(|dep| !classifier.is_complete(dep))
                .map(|dep| dep.to_string())
                .collect();
            (!open.is_empty()).then(|| {
                format!(
                    "{} completed while dependencies are open: {}",
                    task.id,
                    open.join(", ")
                )
            })
        })
        .collect()
}
