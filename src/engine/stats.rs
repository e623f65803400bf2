//! Task statistics
//!
//! Completion breakdowns overall and per phase, type, or priority, plus the
//! blocked/unblocked tally. Read-only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BlockerClassifier, Priority, Task, TaskId, TaskStatus};
use crate::engine::query::phase_rank;

/// Width of text progress bars
pub const BAR_WIDTH: usize = 20;

/// Bucket for tasks without a value in the grouped dimension
pub const UNSPECIFIED: &str = "unspecified";

/// Dimension to group statistics by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Phase,
    Type,
    Priority,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Phase => "phase",
            GroupBy::Type => "type",
            GroupBy::Priority => "priority",
        }
    }

    fn key<'a>(&self, task: &'a Task) -> Option<&'a str> {
        match self {
            GroupBy::Phase => task.meta.phase.as_deref(),
            GroupBy::Type => task.meta.task_type.as_deref(),
            GroupBy::Priority => task.meta.priority.map(|p| p.as_str()),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phase" => Ok(GroupBy::Phase),
            "type" => Ok(GroupBy::Type),
            "priority" => Ok(GroupBy::Priority),
            other => Err(format!(
                "unknown grouping '{}' (expected phase, type, priority)",
                other
            )),
        }
    }
}

/// Completion counts for a set of tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    /// Completed share, rounded to one decimal
    pub percentage: f64,
    pub effort_total: u64,
    pub effort_completed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
}

impl Breakdown {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut breakdown = Self::default();
        for task in tasks {
            breakdown.add(task);
        }
        breakdown.percentage = percentage(breakdown.completed, breakdown.total);
        breakdown
    }

    fn add(&mut self, task: &Task) {
        self.total += 1;
        let effort = u64::from(task.meta.effort.unwrap_or(0));
        self.effort_total = self.effort_total.saturating_add(effort);
        match task.status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => {
                self.completed += 1;
                self.effort_completed = self.effort_completed.saturating_add(effort);
            }
        }
    }

    /// Text bar such as `[##########----------]`
    pub fn bar(&self) -> String {
        let filled = ((self.percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
    }
}

/// Completed share of `total` as a percentage with one decimal
pub fn percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 * 1000.0 / total as f64).round() / 10.0
}

/// One bucket of a grouping
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub key: String,
    #[serde(flatten)]
    pub breakdown: Breakdown,
}

/// Breakdowns for every value of one dimension
#[derive(Debug, Clone, Serialize)]
pub struct Grouping {
    pub by: GroupBy,
    pub groups: Vec<GroupStats>,
}

/// A blocked task and what it waits on
#[derive(Debug, Clone, Serialize)]
pub struct BlockedTask {
    pub id: TaskId,
    pub description: String,
    pub unmet: Vec<TaskId>,
}

/// Blocked vs unblocked open tasks
#[derive(Debug, Clone, Serialize)]
pub struct BlockerSummary {
    pub blocked: usize,
    pub unblocked: usize,
    pub blocked_tasks: Vec<BlockedTask>,
}

/// Statistics request
#[derive(Debug, Clone, Default)]
pub struct StatsRequest {
    pub group_by: Vec<GroupBy>,
    pub include_charts: bool,
}

/// Computed statistics
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub overall: Breakdown,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groupings: Vec<Grouping>,
    pub blockers: BlockerSummary,
    pub generated_at: DateTime<Utc>,
}

/// Computes statistics over effective tasks
pub fn compute(tasks: &[Task], request: &StatsRequest, phase_order: &[String]) -> Statistics {
    let mut overall = Breakdown::from_tasks(tasks);
    if request.include_charts {
        overall.chart = Some(overall.bar());
    }

    let mut seen = Vec::new();
    let groupings = request
        .group_by
        .iter()
        .filter(|by| {
            let first = !seen.contains(*by);
            seen.push(**by);
            first
        })
        .map(|by| group(tasks, *by, request.include_charts, phase_order))
        .collect();

    let classifier = BlockerClassifier::new(tasks);
    let blocked_tasks: Vec<BlockedTask> = classifier
        .blocked(tasks)
        .into_iter()
        .map(|(task, unmet)| BlockedTask {
            id: task.id.clone(),
            description: task.description.clone(),
            unmet,
        })
        .collect();
    let unblocked = classifier.unblocked(tasks).len();

    tracing::debug!(
        total = overall.total,
        completed = overall.completed,
        blocked = blocked_tasks.len(),
        "Computed statistics"
    );

    Statistics {
        overall,
        groupings,
        blockers: BlockerSummary {
            blocked: blocked_tasks.len(),
            unblocked,
            blocked_tasks,
        },
        generated_at: Utc::now(),
    }
}

fn group(tasks: &[Task], by: GroupBy, charts: bool, phase_order: &[String]) -> Grouping {
    let mut buckets: Vec<(Option<&str>, Vec<&Task>)> = Vec::new();
    for task in tasks {
        let key = by.key(task);
        let existing = buckets.iter_mut().find(|(k, _)| match (k, key) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        });
        match existing {
            Some((_, members)) => members.push(task),
            None => buckets.push((key, vec![task])),
        }
    }

    buckets.sort_by_key(|(key, _)| sort_key(by, *key, phase_order));

    let groups = buckets
        .into_iter()
        .map(|(key, members)| {
            let mut breakdown = Breakdown::from_tasks(members);
            if charts {
                breakdown.chart = Some(breakdown.bar());
            }
            GroupStats {
                key: key.unwrap_or(UNSPECIFIED).to_string(),
                breakdown,
            }
        })
        .collect();

    Grouping { by, groups }
}

/// Phases in phase order, priorities high to low, types alphabetically;
/// the unspecified bucket always last
fn sort_key(by: GroupBy, key: Option<&str>, phase_order: &[String]) -> (usize, String) {
    let lower = key.map(str::to_lowercase).unwrap_or_default();
    let rank = match (by, key) {
        (_, None) => usize::MAX,
        (GroupBy::Phase, Some(_)) => phase_rank(key, phase_order),
        (GroupBy::Priority, Some(p)) => p
            .parse::<Priority>()
            .map(|p| usize::from(Priority::bucket(Some(p))))
            .unwrap_or(usize::MAX - 1),
        (GroupBy::Type, Some(_)) => 0,
    };
    (rank, lower)
}
