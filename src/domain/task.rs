//! Task domain model
//!
//! Tasks are the checklist items of a task list document. Each carries a
//! status, a free-text description, and optional metadata parsed from a
//! trailing `(key: value, ...)` block.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::id::TaskId;

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Maps a checklist status character to a status
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            ' ' => Some(TaskStatus::Pending),
            'x' | 'X' => Some(TaskStatus::Completed),
            '~' | '-' | '/' => Some(TaskStatus::InProgress),
            _ => None,
        }
    }

    /// Canonical checklist character for this status
    pub fn marker(&self) -> char {
        match self {
            TaskStatus::Pending => ' ',
            TaskStatus::InProgress => '~',
            TaskStatus::Completed => 'x',
        }
    }

    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" | "todo" => Ok(TaskStatus::Pending),
            "in_progress" | "active" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!(
                "unknown status '{}' (expected pending, in_progress, completed)",
                other
            )),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort bucket; an unspecified priority counts as medium
    pub fn bucket(priority: Option<Priority>) -> u8 {
        match priority.unwrap_or(Priority::Medium) {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!(
                "unknown priority '{}' (expected high, medium, low)",
                other
            )),
        }
    }
}

/// Optional metadata from a task's trailing `( ... )` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    /// Declared dependencies, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<TaskId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TaskMeta {
    /// Returns true if no metadata key was recognized
    pub fn is_empty(&self) -> bool {
        self.phase.is_none()
            && self.task_type.is_none()
            && self.depends.is_empty()
            && self.priority.is_none()
            && self.effort.is_none()
            && self.tags.is_empty()
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Renders the metadata block contents (`phase: setup, depends: T001`)
    pub fn to_block(&self) -> String {
        let mut parts = Vec::new();
        if let Some(phase) = &self.phase {
            parts.push(format!("phase: {}", phase));
        }
        if let Some(task_type) = &self.task_type {
            parts.push(format!("type: {}", task_type));
        }
        if !self.depends.is_empty() {
            let deps: Vec<_> = self.depends.iter().map(|d| d.to_string()).collect();
            parts.push(format!("depends: {}", deps.join(" ")));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("priority: {}", priority));
        }
        if let Some(effort) = self.effort {
            parts.push(format!("effort: {}", effort));
        }
        if !self.tags.is_empty() {
            parts.push(format!("tags: {}", self.tags.join(" ")));
        }
        parts.join(", ")
    }
}

/// A task parsed from one checklist line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "TaskMeta::is_empty")]
    pub meta: TaskMeta,

    /// 1-based source line number
    pub line: usize,

    /// Status character as written in the document
    #[serde(skip)]
    pub marker: char,

    /// Byte offset of the status character within its line
    #[serde(skip)]
    pub marker_offset: usize,
}

impl Task {
    /// Creates a new pending task not yet tied to a document line
    pub fn new(id: TaskId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            meta: TaskMeta::default(),
            line: 0,
            marker: TaskStatus::Pending.marker(),
            marker_offset: 0,
        }
    }

    /// Sets the status, keeping the marker consistent
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self.marker = status.marker();
        self
    }

    /// Adds a dependency on another task
    pub fn depends_on(mut self, task_id: TaskId) -> Self {
        if !self.meta.depends.contains(&task_id) {
            self.meta.depends.push(task_id);
        }
        self
    }

    /// Declared dependencies that are not in the completion set, in declared order
    ///
    /// Dependencies on IDs absent from the document are never complete.
    pub fn unmet_dependencies(&self, statuses: &HashMap<TaskId, TaskStatus>) -> Vec<TaskId> {
        self.meta
            .depends
            .iter()
            .filter(|dep| {
                !statuses
                    .get(*dep)
                    .map(|s| s.is_complete())
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Formats the task as a checklist line
    pub fn to_checklist_line(&self) -> String {
        let mut line = format!("- [{}] {}: {}", self.marker, self.id, self.description);
        if !self.meta.is_empty() {
            line.push_str(&format!(" ({})", self.meta.to_block()));
        }
        line
    }
}
