//! Blocked/unblocked classification
//!
//! A task is unblocked when it is open and every declared dependency is in
//! the completion set. Dependencies on IDs missing from the document count
//! as unmet, so a broken link keeps a task blocked instead of being ignored.

use std::collections::HashMap;

use serde::Serialize;

use super::id::TaskId;
use super::task::{Task, TaskStatus};

/// Readiness of a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    Completed,
    Unblocked,
    Blocked { unmet: Vec<TaskId> },
}

impl Readiness {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Readiness::Blocked { .. })
    }

    pub fn is_unblocked(&self) -> bool {
        matches!(self, Readiness::Unblocked)
    }

    /// Unmet dependencies (empty unless blocked)
    pub fn unmet(&self) -> &[TaskId] {
        match self {
            Readiness::Blocked { unmet } => unmet,
            _ => &[],
        }
    }
}

/// Classifies tasks against a document's completion set
#[derive(Debug, Clone, Default)]
pub struct BlockerClassifier {
    statuses: HashMap<TaskId, TaskStatus>,
}

impl BlockerClassifier {
    /// Builds the completion set; later occurrences of an ID shadow earlier ones
    pub fn new<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let statuses = tasks
            .into_iter()
            .map(|t| (t.id.clone(), t.status))
            .collect();
        Self { statuses }
    }

    /// Returns true if the ID names a completed task
    pub fn is_complete(&self, task_id: &TaskId) -> bool {
        self.statuses
            .get(task_id)
            .map(|s| s.is_complete())
            .unwrap_or(false)
    }

    pub fn classify(&self, task: &Task) -> Readiness {
        if task.status.is_complete() {
            return Readiness::Completed;
        }

        let unmet = task.unmet_dependencies(&self.statuses);
        if unmet.is_empty() {
            Readiness::Unblocked
        } else {
            Readiness::Blocked { unmet }
        }
    }

    /// Blocked tasks with their unmet dependencies, in input order
    pub fn blocked<'a>(
        &self,
        tasks: impl IntoIterator<Item = &'a Task>,
    ) -> Vec<(&'a Task, Vec<TaskId>)> {
        tasks
            .into_iter()
            .filter_map(|task| match self.classify(task) {
                Readiness::Blocked { unmet } => Some((task, unmet)),
                _ => None,
            })
            .collect()
    }

    /// Unblocked tasks, in input order
    pub fn unblocked<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
        tasks
            .into_iter()
            .filter(|task| self.classify(task).is_unblocked())
            .collect()
    }
}
