//! Graph renderers
//!
//! Three textual projections of the dependency graph:
//!
//! | Format | Output |
//! |--------|--------|
//! | [`GraphFormat::Mermaid`] | `flowchart LR` diagram, phase subgraphs |
//! | [`GraphFormat::Dot`] | Graphviz `digraph`, phase clusters |
//! | [`GraphFormat::Tree`] | indented dependency tree with connector glyphs |
//!
//! Every renderer checks for cycles first and fails without producing
//! partial output.

mod dot;
mod mermaid;
mod tree;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{DependencyGraph, GraphError, Task, TaskId};
use crate::engine::query::{phase_rank, CANONICAL_PHASES};

/// Output format for a rendered graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphFormat {
    Mermaid,
    Dot,
    Tree,
}

impl GraphFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphFormat::Mermaid => "mermaid",
            GraphFormat::Dot => "dot",
            GraphFormat::Tree => "tree",
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mermaid" => Ok(GraphFormat::Mermaid),
            "dot" | "graphviz" => Ok(GraphFormat::Dot),
            "tree" | "ascii" => Ok(GraphFormat::Tree),
            other => Err(format!(
                "unknown graph format '{}' (expected mermaid, dot, tree)",
                other
            )),
        }
    }
}

/// Rendering options
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Keep completed tasks in the output
    pub include_completed: bool,

    /// Group nodes by phase (mermaid subgraphs, DOT clusters)
    pub group_by_phase: bool,

    /// Character budget for node descriptions
    pub description_width: usize,

    /// Phase order for grouping
    pub phase_order: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_completed: true,
            group_by_phase: false,
            description_width: 40,
            phase_order: CANONICAL_PHASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Renders the graph in the requested format
pub fn render(
    graph: &DependencyGraph,
    format: GraphFormat,
    options: &RenderOptions,
) -> Result<String, GraphError> {
    graph.ensure_acyclic()?;

    let view = GraphView::new(graph, options);
    let rendered = match format {
        GraphFormat::Mermaid => mermaid::render(&view),
        GraphFormat::Dot => dot::render(&view),
        GraphFormat::Tree => tree::render(&view),
    };

    tracing::debug!(
        format = %format,
        nodes = view.tasks().len(),
        "Rendered dependency graph"
    );
    Ok(rendered)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncate_at = max_len.saturating_sub(3);
        let truncated: String = s.chars().take(truncate_at).collect();
        format!("{}...", truncated)
    }
}

/// The slice of the graph a renderer draws
///
/// Hidden completed tasks disappear entirely; dependencies on them count as
/// satisfied and draw no edge.
struct GraphView<'a> {
    graph: &'a DependencyGraph,
    options: &'a RenderOptions,
    visible: Vec<&'a Task>,
    visible_ids: HashSet<&'a TaskId>,
}

impl<'a> GraphView<'a> {
    fn new(graph: &'a DependencyGraph, options: &'a RenderOptions) -> Self {
        let visible: Vec<&Task> = graph
            .tasks()
            .iter()
            .filter(|t| options.include_completed || !t.status.is_complete())
            .collect();
        let visible_ids = visible.iter().map(|t| &t.id).collect();

        Self {
            graph,
            options,
            visible,
            visible_ids,
        }
    }

    fn tasks(&self) -> &[&'a Task] {
        &self.visible
    }

    fn task(&self, task_id: &TaskId) -> Option<&'a Task> {
        self.graph
            .task(task_id)
            .filter(|t| self.visible_ids.contains(&t.id))
    }

    /// Visible prerequisites of a task, in declared order
    fn dependencies(&self, task: &Task) -> Vec<TaskId> {
        self.graph
            .dependencies(&task.id)
            .into_iter()
            .filter(|id| self.visible_ids.contains(id))
            .collect()
    }

    /// Declared dependencies naming no task in the document
    fn missing(&self, task: &'a Task) -> Vec<&'a TaskId> {
        task.meta
            .depends
            .iter()
            .filter(|dep| !self.graph.contains(dep))
            .collect()
    }

    /// Visible tasks that depend on `task_id`, in document order
    fn dependents(&self, task_id: &TaskId) -> Vec<&'a Task> {
        self.graph
            .dependents(task_id)
            .iter()
            .filter_map(|id| self.task(id))
            .collect()
    }

    /// Missing prerequisites in first-reference order
    fn missing_nodes(&self) -> Vec<&'a TaskId> {
        let mut seen = HashSet::new();
        self.visible
            .iter()
            .flat_map(|&t| self.missing(t))
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn label(&self, task: &Task) -> String {
        format!(
            "{}: {}",
            task.id,
            truncate_str(&task.description, self.options.description_width)
        )
    }

    /// Visible tasks grouped by phase, groups in phase order
    ///
    /// Phases compare case-insensitively; the group takes the spelling of
    /// its first task. Tasks without a phase form the trailing `None` group.
    fn phase_groups(&self) -> Vec<(Option<&'a str>, Vec<&'a Task>)> {
        let mut groups: Vec<(Option<&'a str>, Vec<&'a Task>)> = Vec::new();
        for &task in &self.visible {
            let phase = task.meta.phase.as_deref();
            let existing = groups.iter_mut().find(|(p, _)| match (p, phase) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            });
            match existing {
                Some((_, tasks)) => tasks.push(task),
                None => groups.push((phase, vec![task])),
            }
        }

        groups.sort_by_key(|(phase, _)| {
            (
                phase_rank(*phase, &self.options.phase_order),
                phase.map(str::to_lowercase),
            )
        });
        groups
    }
}

/// Node class for a task status
fn status_class(task: &Task) -> &'static str {
    task.status.as_str()
}

/// Identifier-safe slug for subgraph/cluster names
fn slug(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
