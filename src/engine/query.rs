//! Task filtering and sorting
//!
//! A [`TaskQuery`] combines conjunctive predicates ([`TaskFilter`]), a
//! [`SortOrder`], an optional result limit, and an optional [`Preset`]
//! supplying defaults for whichever of those the caller leaves unset.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{
    BlockerClassifier, DependencyGraph, GraphError, Priority, Readiness, Task, TaskId, TaskStatus,
};

/// Default phase order for sorting and grouping
pub const CANONICAL_PHASES: &[&str] = &[
    "setup",
    "foundational",
    "core",
    "integration",
    "testing",
    "polish",
];

/// Sort bucket for a phase
///
/// Known phases rank by their position in `order` (case-insensitive),
/// unknown phases rank after all known ones, and no phase ranks last.
pub fn phase_rank(phase: Option<&str>, order: &[String]) -> usize {
    match phase {
        Some(phase) => order
            .iter()
            .position(|p| p.eq_ignore_ascii_case(phase))
            .unwrap_or(order.len()),
        None => order.len() + 1,
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Identifier order
    #[default]
    Id,
    /// High, medium (or unspecified), low
    Priority,
    /// Topological: prerequisites before dependents
    Dependency,
    /// Canonical phase order
    Phase,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Id => "id",
            SortOrder::Priority => "priority",
            SortOrder::Dependency => "dependency",
            SortOrder::Phase => "phase",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(SortOrder::Id),
            "priority" => Ok(SortOrder::Priority),
            "dependency" | "dependencies" | "topological" => Ok(SortOrder::Dependency),
            "phase" => Ok(SortOrder::Phase),
            other => Err(format!(
                "unknown sort order '{}' (expected id, priority, dependency, phase)",
                other
            )),
        }
    }
}

/// Blocked/unblocked predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    Blocked,
    Unblocked,
}

/// Named filter/sort combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Pending and unblocked, by priority
    Ready,
    /// Blocked, by identifier
    Blocked,
    /// In progress, by identifier
    InProgress,
    /// High priority and not completed, in dependency order
    HighPriority,
    /// Everything not completed, in dependency order
    Remaining,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Ready,
        Preset::Blocked,
        Preset::InProgress,
        Preset::HighPriority,
        Preset::Remaining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ready => "ready",
            Preset::Blocked => "blocked",
            Preset::InProgress => "in-progress",
            Preset::HighPriority => "high-priority",
            Preset::Remaining => "remaining",
        }
    }

    /// The filter and sort this preset stands for
    pub fn defaults(&self) -> (TaskFilter, SortOrder) {
        let open = vec![TaskStatus::Pending, TaskStatus::InProgress];
        match self {
            Preset::Ready => (
                TaskFilter {
                    statuses: vec![TaskStatus::Pending],
                    block_state: Some(BlockState::Unblocked),
                    ..TaskFilter::default()
                },
                SortOrder::Priority,
            ),
            Preset::Blocked => (
                TaskFilter {
                    block_state: Some(BlockState::Blocked),
                    ..TaskFilter::default()
                },
                SortOrder::Id,
            ),
            Preset::InProgress => (
                TaskFilter {
                    statuses: vec![TaskStatus::InProgress],
                    ..TaskFilter::default()
                },
                SortOrder::Id,
            ),
            Preset::HighPriority => (
                TaskFilter {
                    statuses: open,
                    priority: Some(Priority::High),
                    ..TaskFilter::default()
                },
                SortOrder::Dependency,
            ),
            Preset::Remaining => (
                TaskFilter {
                    statuses: open,
                    ..TaskFilter::default()
                },
                SortOrder::Dependency,
            ),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = Preset::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown preset '{}' (expected {})", s.trim(), names.join(", "))
            })
    }
}

/// Conjunctive task predicates; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskFilter {
    /// Any of these statuses
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<TaskStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// All of these tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_state: Option<BlockState>,
}

impl TaskFilter {
    /// Returns true if the task satisfies every set predicate
    pub fn matches(&self, task: &Task, readiness: &Readiness) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if let Some(phase) = &self.phase {
            if !eq_opt(task.meta.phase.as_deref(), phase) {
                return false;
            }
        }
        if let Some(task_type) = &self.task_type {
            if !eq_opt(task.meta.task_type.as_deref(), task_type) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.meta.priority != Some(priority) {
                return false;
            }
        }
        if !self.tags.iter().all(|tag| task.meta.has_tag(tag)) {
            return false;
        }
        match self.block_state {
            Some(BlockState::Blocked) => readiness.is_blocked(),
            Some(BlockState::Unblocked) => readiness.is_unblocked(),
            None => true,
        }
    }

    /// Fills every unset predicate from `defaults`
    fn or(self, defaults: TaskFilter) -> TaskFilter {
        TaskFilter {
            statuses: if self.statuses.is_empty() {
                defaults.statuses
            } else {
                self.statuses
            },
            phase: self.phase.or(defaults.phase),
            task_type: self.task_type.or(defaults.task_type),
            priority: self.priority.or(defaults.priority),
            tags: if self.tags.is_empty() {
                defaults.tags
            } else {
                self.tags
            },
            block_state: self.block_state.or(defaults.block_state),
        }
    }
}

fn eq_opt(value: Option<&str>, wanted: &str) -> bool {
    value.map(|v| v.eq_ignore_ascii_case(wanted)).unwrap_or(false)
}

/// A filter request
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
    pub preset: Option<Preset>,
}

impl TaskQuery {
    /// Explicit parameters layered over the preset's defaults
    pub fn resolve(&self) -> (TaskFilter, SortOrder) {
        let (defaults, default_sort) = match self.preset {
            Some(preset) => preset.defaults(),
            None => (TaskFilter::default(), SortOrder::default()),
        };
        (
            self.filter.clone().or(defaults),
            self.sort.unwrap_or(default_sort),
        )
    }
}

/// One matched task
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    #[serde(flatten)]
    pub task: Task,

    /// Unmet dependencies, for blocked tasks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<TaskId>,
}

/// Filtered and sorted tasks
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    pub filter: TaskFilter,
    pub sort: SortOrder,
    /// Matches before the limit was applied
    pub total_matched: usize,
    pub tasks: Vec<QueryHit>,
}

/// Runs a query against the graph's effective tasks
///
/// Only dependency-order sorting can fail, and only on a cyclic graph.
pub fn run_query(
    graph: &DependencyGraph,
    query: &TaskQuery,
    phase_order: &[String],
) -> Result<QueryResult, GraphError> {
    let (filter, sort) = query.resolve();
    let classifier = BlockerClassifier::new(graph.tasks());

    let mut hits: Vec<QueryHit> = graph
        .tasks()
        .iter()
        .filter_map(|task| {
            let readiness = classifier.classify(task);
            filter.matches(task, &readiness).then(|| QueryHit {
                task: task.clone(),
                blocked_by: readiness.unmet().to_vec(),
            })
        })
        .collect();

    sort_hits(&mut hits, sort, graph, phase_order)?;

    let total_matched = hits.len();
    if let Some(limit) = query.limit {
        hits.truncate(limit);
    }

    tracing::debug!(
        matched = total_matched,
        returned = hits.len(),
        sort = %sort,
        "Filtered tasks"
    );

    Ok(QueryResult {
        preset: query.preset,
        filter,
        sort,
        total_matched,
        tasks: hits,
    })
}

fn sort_hits(
    hits: &mut [QueryHit],
    sort: SortOrder,
    graph: &DependencyGraph,
    phase_order: &[String],
) -> Result<(), GraphError> {
    let by_id = |a: &QueryHit, b: &QueryHit| a.task.id.cmp(&b.task.id);

    match sort {
        SortOrder::Id => hits.sort_by(by_id),
        SortOrder::Priority => hits.sort_by(|a, b| {
            Priority::bucket(a.task.meta.priority)
                .cmp(&Priority::bucket(b.task.meta.priority))
                .then_with(|| by_id(a, b))
        }),
        SortOrder::Phase => hits.sort_by(|a, b| {
            compare_phase(&a.task, &b.task, phase_order).then_with(|| by_id(a, b))
        }),
        SortOrder::Dependency => {
            let positions = graph.topological_positions()?;
            hits.sort_by_key(|hit| positions.get(&hit.task.id).copied().unwrap_or(usize::MAX));
        }
    }
    Ok(())
}

fn compare_phase(a: &Task, b: &Task, phase_order: &[String]) -> Ordering {
    let a_phase = a.meta.phase.as_deref();
    let b_phase = b.meta.phase.as_deref();
    phase_rank(a_phase, phase_order)
        .cmp(&phase_rank(b_phase, phase_order))
        .then_with(|| {
            let a_lower = a_phase.map(str::to_lowercase);
            let b_lower = b_phase.map(str::to_lowercase);
            a_lower.cmp(&b_lower)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_document;

    const DOC: &str = "\
- [x] T001: Set up project (phase: setup, priority: high)
- [ ] T002: Build parser (phase: core, depends: T001, priority: low, tags: parser)
- [ ] T003: Wire CLI (phase: core, depends: T002, tags: cli, api)
- [~] T004: Write docs (phase: polish, priority: high, tags: docs)
- [ ] T005: Add auth (phase: integration, priority: high, tags: API)
- [ ] T006: Migrate (phase: custom, depends: T009)
";

    fn graph() -> DependencyGraph {
        DependencyGraph::from_tasks(parse_document(DOC).tasks()).unwrap()
    }

    fn phases() -> Vec<String> {
        CANONICAL_PHASES.iter().map(|p| p.to_string()).collect()
    }

    fn ids(result: &QueryResult) -> Vec<String> {
        result.tasks.iter().map(|h| h.task.id.to_string()).collect()
    }

    fn run(query: TaskQuery) -> QueryResult {
        run_query(&graph(), &query, &phases()).unwrap()
    }

    #[test]
    fn empty_query_returns_everything_by_id() {
        let result = run(TaskQuery::default());
        assert_eq!(result.total_matched, 6);
        assert_eq!(ids(&result)[0], "T001");
    }

    #[test]
    fn status_and_blocked_predicates() {
        let result = run(TaskQuery {
            filter: TaskFilter {
                statuses: vec![TaskStatus::Pending],
                block_state: Some(BlockState::Unblocked),
                ..TaskFilter::default()
            },
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T002", "T005"]);

        let result = run(TaskQuery {
            filter: TaskFilter {
                block_state: Some(BlockState::Blocked),
                ..TaskFilter::default()
            },
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T003", "T006"]);
        assert_eq!(result.tasks[1].blocked_by, vec![TaskId::new("T", 9, 3)]);
    }

    #[test]
    fn tags_are_conjunctive_and_case_insensitive() {
        let result = run(TaskQuery {
            filter: TaskFilter {
                tags: vec!["api".to_string()],
                ..TaskFilter::default()
            },
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T003", "T005"]);

        let result = run(TaskQuery {
            filter: TaskFilter {
                tags: vec!["api".to_string(), "cli".to_string()],
                ..TaskFilter::default()
            },
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T003"]);
    }

    #[test]
    fn phase_and_type_match_case_insensitively() {
        let result = run(TaskQuery {
            filter: TaskFilter {
                phase: Some("CORE".to_string()),
                ..TaskFilter::default()
            },
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T002", "T003"]);
    }

    #[test]
    fn priority_sort_treats_unspecified_as_medium() {
        let result = run(TaskQuery {
            sort: Some(SortOrder::Priority),
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T001", "T004", "T005", "T003", "T006", "T002"]);
    }

    #[test]
    fn phase_sort_puts_unknown_phases_last() {
        let result = run(TaskQuery {
            sort: Some(SortOrder::Phase),
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T001", "T002", "T003", "T005", "T004", "T006"]);
    }

    #[test]
    fn dependency_sort_is_topological() {
        let result = run(TaskQuery {
            sort: Some(SortOrder::Dependency),
            ..TaskQuery::default()
        });
        let order = ids(&result);
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert!(pos("T001") < pos("T002"));
        assert!(pos("T002") < pos("T003"));
    }

    #[test]
    fn dependency_sort_fails_on_cycle() {
        let graph = DependencyGraph::from_tasks(
            parse_document("- [ ] T1: a (depends: T2)\n- [ ] T2: b (depends: T1)\n").tasks(),
        )
        .unwrap();
        let query = TaskQuery {
            sort: Some(SortOrder::Dependency),
            ..TaskQuery::default()
        };

        assert!(matches!(
            run_query(&graph, &query, &phases()),
            Err(GraphError::CycleDetected(_))
        ));

        // other sorts never look at the topology
        let result = run_query(&graph, &TaskQuery::default(), &phases()).unwrap();
        assert_eq!(result.total_matched, 2);
    }

    #[test]
    fn limit_applies_after_sort() {
        let result = run(TaskQuery {
            sort: Some(SortOrder::Priority),
            limit: Some(2),
            ..TaskQuery::default()
        });
        assert_eq!(ids(&result), vec!["T001", "T004"]);
        assert_eq!(result.total_matched, 6);
    }

    #[test]
    fn presets_expand_to_defaults() {
        let ready = run(TaskQuery {
            preset: Some(Preset::Ready),
            ..TaskQuery::default()
        });
        assert_eq!(ready.sort, SortOrder::Priority);
        assert_eq!(ids(&ready), vec!["T005", "T002"]);

        let high = run(TaskQuery {
            preset: Some(Preset::HighPriority),
            ..TaskQuery::default()
        });
        assert_eq!(high.sort, SortOrder::Dependency);
        let mut high_ids = ids(&high);
        high_ids.sort();
        assert_eq!(high_ids, vec!["T004", "T005"]);
    }

    #[test]
    fn explicit_parameters_override_preset() {
        let result = run(TaskQuery {
            preset: Some(Preset::Remaining),
            sort: Some(SortOrder::Id),
            filter: TaskFilter {
                phase: Some("core".to_string()),
                ..TaskFilter::default()
            },
            ..TaskQuery::default()
        });
        assert_eq!(result.sort, SortOrder::Id);
        assert_eq!(ids(&result), vec!["T002", "T003"]);
    }

    #[test]
    fn preset_names() {
        assert_eq!("in_progress".parse::<Preset>(), Ok(Preset::InProgress));
        assert_eq!("High-Priority".parse::<Preset>(), Ok(Preset::HighPriority));
        assert!("soon".parse::<Preset>().is_err());
    }

    #[test]
    fn phase_rank_orders_known_unknown_none() {
        let order = phases();
        assert_eq!(phase_rank(Some("Setup"), &order), 0);
        assert!(phase_rank(Some("polish"), &order) < phase_rank(Some("misc"), &order));
        assert!(phase_rank(Some("misc"), &order) < phase_rank(None, &order));
    }

    #[test]
    fn ready_set_only_loses_tasks_that_complete() {
        let ready = |text: &str| -> Vec<String> {
            let graph = DependencyGraph::from_tasks(parse_document(text).tasks()).unwrap();
            let query = TaskQuery {
                preset: Some(Preset::Ready),
                ..TaskQuery::default()
            };
            ids(&run_query(&graph, &query, &phases()).unwrap())
        };

        let before = ready(DOC);
        let after = ready(&DOC.replace("- [ ] T002", "- [x] T002"));

        for id in &before {
            assert!(id == "T002" || after.contains(id), "{} dropped out", id);
        }
        assert!(after.contains(&"T003".to_string()));
    }
}
