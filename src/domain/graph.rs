//! Dependency graph for tasks
//!
//! Builds a directed graph from parsed tasks with cycle detection and
//! topological ordering. Uses petgraph for graph storage and traversal.
//!
//! Edge direction is dependent -> prerequisite: an edge `A -> B` means
//! "A depends on B". Dependencies naming IDs absent from the document are
//! dangling; they are recorded but never become nodes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsPostOrder, VisitMap};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::TaskId;
use super::task::Task;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Dependency cycle detected: {0}")]
    CycleDetected(CycleReport),

    #[error("Duplicate task ID {id} (lines {first_line} and {second_line})")]
    DuplicateTask {
        id: TaskId,
        first_line: usize,
        second_line: usize,
    },
}

/// How repeated task IDs are handled when building the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The last occurrence shadows earlier ones
    #[default]
    LastWins,
    /// Any repeated ID fails graph construction
    Reject,
}

/// Tasks implicated in dependency cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Every task that lies on a cycle, in document order
    pub tasks: Vec<TaskId>,
    /// Cycle paths found by the traversal, each closed on its first task
    pub cycles: Vec<Vec<TaskId>>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tasks: Vec<_> = self.tasks.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", tasks.join(", "))?;
        if !self.cycles.is_empty() {
            let paths: Vec<_> = self
                .cycles
                .iter()
                .map(|path| {
                    path.iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                })
                .collect();
            write!(f, " ({})", paths.join("; "))?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// A dependency graph for tasks
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<TaskId, ()>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,

    /// Effective tasks (after duplicate handling), in document order
    tasks: Vec<Task>,

    /// (dependent, missing prerequisite) pairs
    dangling: Vec<(TaskId, TaskId)>,
}

impl DependencyGraph {
    /// Builds a graph using the default duplicate policy
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<Self, GraphError> {
        Self::build(tasks, DuplicatePolicy::default())
    }

    /// Builds a graph from tasks in document order
    pub fn build<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        policy: DuplicatePolicy,
    ) -> Result<Self, GraphError> {
        let tasks: Vec<&Task> = tasks.into_iter().collect();

        let mut last_index: HashMap<&TaskId, usize> = HashMap::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            if let Some(prev) = last_index.insert(&task.id, idx) {
                if policy == DuplicatePolicy::Reject {
                    return Err(GraphError::DuplicateTask {
                        id: task.id.clone(),
                        first_line: tasks[prev].line,
                        second_line: task.line,
                    });
                }
                tracing::debug!(id = %task.id, line = task.line, "Duplicate task ID shadows earlier line");
            }
        }

        let effective: Vec<Task> = tasks
            .iter()
            .enumerate()
            .filter(|(idx, task)| last_index.get(&task.id) == Some(idx))
            .map(|(_, task)| Task::clone(task))
            .collect();

        let mut graph = Self {
            graph: DiGraph::with_capacity(effective.len(), effective.len()),
            node_map: HashMap::with_capacity(effective.len()),
            tasks: Vec::new(),
            dangling: Vec::new(),
        };

        // First pass: add all nodes
        for task in &effective {
            let idx = graph.graph.add_node(task.id.clone());
            graph.node_map.insert(task.id.clone(), idx);
        }

        // Second pass: add all edges
        for task in &effective {
            let from = graph.node_map[&task.id];
            for dep in &task.meta.depends {
                match graph.node_map.get(dep) {
                    Some(&to) => {
                        graph.graph.update_edge(from, to, ());
                    }
                    None => {
                        tracing::debug!(task = %task.id, missing = %dep, "Dangling dependency");
                        graph.dangling.push((task.id.clone(), dep.clone()));
                    }
                }
            }
        }

        graph.tasks = effective;
        Ok(graph)
    }

    /// Effective tasks in document order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task by ID
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.node_map
            .get(task_id)
            .map(|idx| &self.tasks[idx.index()])
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.node_map.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Dependencies that name no task in the document
    pub fn dangling(&self) -> &[(TaskId, TaskId)] {
        &self.dangling
    }

    /// Returns the direct in-document dependencies of a task, in declared order
    pub fn dependencies(&self, task_id: &TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    /// Returns the direct dependents of a task (tasks that depend on it)
    pub fn dependents(&self, task_id: &TaskId) -> Vec<TaskId> {
        let mut dependents = self.neighbors(task_id, Direction::Incoming);
        dependents.sort_by_key(|id| self.node_map[id].index());
        dependents
    }

    fn neighbors(&self, task_id: &TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&idx) = self.node_map.get(task_id) else {
            return vec![];
        };

        // petgraph yields the most recently added edge first
        let mut ids: Vec<TaskId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        ids.reverse();
        ids
    }

    /// Finds every task implicated in a dependency cycle
    ///
    /// A depth-first traversal with a recursion stack records a cycle path
    /// for each back edge. Strongly connected components then complete the
    /// implicated set: a task can sit on a cycle that the traversal only
    /// reaches through an already finished node.
    pub fn detect_cycles(&self) -> Option<CycleReport> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut cycles: Vec<Vec<TaskId>> = Vec::new();

        for start in self.graph.node_indices() {
            if marks[start.index()] == Mark::Unvisited {
                self.visit(start, &mut marks, &mut cycles);
            }
        }

        if cycles.is_empty() {
            return None;
        }

        let mut implicated: HashSet<NodeIndex> = HashSet::new();
        for component in tarjan_scc(&self.graph) {
            let cyclic = component.len() > 1
                || self.graph.find_edge(component[0], component[0]).is_some();
            if cyclic {
                implicated.extend(component);
            }
        }

        let mut tasks: Vec<NodeIndex> = implicated.into_iter().collect();
        tasks.sort_by_key(|idx| idx.index());

        Some(CycleReport {
            tasks: tasks.into_iter().map(|idx| self.graph[idx].clone()).collect(),
            cycles,
        })
    }

    /// Iterative depth-first walk from `start`; each frame keeps its own
    /// neighbour cursor so long dependency chains cannot exhaust the stack
    fn visit(&self, start: NodeIndex, marks: &mut [Mark], cycles: &mut Vec<Vec<TaskId>>) {
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut frames: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

        marks[start.index()] = Mark::OnStack;
        path.push(start);
        frames.push((start, self.ordered_neighbors(start), 0));

        while let Some((node, next, cursor)) = frames.last_mut() {
            let Some(&dep) = next.get(*cursor) else {
                marks[node.index()] = Mark::Done;
                path.pop();
                frames.pop();
                continue;
            };
            *cursor += 1;

            match marks[dep.index()] {
                Mark::Unvisited => {
                    marks[dep.index()] = Mark::OnStack;
                    path.push(dep);
                    frames.push((dep, self.ordered_neighbors(dep), 0));
                }
                Mark::OnStack => {
                    let pos = path.iter().position(|n| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<TaskId> =
                        path[pos..].iter().map(|n| self.graph[*n].clone()).collect();
                    cycle.push(self.graph[dep].clone());
                    cycles.push(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    /// Prerequisites in declared order
    fn ordered_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        next.reverse();
        next
    }

    /// Fails with every implicated task if the graph has a cycle
    pub fn ensure_acyclic(&self) -> Result<(), GraphError> {
        match self.detect_cycles() {
            Some(report) => Err(GraphError::CycleDetected(report)),
            None => Ok(()),
        }
    }

    /// Returns all tasks in topological order (dependencies before dependents)
    ///
    /// Post-order depth-first traversal seeded per task in document order,
    /// so the result is deterministic for a given document.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, GraphError> {
        self.ensure_acyclic()?;

        let mut order = Vec::with_capacity(self.len());
        let mut dfs = DfsPostOrder::empty(&self.graph);

        for start in self.graph.node_indices() {
            if dfs.discovered.is_visited(&start) {
                continue;
            }
            dfs.move_to(start);
            while let Some(idx) = dfs.next(&self.graph) {
                order.push(self.graph[idx].clone());
            }
        }

        Ok(order)
    }

    /// Position of each task in topological order
    pub fn topological_positions(&self) -> Result<HashMap<TaskId, usize>, GraphError> {
        Ok(self
            .topological_order()?
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    fn id(n: u64) -> TaskId {
        TaskId::new("T", n, 3)
    }

    fn task(n: u64, deps: &[u64]) -> Task {
        let mut task = Task::new(id(n), format!("Task {}", n));
        task.line = n as usize;
        for d in deps {
            task = task.depends_on(id(*d));
        }
        task
    }

    fn graph(tasks: &[Task]) -> DependencyGraph {
        DependencyGraph::from_tasks(tasks).unwrap()
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::from_tasks(&[]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.topological_order().unwrap(), vec![]);
    }

    #[test]
    fn dependencies_and_dependents() {
        let g = graph(&[task(1, &[]), task(2, &[1]), task(3, &[1, 2])]);

        assert_eq!(g.dependencies(&id(3)), vec![id(1), id(2)]);
        assert_eq!(g.dependents(&id(1)), vec![id(2), id(3)]);
        assert!(g.dependencies(&id(99)).is_empty());
    }

    #[test]
    fn dangling_dependencies_are_recorded_not_errors() {
        let g = graph(&[task(1, &[9]), task(2, &[1])]);

        assert_eq!(g.dangling(), &[(id(1), id(9))]);
        assert!(!g.contains(&id(9)));
        assert!(g.detect_cycles().is_none());
        assert_eq!(g.topological_order().unwrap(), vec![id(1), id(2)]);
    }

    #[test]
    fn no_dependencies_means_no_cycles() {
        let g = graph(&[task(1, &[]), task(2, &[]), task(3, &[])]);
        assert!(g.detect_cycles().is_none());
    }

    #[test]
    fn cycle_detection_names_every_task() {
        // 1 -> 2 -> 3 -> 1, plus 4 depending on the cycle
        let g = graph(&[task(1, &[3]), task(2, &[1]), task(3, &[2]), task(4, &[1])]);

        let report = g.detect_cycles().unwrap();
        assert_eq!(report.tasks, vec![id(1), id(2), id(3)]);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].first(), report.cycles[0].last());
    }

    #[test]
    fn cycle_reached_through_finished_node_is_still_reported() {
        // 1 -> 2 -> 1 and 1 -> 4 -> 2: task 4 is on the cycle 1 -> 4 -> 2 -> 1
        let g = graph(&[task(1, &[2, 4]), task(2, &[1]), task(4, &[2])]);

        let report = g.detect_cycles().unwrap();
        assert_eq!(report.tasks, vec![id(1), id(2), id(4)]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(&[task(1, &[]), task(2, &[2])]);

        let report = g.detect_cycles().unwrap();
        assert_eq!(report.tasks, vec![id(2)]);
        assert_eq!(report.cycles, vec![vec![id(2), id(2)]]);
    }

    #[test]
    fn topological_sort_fails_on_cycle() {
        let g = graph(&[task(1, &[2]), task(2, &[1])]);

        let err = g.topological_order().unwrap_err();
        let GraphError::CycleDetected(report) = &err else {
            panic!("unexpected error: {:?}", err);
        };
        assert_eq!(report.tasks, vec![id(1), id(2)]);
        assert!(err.to_string().contains("T001, T002"));
    }

    #[test]
    fn topological_order() {
        // 3 -> 2 -> 1 (3 depends on 2, 2 depends on 1) listed in reverse
        let g = graph(&[task(3, &[2]), task(2, &[1]), task(1, &[])]);

        let order = g.topological_order().unwrap();
        assert_eq!(order, vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn topological_order_is_deterministic() {
        let tasks = [task(1, &[]), task(2, &[1]), task(3, &[1]), task(4, &[3, 2])];
        let first = graph(&tasks).topological_order().unwrap();
        for _ in 0..5 {
            assert_eq!(graph(&tasks).topological_order().unwrap(), first);
        }
    }

    #[test]
    fn last_duplicate_wins_by_default() {
        let first = task(1, &[]);
        let second = task(1, &[]).with_status(TaskStatus::Completed);
        let g = graph(&[first, task(2, &[1]), second]);

        assert_eq!(g.len(), 2);
        assert_eq!(g.task(&id(1)).unwrap().status, TaskStatus::Completed);
        assert_eq!(g.tasks().iter().map(|t| t.id.clone()).collect::<Vec<_>>(), vec![id(2), id(1)]);
    }

    #[test]
    fn reject_policy_fails_on_duplicate() {
        let mut second = task(1, &[]);
        second.line = 7;
        let result = DependencyGraph::build(&[task(1, &[]), second], DuplicatePolicy::Reject);

        assert_eq!(
            result.unwrap_err(),
            GraphError::DuplicateTask {
                id: id(1),
                first_line: 1,
                second_line: 7
            }
        );
    }

    #[test]
    fn performance_500_tasks() {
        use std::time::Instant;

        let tasks: Vec<_> = (1..=500)
            .map(|n| if n == 1 { task(n, &[]) } else { task(n, &[n - 1]) })
            .collect();

        let start = Instant::now();
        let g = graph(&tasks);
        let order = g.topological_order().unwrap();
        let duration = start.elapsed();

        assert_eq!(order.len(), 500);
        assert!(duration.as_millis() < 200, "Topological sort took {:?}", duration);
    }

    #[test]
    fn deep_chain_does_not_exhaust_stack() {
        let tasks: Vec<_> = (1..=20_000)
            .map(|n| if n == 1 { task(n, &[]) } else { task(n, &[n - 1]) })
            .collect();
        let g = graph(&tasks);

        // Run on a thread sized like a binary's main thread
        let handle = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(move || (g.detect_cycles().is_none(), g.topological_order().map(|o| o.len())))
            .unwrap();
        let (acyclic, order) = handle.join().unwrap();

        assert!(acyclic);
        assert_eq!(order.unwrap(), 20_000);
    }

    #[test]
    fn deep_cycle_is_reported() {
        let mut tasks: Vec<_> = (2..=5_000).map(|n| task(n, &[n - 1])).collect();
        tasks.insert(0, task(1, &[5_000]));
        let g = graph(&tasks);

        let report = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(move || g.detect_cycles())
            .unwrap()
            .join()
            .unwrap()
            .unwrap();

        assert_eq!(report.tasks.len(), 5_000);
        assert_eq!(report.cycles.len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Random DAGs: each task may only depend on lower-numbered tasks
        fn dag() -> impl Strategy<Value = Vec<Task>> {
            (1usize..25).prop_flat_map(|n| {
                prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), n)
                    .prop_map(move |deps| {
                        deps.into_iter()
                            .enumerate()
                            .map(|(i, picks)| {
                                let n = (i + 1) as u64;
                                let deps: Vec<u64> = if i == 0 {
                                    vec![]
                                } else {
                                    picks.iter().map(|p| (p.index(i) + 1) as u64).collect()
                                };
                                task(n, &deps)
                            })
                            .rev()
                            .collect::<Vec<_>>()
                    })
            })
        }

        proptest! {
            #[test]
            fn topological_order_respects_dependencies(tasks in dag()) {
                let g = graph(&tasks);
                let order = g.topological_order().unwrap();

                prop_assert_eq!(order.len(), tasks.len());
                let unique: HashSet<_> = order.iter().collect();
                prop_assert_eq!(unique.len(), tasks.len());

                let pos: HashMap<_, _> = order.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
                for t in &tasks {
                    for dep in &t.meta.depends {
                        prop_assert!(pos[dep] < pos[&t.id]);
                    }
                }
            }

            #[test]
            fn dags_have_no_cycles(tasks in dag()) {
                prop_assert!(graph(&tasks).detect_cycles().is_none());
            }
        }
    }
}
