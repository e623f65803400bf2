//! Indented dependency tree
//!
//! Roots are visible tasks with no visible or missing prerequisites. Each
//! node's children are the tasks that depend on it:
//!
//! ```text
//! [x] T001: Set up project
//! ├── [~] T002: Build parser
//! │   └── [ ] T004: Wire CLI
//! └── [ ] T003: Write docs
//! ```
//!
//! A task reachable from several parents is expanded at its first
//! occurrence only. Tasks no root reaches (those behind a missing
//! prerequisite) are listed afterwards.

use std::collections::HashSet;

use super::GraphView;
use crate::domain::{Task, TaskId};

const BRANCH: &str = "├── ";
const CORNER: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

pub(super) fn render(view: &GraphView<'_>) -> String {
    let mut out = String::new();
    let mut seen: HashSet<&TaskId> = HashSet::new();

    let roots: Vec<&Task> = view
        .tasks()
        .iter()
        .copied()
        .filter(|&t| view.dependencies(t).is_empty() && view.missing(t).is_empty())
        .collect();

    for root in roots {
        out.push_str(&node_line(view, root));
        out.push('\n');
        seen.insert(&root.id);
        write_dependents(view, root, &mut seen, &mut out);
    }

    let unreachable: Vec<&Task> = view
        .tasks()
        .iter()
        .copied()
        .filter(|t| !seen.contains(&t.id))
        .collect();

    if !unreachable.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Unreachable:\n");
        for task in unreachable {
            out.push_str("  ");
            out.push_str(&node_line(view, task));
            let missing = view.missing(task);
            if !missing.is_empty() {
                let ids: Vec<_> = missing.iter().map(|id| id.to_string()).collect();
                out.push_str(&format!(" (missing: {})", ids.join(", ")));
            }
            out.push('\n');
        }
    }

    out
}

/// Writes the dependents of `root` depth-first without recursion
///
/// `segments` records, per ancestor level below the root, whether siblings
/// follow; it grows and shrinks with `frames`.
fn write_dependents<'a>(
    view: &GraphView<'a>,
    root: &'a Task,
    seen: &mut HashSet<&'a TaskId>,
    out: &mut String,
) {
    let mut segments: Vec<bool> = Vec::new();
    let mut frames: Vec<(Vec<&'a Task>, usize)> = vec![(view.dependents(&root.id), 0)];

    while let Some((children, cursor)) = frames.last_mut() {
        let Some(&child) = children.get(*cursor) else {
            frames.pop();
            segments.pop();
            continue;
        };
        *cursor += 1;
        let is_last = *cursor == children.len();

        for &has_more in &segments {
            out.push_str(if has_more { PIPE } else { SPACE });
        }
        out.push_str(if is_last { CORNER } else { BRANCH });
        out.push_str(&node_line(view, child));

        if !seen.insert(&child.id) {
            out.push_str(" (see above)\n");
            continue;
        }
        out.push('\n');

        segments.push(!is_last);
        frames.push((view.dependents(&child.id), 0));
    }
}

fn node_line(view: &GraphView<'_>, task: &Task) -> String {
    format!("[{}] {}", task.status.marker(), view.label(task))
}

#[cfg(test)]
mod tests {
    use super::super::tests::graph_of;
    use super::super::{render, GraphFormat, RenderOptions};

    fn tree(text: &str, options: &RenderOptions) -> String {
        render(&graph_of(text), GraphFormat::Tree, options).unwrap()
    }

    #[test]
    fn renders_connectors() {
        let out = tree(
            "\
- [x] T001: Set up project
- [~] T002: Build parser (depends: T001)
- [ ] T003: Write docs (depends: T001)
- [ ] T004: Wire CLI (depends: T002)
- [ ] T005: Standalone
",
            &RenderOptions::default(),
        );

        assert_eq!(
            out,
            "\
[x] T001: Set up project
├── [~] T002: Build parser
│   └── [ ] T004: Wire CLI
└── [ ] T003: Write docs
[ ] T005: Standalone
"
        );
    }

    #[test]
    fn shared_dependents_expand_once() {
        let out = tree(
            "\
- [ ] T001: a
- [ ] T002: b
- [ ] T003: c (depends: T001, T002)
- [ ] T004: d (depends: T003)
",
            &RenderOptions::default(),
        );

        assert_eq!(
            out,
            "\
[ ] T001: a
└── [ ] T003: c
    └── [ ] T004: d
[ ] T002: b
└── [ ] T003: c (see above)
"
        );
    }

    #[test]
    fn missing_prerequisites_are_unreachable() {
        let out = tree(
            "- [ ] T001: a\n- [ ] T002: b (depends: T099)\n- [ ] T003: c (depends: T002)\n",
            &RenderOptions::default(),
        );

        assert_eq!(
            out,
            "[ ] T001: a\n\nUnreachable:\n  [ ] T002: b (missing: T099)\n  [ ] T003: c\n"
        );
    }

    #[test]
    fn hidden_completed_dependencies_count_as_satisfied() {
        let out = tree(
            "- [x] T001: a\n- [ ] T002: b (depends: T001)\n",
            &RenderOptions {
                include_completed: false,
                ..RenderOptions::default()
            },
        );

        assert_eq!(out, "[ ] T002: b\n");
    }

    #[test]
    fn deep_chain_renders_on_small_stack() {
        let depth = 2_000;
        let mut text = String::from("- [ ] T1: step\n");
        for n in 2..=depth {
            text.push_str(&format!("- [ ] T{}: step (depends: T{})\n", n, n - 1));
        }
        let graph = graph_of(&text);

        let out = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || render(&graph, GraphFormat::Tree, &RenderOptions::default()).unwrap())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(out.lines().count(), depth);
        let last = out.lines().last().unwrap();
        assert!(last.ends_with(&format!("└── [ ] T{}: step", depth)));
        assert_eq!(last.chars().count(), (depth - 2) * 4 + 4 + format!("[ ] T{}: step", depth).len());
    }

    #[test]
    fn empty_document_renders_nothing() {
        assert_eq!(tree("# nothing here\n", &RenderOptions::default()), "");
    }
}
