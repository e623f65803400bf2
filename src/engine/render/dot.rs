//! Graphviz DOT output

use std::fmt::Write;

use super::GraphView;
use crate::domain::{Task, TaskStatus};

fn fill_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "#f5f5f5",
        TaskStatus::InProgress => "#fff3cd",
        TaskStatus::Completed => "#d4edda",
    }
}

pub(super) fn render(view: &GraphView<'_>) -> String {
    let mut out = String::from("digraph tasks {\n");
    out.push_str("    rankdir=LR;\n");
    out.push_str("    node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];\n");

    if view.options.group_by_phase {
        for (idx, (phase, tasks)) in view.phase_groups().into_iter().enumerate() {
            match phase {
                Some(phase) => {
                    let _ = writeln!(out, "\n    subgraph cluster_{} {{", idx);
                    let _ = writeln!(out, "        label=\"{}\";", escape(phase));
                    out.push_str("        style=dashed;\n");
                    for task in tasks {
                        write_node(&mut out, view, task, "        ");
                    }
                    out.push_str("    }\n");
                }
                None => {
                    out.push('\n');
                    for task in tasks {
                        write_node(&mut out, view, task, "    ");
                    }
                }
            }
        }
    } else {
        out.push('\n');
        for task in view.tasks() {
            write_node(&mut out, view, task, "    ");
        }
    }

    let missing = view.missing_nodes();
    if !missing.is_empty() {
        out.push('\n');
        for id in missing {
            let _ = writeln!(
                out,
                "    \"{}\" [label=\"{} (missing)\", style=\"rounded,dashed\", color=\"#dc3545\"];",
                id, id
            );
        }
    }

    out.push('\n');
    for task in view.tasks() {
        for dep in view.dependencies(task) {
            let _ = writeln!(out, "    \"{}\" -> \"{}\";", dep, task.id);
        }
        for dep in view.missing(task) {
            let _ = writeln!(out, "    \"{}\" -> \"{}\" [style=dashed];", dep, task.id);
        }
    }

    out.push_str("}\n");
    out
}

fn write_node(out: &mut String, view: &GraphView<'_>, task: &Task, indent: &str) {
    let _ = writeln!(
        out,
        "{}\"{}\" [label=\"{}\", fillcolor=\"{}\"];",
        indent,
        task.id,
        escape(&view.label(task)),
        fill_color(task.status)
    );
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
