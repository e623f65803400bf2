//! Mermaid flowchart output

use std::fmt::Write;

use super::{slug, status_class, GraphView};
use crate::domain::Task;

const CLASS_DEFS: &[(&str, &str)] = &[
    ("pending", "fill:#f5f5f5,stroke:#999999"),
    ("in_progress", "fill:#fff3cd,stroke:#d39e00"),
    ("completed", "fill:#d4edda,stroke:#28a745"),
    ("missing", "fill:#ffffff,stroke:#dc3545,stroke-dasharray:5 5"),
];

pub(super) fn render(view: &GraphView<'_>) -> String {
    let mut out = String::from("flowchart LR\n");

    if view.options.group_by_phase {
        for (phase, tasks) in view.phase_groups() {
            match phase {
                Some(phase) => {
                    let _ = writeln!(
                        out,
                        "    subgraph phase_{}[\"{}\"]",
                        slug(phase),
                        escape(phase)
                    );
                    for task in tasks {
                        write_node(&mut out, view, task, "        ");
                    }
                    out.push_str("    end\n");
                }
                None => {
                    for task in tasks {
                        write_node(&mut out, view, task, "    ");
                    }
                }
            }
        }
    } else {
        for task in view.tasks() {
            write_node(&mut out, view, task, "    ");
        }
    }

    for missing in view.missing_nodes() {
        let _ = writeln!(out, "    {}[\"{} (missing)\"]:::missing", missing, missing);
    }

    for task in view.tasks() {
        for dep in view.dependencies(task) {
            let _ = writeln!(out, "    {} --> {}", dep, task.id);
        }
        for dep in view.missing(task) {
            let _ = writeln!(out, "    {} -.-> {}", dep, task.id);
        }
    }

    for (class, style) in CLASS_DEFS {
        let _ = writeln!(out, "    classDef {} {}", class, style);
    }

    out
}

fn write_node(out: &mut String, view: &GraphView<'_>, task: &Task, indent: &str) {
    let _ = writeln!(
        out,
        "{}{}[\"{}\"]:::{}",
        indent,
        task.id,
        escape(&view.label(task)),
        status_class(task)
    );
}

/// Mermaid labels are quoted; quotes inside become entity codes
fn escape(text: &str) -> String {
    text.replace('"', "#quot;")
}
