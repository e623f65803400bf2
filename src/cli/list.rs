//! List command

use anyhow::Result;

use super::output::Output;
use super::session::Session;
use crate::domain::{BlockerClassifier, Readiness};
use crate::engine::render::truncate_str;

/// Lists every effective task with its readiness
pub fn run(session: &Session, output: &Output, lint: bool) -> Result<()> {
    let document = session.document(output)?;
    let graph = session.graph(&document, output)?;
    let classifier = BlockerClassifier::new(graph.tasks());

    if output.is_json() {
        let tasks: Vec<_> = graph
            .tasks()
            .iter()
            .map(|task| {
                serde_json::json!({
                    "task": task,
                    "readiness": classifier.classify(task),
                })
            })
            .collect();
        let mut data = serde_json::json!({
            "file": document.path(),
            "tasks": tasks,
        });
        if lint {
            let malformed: Vec<_> = document
                .parsed()
                .malformed()
                .map(|l| serde_json::json!({ "line": l.line, "raw": l.raw }))
                .collect();
            data["malformed"] = serde_json::json!(malformed);
        }
        output.data(&data);
        return Ok(());
    }

    let width = session.project().description_width;
    if graph.is_empty() {
        println!("No tasks in {}.", document.path().display());
    } else {
        println!("Tasks ({}):", graph.len());
        println!("{:<8} {:<12} {:<width$} DEPENDS", "ID", "STATUS", "DESCRIPTION");
        println!("{}", "-".repeat(width + 40));
        for task in graph.tasks() {
            let note = match classifier.classify(task) {
                Readiness::Completed => String::new(),
                Readiness::Unblocked => "ready".to_string(),
                Readiness::Blocked { unmet } => {
                    let ids: Vec<_> = unmet.iter().map(|id| id.to_string()).collect();
                    format!("blocked by {}", ids.join(", "))
                }
            };
            println!(
                "{:<8} {:<12} {:<width$} {}",
                task.id.to_string(),
                task.status.as_str(),
                truncate_str(&task.description, width),
                note
            );
        }
    }

    if lint {
        let malformed: Vec<_> = document.parsed().malformed().collect();
        println!();
        if malformed.is_empty() {
            println!("No malformed task lines.");
        } else {
            println!("Malformed task lines ({}):", malformed.len());
            for line in malformed {
                println!("  line {}: {}", line.line, line.raw.trim());
            }
        }
    }

    Ok(())
}
