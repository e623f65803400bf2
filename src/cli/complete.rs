//! Batch completion command

use anyhow::{Context, Result};

use super::output::Output;
use super::session::Session;
use crate::engine::{complete, BatchRequest, Outcome};

/// Marks the targeted tasks completed
pub fn run(
    session: &Session,
    output: &Output,
    targets: Vec<String>,
    strict: bool,
    notes: Option<String>,
) -> Result<()> {
    let path = session.document_path();
    output.verbose_ctx(
        "complete",
        &format!(
            "{} targets, {} mode, document {}",
            targets.len(),
            if strict { "strict" } else { "lenient" },
            path.display()
        ),
    );

    let request = BatchRequest {
        targets,
        strict,
        notes,
    };
    let report = complete(&path, &request, session.project().duplicates)
        .with_context(|| format!("Cannot complete tasks in {}", path.display()))?;

    for warning in &report.warnings {
        output.warn(warning);
    }

    if output.is_json() {
        output.data(&report);
        return Ok(());
    }

    let completed = report.ids(Outcome::Completed);
    if completed.is_empty() {
        println!("No tasks completed.");
    } else {
        println!("Completed ({}): {}", completed.len(), completed.join(", "));
    }

    for item in report.items.iter().filter(|i| i.outcome != Outcome::Completed) {
        let label = match item.outcome {
            Outcome::Skipped => "Skipped",
            _ => "Failed",
        };
        println!(
            "{} {}: {}",
            label,
            item.target,
            item.reason.as_deref().unwrap_or("unknown")
        );
    }

    if let Some(notes) = &report.notes {
        println!("Notes: {}", notes);
    }
    println!("Overall progress: {:.1}%", report.percentage);

    Ok(())
}
