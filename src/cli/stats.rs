//! Statistics command

use anyhow::Result;

use super::output::Output;
use super::session::Session;
use crate::engine::stats::Breakdown;
use crate::engine::{compute_stats, GroupBy, StatsRequest};

/// Shows completion statistics
pub fn run(session: &Session, output: &Output, group_by: Vec<GroupBy>, charts: bool) -> Result<()> {
    let document = session.document(output)?;
    let graph = session.graph(&document, output)?;

    let request = StatsRequest {
        group_by,
        include_charts: charts,
    };
    let stats = compute_stats(graph.tasks(), &request, &session.project().phase_order);

    if output.is_json() {
        output.data(&stats);
        return Ok(());
    }

    println!("Task statistics: {}", document.path().display());
    println!("{}", "=".repeat(40));
    println!();
    print_breakdown("Overall", &stats.overall, 12);

    for grouping in &stats.groupings {
        println!();
        println!("By {}:", grouping.by);
        let label_width = grouping
            .groups
            .iter()
            .map(|g| g.key.len())
            .max()
            .unwrap_or(0)
            .max(12);
        for group in &grouping.groups {
            print_breakdown(&group.key, &group.breakdown, label_width);
        }
    }

    println!();
    println!(
        "Blockers: {} blocked, {} ready",
        stats.blockers.blocked, stats.blockers.unblocked
    );
    for blocked in &stats.blockers.blocked_tasks {
        let unmet: Vec<_> = blocked.unmet.iter().map(|id| id.to_string()).collect();
        println!("  {} waits on {}", blocked.id, unmet.join(", "));
    }

    Ok(())
}

fn print_breakdown(label: &str, breakdown: &Breakdown, label_width: usize) {
    let chart = breakdown
        .chart
        .as_deref()
        .map(|c| format!("{} ", c))
        .unwrap_or_default();
    let mut line = format!(
        "  {:<label_width$} {}{}/{} done ({:.1}%), {} in progress, {} pending",
        label,
        chart,
        breakdown.completed,
        breakdown.total,
        breakdown.percentage,
        breakdown.in_progress,
        breakdown.pending
    );
    if breakdown.effort_total > 0 {
        line.push_str(&format!(
            ", effort {}/{}",
            breakdown.effort_completed, breakdown.effort_total
        ));
    }
    println!("{}", line);
}
