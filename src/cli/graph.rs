//! Graph rendering command

use anyhow::{Context, Result};

use super::output::Output;
use super::session::Session;
use crate::engine::{render, GraphFormat, RenderOptions};

pub struct GraphArgs {
    pub kind: GraphFormat,
    pub include_completed: bool,
    pub group_by_phase: bool,
    pub width: Option<usize>,
}

/// Renders the dependency graph in the requested format
pub fn run(session: &Session, output: &Output, args: GraphArgs) -> Result<()> {
    let document = session.document(output)?;
    let graph = session.graph(&document, output)?;

    let project = session.project();
    let options = RenderOptions {
        include_completed: args.include_completed,
        group_by_phase: args.group_by_phase,
        description_width: args.width.unwrap_or(project.description_width),
        phase_order: project.phase_order.clone(),
    };
    output.verbose_ctx(
        "graph",
        &format!(
            "Rendering {} (completed: {}, phases: {})",
            args.kind, options.include_completed, options.group_by_phase
        ),
    );

    let rendered = render(&graph, args.kind, &options)
        .with_context(|| format!("Cannot render {} graph", args.kind))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "format": args.kind.as_str(),
            "content": rendered,
        }));
    } else {
        print!("{}", rendered);
        if !rendered.is_empty() && !rendered.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
