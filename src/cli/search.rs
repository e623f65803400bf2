//! Search command

use anyhow::Result;

use super::output::Output;
use super::session::Session;
use crate::engine::{search, MatchMode, SearchField, SearchRequest};

pub struct SearchArgs {
    pub query: String,
    pub fields: Vec<SearchField>,
    pub mode: MatchMode,
    pub case_sensitive: bool,
    pub threshold: Option<u8>,
    pub limit: Option<usize>,
}

/// Searches the document's tasks
pub fn run(session: &Session, output: &Output, args: SearchArgs) -> Result<()> {
    let document = session.document(output)?;
    let graph = session.graph(&document, output)?;

    let config = &session.project().search;
    let request = SearchRequest {
        query: args.query,
        fields: args.fields,
        mode: args.mode,
        case_sensitive: args.case_sensitive,
        threshold: args.threshold.unwrap_or(config.fuzzy_threshold),
        limit: Some(args.limit.unwrap_or(config.default_limit)),
    };
    output.verbose_ctx(
        "search",
        &format!(
            "Mode {}, threshold {}, limit {}",
            request.mode,
            request.threshold,
            request.effective_limit()
        ),
    );

    let response = search(graph.tasks(), &request)?;

    if response.pattern_fallback {
        output.warn(&format!(
            "'{}' is not a valid pattern; searched it literally",
            response.query
        ));
    }

    if output.is_json() {
        output.data(&response);
        return Ok(());
    }

    if response.hits.is_empty() {
        println!("No tasks match '{}'.", response.query);
        return Ok(());
    }

    if response.hits.len() < response.total_matches {
        println!(
            "Matches for '{}' ({} of {}):",
            response.query,
            response.hits.len(),
            response.total_matches
        );
    } else {
        println!("Matches for '{}' ({}):", response.query, response.hits.len());
    }
    println!("{:<8} {:>5} {:<12} {:<12} EXCERPT", "ID", "SCORE", "FIELD", "MATCH");
    println!("{}", "-".repeat(80));
    for hit in &response.hits {
        println!(
            "{:<8} {:>5} {:<12} {:<12} {}",
            hit.id.to_string(),
            hit.score,
            hit.field.as_str(),
            hit.kind.as_str(),
            hit.excerpt
        );
    }

    Ok(())
}
