//! Checklist line parser
//!
//! Turns a task list document into tasks, one line at a time:
//!
//! ```text
//! - [ ] T002: Build the API (phase: core, depends: T001, priority: high)
//! ^ ^ ^ ^     ^              ^
//! | | | |     description    metadata block (optional)
//! | | | identifier
//! | | status character
//! | bracket
//! optional list marker
//! ```
//!
//! Parsing is lenient by line: anything that does not parse is kept as an
//! [`LineOutcome::Ignored`] entry rather than failing the document.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::id::TaskId;
use super::task::{Priority, Task, TaskMeta, TaskStatus};

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[-*+]\s+)?\[(?P<status>.)\]\s+(?P<id>[A-Za-z]+[0-9]+)\s*:\s*(?P<rest>.*)$",
    )
    .expect("task line pattern is valid")
});

static CHECKBOX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?\[.?\]").expect("checkbox pattern is valid")
});

/// A line that did not produce a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredLine {
    /// 1-based line number
    pub line: usize,
    pub raw: String,
    /// The line has a checkbox but is not a valid task line
    pub malformed: bool,
}

/// Result of parsing a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Recognized(Task),
    Ignored(IgnoredLine),
}

/// All line outcomes of a document, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    outcomes: Vec<LineOutcome>,
}

impl ParsedDocument {
    /// Recognized tasks in source order (duplicates included)
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.outcomes.iter().filter_map(|o| match o {
            LineOutcome::Recognized(task) => Some(task),
            LineOutcome::Ignored(_) => None,
        })
    }

    /// Consumes the document, returning its tasks
    pub fn into_tasks(self) -> Vec<Task> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                LineOutcome::Recognized(task) => Some(task),
                LineOutcome::Ignored(_) => None,
            })
            .collect()
    }

    /// Lines that produced no task
    pub fn ignored(&self) -> impl Iterator<Item = &IgnoredLine> {
        self.outcomes.iter().filter_map(|o| match o {
            LineOutcome::Ignored(line) => Some(line),
            LineOutcome::Recognized(_) => None,
        })
    }

    /// Checkbox lines that failed to parse as tasks
    pub fn malformed(&self) -> impl Iterator<Item = &IgnoredLine> {
        self.ignored().filter(|l| l.malformed)
    }

    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }
}

/// Parses a whole document
pub fn parse_document(text: &str) -> ParsedDocument {
    let outcomes: Vec<_> = text
        .lines()
        .enumerate()
        .map(|(idx, raw)| parse_line(idx + 1, raw))
        .collect();

    let doc = ParsedDocument { outcomes };
    for line in doc.malformed() {
        tracing::warn!(line = line.line, raw = %line.raw, "Skipping malformed checklist line");
    }
    tracing::debug!(
        tasks = doc.task_count(),
        ignored = doc.ignored().count(),
        "Parsed task document"
    );
    doc
}

/// Parses one line; `line` is the 1-based line number
pub fn parse_line(line: usize, raw: &str) -> LineOutcome {
    let ignored = |malformed: bool| {
        LineOutcome::Ignored(IgnoredLine {
            line,
            raw: raw.to_string(),
            malformed,
        })
    };

    let Some(caps) = TASK_LINE.captures(raw) else {
        return ignored(CHECKBOX_LINE.is_match(raw));
    };

    let status_match = &caps["status"];
    let Some(marker) = status_match.chars().next() else {
        return ignored(true);
    };
    let Some(status) = TaskStatus::from_marker(marker) else {
        return ignored(true);
    };
    let Ok(id) = caps["id"].parse::<TaskId>() else {
        return ignored(true);
    };

    let marker_offset = caps.name("status").map(|m| m.start()).unwrap_or(0);
    let (description, meta) = split_metadata(&caps["rest"]);

    LineOutcome::Recognized(Task {
        id,
        description,
        status,
        meta,
        line,
        marker,
        marker_offset,
    })
}

/// Splits `rest` into description and metadata
///
/// A trailing parenthesized block is metadata only when it starts with a
/// `key: value` pair; otherwise it stays part of the description.
fn split_metadata(rest: &str) -> (String, TaskMeta) {
    let trimmed = rest.trim_end();
    if !trimmed.ends_with(')') {
        return (trimmed.trim().to_string(), TaskMeta::default());
    }

    let Some(open) = matching_open_paren(trimmed) else {
        return (trimmed.trim().to_string(), TaskMeta::default());
    };

    let inner = &trimmed[open + 1..trimmed.len() - 1];
    let starts_with_pair = inner
        .split(',')
        .next()
        .and_then(|first| first.split_once(':'))
        .is_some_and(|(key, _)| is_key(key.trim()));

    if !starts_with_pair {
        return (trimmed.trim().to_string(), TaskMeta::default());
    }

    let description = trimmed[..open].trim().to_string();
    (description, parse_metadata(inner))
}

/// Byte index of the `(` matching the final `)`
fn matching_open_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_key(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
}

/// Parses `key: value` pairs; segments without a key continue the previous value
fn parse_metadata(inner: &str) -> TaskMeta {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for segment in inner.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.split_once(':') {
            Some((key, value)) if is_key(key.trim()) => {
                pairs.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
            _ => {
                if let Some((_, value)) = pairs.last_mut() {
                    value.push(',');
                    value.push_str(segment);
                }
            }
        }
    }

    let mut meta = TaskMeta::default();
    for (key, value) in pairs {
        match key.as_str() {
            "phase" => meta.phase = non_empty(&value),
            "type" => meta.task_type = non_empty(&value),
            "depends" | "dependencies" | "deps" => {
                meta.depends = split_list(&value)
                    .filter_map(|s| s.parse::<TaskId>().ok())
                    .fold(Vec::new(), |mut acc, id| {
                        if !acc.contains(&id) {
                            acc.push(id);
                        }
                        acc
                    });
            }
            "priority" => meta.priority = value.parse::<Priority>().ok(),
            "effort" => meta.effort = value.trim().parse::<u32>().ok(),
            "tags" | "tag" => {
                meta.tags = split_list(&value)
                    .map(|s| s.trim_start_matches('#').to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            other => tracing::trace!(key = other, "Ignoring unknown metadata key"),
        }
    }
    meta
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Splits a list value on commas and whitespace, dropping `[` `]`
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}
