//! Task search
//!
//! Three match modes over a task's description, phase, type, and tags:
//!
//! - **Literal**: substring match, case-insensitive unless requested
//! - **Pattern**: regular expression; an invalid pattern is searched as a
//!   literal instead and the response says so
//! - **Approximate**: literal first, then word similarity from
//!   optimal-string-alignment distance (adjacent transpositions cost one edit)
//!
//! Each task yields at most one hit, from its best-scoring field.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Task, TaskId, TaskStatus};

/// Results returned when the caller gives no limit
pub const DEFAULT_LIMIT: usize = 20;

/// Hard ceiling on returned results
pub const MAX_LIMIT: usize = 100;

/// Default minimum similarity for approximate matches
pub const DEFAULT_THRESHOLD: u8 = 70;

/// Characters of context kept either side of a match
const EXCERPT_CONTEXT: usize = 30;

/// Field words for approximate matching are whitespace-separated runs
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+").expect("word pattern is valid"));

#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Similarity threshold must be 0-100, got {0}")]
    InvalidThreshold(u8),

    #[error("Search query cannot be compiled: {0}")]
    InvalidQuery(String),
}

/// A searchable task field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Description,
    Phase,
    Type,
    Tags,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Description,
        SearchField::Phase,
        SearchField::Type,
        SearchField::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Description => "description",
            SearchField::Phase => "phase",
            SearchField::Type => "type",
            SearchField::Tags => "tags",
        }
    }

    /// The field's searchable values (each tag separately)
    fn values<'a>(&self, task: &'a Task) -> Vec<&'a str> {
        match self {
            SearchField::Description => vec![task.description.as_str()],
            SearchField::Phase => task.meta.phase.as_deref().into_iter().collect(),
            SearchField::Type => task.meta.task_type.as_deref().into_iter().collect(),
            SearchField::Tags => task.meta.tags.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "description" | "desc" => Ok(SearchField::Description),
            "phase" => Ok(SearchField::Phase),
            "type" => Ok(SearchField::Type),
            "tags" | "tag" => Ok(SearchField::Tags),
            other => Err(format!(
                "unknown field '{}' (expected description, phase, type, tags)",
                other
            )),
        }
    }
}

/// How the query is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Literal,
    Pattern,
    Approximate,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Literal => "literal",
            MatchMode::Pattern => "pattern",
            MatchMode::Approximate => "approximate",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" | "exact" => Ok(MatchMode::Literal),
            "pattern" | "regex" => Ok(MatchMode::Pattern),
            "approximate" | "fuzzy" => Ok(MatchMode::Approximate),
            other => Err(format!(
                "unknown match mode '{}' (expected literal, pattern, approximate)",
                other
            )),
        }
    }
}

/// What kind of match produced a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The whole field equals the query
    Exact,
    /// The field starts with the query
    Prefix,
    /// The query occurs inside the field
    Substring,
    /// The regular expression matched
    Pattern,
    /// A field word is close to the query
    Approximate,
}

impl MatchKind {
    /// Relevance before similarity scaling
    pub fn base_score(&self) -> u8 {
        match self {
            MatchKind::Exact => 100,
            MatchKind::Prefix => 90,
            MatchKind::Substring => 75,
            MatchKind::Pattern => 60,
            MatchKind::Approximate => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Prefix => "prefix",
            MatchKind::Substring => "substring",
            MatchKind::Pattern => "pattern",
            MatchKind::Approximate => "approximate",
        }
    }
}

/// A search request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Fields to search; empty means all
    pub fields: Vec<SearchField>,
    pub mode: MatchMode,
    pub case_sensitive: bool,
    /// Minimum similarity (0-100) for approximate matches
    pub threshold: u8,
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fields: Vec::new(),
            mode: MatchMode::default(),
            case_sensitive: false,
            threshold: DEFAULT_THRESHOLD,
            limit: None,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Requested limit capped at `MAX_LIMIT`; zero returns no hits
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

/// A matched task
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub line: usize,
    pub field: SearchField,
    pub kind: MatchKind,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<u8>,
    /// Field text around the match, match wrapped in `**`
    pub excerpt: String,
}

/// Ranked search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: MatchMode,
    /// The pattern did not compile and was searched literally
    pub pattern_fallback: bool,
    /// Hits before the limit was applied
    pub total_matches: usize,
    pub hits: Vec<SearchHit>,
}

/// How a single field value is tested
enum Matcher {
    Literal(Regex),
    Pattern(Regex),
    Approximate { literal: Regex, words: Vec<Vec<char>> },
}

/// Searches tasks, best hits first
pub fn search(tasks: &[Task], request: &SearchRequest) -> Result<SearchResponse, SearchError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    if request.threshold > 100 {
        return Err(SearchError::InvalidThreshold(request.threshold));
    }

    let (matcher, pattern_fallback) = build_matcher(query, request)?;
    if pattern_fallback {
        tracing::debug!(pattern = query, "Invalid pattern, searching literally");
    }

    let fields: &[SearchField] = if request.fields.is_empty() {
        &SearchField::ALL
    } else {
        &request.fields
    };

    let mut hits: Vec<SearchHit> = tasks
        .iter()
        .filter_map(|task| best_hit(task, fields, &matcher, request))
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    let total_matches = hits.len();
    hits.truncate(request.effective_limit());

    tracing::debug!(
        mode = %request.mode,
        matches = total_matches,
        returned = hits.len(),
        "Searched tasks"
    );

    Ok(SearchResponse {
        query: query.to_string(),
        mode: request.mode,
        pattern_fallback,
        total_matches,
        hits,
    })
}

fn literal_regex(query: &str, case_sensitive: bool) -> Result<Regex, SearchError> {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| SearchError::InvalidQuery(e.to_string()))
}

fn build_matcher(query: &str, request: &SearchRequest) -> Result<(Matcher, bool), SearchError> {
    let literal = literal_regex(query, request.case_sensitive)?;
    Ok(match request.mode {
        MatchMode::Literal => (Matcher::Literal(literal), false),
        MatchMode::Pattern => match RegexBuilder::new(query)
            .case_insensitive(!request.case_sensitive)
            .build()
        {
            Ok(regex) => (Matcher::Pattern(regex), false),
            Err(_) => (Matcher::Literal(literal), true),
        },
        MatchMode::Approximate => {
            let words = query
                .split_whitespace()
                .map(|w| normalize(w, request.case_sensitive))
                .collect();
            (Matcher::Approximate { literal, words }, false)
        }
    })
}

fn normalize(text: &str, case_sensitive: bool) -> Vec<char> {
    if case_sensitive {
        text.chars().collect()
    } else {
        text.to_lowercase().chars().collect()
    }
}

fn best_hit(
    task: &Task,
    fields: &[SearchField],
    matcher: &Matcher,
    request: &SearchRequest,
) -> Option<SearchHit> {
    let mut best: Option<SearchHit> = None;

    for field in fields {
        for value in field.values(task) {
            let Some((kind, score, similarity, range)) = match_value(value, matcher, request)
            else {
                continue;
            };
            if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                best = Some(SearchHit {
                    id: task.id.clone(),
                    description: task.description.clone(),
                    status: task.status,
                    line: task.line,
                    field: *field,
                    kind,
                    score,
                    similarity,
                    excerpt: excerpt(value, range),
                });
            }
        }
    }

    best
}

type ValueMatch = (MatchKind, u8, Option<u8>, (usize, usize));

fn match_value(value: &str, matcher: &Matcher, request: &SearchRequest) -> Option<ValueMatch> {
    match matcher {
        Matcher::Literal(regex) => literal_match(value, regex),
        Matcher::Pattern(regex) => regex.find(value).map(|m| {
            (
                MatchKind::Pattern,
                MatchKind::Pattern.base_score(),
                None,
                (m.start(), m.end()),
            )
        }),
        Matcher::Approximate { literal, words } => literal_match(value, literal).or_else(|| {
            let (sim, range) = similarity(words, value, request.threshold, request.case_sensitive)?;
            (sim >= request.threshold).then(|| {
                let score = (u32::from(MatchKind::Approximate.base_score()) * u32::from(sim) / 100) as u8;
                (MatchKind::Approximate, score, Some(sim), range)
            })
        }),
    }
}

fn literal_match(value: &str, regex: &Regex) -> Option<ValueMatch> {
    let m = regex.find(value)?;
    let kind = if m.start() == 0 && m.end() == value.len() {
        MatchKind::Exact
    } else if m.start() == 0 {
        MatchKind::Prefix
    } else {
        MatchKind::Substring
    };
    Some((kind, kind.base_score(), None, (m.start(), m.end())))
}

/// Similarity (0-100) of the query words to the value's words
///
/// Each query word is compared with every value word, both whole and cut
/// to the query word's length, and keeps its best score. Multi-word queries
/// average the per-word bests. Returns the byte range of the best-matching
/// value word for the excerpt.
pub fn similarity(
    words: &[Vec<char>],
    value: &str,
    threshold: u8,
    case_sensitive: bool,
) -> Option<(u8, (usize, usize))> {
    if words.is_empty() {
        return None;
    }

    let tokens: Vec<(Vec<char>, (usize, usize))> = WORD
        .find_iter(value)
        .map(|m| (normalize(m.as_str(), case_sensitive), (m.start(), m.end())))
        .collect();
    if tokens.is_empty() {
        return None;
    }

    // Bounding the distance is only sound when one word decides the score
    let bounded = words.len() == 1;

    let mut total: u32 = 0;
    let mut best_overall: (u8, (usize, usize)) = (0, tokens[0].1);

    for word in words {
        let mut best_word: u8 = 0;
        for (token, range) in &tokens {
            let whole = word_similarity(word, token, bounded.then_some(threshold));
            let prefix = if token.len() > word.len() {
                word_similarity(word, &token[..word.len()], bounded.then_some(threshold))
            } else {
                0
            };
            let sim = whole.max(prefix);
            if sim > best_word {
                best_word = sim;
            }
            if sim > best_overall.0 {
                best_overall = (sim, *range);
            }
        }
        total += u32::from(best_word);
    }

    let average = (total / words.len() as u32) as u8;
    Some((average, best_overall.1))
}

/// Normalized similarity of two words; 0 when provably under `threshold`
fn word_similarity(a: &[char], b: &[char], threshold: Option<u8>) -> u8 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 100;
    }
    let bound = threshold.map(|t| len * usize::from(100 - t) / 100);
    match osa_distance(a, b, bound) {
        Some(distance) => ((len - distance.min(len)) * 100 / len) as u8,
        None => 0,
    }
}

/// Optimal string alignment distance, or `None` once it must exceed `bound`
pub fn osa_distance(a: &[char], b: &[char], bound: Option<usize>) -> Option<usize> {
    if let Some(bound) = bound {
        if a.len().abs_diff(b.len()) > bound {
            return None;
        }
    }

    let width = b.len() + 1;
    let mut prev2: Vec<usize> = vec![0; width];
    let mut prev: Vec<usize> = (0..width).collect();
    let mut curr: Vec<usize> = vec![0; width];
    let mut prev_min = 0;

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..width {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(prev2[j - 2] + 1);
            }
            curr[j] = d;
        }

        // Later rows can never drop below min(this row, previous row + 1)
        let row_min = curr.iter().copied().min().unwrap_or(0);
        if let Some(bound) = bound {
            if row_min.min(prev_min + 1) > bound {
                return None;
            }
        }
        prev_min = row_min;

        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    match bound {
        Some(bound) if distance > bound => None,
        _ => Some(distance),
    }
}

/// Field text around `range` with the match wrapped in `**`
pub fn excerpt(text: &str, range: (usize, usize)) -> String {
    let (start, end) = range;

    let before_start = text[..start]
        .char_indices()
        .rev()
        .nth(EXCERPT_CONTEXT - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let after_end = text[end..]
        .char_indices()
        .nth(EXCERPT_CONTEXT)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len());

    let mut out = String::new();
    if before_start > 0 {
        out.push_str("...");
    }
    out.push_str(&text[before_start..start]);
    out.push_str("**");
    out.push_str(&text[start..end]);
    out.push_str("**");
    out.push_str(&text[end..after_end]);
    if after_end < text.len() {
        out.push_str("...");
    }
    out
}
