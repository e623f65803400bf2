//! Task identifiers and identifier ranges
//!
//! ID Format:
//! - Task IDs: `{letters}{digits}` (e.g., `T001`, `T12`, `SETUP3`)
//! - Ranges: `{start}-{end}` sharing one prefix (e.g., `T001-T005`)
//!
//! Identity ignores zero-padding: `T1` and `T001` name the same task.
//! The padding width an ID was written with is kept for display, so an
//! identifier read from a document prints back exactly as it was written.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Largest number of identifiers a single range may expand to
pub const MAX_RANGE_LEN: u64 = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID format: expected '{{letters}}{{digits}}', got '{0}'")]
    InvalidTaskId(String),

    #[error("Invalid range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },
}

/// Task identifier: a letter prefix plus a number
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId {
    prefix: String,
    number: u64,
    /// Digit count as written (zero-padding)
    width: usize,
}

impl TaskId {
    /// Creates an ID with the given zero-padding width
    pub fn new(prefix: impl Into<String>, number: u64, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            number,
            width,
        }
    }

    /// Returns the letter prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the numeric part
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the zero-padding width the ID was written with
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns an ID with the same prefix and padding but a different number
    pub fn with_number(&self, number: u64) -> Self {
        Self {
            prefix: self.prefix.clone(),
            number,
            width: self.width,
        }
    }
}

impl PartialEq for TaskId {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.number == other.number
    }
}

impl Eq for TaskId {}

impl Hash for TaskId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
        self.number.hash(state);
    }
}

impl PartialOrd for TaskId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then(self.number.cmp(&other.number))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", self.prefix, self.number, width = self.width)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits_at = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| IdError::InvalidTaskId(s.to_string()))?;

        let (prefix, digits) = s.split_at(digits_at);
        if prefix.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_alphabetic())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(IdError::InvalidTaskId(s.to_string()));
        }

        let number = digits
            .parse::<u64>()
            .map_err(|_| IdError::InvalidTaskId(s.to_string()))?;

        Ok(Self {
            prefix: prefix.to_string(),
            number,
            width: digits.len(),
        })
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}

/// A closed range of task IDs sharing one prefix (`T001-T005`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRange {
    start: TaskId,
    end: TaskId,
}

impl TaskRange {
    /// Returns the first ID of the range
    pub fn start(&self) -> &TaskId {
        &self.start
    }

    /// Returns the last ID of the range
    pub fn end(&self) -> &TaskId {
        &self.end
    }

    /// Number of IDs the range covers
    pub fn len(&self) -> u64 {
        self.end.number - self.start.number + 1
    }

    /// Always false: a parsed range covers at least its start
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Expands the range, padding every member like the start ID
    pub fn expand(&self) -> Vec<TaskId> {
        (self.start.number..=self.end.number)
            .map(|n| self.start.with_number(n))
            .collect()
    }
}

impl fmt::Display for TaskRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TaskRange {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| IdError::InvalidRange {
            range: s.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| invalid("expected '{start}-{end}'"))?;

        let start: TaskId = start
            .parse()
            .map_err(|_| invalid("start is not a task ID"))?;
        let end: TaskId = end.parse().map_err(|_| invalid("end is not a task ID"))?;

        if start.prefix != end.prefix {
            return Err(invalid("start and end must share a prefix"));
        }
        if start.number > end.number {
            return Err(invalid("start is greater than end"));
        }
        if end.number - start.number + 1 > MAX_RANGE_LEN {
            return Err(invalid(&format!("covers more than {} tasks", MAX_RANGE_LEN)));
        }

        Ok(Self { start, end })
    }
}
