//! Domain models for tasklens
//!
//! Contains parsing and graph logic without any I/O concerns.

mod id;
mod task;
mod parser;
mod graph;
mod blocker;

pub use id::{IdError, TaskId, TaskRange, MAX_RANGE_LEN};
pub use task::{Priority, Task, TaskMeta, TaskStatus};
pub use parser::{parse_document, parse_line, IgnoredLine, LineOutcome, ParsedDocument};
pub use graph::{CycleReport, DependencyGraph, DuplicatePolicy, GraphError};
pub use blocker::{BlockerClassifier, Readiness};
