//! tasklens - Dependency analysis and queries over markdown task lists
//!
//! tasklens reads a checklist document (`- [ ] T001: ... (depends: T000)`)
//! and answers questions about it: what is blocked, what order work can
//! happen in, what matches a search, how far along each phase is. Its one
//! write is a batch status change that touches only checkbox characters.

pub mod domain;
pub mod engine;
pub mod storage;
pub mod cli;

pub use domain::{DependencyGraph, Task, TaskId, TaskStatus};
pub use storage::{TaskDocument, Workspace};
