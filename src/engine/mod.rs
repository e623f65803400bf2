//! # Engine
//!
//! Operations over a parsed task list. Each takes freshly parsed tasks or a
//! freshly built graph; nothing is cached between calls.
//!
//! | Module | Operation |
//! |--------|-----------|
//! | [`render`] | Mermaid, DOT, and tree projections of the dependency graph |
//! | [`query`] | Filtering, sorting, presets |
//! | [`search`] | Literal, pattern, and approximate search |
//! | [`stats`] | Completion breakdowns and blocker tally |
//! | [`batch`] | Strict/lenient batch completion (the only writer) |

pub mod batch;
pub mod query;
pub mod render;
pub mod search;
pub mod stats;

pub use batch::{complete, BatchError, BatchReport, BatchRequest, Outcome};
pub use query::{run_query, BlockState, Preset, QueryResult, SortOrder, TaskFilter, TaskQuery};
pub use render::{render, GraphFormat, RenderOptions};
pub use search::{search, MatchMode, SearchField, SearchRequest, SearchResponse};
pub use stats::{compute as compute_stats, GroupBy, Statistics, StatsRequest};
