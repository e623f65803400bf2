//! Per-invocation state shared by commands
//!
//! Resolves which document a command works on and loads it fresh.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::DependencyGraph;
use crate::storage::{ProjectConfig, TaskDocument, Workspace};

pub struct Session {
    workspace: Workspace,
    file: Option<PathBuf>,
}

impl Session {
    pub fn new(workspace: Workspace, file: Option<PathBuf>) -> Self {
        Self { workspace, file }
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.workspace.config().project
    }

    pub fn document_path(&self) -> PathBuf {
        self.workspace.resolve_document(self.file.as_deref())
    }

    /// Loads and parses the task document
    pub fn document(&self, output: &Output) -> Result<TaskDocument> {
        let path = self.document_path();
        output.verbose_ctx("document", &format!("Loading {}", path.display()));

        let document = self.workspace.load_document(self.file.as_deref())?;
        let parsed = document.parsed();
        output.verbose_ctx(
            "document",
            &format!(
                "Parsed {} tasks, ignored {} lines ({} malformed)",
                parsed.task_count(),
                parsed.ignored().count(),
                parsed.malformed().count()
            ),
        );
        Ok(document)
    }

    /// Builds the dependency graph with the configured duplicate policy
    pub fn graph(&self, document: &TaskDocument, output: &Output) -> Result<DependencyGraph> {
        let graph = document
            .graph(self.project().duplicates)
            .with_context(|| format!("Invalid task document: {}", document.path().display()))?;

        output.verbose_ctx(
            "graph",
            &format!(
                "{} tasks, {} dangling dependencies",
                graph.len(),
                graph.dangling().len()
            ),
        );
        for (task, missing) in graph.dangling() {
            tracing::warn!(task = %task, missing = %missing, "Dependency names no task in the document");
        }
        Ok(graph)
    }
}
