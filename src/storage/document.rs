//! Markdown task list document
//!
//! The document is the only persistent state. Every load re-reads the file;
//! the only write is a status-marker rewrite that touches nothing but the
//! status characters of the targeted lines.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::domain::{
    parse_document, DependencyGraph, DuplicatePolicy, GraphError, ParsedDocument, Task,
    TaskStatus,
};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Task document not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read task document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write task document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Line {line} no longer has a status marker at column {column}")]
    MarkerMismatch { line: usize, column: usize },
}

/// A loaded task list document
#[derive(Debug, Clone)]
pub struct TaskDocument {
    path: PathBuf,
    text: String,
    parsed: ParsedDocument,
}

impl TaskDocument {
    /// Reads and parses the document at `path`
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        if !path.is_file() {
            return Err(DocumentError::NotFound(path));
        }

        let text = fs::read_to_string(&path).map_err(|source| DocumentError::Read {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), bytes = text.len(), "Loaded task document");
        Ok(Self::from_text(path, text))
    }

    /// Parses in-memory text as if it were read from `path`
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let parsed = parse_document(&text);
        Self {
            path: path.into(),
            text,
            parsed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parsed(&self) -> &ParsedDocument {
        &self.parsed
    }

    /// Builds the dependency graph for this document
    pub fn graph(&self, policy: DuplicatePolicy) -> Result<DependencyGraph, GraphError> {
        DependencyGraph::build(self.parsed.tasks(), policy)
    }

    /// Returns the document text with the given tasks' status markers replaced
    ///
    /// Only the single status character of each targeted line changes; line
    /// endings and all other content are preserved byte for byte.
    pub fn with_statuses(&self, updates: &[(&Task, TaskStatus)]) -> Result<String, DocumentError> {
        let wanted: HashMap<usize, (&Task, TaskStatus)> = updates
            .iter()
            .map(|(task, status)| (task.line, (*task, *status)))
            .collect();

        let mut out = String::with_capacity(self.text.len());
        for (idx, line) in self.text.split_inclusive('\n').enumerate() {
            let Some((task, status)) = wanted.get(&(idx + 1)) else {
                out.push_str(line);
                continue;
            };

            let at = task.marker_offset;
            let current = line[at..].chars().next();
            if current != Some(task.marker) {
                return Err(DocumentError::MarkerMismatch {
                    line: task.line,
                    column: at + 1,
                });
            }

            out.push_str(&line[..at]);
            out.push(status.marker());
            out.push_str(&line[at + task.marker.len_utf8()..]);
        }

        Ok(out)
    }

    /// Atomically replaces the document contents (temp file + rename)
    pub fn write_text(&self, text: &str) -> Result<(), DocumentError> {
        let write_err = |source| DocumentError::Write {
            path: self.path.clone(),
            source,
        };

        let mut temp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(write_err)?;

            // Acquire exclusive lock
            file.lock_exclusive().map_err(write_err)?;

            let mut writer = BufWriter::new(&file);
            writer.write_all(text.as_bytes()).map_err(write_err)?;
            writer.flush().map_err(write_err)?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), "Rewrote task document");
        Ok(())
    }
}
