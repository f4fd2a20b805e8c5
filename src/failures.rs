//! Per-run failure aggregation and the durable failure list.
//!
//! Both pipelines fold their [`TaskReport`]s into a [`FailureLog`] after the
//! pool drains, then persist the failed identifiers so a follow-up run can be
//! restricted to exactly the failures. Persistence happens on the
//! coordinating thread strictly after all workers have exited, so the list
//! file needs no locking.

use crate::error::PipelineError;
use crate::pool::TaskReport;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Name of the durable failure list written at the end of each run.
pub const FAILED_LIST_FILE: &str = "failed.txt";

/// Accumulates per-item failures for one pipeline invocation.
#[derive(Debug, Default)]
pub struct FailureLog {
    messages: Vec<String>,
    failed: Vec<PathBuf>,
    total: usize,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completion report into the log.
    pub fn record(&mut self, report: &TaskReport) {
        self.total += 1;
        if let Some(error) = &report.error {
            self.messages.push(error.to_string());
            if let Some(path) = &report.failed_path {
                self.failed.push(path.clone());
            }
            warn!(task_id = report.id, error = %error, "item failed");
        }
    }

    pub fn failed_paths(&self) -> &[PathBuf] {
        &self.failed
    }

    pub fn failure_count(&self) -> usize {
        self.messages.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Write the failed identifiers to `path`, one per line, fully replacing
    /// any prior contents. An empty log truncates the file, so a clean run
    /// erases stale failures from earlier runs.
    pub fn persist(&self, path: &Path) -> Result<(), PipelineError> {
        let mut contents = String::new();
        for failed in &self.failed {
            contents.push_str(&failed.to_string_lossy());
            contents.push('\n');
        }
        std::fs::write(path, contents).map_err(|source| PipelineError::FailureListWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Collapse the log into the pipeline's return value: `Ok(ok)` when
    /// nothing failed, otherwise one aggregate error whose text concatenates
    /// every per-item message.
    pub fn into_result<T>(self, ok: T) -> Result<T, PipelineError> {
        if self.messages.is_empty() {
            Ok(ok)
        } else {
            Err(PipelineError::Partial {
                failed: self.messages.len(),
                total: self.total,
                detail: self.messages.join("; "),
            })
        }
    }
}
