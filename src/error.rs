//! Error types for the disclosure-pipeline library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot proceed at all (a source
//!   or destination directory cannot be enumerated, a page-count probe failed
//!   during batch planning). Returned as `Err(PipelineError)` from the
//!   top-level pipeline functions. The `Partial` variant is the aggregate
//!   error a pipeline returns after every item was still attempted exactly
//!   once but at least one failed.
//!
//! * [`ItemError`] — **Non-fatal**: a single entry failed (corrupt PDF,
//!   recognition glitch, disk error on one page) and siblings are unaffected.
//!   Carried inside [`crate::pool::TaskReport`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad document.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! failure, log and continue, or collect all errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the disclosure-pipeline library.
///
/// Per-item failures use [`ItemError`] and are stored in
/// [`crate::pool::TaskReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Discovery errors ──────────────────────────────────────────────────
    /// A source or destination directory could not be enumerated.
    #[error("failed to read directory '{path}': {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A destination root directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Planning errors ───────────────────────────────────────────────────
    /// The per-entry weight probe failed during batch planning.
    ///
    /// Planning aborts immediately with no partial batch list; callers must
    /// not act on any batches from the failed call.
    #[error("page-count probe failed for '{path}': {detail}")]
    Planning { path: PathBuf, detail: String },

    // ── Aggregate errors ──────────────────────────────────────────────────
    /// At least one item failed during a pipeline run.
    ///
    /// Every item was still attempted exactly once; `detail` concatenates
    /// all per-item error messages.
    #[error("{failed}/{total} items failed: {detail}")]
    Partial {
        failed: usize,
        total: usize,
        detail: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The durable failure list could not be written.
    #[error("failed to write failure list '{path}': {source}")]
    FailureListWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single work item.
///
/// Recorded in the item's [`crate::pool::TaskReport`]; the surrounding batch
/// continues regardless.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Opening or rasterising the source document failed.
    #[error("render failed for '{path}': {source}")]
    RenderFailed {
        path: PathBuf,
        #[source]
        source: crate::render::RenderError,
    },

    /// A rendered page could not be written to disk.
    #[error("failed to write page {page} of '{path}': {detail}")]
    PageWriteFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// The destination subdirectory or completion manifest could not be written.
    #[error("failed to prepare output for '{path}': {source}")]
    OutputSetupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text-recognition engine failed on an image.
    #[error("recognition failed for '{path}': {source}")]
    RecognitionFailed {
        path: PathBuf,
        #[source]
        source: crate::recognize::RecognizeError,
    },

    /// The extraction record could not be written.
    #[error("failed to write record '{path}': {detail}")]
    RecordWriteFailed { path: PathBuf, detail: String },

    /// The run was cancelled before this item executed.
    #[error("cancelled before processing '{path}'")]
    Cancelled { path: PathBuf },

    /// The work closure panicked; converted to an error so the pool still
    /// reports exactly one completion for the task.
    #[error("task panicked: {detail}")]
    Panicked { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_display_includes_counts_and_detail() {
        let e = PipelineError::Partial {
            failed: 2,
            total: 10,
            detail: "a; b".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("2/10"), "got: {msg}");
        assert!(msg.contains("a; b"));
    }

    #[test]
    fn cancelled_display_names_path() {
        let e = ItemError::Cancelled {
            path: PathBuf::from("images/report/report-0.png"),
        };
        assert!(e.to_string().contains("report-0.png"));
    }

    #[test]
    fn planning_display() {
        let e = PipelineError::Planning {
            path: PathBuf::from("disclosures/bad.pdf"),
            detail: "not a PDF".into(),
        };
        assert!(e.to_string().contains("bad.pdf"));
        assert!(e.to_string().contains("not a PDF"));
    }
}
