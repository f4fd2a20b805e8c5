//! # disclosure-pipeline
//!
//! Batch-processing engine for financial-disclosure PDFs: rasterise each
//! document's pages to image files, then run text recognition over the
//! images and write per-image tab-separated records.
//!
//! ## Why this crate?
//!
//! Disclosure archives hold thousands of PDFs of wildly uneven size. Running
//! them through a renderer and a recognition engine naively either exhausts
//! memory (too much in flight) or takes days (one at a time). This crate
//! provides the coordination that makes the job boring: weight-aware
//! batching, a bounded worker pool, idempotent skipping of finished work,
//! and fail-soft error collection so one corrupt document never sinks a run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Plan     group sources into batches by cumulative page count
//!  ├─ 2. Convert  render each page to an image file (pool, per batch)
//!  ├─ 3. Extract  recognise each image, write TSV records (pool, capped)
//!  └─ 4. Report   created / skipped / failed counts + durable failed.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use disclosure_pipeline::{
//!     convert_directory, extract_directory, CancelToken, ConvertConfig,
//!     ExtractConfig, PdfiumRenderer,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let renderer = Arc::new(PdfiumRenderer::default());
//!     let cancel = CancelToken::new();
//!
//!     let summary = convert_directory(
//!         renderer,
//!         Path::new("disclosures"),
//!         Path::new("images"),
//!         &ConvertConfig::default(),
//!         &cancel,
//!     )?;
//!     println!("converted {} documents", summary.created);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Fatal errors (unreadable directories, a failed page-count probe) abort a
//! run immediately. Per-item errors never stop siblings: every item is
//! attempted exactly once, failures are aggregated into one
//! [`PipelineError::Partial`], and the failed paths land in a `failed.txt`
//! the next run can be pointed at. Artifacts that already exist are never
//! regenerated, so re-running after a partial failure only does the missing
//! work.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod failures;
pub mod pipeline;
pub mod planner;
pub mod pool;
pub mod recognize;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConvertConfig, ConvertConfigBuilder, ExtractConfig, ExtractConfigBuilder};
pub use error::{ItemError, PipelineError};
pub use failures::{FailureLog, FAILED_LIST_FILE};
pub use pipeline::convert::{
    convert_directory, ConversionManifest, ConversionSummary, MANIFEST_FILE,
};
pub use pipeline::extract::{extract_directory, ExtractionSummary};
pub use planner::{plan_batches, Batch};
pub use pool::{CancelToken, Task, TaskReport, WorkerPool};
pub use recognize::{ExtractionRecord, RecognizeError, TextRecognizer};
pub use render::{PageRenderer, PdfiumRenderer, RenderError};
