//! Conversion pipeline: PDF sources → per-document page-image directories.
//!
//! ## Data flow
//!
//! ```text
//! discover ──▶ plan ──▶ [batch 0] pool ──▶ [batch 1] pool ──▶ … ──▶ report
//! (read_dir)  (pages)   (render + write, concurrent per entry)     (failed.txt)
//! ```
//!
//! Batches run strictly one at a time so peak in-flight page memory stays
//! under the planner's weight bound; entries within a batch render
//! concurrently on the worker pool. One corrupt document fails only its own
//! entry — siblings and later batches are unaffected.
//!
//! Idempotency is directory-existence-based: an entry whose destination
//! subdirectory already exists is skipped outright, so re-running after a
//! partial batch only redoes the missing entries. A completion manifest is
//! written alongside the images so tooling can tell a finished directory
//! from one left behind by a crash.

use crate::config::ConvertConfig;
use crate::error::{ItemError, PipelineError};
use crate::failures::{FailureLog, FAILED_LIST_FILE};
use crate::planner::{plan_batches, Batch};
use crate::pool::{CancelToken, Task, TaskReport, WorkerPool};
use crate::render::PageRenderer;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Completion marker written into each converted image directory.
pub const MANIFEST_FILE: &str = ".manifest.json";

/// Records what a finished conversion wrote, for post-run validation.
///
/// The idempotent skip itself stays directory-existence-based; the manifest
/// exists so a validator can distinguish a complete directory
/// (`written_pages == expected_pages`) from a partial one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionManifest {
    pub source: PathBuf,
    pub expected_pages: usize,
    pub written_pages: usize,
}

/// Per-run counts for the conversion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Entries newly converted in this run.
    pub created: usize,
    /// Entries skipped because their image directory already existed.
    pub skipped: usize,
    /// Entries that failed.
    pub failed: usize,
    /// Number of weight-bounded batches the run was split into.
    pub batches: usize,
}

/// One rendered page waiting to be written, owned by the worker that
/// produced it until the file is on disk.
struct RenderedPage {
    image: DynamicImage,
    file_name: String,
}

/// Convert every document under `pdf_root` into a page-image directory
/// under `image_root`.
///
/// Failed source paths are persisted to `{image_root}/failed.txt`
/// (overwriting any previous list) after the run.
///
/// # Errors
/// Fatal errors (unreadable directories, a failed page-count probe) abort
/// immediately. Per-entry failures are collected; if any occurred the run
/// returns a single [`PipelineError::Partial`] aggregating all of them —
/// every entry was still attempted exactly once.
pub fn convert_directory(
    renderer: Arc<dyn PageRenderer>,
    pdf_root: &Path,
    image_root: &Path,
    config: &ConvertConfig,
    cancel: &CancelToken,
) -> Result<ConversionSummary, PipelineError> {
    let start = Instant::now();
    info!(
        pdf_root = %pdf_root.display(),
        image_root = %image_root.display(),
        concurrency = config.concurrency,
        max_batch_weight = config.max_batch_weight,
        "starting conversion run"
    );

    std::fs::create_dir_all(image_root).map_err(|source| PipelineError::CreateDir {
        path: image_root.to_path_buf(),
        source,
    })?;

    let entries = discover_sources(pdf_root)?;
    let probe = Arc::clone(&renderer);
    let batches = plan_batches(
        &entries,
        |path| {
            probe.page_count(path).map_err(|e| PipelineError::Planning {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        },
        config.max_batch_weight,
    )?;

    let mut log = FailureLog::new();
    let mut summary = ConversionSummary {
        batches: batches.len(),
        ..Default::default()
    };

    for (index, batch) in batches.iter().enumerate() {
        debug!(
            batch = index,
            entries = batch.len(),
            weight = batch.weight(),
            "processing batch"
        );
        for report in run_batch(&renderer, batch, image_root, config, cancel) {
            if report.is_failure() {
                summary.failed += 1;
            } else if report.created {
                summary.created += 1;
            } else {
                summary.skipped += 1;
            }
            log.record(&report);
        }
    }

    log.persist(&image_root.join(FAILED_LIST_FILE))?;
    info!(
        created = summary.created,
        skipped = summary.skipped,
        failed = summary.failed,
        batches = summary.batches,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "conversion run finished"
    );
    log.into_result(summary)
}

/// Regular files directly under `pdf_root`, in lexical order.
fn discover_sources(pdf_root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let discovery_err = |source| PipelineError::Discovery {
        path: pdf_root.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(pdf_root).map_err(discovery_err)? {
        let path = entry.map_err(discovery_err)?.path();
        if path.is_file() {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Run one batch to completion on its own pool and return every report.
fn run_batch(
    renderer: &Arc<dyn PageRenderer>,
    batch: &Batch,
    image_root: &Path,
    config: &ConvertConfig,
    cancel: &CancelToken,
) -> Vec<TaskReport> {
    let tasks: Vec<Task> = batch
        .entries()
        .iter()
        .enumerate()
        .map(|(id, entry)| {
            let renderer = Arc::clone(renderer);
            let entry = entry.clone();
            let image_root = image_root.to_path_buf();
            let extension = config.extension.clone();
            let token = cancel.clone();
            Task::new(id, entry.clone(), move || {
                match convert_entry(renderer.as_ref(), &entry, &image_root, &extension, &token) {
                    Ok(created) => TaskReport::success(id, created),
                    Err(error) => TaskReport::failure(id, error, entry),
                }
            })
        })
        .collect();

    WorkerPool::new(tasks, config.concurrency).run(cancel)
}

/// Convert a single source document, unless its output already exists.
///
/// Returns `Ok(true)` when the directory was newly created and filled,
/// `Ok(false)` for an idempotent skip.
fn convert_entry(
    renderer: &dyn PageRenderer,
    pdf_path: &Path,
    image_root: &Path,
    extension: &str,
    cancel: &CancelToken,
) -> Result<bool, ItemError> {
    let base = base_name(pdf_path);
    let dest_dir = image_root.join(&base);

    if dest_dir.exists() {
        debug!(dir = %dest_dir.display(), "image directory exists, skipping entry");
        return Ok(false);
    }

    std::fs::create_dir_all(&dest_dir).map_err(|source| ItemError::OutputSetupFailed {
        path: dest_dir.clone(),
        source,
    })?;

    let pages = renderer
        .render_pages(pdf_path)
        .map_err(|source| ItemError::RenderFailed {
            path: pdf_path.to_path_buf(),
            source,
        })?;

    let expected_pages = pages.len();
    let mut written_pages = 0;
    for (page, image) in pages.into_iter().enumerate() {
        if cancel.is_cancelled() {
            // Remove the partial output: the skip check is
            // directory-existence-based, so leaving it would hide this
            // entry from the retry run.
            if let Err(e) = std::fs::remove_dir_all(&dest_dir) {
                warn!(dir = %dest_dir.display(), error = %e, "could not remove partial image directory");
            }
            return Err(ItemError::Cancelled {
                path: pdf_path.to_path_buf(),
            });
        }
        let rendered = RenderedPage {
            image,
            file_name: page_file_name(&base, page, extension),
        };
        write_page(rendered, &dest_dir, pdf_path, page)?;
        written_pages += 1;
    }

    write_manifest(&dest_dir, pdf_path, expected_pages, written_pages)?;
    info!(source = %pdf_path.display(), pages = written_pages, "converted entry");
    Ok(true)
}

/// File name of the `page`-th rendered page (zero-based, render order).
fn page_file_name(base: &str, page: usize, extension: &str) -> String {
    format!("{base}-{page}{extension}")
}

/// Destination directory name: the entry's file name with its extension
/// stripped and any path-separator characters removed.
fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
        .replace(['/', '\\'], "")
}

fn write_page(
    rendered: RenderedPage,
    dest_dir: &Path,
    pdf_path: &Path,
    page: usize,
) -> Result<(), ItemError> {
    let dest = dest_dir.join(&rendered.file_name);
    debug!(image = %dest.display(), "writing page image");
    rendered
        .image
        .save(&dest)
        .map_err(|e| ItemError::PageWriteFailed {
            path: pdf_path.to_path_buf(),
            page,
            detail: e.to_string(),
        })
}

fn write_manifest(
    dest_dir: &Path,
    source: &Path,
    expected_pages: usize,
    written_pages: usize,
) -> Result<(), ItemError> {
    let manifest = ConversionManifest {
        source: source.to_path_buf(),
        expected_pages,
        written_pages,
    };
    let path = dest_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest).map_err(std::io::Error::other);
    json.and_then(|json| std::fs::write(&path, json))
        .map_err(|source| ItemError::OutputSetupFailed { path, source })
}
