//! Extraction pipeline: page images → tab-separated recognition records.
//!
//! ## Data flow
//!
//! ```text
//! walk subdirs ──▶ skip done ──▶ pool (recognize + write) ──▶ failed.txt
//! (lexical order)  (record exists)  (fixed concurrency cap)
//! ```
//!
//! No weight-based batching here: every image costs roughly the same, so a
//! fixed concurrency cap on the recognition engine is the only throttle.
//! Images whose record already exists are skipped during discovery and do
//! not count against the run's `limit`, so repeated limited runs make
//! forward progress through a large tree.
//!
//! After the pool drains, the failed image paths are written to
//! `{record_root}/failed.txt` — one per line, fully overwriting the previous
//! run's list — so a follow-up invocation can target exactly the failures.

use crate::config::ExtractConfig;
use crate::error::{ItemError, PipelineError};
use crate::failures::{FailureLog, FAILED_LIST_FILE};
use crate::pool::{CancelToken, Task, TaskReport, WorkerPool};
use crate::recognize::{write_records, TextRecognizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Per-run counts for the extraction pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Records newly created in this run.
    pub created: usize,
    /// Images skipped because their record already existed.
    pub already_present: usize,
    /// Images whose recognition or record write failed.
    pub failed: usize,
}

/// Extract text records for every page image under `image_root`, writing
/// one TSV record file per image into `record_root`.
///
/// # Errors
/// Fatal errors (unreadable directories) abort immediately. Per-image
/// failures are collected; if any occurred the run returns one
/// [`PipelineError::Partial`] aggregating all of them — every image was
/// still attempted exactly once, and the failed paths are in
/// `{record_root}/failed.txt`.
pub fn extract_directory(
    recognizer: Arc<dyn TextRecognizer>,
    image_root: &Path,
    record_root: &Path,
    config: &ExtractConfig,
    cancel: &CancelToken,
) -> Result<ExtractionSummary, PipelineError> {
    let start = Instant::now();
    info!(
        image_root = %image_root.display(),
        record_root = %record_root.display(),
        concurrency = config.concurrency,
        limit = config.limit,
        "starting extraction run"
    );

    std::fs::create_dir_all(record_root).map_err(|source| PipelineError::CreateDir {
        path: record_root.to_path_buf(),
        source,
    })?;

    let (images, already_present) = discover_images(image_root, record_root, config.limit)?;
    debug!(
        discovered = images.len(),
        already_present, "extraction discovery finished"
    );

    let tasks: Vec<Task> = images
        .iter()
        .enumerate()
        .map(|(id, image)| {
            let recognizer = Arc::clone(&recognizer);
            let image = image.clone();
            let record = record_path(record_root, &image);
            Task::new(id, image.clone(), move || {
                match extract_item(recognizer.as_ref(), &image, &record) {
                    Ok(created) => TaskReport::success(id, created),
                    Err(error) => TaskReport::failure(id, error, image),
                }
            })
        })
        .collect();

    let reports = WorkerPool::new(tasks, config.concurrency).run(cancel);

    let mut log = FailureLog::new();
    let mut summary = ExtractionSummary {
        already_present,
        ..Default::default()
    };
    for report in &reports {
        if report.is_failure() {
            summary.failed += 1;
        } else if report.created {
            summary.created += 1;
        } else {
            summary.already_present += 1;
        }
        log.record(report);
    }

    log.persist(&record_root.join(FAILED_LIST_FILE))?;
    info!(
        created = summary.created,
        already_present = summary.already_present,
        failed = summary.failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "extraction run finished"
    );
    log.into_result(summary)
}

/// Walk `image_root`'s subdirectories in lexical order and collect image
/// paths that still need a record, up to `limit` of them.
///
/// Returns the pending images and the count of images skipped because their
/// record already exists. Skipped images never count against the limit.
fn discover_images(
    image_root: &Path,
    record_root: &Path,
    limit: Option<usize>,
) -> Result<(Vec<PathBuf>, usize), PipelineError> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut images = Vec::new();
    let mut already_present = 0usize;

    'walk: for subdir in sorted_entries(image_root, |p| p.is_dir())? {
        for image in sorted_entries(&subdir, |p| p.is_file())? {
            if is_hidden(&image) {
                continue;
            }
            if record_is_complete(&record_path(record_root, &image)) {
                debug!(image = %image.display(), "record exists, skipping image");
                already_present += 1;
                continue;
            }
            if images.len() >= limit {
                debug!(limit, "discovery limit reached");
                break 'walk;
            }
            images.push(image);
        }
    }

    Ok((images, already_present))
}

fn sorted_entries(
    dir: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    let discovery_err = |source| PipelineError::Discovery {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(discovery_err)? {
        let path = entry.map_err(discovery_err)?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Hidden files (completion manifests and the like) are not page images.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true)
}

/// Record path for an image: `{record_root}/{imageStem}.csv`.
fn record_path(record_root: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    record_root.join(format!("{stem}.csv"))
}

/// A record counts as done only when it exists and is non-empty. A
/// zero-byte file is what a crash mid-write leaves behind, so it is treated
/// as incomplete and re-extracted.
fn record_is_complete(record: &Path) -> bool {
    std::fs::metadata(record).map(|m| m.len() > 0).unwrap_or(false)
}

/// Recognize one image and write its record, unless the record already
/// exists. Returns whether the record was newly created.
fn extract_item(
    recognizer: &dyn TextRecognizer,
    image: &Path,
    record: &Path,
) -> Result<bool, ItemError> {
    // Recheck just before writing: the discovery list can be minutes old on
    // a large run.
    if record_is_complete(record) {
        debug!(record = %record.display(), "record appeared since discovery, skipping");
        return Ok(false);
    }

    let records = recognizer
        .recognize(image)
        .map_err(|source| ItemError::RecognitionFailed {
            path: image.to_path_buf(),
            source,
        })?;

    write_records(&records, record).map_err(|e| ItemError::RecordWriteFailed {
        path: record.to_path_buf(),
        detail: e.to_string(),
    })?;

    info!(record = %record.display(), rows = records.len(), "created extraction record");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_path_swaps_extension_for_csv() {
        assert_eq!(
            record_path(Path::new("csv"), Path::new("images/report/report-0.png")),
            PathBuf::from("csv/report-0.csv")
        );
    }

    #[test]
    fn zero_byte_record_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("page.csv");

        assert!(!record_is_complete(&record), "missing file");

        std::fs::write(&record, "").unwrap();
        assert!(!record_is_complete(&record), "zero-byte file");

        std::fs::write(&record, "1\t1\tword\t90.0\n").unwrap();
        assert!(record_is_complete(&record));
    }

    #[test]
    fn hidden_files_are_not_images() {
        assert!(is_hidden(Path::new("images/report/.manifest.json")));
        assert!(!is_hidden(Path::new("images/report/report-0.png")));
    }
}
