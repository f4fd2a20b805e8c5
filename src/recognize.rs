//! Text-recognition collaborator and the tab-separated record format.
//!
//! Recognition is consumed through the narrow [`TextRecognizer`] trait: set
//! an image, get back word-level results or fail. The engine itself (model,
//! language data, process boundaries) is the caller's concern; the pipeline
//! only needs ordered records it can serialise.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error from the recognition collaborator.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct RecognizeError {
    pub detail: String,
}

impl RecognizeError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Narrow interface over the text-recognition engine.
pub trait TextRecognizer: Send + Sync {
    /// Run recognition on the image at `image`, returning word-level results
    /// in reading order.
    fn recognize(&self, image: &Path) -> Result<Vec<ExtractionRecord>, RecognizeError>;
}

/// One word-level recognition result.
///
/// Serialised as a tab-separated row `lineNum, wordNum, word, confidence`
/// with no header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub line_num: u32,
    pub word_num: u32,
    pub word: String,
    /// Engine confidence in `[0, 100]`.
    pub confidence: f64,
}

impl ExtractionRecord {
    /// Build a record from raw engine output.
    ///
    /// All whitespace (including newlines and the tab that would corrupt the
    /// record format) is stripped from the word; confidence is clamped into
    /// `[0, 100]`.
    pub fn new(line_num: u32, word_num: u32, raw_word: &str, confidence: f64) -> Self {
        Self {
            line_num,
            word_num,
            word: raw_word.chars().filter(|c| !c.is_whitespace()).collect(),
            confidence: confidence.clamp(0.0, 100.0),
        }
    }
}

/// Write `records` to `path` as tab-separated rows, no header.
pub fn write_records(records: &[ExtractionRecord], path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_strips_whitespace_and_clamps_confidence() {
        let r = ExtractionRecord::new(1, 2, " Mem\nber ", 104.2);
        assert_eq!(r.word, "Member");
        assert_eq!(r.confidence, 100.0);

        let r = ExtractionRecord::new(1, 3, "AAPL", -0.5);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn records_serialise_as_headerless_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.csv");

        let records = vec![
            ExtractionRecord::new(1, 1, "Financial", 96.5),
            ExtractionRecord::new(1, 2, "Disclosure", 91.0),
            ExtractionRecord::new(2, 1, "2023", 88.25),
        ];
        write_records(&records, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3, "no header row expected");
        assert_eq!(lines[0], "1\t1\tFinancial\t96.5");
        assert_eq!(lines[2], "2\t1\t2023\t88.25");
    }

    #[test]
    fn empty_result_set_writes_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        write_records(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
