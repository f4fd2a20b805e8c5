//! Weight-aware batch planning.
//!
//! Documents vary wildly in page count, and every page rendered within a
//! batch is held in memory until written. Grouping sources by cumulative
//! page count instead of by entry count keeps peak memory roughly constant
//! regardless of how the pages are distributed across files.

use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An ordered, weight-bounded group of source entries.
///
/// Produced once per planning call and immutable thereafter. Batches are
/// processed strictly one at a time; entries within a batch run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<PathBuf>,
    weight: usize,
}

impl Batch {
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Cumulative weight (total page count) of the batch.
    pub fn weight(&self) -> usize {
        self.weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Partition `entries` into weight-bounded batches, preserving input order
/// within and across batches.
///
/// Greedy linear scan: when appending an entry to the current non-empty
/// batch would push its cumulative weight past `max_weight`, the batch is
/// closed and a new one started with that entry. A single entry whose own
/// weight exceeds `max_weight` occupies a batch alone — entries are never
/// split.
///
/// # Errors
/// A probe failure aborts planning immediately with no partial result.
pub fn plan_batches<F>(
    entries: &[PathBuf],
    mut probe: F,
    max_weight: usize,
) -> Result<Vec<Batch>, PipelineError>
where
    F: FnMut(&Path) -> Result<usize, PipelineError>,
{
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut current_weight = 0usize;

    for entry in entries {
        let weight = probe(entry)?;

        if !current.is_empty() && current_weight + weight > max_weight {
            batches.push(Batch {
                entries: std::mem::take(&mut current),
                weight: current_weight,
            });
            current_weight = 0;
        }

        if weight > max_weight {
            warn!(
                entry = %entry.display(),
                weight,
                max_weight,
                "entry exceeds the batch weight limit; processing it in an oversized batch of one"
            );
        }

        current.push(entry.clone());
        current_weight += weight;
    }

    if !current.is_empty() {
        batches.push(Batch {
            entries: current,
            weight: current_weight,
        });
    }

    debug!(
        entries = entries.len(),
        batches = batches.len(),
        max_weight,
        "planned batches"
    );
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn probe_from(weights: &[(&str, usize)]) -> impl FnMut(&Path) -> Result<usize, PipelineError> {
        let map: HashMap<PathBuf, usize> = weights
            .iter()
            .map(|(n, w)| (PathBuf::from(n), *w))
            .collect();
        move |p: &Path| Ok(map[p])
    }

    #[test]
    fn weights_2_3_6_with_max_5_split_after_second() {
        let entries = paths(&["a.pdf", "b.pdf", "c.pdf"]);
        let probe = probe_from(&[("a.pdf", 2), ("b.pdf", 3), ("c.pdf", 6)]);

        let batches = plan_batches(&entries, probe, 5).unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].entries(), &paths(&["a.pdf", "b.pdf"])[..]);
        assert_eq!(batches[0].weight(), 5);
        assert_eq!(batches[1].entries(), &paths(&["c.pdf"])[..]);
        assert_eq!(batches[1].weight(), 6);
    }

    #[test]
    fn oversized_entry_gets_its_own_batch() {
        let entries = paths(&["small.pdf", "huge.pdf", "tiny.pdf"]);
        let probe = probe_from(&[("small.pdf", 3), ("huge.pdf", 40), ("tiny.pdf", 1)]);

        let batches = plan_batches(&entries, probe, 10).unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].entries(), &paths(&["huge.pdf"])[..]);
        assert_eq!(batches[1].weight(), 40);
        assert_eq!(batches[2].entries(), &paths(&["tiny.pdf"])[..]);
    }

    #[test]
    fn oversized_first_entry_does_not_create_a_leading_empty_batch() {
        let entries = paths(&["huge.pdf", "small.pdf"]);
        let probe = probe_from(&[("huge.pdf", 99), ("small.pdf", 1)]);

        let batches = plan_batches(&entries, probe, 10).unwrap();

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| !b.is_empty()));
        assert_eq!(batches[0].entries(), &paths(&["huge.pdf"])[..]);
    }

    #[test]
    fn order_is_preserved_within_and_across_batches() {
        let names: Vec<String> = (0..9).map(|i| format!("{i}.pdf")).collect();
        let entries: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();

        let batches = plan_batches(&entries, |_| Ok(2), 6).unwrap();

        let flattened: Vec<PathBuf> = batches
            .iter()
            .flat_map(|b| b.entries().iter().cloned())
            .collect();
        assert_eq!(flattened, entries);
        for batch in &batches {
            assert!(batch.weight() <= 6);
        }
    }

    #[test]
    fn empty_input_plans_no_batches() {
        let batches = plan_batches(&[], |_| Ok(1), 10).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn probe_failure_aborts_with_no_partial_result() {
        let entries = paths(&["a.pdf", "bad.pdf", "c.pdf"]);
        let result = plan_batches(
            &entries,
            |p: &Path| {
                if p.ends_with("bad.pdf") {
                    Err(PipelineError::Planning {
                        path: p.to_path_buf(),
                        detail: "unreadable".into(),
                    })
                } else {
                    Ok(1)
                }
            },
            10,
        );
        assert!(matches!(result, Err(PipelineError::Planning { .. })));
    }
}
