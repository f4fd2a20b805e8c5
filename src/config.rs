//! Configuration for the two pipelines.
//!
//! Each pipeline takes an explicit config value at the call site — there is
//! no global state. Conversion and extraction have independent knobs because
//! their costs differ: conversion is memory-bound (whole documents of pages
//! in flight), extraction is engine-bound (one image per recognition call).

use crate::error::PipelineError;

/// Configuration for the conversion (PDF → page images) pipeline.
///
/// Built via [`ConvertConfig::builder()`] or [`ConvertConfig::default()`].
///
/// # Example
/// ```rust
/// use disclosure_pipeline::ConvertConfig;
///
/// let config = ConvertConfig::builder()
///     .extension(".png")
///     .concurrency(8)
///     .max_batch_weight(250)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Output image file extension, including the leading dot. Default: `.png`.
    pub extension: String,

    /// Worker-pool concurrency for entries within a batch.
    ///
    /// Default: 70% of the logical CPU count, at least 1. Rendering is
    /// CPU-bound, so saturating every core just trades throughput for an
    /// unresponsive machine.
    pub concurrency: usize,

    /// Maximum cumulative page count per batch. Default: 100.
    ///
    /// Every page rendered within a batch is held in memory until written,
    /// so this bound is the peak-memory knob. A single document with more
    /// pages than this still converts — alone, in an oversized batch.
    pub max_batch_weight: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            extension: ".png".to_string(),
            concurrency: default_convert_concurrency(),
            max_batch_weight: 100,
        }
    }
}

fn default_convert_concurrency() -> usize {
    ((num_cpus::get() as f64 * 0.7).floor() as usize).max(1)
}

impl ConvertConfig {
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    /// Output extension; a missing leading dot is added.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.config.extension = if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        };
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_batch_weight(mut self, pages: usize) -> Self {
        self.config.max_batch_weight = pages;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConvertConfig, PipelineError> {
        let c = &self.config;
        if c.extension.len() < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "extension must name a format, got '{}'",
                c.extension
            )));
        }
        if c.max_batch_weight == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_batch_weight must be at least 1 page".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the extraction (image → TSV records) pipeline.
///
/// No weight-based batching here: every image is roughly uniform cost, so a
/// fixed concurrency cap on the recognition engine suffices.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Worker-pool concurrency for recognition calls. Default: 25.
    pub concurrency: usize,

    /// Maximum number of newly discovered images to process in one run.
    /// Already-extracted images never count against the limit.
    /// Default: unlimited.
    pub limit: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            concurrency: 25,
            limit: None,
        }
    }
}

impl ExtractConfig {
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.config.limit = Some(n);
        self
    }

    pub fn build(self) -> Result<ExtractConfig, PipelineError> {
        Ok(self.config)
    }
}
