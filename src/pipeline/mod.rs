//! The two batch pipelines built on the planner, pool, and failure log.
//!
//! ```text
//! convert:  {pdf_root}/*.pdf ──▶ {image_root}/{base}/{base}-{page}.{ext}
//! extract:  {image_root}/*/*.png ──▶ {record_root}/{stem}.csv
//! ```
//!
//! Both pipelines share the same shape — discover work, skip what is already
//! done, run the rest on a bounded [`crate::pool::WorkerPool`], fold the
//! reports into a [`crate::failures::FailureLog`], persist the failure list —
//! and differ only in how work is grouped: conversion batches entries by
//! cumulative page weight to bound memory, extraction relies on a fixed
//! concurrency cap because items are uniform cost.

pub mod convert;
pub mod extract;
