//! Page-rendering collaborator: open a document, count pages, rasterise.
//!
//! The pipelines consume rendering through the narrow [`PageRenderer`] trait
//! so tests can substitute a synthetic renderer and the production backend
//! can change without touching batch or pool logic. The default backend is
//! pdfium via `pdfium-render`.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 attachment at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_pixels` caps the longest edge regardless
//! of physical page size, keeping per-page memory bounded — which is what
//! makes the planner's page-count weighting a meaningful memory proxy.

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from the rendering collaborator.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The document could not be opened (missing, unreadable, or corrupt).
    #[error("cannot open document '{path}': {detail}")]
    Open { path: PathBuf, detail: String },

    /// A single page failed to rasterise.
    #[error("failed to rasterise page {page} of '{path}': {detail}")]
    Page {
        path: PathBuf,
        page: usize,
        detail: String,
    },
}

/// Narrow interface over the page-rendering engine.
///
/// Implementations are shared across worker threads, so they must be
/// `Send + Sync` and must not keep per-call mutable state.
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document. Fails on corrupt or unreadable
    /// input. Doubles as the batch planner's weight probe.
    fn page_count(&self, document: &Path) -> Result<usize, RenderError>;

    /// Rasterise every page of the document, in source order.
    fn render_pages(&self, document: &Path) -> Result<Vec<DynamicImage>, RenderError>;
}

/// pdfium-backed renderer.
///
/// Each call binds pdfium, loads the document, works, and releases it —
/// documents are never held across calls, so worker threads never contend
/// on a shared document handle.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    /// Maximum rendered dimension (width or height) in pixels.
    max_pixels: u32,
}

impl Default for PdfiumRenderer {
    fn default() -> Self {
        Self { max_pixels: 2000 }
    }
}

impl PdfiumRenderer {
    pub fn new(max_pixels: u32) -> Self {
        Self {
            max_pixels: max_pixels.max(100),
        }
    }

    fn load<'a>(
        &self,
        pdfium: &'a Pdfium,
        path: &Path,
    ) -> Result<PdfDocument<'a>, RenderError> {
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| RenderError::Open {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, document: &Path) -> Result<usize, RenderError> {
        let pdfium = Pdfium::default();
        let doc = self.load(&pdfium, document)?;
        Ok(doc.pages().len() as usize)
    }

    fn render_pages(&self, document: &Path) -> Result<Vec<DynamicImage>, RenderError> {
        let pdfium = Pdfium::default();
        let doc = self.load(&pdfium, document)?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(doc.pages().len() as usize);
        for (index, page) in doc.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| RenderError::Page {
                    path: document.to_path_buf(),
                    page: index,
                    detail: format!("{e:?}"),
                })?;
            let image = bitmap.as_image();
            debug!(
                document = %document.display(),
                page = index,
                width = image.width(),
                height = image.height(),
                "rendered page"
            );
            images.push(image);
        }

        Ok(images)
    }
}
