//! Seam between the viewer and the PDF library
//!
//! Documents are opened on the worker thread and never leave it, so only
//! the engine itself has to be `Send + Sync`.

use std::sync::Arc;

use super::cancel::RenderTask;
use super::request::{RenderParams, WorkerFault};
use super::types::{DocumentSource, PageSize, RenderedPage};

/// Opens documents
pub trait PdfEngine: Send + Sync {
    fn open(&self, source: &DocumentSource) -> Result<Box<dyn PdfDocument>, WorkerFault>;
}

/// An opened document
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    fn title(&self) -> Option<String> {
        None
    }

    /// Size of a 0-indexed page in points
    fn page_size(&self, page: usize) -> Result<PageSize, WorkerFault>;

    /// Rasterize a 0-indexed page. Implementations should bail out with
    /// [`WorkerFault::Cancelled`] once `task` is cancelled.
    fn render(
        &self,
        page: usize,
        params: &RenderParams,
        task: &RenderTask,
    ) -> Result<RenderedPage, WorkerFault>;
}

/// The engine compiled into this build
pub fn default_engine() -> Arc<dyn PdfEngine> {
    #[cfg(feature = "pdf")]
    {
        Arc::new(super::mupdf_engine::MupdfEngine)
    }

    #[cfg(not(feature = "pdf"))]
    {
        Arc::new(UnavailableEngine)
    }
}

/// Placeholder used when the crate is built without a PDF backend
#[cfg(not(feature = "pdf"))]
struct UnavailableEngine;

#[cfg(not(feature = "pdf"))]
impl PdfEngine for UnavailableEngine {
    fn open(&self, _source: &DocumentSource) -> Result<Box<dyn PdfDocument>, WorkerFault> {
        Err(WorkerFault::generic(
            "PDF support is not compiled in (enable the `pdf` feature)",
        ))
    }
}

pub(crate) fn check_page(page: usize, page_count: usize) -> Result<(), WorkerFault> {
    if page < page_count {
        Ok(())
    } else {
        Err(WorkerFault::PageOutOfRange { page, page_count })
    }
}

pub(crate) fn check_cancelled(task: &RenderTask) -> Result<(), WorkerFault> {
    if task.is_cancelled() {
        Err(WorkerFault::Cancelled)
    } else {
        Ok(())
    }
}
