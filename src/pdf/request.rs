//! Render request and response types

use std::sync::Arc;

use super::cancel::RenderTask;
use super::types::{DocumentInfo, DocumentSource, RenderedPage};

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rasterizing a page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// User zoom scale, already clamped
    pub scale: f32,
    /// Surface pixels per PDF point at scale 1.0
    pub density: f32,
}

/// Request sent to the render worker
#[derive(Debug)]
pub enum RenderRequest {
    /// Open a document, replacing the current one
    Open {
        generation: u64,
        source: DocumentSource,
    },

    /// Rasterize a page (0-indexed) of the given document generation
    Render {
        id: RequestId,
        generation: u64,
        page: usize,
        params: RenderParams,
        task: RenderTask,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the PDF engine and render worker
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("render cancelled")]
    Cancelled,

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    /// Document opened
    Loaded { generation: u64, info: DocumentInfo },

    /// Document could not be opened
    LoadFailed {
        generation: u64,
        error: WorkerFault,
    },

    /// Rasterized page
    Page {
        id: RequestId,
        generation: u64,
        data: Arc<RenderedPage>,
    },

    /// Request was cancelled before it completed
    Cancelled(RequestId),

    /// Error during rendering
    Error { id: RequestId, error: WorkerFault },
}
