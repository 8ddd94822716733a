//! PDF viewing infrastructure

mod cache;
mod cancel;
mod engine;
#[cfg(feature = "pdf")]
mod mupdf_engine;
mod request;
mod service;
mod state;
mod types;
mod worker;
mod zoom;

pub use cache::{CacheKey, PageCache};
pub use cancel::RenderTask;
pub use engine::{PdfDocument, PdfEngine, default_engine};
pub use request::{RenderParams, RenderRequest, RenderResponse, RequestId, WorkerFault};
pub use service::{RenderService, ServiceEvent};
pub use state::{Command, DEFAULT_DENSITY, Effect, ViewState};
pub use types::*;
pub use zoom::*;

/// Number of rendered pages kept around for instant revisits
pub const DEFAULT_CACHE_SIZE: usize = 16;
