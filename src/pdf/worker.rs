//! PDF render worker - runs in a dedicated thread
//!
//! The worker owns the open document. Opening a new one replaces it
//! wholesale; render requests for any other generation are answered as
//! cancelled.

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cancel::RenderTask;
use super::engine::{PdfDocument, PdfEngine};
use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId, WorkerFault};
use super::types::{DocumentInfo, DocumentSource, PageSize};

struct OpenDocument {
    generation: u64,
    doc: Box<dyn PdfDocument>,
}

/// Main worker function
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    engine: Arc<dyn PdfEngine>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let mut current: Option<OpenDocument> = None;

    for request in requests {
        match request {
            RenderRequest::Open { generation, source } => {
                // Drop the previous document before opening the next one
                current = None;
                match open_document(engine.as_ref(), &source) {
                    Ok((doc, info)) => {
                        debug!(
                            "Opened {} ({} pages, generation {generation})",
                            info.name, info.page_count
                        );
                        current = Some(OpenDocument { generation, doc });
                        let _ = responses.send(RenderResponse::Loaded { generation, info });
                    }
                    Err(error) => {
                        warn!("Failed to open {}: {error}", source.name());
                        let _ = responses.send(RenderResponse::LoadFailed { generation, error });
                    }
                }
            }

            RenderRequest::Render {
                id,
                generation,
                page,
                params,
                task,
            } => {
                let response = match current.as_ref() {
                    Some(open) if open.generation == generation => {
                        render(open, id, page, &params, &task)
                    }
                    _ => RenderResponse::Cancelled(id),
                };
                let _ = responses.send(response);
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn open_document(
    engine: &dyn PdfEngine,
    source: &DocumentSource,
) -> Result<(Box<dyn PdfDocument>, DocumentInfo), WorkerFault> {
    let doc = engine.open(source)?;
    let page_count = doc.page_count();

    let page_sizes = (0..page_count)
        .map(|page| {
            doc.page_size(page).unwrap_or_else(|e| {
                warn!("Could not read size of page {page}: {e}");
                PageSize::LETTER
            })
        })
        .collect();

    let info = DocumentInfo {
        name: source.name(),
        page_count,
        title: doc.title(),
        page_sizes,
    };

    Ok((doc, info))
}

fn render(
    open: &OpenDocument,
    id: RequestId,
    page: usize,
    params: &RenderParams,
    task: &RenderTask,
) -> RenderResponse {
    if task.is_cancelled() {
        return RenderResponse::Cancelled(id);
    }

    match open.doc.render(page, params, task) {
        Ok(_) if task.is_cancelled() => RenderResponse::Cancelled(id),
        Ok(data) => RenderResponse::Page {
            id,
            generation: open.generation,
            data: Arc::new(data),
        },
        Err(WorkerFault::Cancelled) => RenderResponse::Cancelled(id),
        Err(error) => RenderResponse::Error { id, error },
    }
}
