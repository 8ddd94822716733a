//! Render service - owns the view state, the worker, and the page cache

use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, error, info, warn};

use super::cache::{CacheKey, PageCache};
use super::cancel::RenderTask;
use super::engine::PdfEngine;
use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId};
use super::state::{Command, Effect, ViewState};
use super::types::{DocumentSource, RenderedPage};
use super::worker::render_worker;
use super::zoom::Zoom;
use super::DEFAULT_CACHE_SIZE;

const WORKER_STOPPED: &str = "Render worker stopped";

/// The one rasterization currently allowed to be in flight
#[derive(Debug)]
struct ActiveRender {
    id: RequestId,
    page: usize,
    task: RenderTask,
}

/// Something the owner of the service may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// A document finished loading; carries the effects of the transition
    DocumentLoaded { effects: Vec<Effect> },
    /// A document failed to load
    DocumentFailed { message: String },
    /// The current page image is ready
    PageReady { page: usize },
    /// Rendering the current page failed
    RenderFailed { message: String },
}

/// Manages PDF rendering with a worker thread and caching
pub struct RenderService {
    state: ViewState,
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    active: Option<ActiveRender>,
    cache: PageCache,
    current: Option<Arc<RenderedPage>>,
    worker_gone: bool,
}

impl RenderService {
    /// Create a new render service with default configuration
    #[must_use]
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        Self::with_config(
            engine,
            Zoom::default(),
            super::state::DEFAULT_DENSITY,
            DEFAULT_CACHE_SIZE,
        )
    }

    /// Create a new render service with custom configuration
    #[must_use]
    pub fn with_config(
        engine: Arc<dyn PdfEngine>,
        zoom: Zoom,
        density: f32,
        cache_size: usize,
    ) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        std::thread::spawn(move || {
            render_worker(engine, request_rx, response_tx);
        });

        Self {
            state: ViewState::new(zoom, density),
            request_tx,
            response_rx,
            next_request_id: 1,
            active: None,
            cache: PageCache::new(cache_size),
            current: None,
            worker_gone: false,
        }
    }

    /// Get current view state
    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Image of the current page at the current scale, if rendered
    #[must_use]
    pub fn current_page_image(&self) -> Option<&Arc<RenderedPage>> {
        self.current.as_ref()
    }

    /// Whether a rasterization is in flight
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.active.is_some()
    }

    /// Number of rasterizations in flight (never more than one)
    #[must_use]
    pub fn in_flight(&self) -> usize {
        usize::from(self.active.is_some())
    }

    /// Apply a command to the view state, executing render effects.
    ///
    /// All effects are returned so the caller can handle the ones outside
    /// rendering (notes).
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        let effects = self.state.apply(cmd);
        self.execute_effects(&effects);
        effects
    }

    fn execute_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::CancelRender => self.cancel_active(),

                Effect::InvalidateCache => {
                    self.cache.invalidate_all();
                    self.current = None;
                }

                Effect::LoadDocument(source) => self.load_document(source.clone()),

                Effect::RenderCurrentPage => self.render_current_page(),

                Effect::RestoreNotes => {}
            }
        }
    }

    fn load_document(&mut self, source: DocumentSource) {
        info!("Loading document {}", source.name());
        let generation = self.state.generation();
        if self
            .request_tx
            .send(RenderRequest::Open { generation, source })
            .is_err()
        {
            error!("Render worker is gone; cannot load document");
            self.worker_gone = true;
            let _ = self.state.apply(Command::DocumentFailed {
                generation,
                message: WORKER_STOPPED.to_string(),
            });
        }
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("Cancelling render {:?} of page {}", active.id, active.page);
            active.task.cancel();
        }
    }

    fn render_current_page(&mut self) {
        if !self.state.has_document() {
            return;
        }

        let page = self.state.current_page() - 1;
        let params = RenderParams {
            scale: self.state.scale(),
            density: self.state.density(),
        };
        let key = CacheKey::new(self.state.generation(), page, params.scale);

        if let Some(cached) = self.cache.get(&key) {
            self.cancel_active();
            self.current = Some(cached);
            let _ = self.state.apply(Command::PageRendered);
            return;
        }

        // Keep showing the previous image only if it is the same page
        if self.current.as_ref().is_some_and(|c| c.page != page) {
            self.current = None;
        }

        self.start_render(page, params);
    }

    fn start_render(&mut self, page: usize, params: RenderParams) {
        self.cancel_active();

        let id = self.next_id();
        let task = RenderTask::new();
        let request = RenderRequest::Render {
            id,
            generation: self.state.generation(),
            page,
            params,
            task: task.clone(),
        };

        if self.request_tx.send(request).is_err() {
            error!("Render worker is gone; cannot render page {page}");
            self.worker_gone = true;
            let _ = self
                .state
                .apply(Command::RenderFailed(WORKER_STOPPED.to_string()));
            return;
        }

        self.active = Some(ActiveRender { id, page, task });
    }

    /// Poll for completed worker responses
    pub fn poll(&mut self) -> Vec<ServiceEvent> {
        let mut events = vec![];

        loop {
            match self.response_rx.try_recv() {
                Ok(response) => {
                    if let Some(event) = self.handle_response(response) {
                        events.push(event);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    events.extend(self.worker_lost());
                    break;
                }
            }
        }

        events
    }

    /// The worker thread ended without being asked to. Surfaced once.
    fn worker_lost(&mut self) -> Option<ServiceEvent> {
        if self.worker_gone {
            return None;
        }
        self.worker_gone = true;
        self.active = None;
        error!("Render worker exited unexpectedly");

        let message = WORKER_STOPPED.to_string();
        if self.state.is_loading() {
            let _ = self.state.apply(Command::DocumentFailed {
                generation: self.state.generation(),
                message: message.clone(),
            });
            Some(ServiceEvent::DocumentFailed { message })
        } else {
            let _ = self.state.apply(Command::RenderFailed(message.clone()));
            Some(ServiceEvent::RenderFailed { message })
        }
    }

    /// Block until one response arrives and handle it
    pub fn wait_for_event(&mut self, timeout: Duration) -> Option<ServiceEvent> {
        let deadline = std::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(event) = self.handle_response(response) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return self.worker_lost(),
            }
        }
    }

    fn handle_response(&mut self, response: RenderResponse) -> Option<ServiceEvent> {
        match response {
            RenderResponse::Loaded { generation, info } => {
                let effects = self.apply(Command::DocumentLoaded { generation, info });
                if generation != self.state.generation() {
                    debug!("Dropping stale document load (generation {generation})");
                    return None;
                }
                if let Some(message) = self.state.error() {
                    return Some(ServiceEvent::DocumentFailed {
                        message: message.to_string(),
                    });
                }
                Some(ServiceEvent::DocumentLoaded { effects })
            }

            RenderResponse::LoadFailed { generation, error } => {
                if generation != self.state.generation() {
                    return None;
                }
                let message = error.to_string();
                let _ = self.apply(Command::DocumentFailed {
                    generation,
                    message: message.clone(),
                });
                Some(ServiceEvent::DocumentFailed { message })
            }

            RenderResponse::Page {
                id,
                generation,
                data,
            } => {
                if generation != self.state.generation() {
                    return None;
                }
                self.cache
                    .insert(CacheKey::new(generation, data.page, data.scale), data.clone());

                if !self.is_active(id) {
                    return None;
                }
                self.active = None;
                let page = data.page + 1;
                self.current = Some(data);
                let _ = self.state.apply(Command::PageRendered);
                Some(ServiceEvent::PageReady { page })
            }

            RenderResponse::Cancelled(id) => {
                if self.is_active(id) {
                    self.active = None;
                }
                None
            }

            RenderResponse::Error { id, error } => {
                if !self.is_active(id) {
                    return None;
                }
                self.active = None;
                let message = error.to_string();
                warn!("Render failed: {message}");
                let _ = self.apply(Command::RenderFailed(message.clone()));
                Some(ServiceEvent::RenderFailed { message })
            }
        }
    }

    fn is_active(&self, id: RequestId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }

    /// Shutdown the worker
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.cancel_active();
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeEngine;

    const WAIT: Duration = Duration::from_secs(5);

    fn loaded_service(engine: FakeEngine) -> RenderService {
        let mut service = RenderService::with_config(Arc::new(engine), Zoom::default(), 0.1, 8);
        let _ = service.apply(Command::OpenDocument(DocumentSource::bytes(
            "doc.pdf",
            vec![1u8],
        )));
        match service.wait_for_event(WAIT) {
            Some(ServiceEvent::DocumentLoaded { .. }) => {}
            other => panic!("document did not load: {other:?}"),
        }
        service
    }

    fn wait_for_page(service: &mut RenderService) -> usize {
        loop {
            match service.wait_for_event(WAIT) {
                Some(ServiceEvent::PageReady { page }) => return page,
                Some(_) => continue,
                None => panic!("no page rendered"),
            }
        }
    }

    #[test]
    fn load_then_render_first_page() {
        let mut service = loaded_service(FakeEngine::with_pages(3));
        assert_eq!(service.state().page_count(), 3);
        assert!(service.is_rendering());

        assert_eq!(wait_for_page(&mut service), 1);
        assert!(!service.is_rendering());
        assert_eq!(service.current_page_image().map(|p| p.page), Some(0));
    }

    #[test]
    fn new_render_cancels_previous() {
        let engine = FakeEngine::with_pages(5).with_render_delay(Duration::from_millis(200));
        let mut service = loaded_service(engine);
        let first = service.active.as_ref().map(|a| a.task.clone()).unwrap();

        let _ = service.apply(Command::NextPage);
        let second = service.active.as_ref().map(|a| a.task.clone()).unwrap();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(service.in_flight(), 1);

        assert_eq!(wait_for_page(&mut service), 2);
        assert_eq!(service.in_flight(), 0);
    }

    #[test]
    fn revisit_is_served_from_cache() {
        let engine = FakeEngine::with_pages(3);
        let renders = engine.render_count();
        let mut service = loaded_service(engine);
        assert_eq!(wait_for_page(&mut service), 1);

        let _ = service.apply(Command::NextPage);
        assert_eq!(wait_for_page(&mut service), 2);

        let _ = service.apply(Command::PrevPage);
        assert!(!service.is_rendering());
        assert_eq!(service.current_page_image().map(|p| p.page), Some(0));
        assert_eq!(renders.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn load_failure_surfaces_engine_message() {
        let mut service = RenderService::new(Arc::new(FakeEngine::failing("not a PDF")));
        let _ = service.apply(Command::OpenDocument(DocumentSource::bytes(
            "junk.bin",
            vec![0u8],
        )));

        match service.wait_for_event(WAIT) {
            Some(ServiceEvent::DocumentFailed { message }) => assert!(message.contains("not a PDF")),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(service.state().error(), Some("not a PDF"));
        assert!(!service.state().is_loading());
    }

    #[test]
    fn reopen_discards_old_generation() {
        let engine = FakeEngine::with_pages(2)
            .with_document("big.pdf", 9)
            .with_render_delay(Duration::from_millis(100));
        let mut service = loaded_service(engine);

        let _ = service.apply(Command::OpenDocument(DocumentSource::bytes(
            "big.pdf",
            vec![1u8],
        )));
        assert!(!service.is_rendering());

        loop {
            match service.wait_for_event(WAIT) {
                Some(ServiceEvent::DocumentLoaded { .. }) => break,
                Some(ServiceEvent::PageReady { .. }) => panic!("stale page delivered"),
                Some(_) => continue,
                None => panic!("document did not load"),
            }
        }
        assert_eq!(service.state().page_count(), 9);
        assert_eq!(wait_for_page(&mut service), 1);
    }

    #[test]
    fn successful_render_clears_earlier_error() {
        let engine = FakeEngine::with_pages(2).with_failing_scale(1.0, "transient");
        let mut service = loaded_service(engine);

        match service.wait_for_event(WAIT) {
            Some(ServiceEvent::RenderFailed { message }) => assert_eq!(message, "transient"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(service.state().error(), Some("transient"));

        let _ = service.apply(Command::ZoomIn);
        assert_eq!(wait_for_page(&mut service), 1);
        assert_eq!(service.state().error(), None);
        assert_eq!(service.current_page_image().map(|p| p.scale), Some(1.25));
    }

    #[test]
    fn cached_page_clears_earlier_error() {
        let engine = FakeEngine::with_pages(2).with_failing_scale(1.25, "transient");
        let mut service = loaded_service(engine);
        assert_eq!(wait_for_page(&mut service), 1);

        let _ = service.apply(Command::ZoomIn);
        match service.wait_for_event(WAIT) {
            Some(ServiceEvent::RenderFailed { .. }) => {}
            other => panic!("unexpected event {other:?}"),
        }

        let _ = service.apply(Command::ZoomOut);
        assert!(!service.is_rendering());
        assert_eq!(service.state().error(), None);
    }

    #[test]
    fn crashed_worker_is_reported_once() {
        let mut service = loaded_service(FakeEngine::with_pages(2).panicking_on_render());

        match service.wait_for_event(WAIT) {
            Some(ServiceEvent::RenderFailed { message }) => assert_eq!(message, WORKER_STOPPED),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!service.is_rendering());
        assert_eq!(service.state().error(), Some(WORKER_STOPPED));
        assert!(service.poll().is_empty());

        let _ = service.apply(Command::OpenDocument(DocumentSource::bytes(
            "again.pdf",
            vec![1u8],
        )));
        assert!(!service.state().is_loading());
        assert_eq!(service.state().error(), Some(WORKER_STOPPED));
    }
}
