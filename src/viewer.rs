//! The PDF viewing component: render service plus per-page notes

use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use log::{debug, info, warn};

use crate::notes::{PageNotes, SessionStore};
use crate::pdf::{
    Command, DocumentSource, Effect, RenderService, RenderedPage, ServiceEvent, Size, ViewState,
};

/// What happened while pumping the viewer
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Loaded { name: String, pages: usize },
    LoadFailed(String),
    PageReady(usize),
    RenderFailed(String),
    NotesRestored(usize),
}

/// How notes are seeded when a document finishes loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotesOrigin {
    /// Pick up whatever the session holds for the document
    Session,
    /// Start from nothing
    Fresh,
}

pub struct Viewer {
    service: RenderService,
    notes: PageNotes,
    store: SessionStore,
    default_source: DocumentSource,
    origin: NotesOrigin,
}

impl Viewer {
    pub fn new(service: RenderService, store: SessionStore, default_source: DocumentSource) -> Self {
        Self {
            service,
            notes: PageNotes::new(),
            store,
            default_source,
            origin: NotesOrigin::Session,
        }
    }

    pub fn state(&self) -> &ViewState {
        self.service.state()
    }

    pub fn page_image(&self) -> Option<&RenderedPage> {
        self.service.current_page_image().map(|page| page.as_ref())
    }

    pub fn is_rendering(&self) -> bool {
        self.service.is_rendering()
    }

    pub fn in_flight(&self) -> usize {
        self.service.in_flight()
    }

    pub fn notes(&self) -> &PageNotes {
        &self.notes
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn default_source(&self) -> &DocumentSource {
        &self.default_source
    }

    /// Name of the loaded document
    pub fn document_name(&self) -> Option<&str> {
        self.state().info().map(|info| info.name.as_str())
    }

    /// Load the default document, restoring its session notes once loaded
    pub fn open_default(&mut self) {
        info!("Opening default document {}", self.default_source.name());
        self.notes.clear();
        self.origin = NotesOrigin::Session;
        let source = self.default_source.clone();
        self.apply(Command::OpenDocument(source));
    }

    /// Load a user-supplied document. Its notes start empty.
    pub fn open_upload(&mut self, source: DocumentSource) {
        let name = source.name();
        info!("Opening uploaded document {name}");
        self.notes.clear();
        if let Err(e) = self.store.discard(&name) {
            warn!("Could not discard session notes for {name}: {e:#}");
        }
        self.origin = NotesOrigin::Fresh;
        self.apply(Command::OpenDocument(source));
    }

    /// Apply a view command
    pub fn apply(&mut self, cmd: Command) {
        let effects = self.service.apply(cmd);
        if effects.contains(&Effect::RestoreNotes) {
            self.restore_notes();
        }
    }

    pub fn next_page(&mut self) {
        self.apply(Command::NextPage);
    }

    pub fn prev_page(&mut self) {
        self.apply(Command::PrevPage);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.apply(Command::GoToPage(page));
    }

    pub fn zoom_in(&mut self) {
        self.apply(Command::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        self.apply(Command::ZoomOut);
    }

    pub fn fit_page(&mut self) {
        self.apply(Command::FitPage);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.apply(Command::Pan { dx, dy });
    }

    pub fn set_container(&mut self, size: Size) {
        if self.state().container() != size {
            self.apply(Command::SetContainer(size));
        }
    }

    /// Note of the page being shown
    pub fn current_note(&self) -> &str {
        self.notes.content(self.state().current_page())
    }

    /// Replace the note of the current page and write it to the session
    pub fn set_current_note(&mut self, text: &str) -> Result<()> {
        let Some(info) = self.state().info() else {
            bail!("No document loaded");
        };
        let name = info.name.clone();
        let total = info.page_count;
        let page = self.state().current_page();

        self.notes.set(page, text);
        debug!("Note for page {page} of {name} is now {} chars", text.chars().count());

        if self.notes.is_empty() {
            self.store.discard(&name)
        } else {
            self.store.save(&self.notes.to_envelope(&name, total))
        }
    }

    fn restore_notes(&mut self) {
        self.notes.clear();
        if self.origin == NotesOrigin::Fresh {
            return;
        }
        let Some(name) = self.document_name().map(str::to_string) else {
            return;
        };

        match self.store.load(&name) {
            Ok(Some(envelope)) => {
                self.notes = PageNotes::from_envelope(envelope);
                debug!("Restored {} notes for {name}", self.notes.len());
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable session notes for {name}: {e:#}"),
        }
    }

    /// Handle finished work without blocking
    pub fn pump(&mut self) -> Vec<ViewerEvent> {
        let events = self.service.poll();
        events
            .into_iter()
            .flat_map(|event| self.translate(event))
            .collect()
    }

    /// Block until something happens or `timeout` elapses
    pub fn wait_for_event(&mut self, timeout: Duration) -> Vec<ViewerEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.service.wait_for_event(remaining) {
                Some(event) => {
                    let events = self.translate(event);
                    if !events.is_empty() {
                        return events;
                    }
                }
                None => return vec![],
            }
        }
    }

    fn translate(&mut self, event: ServiceEvent) -> Vec<ViewerEvent> {
        match event {
            ServiceEvent::DocumentLoaded { effects } => {
                let mut out = vec![];
                if let Some(info) = self.state().info() {
                    out.push(ViewerEvent::Loaded {
                        name: info.name.clone(),
                        pages: info.page_count,
                    });
                }
                if effects.contains(&Effect::RestoreNotes) {
                    self.restore_notes();
                    if !self.notes.is_empty() {
                        out.push(ViewerEvent::NotesRestored(self.notes.len()));
                    }
                }
                out
            }
            ServiceEvent::DocumentFailed { message } => vec![ViewerEvent::LoadFailed(message)],
            ServiceEvent::PageReady { page } => vec![ViewerEvent::PageReady(page)],
            ServiceEvent::RenderFailed { message } => vec![ViewerEvent::RenderFailed(message)],
        }
    }
}
