//! View state management
//!
//! All view transitions go through [`ViewState::apply`], which mutates the
//! state and returns the effects the owner has to carry out (cancel the
//! in-flight render, load a document, render the current page, restore
//! notes). Page numbers here are 1-based.

use super::types::{DocumentInfo, DocumentSource, Pan, Size};
use super::zoom::{self, Zoom};

/// Default surface pixels per PDF point at scale 1.0.
///
/// A Letter page at 100% becomes 76x99 half-block pixels.
pub const DEFAULT_DENSITY: f32 = 0.125;

/// Current view state for a PDF document
#[derive(Clone, Debug)]
pub struct ViewState {
    current_page: usize,
    page_count: usize,
    zoom: Zoom,
    pan: Pan,
    container: Size,
    density: f32,
    loading: bool,
    error: Option<String>,
    generation: u64,
    info: Option<DocumentInfo>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Zoom::default(), DEFAULT_DENSITY)
    }
}

impl ViewState {
    #[must_use]
    pub fn new(zoom: Zoom, density: f32) -> Self {
        let density = if density.is_finite() && density > 0.0 {
            density
        } else {
            DEFAULT_DENSITY
        };
        Self {
            current_page: 1,
            page_count: 0,
            zoom,
            pan: Pan::ORIGIN,
            container: Size::default(),
            density,
            loading: false,
            error: None,
            generation: 0,
            info: None,
        }
    }

    /// Current page (1-based)
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn scale(&self) -> f32 {
        self.zoom.scale()
    }

    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn pan(&self) -> Pan {
        self.pan
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        self.info.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.info.is_some() && self.page_count > 0
    }

    /// Pixel rectangle the current page occupies at the current scale
    pub fn viewport(&self) -> Size {
        let page = self
            .info
            .as_ref()
            .map(|info| info.page_size(self.current_page))
            .unwrap_or(super::types::PageSize::LETTER);
        zoom::viewport(page, self.zoom.scale(), self.density)
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::OpenDocument(source) => {
                self.generation += 1;
                self.loading = true;
                self.error = None;
                self.info = None;
                self.page_count = 0;
                self.current_page = 1;
                self.pan = Pan::ORIGIN;
                vec![
                    Effect::CancelRender,
                    Effect::InvalidateCache,
                    Effect::LoadDocument(source),
                ]
            }

            Command::DocumentLoaded { generation, info } => {
                if generation != self.generation {
                    return vec![];
                }
                self.loading = false;
                self.page_count = info.page_count;
                self.current_page = 1;
                self.pan = Pan::ORIGIN;
                self.info = Some(info);

                if self.page_count == 0 {
                    self.error = Some("Document has no pages".to_string());
                    return vec![];
                }
                vec![Effect::RenderCurrentPage, Effect::RestoreNotes]
            }

            Command::DocumentFailed {
                generation,
                message,
            } => {
                if generation != self.generation {
                    return vec![];
                }
                self.loading = false;
                self.error = Some(message);
                vec![]
            }

            Command::GoToPage(page) => self.go_to_page(page),
            Command::NextPage => self.go_to_page(self.current_page.saturating_add(1)),
            Command::PrevPage => self.go_to_page(self.current_page.saturating_sub(1)),
            Command::FirstPage => self.go_to_page(1),
            Command::LastPage => self.go_to_page(self.page_count),

            Command::ZoomIn => self.rezoom(|zoom, _| zoom.step_in()),
            Command::ZoomOut => self.rezoom(|zoom, _| zoom.step_out()),
            Command::SetScale(scale) => self.rezoom(|zoom, _| zoom.set(scale)),
            Command::ResetZoom => self.rezoom(|zoom, _| zoom.reset()),
            Command::FitPage => self.rezoom(|zoom, state| {
                let page = state
                    .info
                    .as_ref()
                    .map(|info| info.page_size(state.current_page))
                    .unwrap_or(super::types::PageSize::LETTER);
                zoom.set(zoom::fit_scale(page, state.container, state.density));
            }),

            Command::Pan { dx, dy } => {
                self.pan = zoom::clamp_pan(self.pan.offset(dx, dy), self.viewport(), self.container);
                vec![]
            }

            Command::ResetPan => {
                self.pan = Pan::ORIGIN;
                vec![]
            }

            Command::SetContainer(size) => {
                self.container = size;
                self.pan = zoom::clamp_pan(self.pan, self.viewport(), self.container);
                vec![]
            }

            Command::RenderFailed(message) => {
                self.error = Some(message);
                vec![]
            }

            Command::PageRendered => {
                self.error = None;
                vec![]
            }
        }
    }

    fn go_to_page(&mut self, page: usize) -> Vec<Effect> {
        if self.page_count == 0 {
            return vec![];
        }

        let clamped = page.clamp(1, self.page_count);
        if self.current_page == clamped {
            return vec![];
        }

        self.current_page = clamped;
        self.pan = Pan::ORIGIN;
        self.error = None;
        vec![Effect::CancelRender, Effect::RenderCurrentPage]
    }

    fn rezoom(&mut self, change: impl FnOnce(&mut Zoom, &Self)) -> Vec<Effect> {
        let mut zoom = self.zoom;
        change(&mut zoom, self);

        if (zoom.scale() - self.zoom.scale()).abs() <= f32::EPSILON {
            return vec![];
        }

        self.zoom = zoom;
        self.pan = zoom::clamp_pan(self.pan, self.viewport(), self.container);

        if self.has_document() {
            vec![Effect::CancelRender, Effect::RenderCurrentPage]
        } else {
            vec![]
        }
    }
}

/// Commands that modify view state
#[derive(Clone, Debug)]
pub enum Command {
    /// Replace the document wholesale
    OpenDocument(DocumentSource),
    /// Worker finished opening the document of `generation`
    DocumentLoaded { generation: u64, info: DocumentInfo },
    /// Worker failed to open the document of `generation`
    DocumentFailed { generation: u64, message: String },
    /// Go to a 1-based page
    GoToPage(usize),
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    ZoomIn,
    ZoomOut,
    SetScale(f32),
    ResetZoom,
    /// Fit the current page into the container
    FitPage,
    /// Move the pan offset by a delta in pixels
    Pan { dx: i32, dy: i32 },
    ResetPan,
    /// Update the container size in pixels
    SetContainer(Size),
    /// Surface a render error
    RenderFailed(String),
    /// The current page is on screen, so any earlier render error is over
    PageRendered,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Cancel the in-flight render task, if any
    CancelRender,
    /// Drop every cached page
    InvalidateCache,
    /// Ask the worker to open a document
    LoadDocument(DocumentSource),
    /// Render the current page
    RenderCurrentPage,
    /// Notes for the freshly loaded document should be derived
    RestoreNotes,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::super::types::PageSize;
    use super::*;

    fn info(pages: usize) -> DocumentInfo {
        DocumentInfo {
            name: "test.pdf".into(),
            page_count: pages,
            title: None,
            page_sizes: vec![PageSize::new(400.0, 800.0); pages],
        }
    }

    fn loaded_state(pages: usize) -> ViewState {
        let mut state = ViewState::new(Zoom::default(), 1.0);
        let _ = state.apply(Command::OpenDocument(DocumentSource::Path(PathBuf::from(
            "test.pdf",
        ))));
        let generation = state.generation();
        let _ = state.apply(Command::DocumentLoaded {
            generation,
            info: info(pages),
        });
        state
    }

    #[test]
    fn open_document_resets_and_loads() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::GoToPage(4));
        let _ = state.apply(Command::SetContainer(Size::new(100, 100)));
        let _ = state.apply(Command::Pan { dx: 50, dy: 50 });
        assert_ne!(state.pan(), Pan::ORIGIN);

        let source = DocumentSource::Path(PathBuf::from("other.pdf"));
        let effects = state.apply(Command::OpenDocument(source.clone()));

        assert_eq!(state.current_page(), 1);
        assert_eq!(state.pan(), Pan::ORIGIN);
        assert!(state.is_loading());
        assert!(!state.has_document());
        assert_eq!(
            effects,
            vec![
                Effect::CancelRender,
                Effect::InvalidateCache,
                Effect::LoadDocument(source)
            ]
        );
    }

    #[test]
    fn loaded_document_renders_and_restores_notes() {
        let mut state = ViewState::default();
        let _ = state.apply(Command::OpenDocument(DocumentSource::bytes(
            "a.pdf",
            vec![0u8],
        )));
        let effects = state.apply(Command::DocumentLoaded {
            generation: state.generation(),
            info: info(3),
        });

        assert!(!state.is_loading());
        assert_eq!(state.page_count(), 3);
        assert_eq!(
            effects,
            vec![Effect::RenderCurrentPage, Effect::RestoreNotes]
        );
    }

    #[test]
    fn stale_load_is_ignored() {
        let mut state = loaded_state(3);
        let stale = state.generation();
        let _ = state.apply(Command::OpenDocument(DocumentSource::bytes(
            "b.pdf",
            vec![0u8],
        )));

        let effects = state.apply(Command::DocumentLoaded {
            generation: stale,
            info: info(99),
        });
        assert!(effects.is_empty());
        assert!(state.is_loading());
        assert_eq!(state.page_count(), 0);

        let effects = state.apply(Command::DocumentFailed {
            generation: stale,
            message: "old".into(),
        });
        assert!(effects.is_empty());
        assert!(state.error().is_none());
    }

    #[test]
    fn failed_load_surfaces_message() {
        let mut state = ViewState::default();
        let _ = state.apply(Command::OpenDocument(DocumentSource::bytes(
            "bad.pdf",
            vec![0u8],
        )));
        let _ = state.apply(Command::DocumentFailed {
            generation: state.generation(),
            message: "PDF engine: cannot open".into(),
        });

        assert!(!state.is_loading());
        assert_eq!(state.error(), Some("PDF engine: cannot open"));
    }

    #[test]
    fn rendered_page_clears_render_error() {
        let mut state = loaded_state(3);
        let _ = state.apply(Command::RenderFailed("bad stream".into()));
        assert_eq!(state.error(), Some("bad stream"));

        let effects = state.apply(Command::PageRendered);
        assert!(effects.is_empty());
        assert_eq!(state.error(), None);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn empty_document_is_an_error() {
        let mut state = ViewState::default();
        let _ = state.apply(Command::OpenDocument(DocumentSource::bytes(
            "empty.pdf",
            vec![0u8],
        )));
        let effects = state.apply(Command::DocumentLoaded {
            generation: state.generation(),
            info: info(0),
        });

        assert!(effects.is_empty());
        assert!(state.error().is_some());
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn navigation_stays_in_range() {
        let mut state = loaded_state(5);

        let _ = state.apply(Command::PrevPage);
        assert_eq!(state.current_page(), 1);

        let _ = state.apply(Command::GoToPage(0));
        assert_eq!(state.current_page(), 1);

        let _ = state.apply(Command::GoToPage(999));
        assert_eq!(state.current_page(), 5);

        let effects = state.apply(Command::NextPage);
        assert_eq!(state.current_page(), 5);
        assert!(effects.is_empty());

        let _ = state.apply(Command::FirstPage);
        assert_eq!(state.current_page(), 1);
        let _ = state.apply(Command::LastPage);
        assert_eq!(state.current_page(), 5);
    }

    #[test]
    fn page_change_cancels_and_renders() {
        let mut state = loaded_state(5);
        let effects = state.apply(Command::NextPage);

        assert_eq!(state.current_page(), 2);
        assert_eq!(effects, vec![Effect::CancelRender, Effect::RenderCurrentPage]);
    }

    #[test]
    fn page_change_resets_pan() {
        let mut state = loaded_state(5);
        let _ = state.apply(Command::SetContainer(Size::new(100, 100)));
        let _ = state.apply(Command::Pan { dx: 30, dy: 40 });
        assert_eq!(state.pan(), Pan::new(30, 40));

        let _ = state.apply(Command::NextPage);
        assert_eq!(state.pan(), Pan::ORIGIN);
    }

    #[test]
    fn navigation_without_document_is_a_no_op() {
        let mut state = ViewState::default();
        assert!(state.apply(Command::NextPage).is_empty());
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn zoom_change_rerenders_only_when_scale_moves() {
        let mut state = loaded_state(2);

        let effects = state.apply(Command::ZoomIn);
        assert_eq!(state.scale(), 1.25);
        assert_eq!(effects, vec![Effect::CancelRender, Effect::RenderCurrentPage]);

        let _ = state.apply(Command::SetScale(Zoom::MAX_SCALE));
        let effects = state.apply(Command::ZoomIn);
        assert!(effects.is_empty());
        assert_eq!(state.scale(), Zoom::MAX_SCALE);
    }

    #[test]
    fn fit_uses_container() {
        let mut state = loaded_state(2);
        let _ = state.apply(Command::SetContainer(Size::new(200, 800)));

        let _ = state.apply(Command::FitPage);
        // 400x800pt page at density 1.0 in a 200x800 container: width limits.
        assert_eq!(state.scale(), 0.5);
        assert_eq!(state.viewport().width, 200);
    }

    #[test]
    fn zoom_out_reclamps_pan() {
        let mut state = loaded_state(1);
        let _ = state.apply(Command::SetContainer(Size::new(400, 800)));
        let _ = state.apply(Command::SetScale(2.0));
        let _ = state.apply(Command::Pan { dx: 400, dy: 800 });
        assert_eq!(state.pan(), Pan::new(400, 800));

        let _ = state.apply(Command::ResetZoom);
        assert_eq!(state.pan(), Pan::ORIGIN);
    }

    #[test]
    fn pan_never_leaves_viewport() {
        let mut state = loaded_state(1);
        let _ = state.apply(Command::SetContainer(Size::new(100, 100)));

        let _ = state.apply(Command::Pan { dx: -50, dy: 10_000 });
        assert_eq!(state.pan(), Pan::new(0, 700));

        let _ = state.apply(Command::ResetPan);
        assert_eq!(state.pan(), Pan::ORIGIN);
    }
}
