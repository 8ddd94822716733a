//! Helpers for unit and integration tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};

use crate::pdf::{
    DocumentSource, PageSize, PdfDocument, PdfEngine, RenderParams, RenderTask, RenderedPage,
    WorkerFault, viewport,
};

/// In-memory PDF engine with configurable documents
#[derive(Clone)]
pub struct FakeEngine {
    default_pages: usize,
    documents: HashMap<String, usize>,
    page_size: PageSize,
    failure: Option<String>,
    failing_page: Option<(usize, String)>,
    failing_scale: Option<(f32, String)>,
    panics_on_render: bool,
    render_delay: Duration,
    renders: Arc<AtomicUsize>,
}

impl FakeEngine {
    /// Every document opens with `pages` pages
    pub fn with_pages(pages: usize) -> Self {
        Self {
            default_pages: pages,
            documents: HashMap::new(),
            page_size: PageSize::new(400.0, 600.0),
            failure: None,
            failing_page: None,
            failing_scale: None,
            panics_on_render: false,
            render_delay: Duration::ZERO,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every open fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::with_pages(0)
        }
    }

    /// Documents named `name` open with `pages` pages instead of the default
    pub fn with_document(mut self, name: &str, pages: usize) -> Self {
        self.documents.insert(name.to_string(), pages);
        self
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Each render takes at least `delay`, checking for cancellation meanwhile
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    /// Rendering the 0-indexed `page` fails with `message`
    pub fn with_failing_page(mut self, page: usize, message: &str) -> Self {
        self.failing_page = Some((page, message.to_string()));
        self
    }

    /// Renders at `scale` fail with `message`, every other scale works
    pub fn with_failing_scale(mut self, scale: f32, message: &str) -> Self {
        self.failing_scale = Some((scale, message.to_string()));
        self
    }

    /// Rendering any page panics, taking the worker thread down with it
    pub fn panicking_on_render(mut self) -> Self {
        self.panics_on_render = true;
        self
    }

    /// Counter of completed renders, shared with every opened document
    pub fn render_count(&self) -> Arc<AtomicUsize> {
        self.renders.clone()
    }
}

impl PdfEngine for FakeEngine {
    fn open(&self, source: &DocumentSource) -> Result<Box<dyn PdfDocument>, WorkerFault> {
        if let Some(message) = &self.failure {
            return Err(WorkerFault::generic(message.clone()));
        }

        let page_count = self
            .documents
            .get(&source.name())
            .copied()
            .unwrap_or(self.default_pages);

        Ok(Box::new(FakeDocument {
            page_count,
            page_size: self.page_size,
            failing_page: self.failing_page.clone(),
            failing_scale: self.failing_scale.clone(),
            panics_on_render: self.panics_on_render,
            render_delay: self.render_delay,
            renders: self.renders.clone(),
        }))
    }
}

struct FakeDocument {
    page_count: usize,
    page_size: PageSize,
    failing_page: Option<(usize, String)>,
    failing_scale: Option<(f32, String)>,
    panics_on_render: bool,
    render_delay: Duration,
    renders: Arc<AtomicUsize>,
}

impl FakeDocument {
    fn check_page(&self, page: usize) -> Result<(), WorkerFault> {
        if page < self.page_count {
            Ok(())
        } else {
            Err(WorkerFault::PageOutOfRange {
                page,
                page_count: self.page_count,
            })
        }
    }
}

impl PdfDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn title(&self) -> Option<String> {
        Some("Fake document".to_string())
    }

    fn page_size(&self, page: usize) -> Result<PageSize, WorkerFault> {
        self.check_page(page)?;
        Ok(self.page_size)
    }

    fn render(
        &self,
        page: usize,
        params: &RenderParams,
        task: &RenderTask,
    ) -> Result<RenderedPage, WorkerFault> {
        self.check_page(page)?;
        if let Some((_, message)) = self.failing_page.as_ref().filter(|(p, _)| *p == page) {
            return Err(WorkerFault::generic(message.clone()));
        }
        if let Some((_, message)) = self
            .failing_scale
            .as_ref()
            .filter(|(scale, _)| (scale - params.scale).abs() < 1e-3)
        {
            return Err(WorkerFault::generic(message.clone()));
        }
        if self.panics_on_render {
            panic!("fake engine crashed while rendering page {page}");
        }

        let deadline = Instant::now() + self.render_delay;
        while Instant::now() < deadline {
            if task.is_cancelled() {
                return Err(WorkerFault::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        if task.is_cancelled() {
            return Err(WorkerFault::Cancelled);
        }

        let size = viewport(self.page_size, params.scale, params.density);
        let shade = (page * 37 % 200) as u8 + 40;
        let image = RgbImage::from_pixel(size.width, size.height, Rgb([shade, shade, 255]));

        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage {
            page,
            scale: params.scale,
            image,
        })
    }
}

pub mod test_helpers {
    use crate::event_source::{Event, KeyCode, KeyModifiers, SimulatedEventSource};
    use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key(c));
            self
        }

        pub fn press(mut self, code: KeyCode) -> Self {
            self.events
                .push(SimulatedEventSource::key_event(code, KeyModifiers::empty()));
            self
        }

        pub fn press_enter(self) -> Self {
            self.press(KeyCode::Enter)
        }

        pub fn press_esc(self) -> Self {
            self.press(KeyCode::Esc)
        }

        /// Type every character of `text`, newlines as Enter
        pub fn type_text(mut self, text: &str) -> Self {
            for c in text.chars() {
                self = if c == '\n' {
                    self.press_enter()
                } else {
                    self.press_char(c)
                };
            }
            self
        }

        /// Go forward n pages (press 'n' n times)
        pub fn next_page(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('n'));
            }
            self
        }

        /// Go back n pages (press 'p' n times)
        pub fn prev_page(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('p'));
            }
            self
        }

        pub fn zoom_in(self) -> Self {
            self.press_char('+')
        }

        pub fn zoom_out(self) -> Self {
            self.press_char('-')
        }

        /// Drag the page with the left mouse button from one cell to another
        pub fn drag(mut self, from: (u16, u16), to: (u16, u16)) -> Self {
            let mouse = |kind, (column, row): (u16, u16)| {
                Event::Mouse(MouseEvent {
                    kind,
                    column,
                    row,
                    modifiers: KeyModifiers::empty(),
                })
            };
            self.events
                .push(mouse(MouseEventKind::Down(MouseButton::Left), from));
            self.events
                .push(mouse(MouseEventKind::Drag(MouseButton::Left), to));
            self.events.push(mouse(MouseEventKind::Up(MouseButton::Left), to));
            self
        }

        pub fn resize(mut self, width: u16, height: u16) -> Self {
            self.events.push(Event::Resize(width, height));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        pub fn len(&self) -> usize {
            self.events.len()
        }

        pub fn is_empty(&self) -> bool {
            self.events.is_empty()
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}
