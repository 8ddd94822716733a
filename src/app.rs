use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use log::{debug, info, warn};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Paragraph,
};

use crate::event_source::EventSource;
use crate::export::export_notes;
use crate::note_editor::{EditorAction, NoteEditor};
use crate::notes::NOTE_MAX_CHARS;
use crate::notification::NotificationManager;
use crate::pdf::{DocumentSource, ScrollDirection};
use crate::settings;
use crate::theme::{Base16Palette, current_theme};
use crate::viewer::{Viewer, ViewerEvent};
use crate::widget::help_popup::{HelpPopup, HelpPopupAction};
use crate::widget::notes_panel::{NotesPanel, editor_cursor};
use crate::widget::page_view::{PageView, container_for};
use crate::widget::prompt::{Prompt, PromptAction, PromptKind};
use crate::widget::status_bar::StatusBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

/// What keys currently go to
enum InputMode {
    Normal,
    EditingNote(NoteEditor),
    Prompt(Prompt),
    Help(HelpPopup),
}

pub struct App {
    viewer: Viewer,
    notifications: NotificationManager,
    mode: InputMode,
    show_notes: bool,
    export_dir: PathBuf,
    page_area: Rect,
    notes_area: Rect,
    drag_from: Option<(u16, u16)>,
    palette: &'static Base16Palette,
}

impl App {
    pub fn new(viewer: Viewer, show_notes: bool, export_dir: PathBuf) -> Self {
        Self {
            viewer,
            notifications: NotificationManager::new(),
            mode: InputMode::Normal,
            show_notes,
            export_dir,
            page_area: Rect::default(),
            notes_area: Rect::default(),
            drag_from: None,
            palette: current_theme(),
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut Viewer {
        &mut self.viewer
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn is_editing_note(&self) -> bool {
        matches!(self.mode, InputMode::EditingNote(_))
    }

    pub fn is_prompting(&self) -> bool {
        matches!(self.mode, InputMode::Prompt(_))
    }

    pub fn is_showing_help(&self) -> bool {
        matches!(self.mode, InputMode::Help(_))
    }

    pub fn notes_shown(&self) -> bool {
        self.show_notes
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key),
            Event::Mouse(mouse) => {
                self.handle_mouse(*mouse);
                None
            }
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match std::mem::replace(&mut self.mode, InputMode::Normal) {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::EditingNote(mut editor) => {
                match editor.handle_key(key) {
                    EditorAction::Continue => self.mode = InputMode::EditingNote(editor),
                    EditorAction::Save => self.save_note(&editor.text()),
                    EditorAction::Cancel => debug!("Note edit discarded"),
                }
                None
            }
            InputMode::Prompt(mut prompt) => {
                match prompt.handle_key(key) {
                    None => self.mode = InputMode::Prompt(prompt),
                    Some(PromptAction::Cancel) => {}
                    Some(PromptAction::Submit(text)) => self.submit_prompt(prompt.kind, &text),
                }
                None
            }
            InputMode::Help(mut help) => {
                if !matches!(help.handle_key(key), Some(HelpPopupAction::Close)) {
                    self.mode = InputMode::Help(help);
                }
                None
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('c') {
                return Some(AppAction::Quit);
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppAction::Quit),
            KeyCode::Char('n') | KeyCode::Char('l') | KeyCode::PageDown => self.viewer.next_page(),
            KeyCode::Char('p') | KeyCode::Char('h') | KeyCode::PageUp => self.viewer.prev_page(),
            KeyCode::Char('g') | KeyCode::Home => self.viewer.go_to_page(1),
            KeyCode::Char('G') | KeyCode::End => {
                let last = self.viewer.state().page_count();
                self.viewer.go_to_page(last);
            }
            KeyCode::Char(':') => self.mode = InputMode::Prompt(Prompt::new(PromptKind::GoToPage)),
            KeyCode::Char('+') | KeyCode::Char('=') => self.viewer.zoom_in(),
            KeyCode::Char('-') => self.viewer.zoom_out(),
            KeyCode::Char('0') => self.viewer.apply(crate::pdf::Command::ResetZoom),
            KeyCode::Char('f') => self.viewer.fit_page(),
            KeyCode::Up => self.pan(ScrollDirection::Up),
            KeyCode::Down => self.pan(ScrollDirection::Down),
            KeyCode::Left => self.pan(ScrollDirection::Left),
            KeyCode::Right => self.pan(ScrollDirection::Right),
            KeyCode::Char('r') => self.viewer.apply(crate::pdf::Command::ResetPan),
            KeyCode::Char('e') | KeyCode::Enter => self.start_editing(),
            KeyCode::Char('o') => self.mode = InputMode::Prompt(Prompt::new(PromptKind::OpenFile)),
            KeyCode::Char('d') => self.viewer.open_default(),
            KeyCode::Char('t') => {
                self.show_notes = !self.show_notes;
                settings::set_notes_panel_shown(self.show_notes);
            }
            KeyCode::Char('x') => self.export(),
            KeyCode::Char('?') => self.mode = InputMode::Help(HelpPopup::new()),
            _ => {}
        }
        None
    }

    fn pan(&mut self, direction: ScrollDirection) {
        let (dx, dy) = self.viewer.state().zoom().pan_step(direction);
        self.viewer.pan(dx, dy);
    }

    fn start_editing(&mut self) {
        if !self.viewer.state().has_document() {
            self.notifications.warn("Open a document before writing notes");
            return;
        }
        let editor = NoteEditor::new(self.viewer.current_note(), NOTE_MAX_CHARS);
        self.mode = InputMode::EditingNote(editor);
    }

    fn save_note(&mut self, text: &str) {
        let page = self.viewer.state().current_page();
        match self.viewer.set_current_note(text) {
            Ok(()) if text.trim().is_empty() => {
                self.notifications.info(format!("Removed note of page {page}"));
            }
            Ok(()) => self.notifications.info(format!("Saved note for page {page}")),
            Err(e) => {
                warn!("Could not save note: {e:#}");
                self.notifications.error(format!("Could not save note: {e}"));
            }
        }
    }

    fn submit_prompt(&mut self, kind: PromptKind, text: &str) {
        if text.is_empty() {
            return;
        }
        match kind {
            PromptKind::GoToPage => match text.parse::<usize>() {
                Ok(page) => self.viewer.go_to_page(page),
                Err(_) => self.notifications.warn(format!("Not a page number: {text}")),
            },
            PromptKind::OpenFile => {
                let path = expand_home(text);
                if path.is_file() {
                    self.viewer.open_upload(DocumentSource::Path(path));
                } else {
                    self.notifications
                        .error(format!("File not found: {}", path.display()));
                }
            }
        }
    }

    fn export(&mut self) {
        let Some(info) = self.viewer.state().info() else {
            self.notifications.warn("Nothing to export");
            return;
        };
        let (name, pages) = (info.name.clone(), info.page_count);
        match export_notes(self.viewer.notes(), &name, pages, &self.export_dir) {
            Ok(path) => self
                .notifications
                .info(format!("Exported notes to {}", path.display())),
            Err(e) => self.notifications.error(e.to_string()),
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        // The page stays put while the editor, a prompt or the help is open
        if !matches!(self.mode, InputMode::Normal) {
            self.drag_from = None;
            return;
        }
        let inside_page = self.page_area.contains((mouse.column, mouse.row).into());
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside_page => {
                self.drag_from = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((col, row)) = self.drag_from {
                    // Content follows the pointer, so the pan moves the other way
                    let dx = i32::from(col) - i32::from(mouse.column);
                    let dy = (i32::from(row) - i32::from(mouse.row)) * 2;
                    self.viewer.pan(dx, dy);
                    self.drag_from = Some((mouse.column, mouse.row));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.drag_from = None,
            MouseEventKind::ScrollDown if inside_page => self.viewer.next_page(),
            MouseEventKind::ScrollUp if inside_page => self.viewer.prev_page(),
            _ => {}
        }
    }

    /// Pick up background work. Returns true if the screen should be redrawn.
    pub fn tick(&mut self) -> bool {
        let events = self.viewer.pump();
        let changed = !events.is_empty();
        for event in events {
            self.notify(event);
        }
        let expired = self.notifications.update();
        changed || expired
    }

    fn notify(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::Loaded { name, pages } => {
                info!("Showing {name} ({pages} pages)");
                self.notifications.info(format!("Loaded {name} ({pages} pages)"));
            }
            ViewerEvent::LoadFailed(message) | ViewerEvent::RenderFailed(message) => {
                self.notifications.error(message);
            }
            ViewerEvent::NotesRestored(count) => {
                self.notifications.info(format!("Restored {count} notes"));
            }
            ViewerEvent::PageReady(_) => {}
        }
    }

    fn update_layout(&mut self, area: Rect) -> Rect {
        let [main, status] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .areas(area);

        if self.show_notes || self.is_editing_note() {
            let [page, notes] = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
                .areas(main);
            self.page_area = page;
            self.notes_area = notes;
        } else {
            self.page_area = main;
            self.notes_area = Rect::default();
        }

        self.viewer.set_container(container_for(self.page_area));
        status
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let full = f.area();
        let status_area = self.update_layout(full);
        let state = self.viewer.state();

        f.render_widget(
            PageView::new(self.palette)
                .page(self.viewer.page_image())
                .pan(state.pan())
                .loading(state.is_loading() || self.viewer.is_rendering())
                .error(state.error()),
            self.page_area,
        );

        if !self.notes_area.is_empty() {
            let editor = match &self.mode {
                InputMode::EditingNote(editor) => Some(editor),
                _ => None,
            };
            f.render_widget(
                NotesPanel::new(state.current_page(), self.viewer.current_note(), self.palette)
                    .editor(editor)
                    .noted_pages(self.viewer.notes().pages()),
                self.notes_area,
            );
            if let Some(position) = editor.and_then(|e| editor_cursor(self.notes_area, e)) {
                f.set_cursor_position(position);
            }
        }

        f.render_widget(
            StatusBar::new(state, self.viewer.is_rendering(), self.palette),
            status_area,
        );

        if let Some(notification) = self.notifications.current() {
            if self.page_area.height > 0 {
                let line_area = Rect::new(
                    self.page_area.x,
                    self.page_area.bottom() - 1,
                    self.page_area.width,
                    1,
                );
                f.render_widget(
                    Paragraph::new(notification.styled_line(self.palette)),
                    line_area,
                );
            }
        }

        match &self.mode {
            InputMode::Prompt(prompt) => prompt.render(f, self.page_area, self.palette),
            InputMode::Help(help) => help.render(f, full, self.palette),
            _ => {}
        }
    }
}

fn expand_home(input: &str) -> PathBuf {
    match input.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(input)),
        None => Path::new(input).to_path_buf(),
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    loop {
        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
            needs_redraw = false;
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        let mut events_processed = 0;
        while events_processed < 50 && event_source.poll(timeout)? {
            let event = event_source.read()?;
            events_processed += 1;
            if app.handle_event(&event) == Some(AppAction::Quit) {
                info!("Quit requested");
                return Ok(());
            }
        }
        if events_processed > 0 {
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            if app.tick() {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::notes::SessionStore;
    use crate::pdf::{RenderService, Zoom};
    use crate::test_utils::FakeEngine;
    use crate::test_utils::test_helpers::create_test_terminal;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn loaded_app(pages: usize) -> App {
        let service = RenderService::with_config(
            Arc::new(FakeEngine::with_pages(pages)),
            Zoom::default(),
            0.1,
            8,
        );
        let viewer = Viewer::new(
            service,
            SessionStore::ephemeral().unwrap(),
            DocumentSource::bytes("default.pdf", vec![1u8]),
        );
        let mut app = App::new(viewer, true, std::env::temp_dir());
        app.viewer_mut().open_default();
        while !app.viewer().state().has_document() {
            let events = app.viewer_mut().wait_for_event(Duration::from_secs(5));
            assert!(!events.is_empty(), "document never loaded");
        }
        app
    }

    #[test]
    fn quit_keys() {
        let mut app = loaded_app(1);
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), Some(AppAction::Quit));
        assert_eq!(app.handle_key(key(KeyCode::Esc)), Some(AppAction::Quit));
    }

    #[test]
    fn editing_captures_keys_until_saved() {
        let mut app = loaded_app(3);
        app.handle_key(key(KeyCode::Char('e')));
        assert!(app.is_editing_note());

        for c in "qn".chars() {
            assert_eq!(app.handle_key(key(KeyCode::Char(c))), None);
        }
        assert_eq!(app.viewer().state().current_page(), 1);

        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(!app.is_editing_note());
        assert_eq!(app.viewer().current_note(), "qn");
    }

    #[test]
    fn cancelled_edit_keeps_old_note() {
        let mut app = loaded_app(2);
        app.viewer_mut().set_current_note("keep").unwrap();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.viewer().current_note(), "keep");
    }

    #[test]
    fn go_to_page_prompt() {
        let mut app = loaded_app(9);
        app.handle_key(key(KeyCode::Char(':')));
        assert!(app.is_prompting());
        app.handle_key(key(KeyCode::Char('7')));
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.is_prompting());
        assert_eq!(app.viewer().state().current_page(), 7);
    }

    #[test]
    fn open_prompt_rejects_missing_file() {
        let mut app = loaded_app(2);
        app.handle_key(key(KeyCode::Char('o')));
        for c in "/definitely/not/here.pdf".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));

        let message = &app.notifications().current().unwrap().message;
        assert!(message.starts_with("File not found"));
        assert_eq!(app.viewer().document_name(), Some("default.pdf"));
    }

    #[test]
    fn help_opens_and_closes() {
        let mut app = loaded_app(1);
        app.handle_key(key(KeyCode::Char('?')));
        assert!(app.is_showing_help());
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), None);
        assert!(!app.is_showing_help());
    }

    #[test]
    fn draw_sets_container_from_layout() {
        let mut app = loaded_app(1);
        let mut terminal = create_test_terminal(100, 31);
        terminal.draw(|f| app.draw(f)).unwrap();

        // 68% of 100 columns, 30 rows above the status bar
        let container = app.viewer().state().container();
        assert_eq!(container.width, 68);
        assert_eq!(container.height, 60);
    }

    #[test]
    #[serial_test::serial]
    fn mouse_drag_pans_page() {
        let mut app = loaded_app(1);
        let mut terminal = create_test_terminal(20, 6);
        app.handle_key(key(KeyCode::Char('t')));
        terminal.draw(|f| app.draw(f)).unwrap();
        app.viewer_mut().zoom_in();

        let mouse = |kind, column, row| MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        };
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 10, 4));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 7, 2));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 7, 2));

        let pan = app.viewer().state().pan();
        assert_eq!((pan.x, pan.y), (3, 4));
    }

    #[test]
    fn wheel_does_not_turn_page_while_editing() {
        let mut app = loaded_app(3);
        let mut terminal = create_test_terminal(40, 12);
        terminal.draw(|f| app.draw(f)).unwrap();
        let wheel = MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 2,
            row: 2,
            modifiers: KeyModifiers::empty(),
        };

        app.handle_key(key(KeyCode::Char('e')));
        app.handle_key(key(KeyCode::Char('x')));
        app.handle_event(&Event::Mouse(wheel));
        assert_eq!(app.viewer().state().current_page(), 1);

        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(app.viewer().notes().content(1), "x");
        assert_eq!(app.viewer().notes().content(2), "");

        app.handle_event(&Event::Mouse(wheel));
        assert_eq!(app.viewer().state().current_page(), 2);
    }
}
