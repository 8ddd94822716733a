use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::theme::Base16Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    GoToPage,
    OpenFile,
}

impl PromptKind {
    fn label(self) -> &'static str {
        match self {
            PromptKind::GoToPage => " Go to page ",
            PromptKind::OpenFile => " Open PDF file ",
        }
    }
}

pub enum PromptAction {
    Submit(String),
    Cancel,
}

/// One-line input shown over the page
#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    input: String,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: String::new(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<PromptAction> {
        match key.code {
            KeyCode::Enter => Some(PromptAction::Submit(self.input.trim().to_string())),
            KeyCode::Esc => Some(PromptAction::Cancel),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(PromptAction::Cancel)
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char(c) => {
                if self.kind == PromptKind::GoToPage && !c.is_ascii_digit() {
                    return None;
                }
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let width = area.width.min(60).max(20.min(area.width));
        let popup = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(3) / 2,
            width,
            3.min(area.height),
        );

        f.render_widget(Clear, popup);
        let block = Block::default()
            .title(self.kind.label())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.base_0c))
            .style(Style::default().bg(palette.base_00));
        let inner = block.inner(popup);
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                self.input.clone(),
                Style::default().fg(palette.base_06),
            )))
            .block(block),
            popup,
        );

        let cursor_x = inner.x + u16::try_from(self.input.width()).unwrap_or(u16::MAX);
        if cursor_x < inner.right() && inner.height > 0 {
            f.set_cursor_position(Position::new(cursor_x, inner.y));
        }
    }
}
