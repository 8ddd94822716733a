use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::theme::Base16Palette;

const HELP_TEXT: &str = "\
Pages
  n  l  PageDown    next page
  p  h  PageUp      previous page
  g / G             first / last page
  :                 go to page
  mouse wheel       next / previous page

Zoom and pan
  +  =              zoom in
  -                 zoom out
  0                 reset zoom
  f                 fit page to view
  arrows            pan
  mouse drag        pan
  r                 reset pan

Notes
  e  Enter          edit note of this page
  Ctrl+s  Esc       save note
  Ctrl+c            discard edit
  t                 show / hide notes panel
  x                 export notes as JSON

Documents
  o                 open a PDF file
  d                 back to the default document

  ?                 this help
  q  Esc            quit";

pub enum HelpPopupAction {
    Close,
}

#[derive(Default)]
pub struct HelpPopup {
    scroll_offset: usize,
}

impl HelpPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let max_content_width = HELP_TEXT
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(40);

        // two chars of margin on each side plus the borders
        let desired_width = (max_content_width + 6).min(area.width as usize);
        let popup_area = content_sized_rect(desired_width as u16, 90, area);

        f.render_widget(Clear, popup_area);

        let lines: Vec<Line> = HELP_TEXT
            .lines()
            .skip(self.scroll_offset)
            .map(|line| {
                Line::from(Span::styled(
                    format!("  {line}"),
                    Style::default().fg(palette.base_05),
                ))
            })
            .collect();

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" Help - Press ? or ESC to close ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.base_0c))
                    .style(Style::default().bg(palette.base_00)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(paragraph, popup_area);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<HelpPopupAction> {
        let max_offset = HELP_TEXT.lines().count().saturating_sub(1);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll_offset = (self.scroll_offset + 1).min(max_offset);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
                None
            }
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Some(HelpPopupAction::Close),
            _ => None,
        }
    }
}

fn content_sized_rect(width: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    let width = width.min(r.width);
    let margin = r.width.saturating_sub(width) / 2;

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(width),
            Constraint::Length(margin),
        ])
        .split(popup_layout[1])[1]
}
