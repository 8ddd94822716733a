use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::pdf::ViewState;
use crate::theme::Base16Palette;

/// Bottom line: document, page, zoom and render activity
pub struct StatusBar<'a> {
    state: &'a ViewState,
    rendering: bool,
    palette: &'a Base16Palette,
}

impl<'a> StatusBar<'a> {
    pub fn new(state: &'a ViewState, rendering: bool, palette: &'a Base16Palette) -> Self {
        Self {
            state,
            rendering,
            palette,
        }
    }

    fn left(&self) -> Vec<Span<'static>> {
        let name_style = Style::default()
            .fg(self.palette.base_00)
            .bg(self.palette.base_0d)
            .add_modifier(Modifier::BOLD);
        let text_style = Style::default().fg(self.palette.base_05);

        let name = self
            .state
            .info()
            .map(|info| info.title.clone().unwrap_or_else(|| info.name.clone()))
            .unwrap_or_else(|| "pagenote".to_string());
        let mut spans = vec![Span::styled(format!(" {name} "), name_style)];

        if let Some(error) = self.state.error() {
            spans.push(Span::styled(
                format!(" {error} "),
                Style::default()
                    .fg(self.palette.base_07)
                    .bg(self.palette.base_08),
            ));
        } else if self.state.is_loading() {
            spans.push(Span::styled(" loading… ", text_style));
        } else if self.rendering {
            spans.push(Span::styled(" rendering… ", text_style));
        }
        spans
    }

    fn right(&self) -> String {
        if !self.state.has_document() {
            return "? help ".to_string();
        }
        let pan = self.state.pan();
        format!(
            "page {}/{}  {:.0}%  pan {},{}  ? help ",
            self.state.current_page(),
            self.state.page_count(),
            self.state.scale() * 100.0,
            pan.x,
            pan.y
        )
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let background = Style::default().bg(self.palette.base_01);
        buf.set_style(area, background);

        Paragraph::new(Line::from(self.left())).render(area, buf);
        Paragraph::new(Line::from(Span::styled(
            self.right(),
            Style::default().fg(self.palette.base_04),
        )))
        .right_aligned()
        .render(area, buf);
    }
}
