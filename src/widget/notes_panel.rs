use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::note_editor::NoteEditor;
use crate::theme::Base16Palette;

/// Side panel with the note of the current page
pub struct NotesPanel<'a> {
    page: usize,
    note: &'a str,
    editor: Option<&'a NoteEditor>,
    noted_pages: Vec<usize>,
    palette: &'a Base16Palette,
}

impl<'a> NotesPanel<'a> {
    pub fn new(page: usize, note: &'a str, palette: &'a Base16Palette) -> Self {
        Self {
            page,
            note,
            editor: None,
            noted_pages: vec![],
            palette,
        }
    }

    pub fn editor(mut self, editor: Option<&'a NoteEditor>) -> Self {
        self.editor = editor;
        self
    }

    pub fn noted_pages(mut self, pages: impl IntoIterator<Item = usize>) -> Self {
        self.noted_pages = pages.into_iter().collect();
        self
    }

    fn block(&self) -> Block<'static> {
        let editing = self.editor.is_some();
        let title = if editing {
            format!(" Editing note - page {} ", self.page)
        } else {
            format!(" Note - page {} ", self.page)
        };
        let border = if editing {
            self.palette.base_0d
        } else {
            self.palette.base_03
        };

        let mut block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(self.palette.base_00));

        if let Some(editor) = self.editor {
            block = block.title_bottom(
                Line::from(format!(
                    " {}/{} · Ctrl+s save · Ctrl+c cancel ",
                    editor.char_count(),
                    editor.max_chars()
                ))
                .right_aligned(),
            );
        } else if !self.noted_pages.is_empty() {
            let pages = self
                .noted_pages
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            block = block.title_bottom(Line::from(format!(" notes on: {pages} ")).right_aligned());
        }
        block
    }
}

/// Where the terminal cursor goes while editing in a panel drawn at `area`
pub fn editor_cursor(area: Rect, editor: &NoteEditor) -> Option<Position> {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let (row, _) = editor.cursor();
    let x = inner.x + u16::try_from(editor.cursor_display_col()).ok()?;
    let y = inner.y + u16::try_from(row).ok()?;
    (x < inner.right() && y < inner.bottom()).then_some(Position::new(x, y))
}

impl Widget for NotesPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();
        let text_style = Style::default().fg(self.palette.base_05);

        let lines: Vec<Line> = match self.editor {
            Some(editor) => editor
                .lines()
                .iter()
                .map(|line| Line::from(Span::styled(line.clone(), text_style)))
                .collect(),
            None if self.note.is_empty() => vec![Line::from(Span::styled(
                "No note for this page. Press e to write one.",
                Style::default()
                    .fg(self.palette.base_03)
                    .add_modifier(Modifier::ITALIC),
            ))],
            None => self
                .note
                .lines()
                .map(|line| Line::from(Span::styled(line.to_string(), text_style)))
                .collect(),
        };

        let mut paragraph = Paragraph::new(lines).block(block);
        // The editor positions the cursor by raw line, so it must not wrap
        if self.editor.is_none() {
            paragraph = paragraph.wrap(Wrap { trim: false });
        }
        paragraph.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::OCEANIC_NEXT;

    fn text_of(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn shows_note_and_page() {
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        NotesPanel::new(3, "see table 2", &OCEANIC_NEXT)
            .noted_pages([1, 3])
            .render(area, &mut buf);

        let text = text_of(&buf);
        assert!(text.contains("Note - page 3"));
        assert!(text.contains("see table 2"));
        assert!(text.contains("notes on: 1,3"));
    }

    #[test]
    fn empty_note_shows_hint() {
        let area = Rect::new(0, 0, 60, 4);
        let mut buf = Buffer::empty(area);
        NotesPanel::new(1, "", &OCEANIC_NEXT).render(area, &mut buf);
        assert!(text_of(&buf).contains("Press e to write one"));
    }

    #[test]
    fn editor_cursor_follows_text() {
        let editor = NoteEditor::new("ab\ncd", 100);
        let area = Rect::new(10, 5, 30, 8);
        assert_eq!(editor_cursor(area, &editor), Some(Position::new(13, 7)));
    }
}
