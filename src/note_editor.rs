//! Bounded multi-line editor used for page notes

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthStr;

/// Outcome of feeding a key to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Continue,
    Save,
    Cancel,
}

#[derive(Debug, Clone)]
pub struct NoteEditor {
    lines: Vec<String>,
    /// Cursor row and column, the column counted in chars
    cursor: (usize, usize),
    max_chars: usize,
}

impl NoteEditor {
    pub fn new(text: &str, max_chars: usize) -> Self {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        let row = lines.len() - 1;
        let col = lines[row].chars().count();
        Self {
            lines,
            cursor: (row, col),
            max_chars,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    /// Characters in the buffer, newlines included
    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|l| l.chars().count()).sum::<usize>() + self.lines.len() - 1
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn remaining(&self) -> usize {
        self.max_chars.saturating_sub(self.char_count())
    }

    /// Display column of the cursor within its line
    pub fn cursor_display_col(&self) -> usize {
        let (row, col) = self.cursor;
        let line = &self.lines[row];
        line[..byte_index(line, col)].width()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return EditorAction::Save,
            KeyCode::Char('c') if ctrl => return EditorAction::Cancel,
            KeyCode::Esc => return EditorAction::Save,
            KeyCode::Char(c) if !ctrl => self.insert_char(c),
            KeyCode::Enter => self.insert_newline(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_vertical(-1),
            KeyCode::Down => self.move_vertical(1),
            KeyCode::Home => self.cursor.1 = 0,
            KeyCode::End => self.cursor.1 = self.lines[self.cursor.0].chars().count(),
            _ => {}
        }
        EditorAction::Continue
    }

    pub fn insert_char(&mut self, c: char) {
        if self.remaining() == 0 {
            return;
        }
        let (row, col) = self.cursor;
        let line = &mut self.lines[row];
        let idx = byte_index(line, col);
        line.insert(idx, c);
        self.cursor.1 += 1;
    }

    pub fn insert_newline(&mut self) {
        if self.remaining() == 0 {
            return;
        }
        let (row, col) = self.cursor;
        let idx = byte_index(&self.lines[row], col);
        let tail = self.lines[row].split_off(idx);
        self.lines.insert(row + 1, tail);
        self.cursor = (row + 1, 0);
    }

    pub fn backspace(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            let line = &mut self.lines[row];
            let idx = byte_index(line, col - 1);
            line.remove(idx);
            self.cursor.1 -= 1;
        } else if row > 0 {
            let line = self.lines.remove(row);
            let prev = &mut self.lines[row - 1];
            let prev_len = prev.chars().count();
            prev.push_str(&line);
            self.cursor = (row - 1, prev_len);
        }
    }

    pub fn delete(&mut self) {
        let (row, col) = self.cursor;
        let len = self.lines[row].chars().count();
        if col < len {
            let line = &mut self.lines[row];
            let idx = byte_index(line, col);
            line.remove(idx);
        } else if row + 1 < self.lines.len() {
            let next = self.lines.remove(row + 1);
            self.lines[row].push_str(&next);
        }
    }

    fn move_left(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            self.cursor.1 -= 1;
        } else if row > 0 {
            self.cursor = (row - 1, self.lines[row - 1].chars().count());
        }
    }

    fn move_right(&mut self) {
        let (row, col) = self.cursor;
        if col < self.lines[row].chars().count() {
            self.cursor.1 += 1;
        } else if row + 1 < self.lines.len() {
            self.cursor = (row + 1, 0);
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let row = self.cursor.0.saturating_add_signed(delta);
        if row >= self.lines.len() || row == self.cursor.0 {
            return;
        }
        let len = self.lines[row].chars().count();
        self.cursor = (row, self.cursor.1.min(len));
    }
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn type_str(editor: &mut NoteEditor, text: &str) {
        for c in text.chars() {
            editor.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn starts_with_cursor_at_end() {
        let editor = NoteEditor::new("one\ntwo", 100);
        assert_eq!(editor.cursor(), (1, 3));
        assert_eq!(editor.char_count(), 7);
    }

    #[test]
    fn typing_and_newlines() {
        let mut editor = NoteEditor::new("", 100);
        type_str(&mut editor, "ab");
        editor.handle_key(key(KeyCode::Enter));
        type_str(&mut editor, "c");
        assert_eq!(editor.text(), "ab\nc");
    }

    #[test]
    fn backspace_joins_lines() {
        let mut editor = NoteEditor::new("ab\nc", 100);
        editor.handle_key(key(KeyCode::Home));
        editor.handle_key(key(KeyCode::Backspace));
        assert_eq!(editor.text(), "abc");
        assert_eq!(editor.cursor(), (0, 2));
    }

    #[test]
    fn insert_stops_at_limit() {
        let mut editor = NoteEditor::new("", 3);
        type_str(&mut editor, "abcdef");
        editor.handle_key(key(KeyCode::Enter));
        assert_eq!(editor.text(), "abc");
        assert_eq!(editor.remaining(), 0);
    }

    #[test]
    fn multibyte_editing() {
        let mut editor = NoteEditor::new("héllo", 100);
        editor.handle_key(key(KeyCode::Left));
        editor.handle_key(key(KeyCode::Left));
        editor.handle_key(key(KeyCode::Left));
        editor.handle_key(key(KeyCode::Backspace));
        assert_eq!(editor.text(), "hllo");
        editor.handle_key(key(KeyCode::Delete));
        assert_eq!(editor.text(), "hlo");
    }

    #[test]
    fn wide_chars_count_double_width() {
        let editor = NoteEditor::new("日本", 100);
        assert_eq!(editor.cursor_display_col(), 4);
    }

    #[test]
    fn vertical_motion_clamps_column() {
        let mut editor = NoteEditor::new("long line\nab", 100);
        editor.handle_key(key(KeyCode::Up));
        assert_eq!(editor.cursor(), (0, 2));
        editor.handle_key(key(KeyCode::End));
        editor.handle_key(key(KeyCode::Down));
        assert_eq!(editor.cursor(), (1, 2));
    }

    #[test]
    fn control_keys_finish_editing() {
        let mut editor = NoteEditor::new("x", 10);
        assert_eq!(
            editor.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            EditorAction::Save
        );
        assert_eq!(
            editor.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            EditorAction::Cancel
        );
        assert_eq!(editor.handle_key(key(KeyCode::Esc)), EditorAction::Save);
        assert_eq!(editor.text(), "x");
    }
}
