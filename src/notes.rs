use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Longest note, in characters, a page can hold
pub const NOTE_MAX_CHARS: usize = 1000;

const SESSION_DIR_ENV: &str = "PAGENOTE_SESSION_DIR";

/// A free-text note attached to one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNote {
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// Notes of one document, keyed by 1-based page number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageNotes {
    notes: BTreeMap<usize, PageNote>,
}

impl PageNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: usize) -> Option<&PageNote> {
        self.notes.get(&page)
    }

    pub fn content(&self, page: usize) -> &str {
        self.notes
            .get(&page)
            .map(|note| note.content.as_str())
            .unwrap_or("")
    }

    /// Set the note of a page. Content beyond [`NOTE_MAX_CHARS`] is dropped
    /// and a blank note removes the entry.
    pub fn set(&mut self, page: usize, content: &str) {
        if content.trim().is_empty() {
            self.notes.remove(&page);
            return;
        }

        let content = truncate_chars(content, NOTE_MAX_CHARS);
        match self.notes.get_mut(&page) {
            Some(existing) if existing.content == content => {}
            Some(existing) => {
                existing.content = content;
                existing.updated_at = Utc::now();
            }
            None => {
                self.notes.insert(
                    page,
                    PageNote {
                        content,
                        updated_at: Utc::now(),
                    },
                );
            }
        }
    }

    pub fn remove(&mut self, page: usize) -> Option<PageNote> {
        self.notes.remove(&page)
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Pages with notes, ascending
    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.notes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &PageNote)> {
        self.notes.iter().map(|(page, note)| (*page, note))
    }

    pub fn to_envelope(&self, document: &str, total_pages: usize) -> NotesEnvelope {
        NotesEnvelope {
            document: document.to_string(),
            total_pages,
            pages: self
                .notes
                .iter()
                .map(|(page, note)| PageEntry {
                    page: *page,
                    content: note.content.clone(),
                    updated_at: note.updated_at,
                })
                .collect(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuild notes from an envelope, dropping pages outside `1..=total_pages`
    pub fn from_envelope(envelope: NotesEnvelope) -> Self {
        let total = envelope.total_pages;
        let notes = envelope
            .pages
            .into_iter()
            .filter(|entry| entry.page >= 1 && (total == 0 || entry.page <= total))
            .filter(|entry| !entry.content.trim().is_empty())
            .map(|entry| {
                (
                    entry.page,
                    PageNote {
                        content: truncate_chars(&entry.content, NOTE_MAX_CHARS),
                        updated_at: entry.updated_at,
                    },
                )
            })
            .collect();
        Self { notes }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// One page entry of the serialized notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub page: usize,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// Serialized notes of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesEnvelope {
    pub document: String,
    pub total_pages: usize,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
    pub saved_at: DateTime<Utc>,
}

/// Session-scoped storage for notes.
///
/// The default store lives in a temporary directory that is removed when
/// the store is dropped, so notes last for one viewing session.
pub struct SessionStore {
    root: PathBuf,
    _guard: Option<TempDir>,
}

impl SessionStore {
    /// A store that disappears with this session
    pub fn ephemeral() -> Result<Self> {
        let guard = tempfile::Builder::new()
            .prefix("pagenote-session-")
            .tempdir()
            .context("Failed to create session directory")?;
        Ok(Self {
            root: guard.path().to_path_buf(),
            _guard: Some(guard),
        })
    }

    /// A store backed by an explicit directory that outlives the process
    pub fn at(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir).context("Failed to create session directory")?;
        }
        Ok(Self {
            root: dir.to_path_buf(),
            _guard: None,
        })
    }

    /// Use `dir`, then `PAGENOTE_SESSION_DIR`, then an ephemeral directory
    pub fn resolve(dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = dir {
            return Self::at(dir);
        }
        match std::env::var_os(SESSION_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::at(Path::new(&dir)),
            _ => Self::ephemeral(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_ephemeral(&self) -> bool {
        self._guard.is_some()
    }

    pub fn file_path(&self, document: &str) -> PathBuf {
        self.root
            .join(format!("notes_{}.json", Self::document_key(document)))
    }

    fn document_key(document: &str) -> String {
        let digest = md5::compute(document.as_bytes());
        format!("{digest:x}")
    }

    pub fn load(&self, document: &str) -> Result<Option<NotesEnvelope>> {
        let path = self.file_path(document);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).context("Failed to read notes file")?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let envelope: NotesEnvelope =
            serde_json::from_str(&content).context("Failed to parse notes JSON")?;
        if envelope.document != document {
            debug!(
                "Notes file {path:?} belongs to {:?}, not {document:?}",
                envelope.document
            );
            return Ok(None);
        }
        Ok(Some(envelope))
    }

    pub fn save(&self, envelope: &NotesEnvelope) -> Result<()> {
        let json =
            serde_json::to_string_pretty(envelope).context("Failed to serialize notes")?;
        fs::write(self.file_path(&envelope.document), json)
            .context("Failed to write notes file")?;
        Ok(())
    }

    pub fn discard(&self, document: &str) -> Result<()> {
        let path = self.file_path(document);
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove notes file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_note() {
        let mut notes = PageNotes::new();
        notes.set(2, "check figure 3");

        assert_eq!(notes.content(2), "check figure 3");
        assert_eq!(notes.content(1), "");
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn blank_note_removes_entry() {
        let mut notes = PageNotes::new();
        notes.set(4, "temp");
        notes.set(4, "   \n");

        assert!(notes.get(4).is_none());
        assert!(notes.is_empty());
    }

    #[test]
    fn note_is_truncated_to_limit() {
        let mut notes = PageNotes::new();
        let long: String = "é".repeat(NOTE_MAX_CHARS + 50);
        notes.set(1, &long);

        assert_eq!(notes.content(1).chars().count(), NOTE_MAX_CHARS);
    }

    #[test]
    fn unchanged_content_keeps_timestamp() {
        let mut notes = PageNotes::new();
        notes.set(1, "same");
        let before = notes.get(1).unwrap().updated_at;
        notes.set(1, "same");
        assert_eq!(notes.get(1).unwrap().updated_at, before);
    }

    #[test]
    fn envelope_lists_pages_in_order() {
        let mut notes = PageNotes::new();
        notes.set(5, "five");
        notes.set(1, "one");
        notes.set(3, "three");

        let envelope = notes.to_envelope("doc.pdf", 6);
        let pages: Vec<usize> = envelope.pages.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![1, 3, 5]);
        assert_eq!(envelope.total_pages, 6);
        assert_eq!(envelope.document, "doc.pdf");
    }

    #[test]
    fn envelope_json_shape() {
        let mut notes = PageNotes::new();
        notes.set(2, "hello");
        let json = serde_json::to_value(notes.to_envelope("doc.pdf", 3)).unwrap();

        assert_eq!(json["document"], "doc.pdf");
        assert_eq!(json["total_pages"], 3);
        assert_eq!(json["pages"][0]["page"], 2);
        assert_eq!(json["pages"][0]["content"], "hello");
        assert!(json["saved_at"].is_string());
    }

    #[test]
    fn from_envelope_drops_out_of_range_pages() {
        let envelope: NotesEnvelope = serde_json::from_str(
            r#"{
                "document": "doc.pdf",
                "total_pages": 2,
                "pages": [
                    {"page": 0, "content": "zero", "updated_at": "2024-01-01T00:00:00Z"},
                    {"page": 2, "content": "two", "updated_at": "2024-01-01T00:00:00Z"},
                    {"page": 3, "content": "three", "updated_at": "2024-01-01T00:00:00Z"}
                ],
                "saved_at": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let notes = PageNotes::from_envelope(envelope);
        assert_eq!(notes.pages().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn store_save_load_discard() {
        let store = SessionStore::ephemeral().unwrap();
        let mut notes = PageNotes::new();
        notes.set(1, "intro");

        store.save(&notes.to_envelope("a.pdf", 3)).unwrap();
        let loaded = store.load("a.pdf").unwrap().unwrap();
        assert_eq!(PageNotes::from_envelope(loaded), notes);

        assert!(store.load("b.pdf").unwrap().is_none());

        store.discard("a.pdf").unwrap();
        assert!(store.load("a.pdf").unwrap().is_none());
    }

    #[test]
    fn ephemeral_store_is_removed_on_drop() {
        let store = SessionStore::ephemeral().unwrap();
        let root = store.root().to_path_buf();
        assert!(root.exists());
        assert!(store.is_ephemeral());

        drop(store);
        assert!(!root.exists());
    }

    #[test]
    fn explicit_store_survives_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let session = dir.path().join("session");
        {
            let store = SessionStore::at(&session).unwrap();
            let mut notes = PageNotes::new();
            notes.set(2, "kept");
            store.save(&notes.to_envelope("keep.pdf", 2)).unwrap();
        }

        let store = SessionStore::at(&session).unwrap();
        let loaded = store.load("keep.pdf").unwrap().unwrap();
        assert_eq!(loaded.pages[0].content, "kept");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let store = SessionStore::ephemeral().unwrap();
        fs::write(store.file_path("x.pdf"), "{not json").unwrap();
        assert!(store.load("x.pdf").is_err());
    }
}
