//! Writing a document's notes out of the session

use anyhow::{Context, Result};
use log::info;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::notes::PageNotes;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No notes to export")]
    NoNotes,
    #[error("Export directory {0} not found")]
    ExportDirNotFound(PathBuf),
}

/// Write `notes` as JSON to `<export_dir>/<stem>_notes.json`
pub fn export_notes(
    notes: &PageNotes,
    document: &str,
    total_pages: usize,
    export_dir: &Path,
) -> Result<PathBuf> {
    if notes.is_empty() {
        return Err(ExportError::NoNotes.into());
    }
    if !export_dir.is_dir() {
        return Err(ExportError::ExportDirNotFound(export_dir.to_path_buf()).into());
    }

    let filepath = export_dir.join(export_filename(document));
    let envelope = notes.to_envelope(document, total_pages);
    let json = serde_json::to_string_pretty(&envelope).context("Failed to serialize notes")?;
    fs::write(&filepath, json)
        .with_context(|| format!("Failed to write to {}", filepath.display()))?;

    info!(
        "Exported {} notes to: {}",
        notes.len(),
        filepath.display()
    );
    Ok(filepath)
}

pub fn export_filename(document: &str) -> String {
    let stem = Path::new(document)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}_notes.json", sanitize_filename(&stem))
}

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());

static RESERVED_NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$").unwrap());

/// Sanitize a filename for cross-platform compatibility
pub fn sanitize_filename(name: &str) -> String {
    let replaced = INVALID_CHARS.replace_all(name, "_");

    // Leading/trailing spaces and dots are problematic on Windows
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');

    if RESERVED_NAMES.is_match(trimmed) {
        return format!("_{trimmed}");
    }

    let limited: String = trimmed.chars().take(200).collect();
    if limited.is_empty() {
        "untitled".to_string()
    } else {
        limited
    }
}
