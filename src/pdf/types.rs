//! Core types for PDF viewing

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;

/// Page dimensions in PDF points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter, used when a page reports degenerate bounds
    pub const LETTER: Self = Self::new(612.0, 792.0);

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Size of a drawing surface in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pan offset in surface pixels from the top-left corner of the page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pan {
    pub x: i32,
    pub y: i32,
}

impl Pan {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Where a document comes from
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// An in-memory document (the built-in sample, or bytes read elsewhere)
    Bytes { name: String, data: Arc<[u8]> },
}

impl DocumentSource {
    pub fn bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Display and storage name of the document
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            Self::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Document metadata, reported once the worker has opened a document
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: usize,
    pub title: Option<String>,
    /// Size of every page, 0-indexed
    pub page_sizes: Vec<PageSize>,
}

impl DocumentInfo {
    /// Size of a 1-based page, falling back to Letter for unknown pages
    pub fn page_size(&self, page: usize) -> PageSize {
        page.checked_sub(1)
            .and_then(|idx| self.page_sizes.get(idx))
            .copied()
            .filter(|size| !size.is_degenerate())
            .unwrap_or(PageSize::LETTER)
    }
}

/// A rasterized page
#[derive(Clone)]
pub struct RenderedPage {
    /// Page number (0-indexed)
    pub page: usize,
    /// Zoom scale the page was rasterized at
    pub scale: f32,
    pub image: RgbImage,
}

impl RenderedPage {
    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page", &self.page)
            .field("scale", &self.scale)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_source_uses_file_name() {
        let source = DocumentSource::Path(PathBuf::from("/tmp/books/report.pdf"));
        assert_eq!(source.name(), "report.pdf");
    }

    #[test]
    fn page_size_falls_back_for_unknown_pages() {
        let info = DocumentInfo {
            name: "a.pdf".into(),
            page_count: 1,
            title: None,
            page_sizes: vec![PageSize::new(100.0, 200.0)],
        };

        assert_eq!(info.page_size(1), PageSize::new(100.0, 200.0));
        assert_eq!(info.page_size(0), PageSize::LETTER);
        assert_eq!(info.page_size(2), PageSize::LETTER);
    }

    #[test]
    fn pan_offset_saturates() {
        let pan = Pan::new(i32::MAX, 0).offset(10, -5);
        assert_eq!(pan, Pan::new(i32::MAX, -5));
    }
}
