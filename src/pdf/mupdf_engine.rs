//! MuPDF-backed engine

use image::RgbImage;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::cancel::RenderTask;
use super::engine::{PdfDocument, PdfEngine, check_cancelled, check_page};
use super::request::{RenderParams, WorkerFault};
use super::types::{DocumentSource, PageSize, RenderedPage};
use super::zoom::Zoom;

const PDF_MAGIC: &str = "application/pdf";

pub struct MupdfEngine;

impl PdfEngine for MupdfEngine {
    fn open(&self, source: &DocumentSource) -> Result<Box<dyn PdfDocument>, WorkerFault> {
        let doc = match source {
            DocumentSource::Path(path) => Document::open(path.to_string_lossy().as_ref())?,
            DocumentSource::Bytes { data, .. } => Document::from_bytes(data, PDF_MAGIC)?,
        };
        let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);

        Ok(Box::new(MupdfDocument { doc, page_count }))
    }
}

struct MupdfDocument {
    doc: Document,
    page_count: usize,
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn title(&self) -> Option<String> {
        self.doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    fn page_size(&self, page: usize) -> Result<PageSize, WorkerFault> {
        check_page(page, self.page_count)?;
        let bounds = self.doc.load_page(page as i32)?.bounds()?;
        Ok(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn render(
        &self,
        page_num: usize,
        params: &RenderParams,
        task: &RenderTask,
    ) -> Result<RenderedPage, WorkerFault> {
        check_page(page_num, self.page_count)?;
        check_cancelled(task)?;

        let page = self.doc.load_page(page_num as i32)?;
        let scale = Zoom::clamp_scale(params.scale);
        let mag = scale * params.density;

        check_cancelled(task)?;
        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&Matrix::new_scale(mag, mag), &rgb, false, false)?;
        let image = pixmap_to_image(&pixmap)?;
        check_cancelled(task)?;

        Ok(RenderedPage {
            page: page_num,
            scale,
            image,
        })
    }
}

fn pixmap_to_image(pixmap: &Pixmap) -> Result<RgbImage, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    RgbImage::from_raw(pixmap.width(), pixmap.height(), out)
        .ok_or_else(|| WorkerFault::generic("Pixmap dimensions do not match its samples"))
}
