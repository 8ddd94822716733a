//! Built-in document shown when nothing else is configured

use std::fmt::Write;

use crate::pdf::DocumentSource;

pub const SAMPLE_NAME: &str = "pagenote-sample.pdf";
pub const SAMPLE_PAGES: usize = 5;

const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;

pub fn sample_source() -> DocumentSource {
    DocumentSource::bytes(SAMPLE_NAME, sample_pdf(SAMPLE_PAGES))
}

/// Build a minimal PDF with `pages` pages, each showing its number in large
/// type over a frame so zoom and pan are easy to follow.
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let pages = pages.max(1);
    let mut objects: Vec<String> = Vec::with_capacity(3 + pages * 2);

    let kids = (0..pages)
        .map(|i| format!("{} 0 R", page_object(i)))
        .collect::<Vec<_>>()
        .join(" ");

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{kids}] /Count {pages} /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] >>"
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for i in 0..pages {
        let content = page_content(i + 1, pages);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            page_object(i) + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{body}\nendobj\n", idx + 1);
    }

    let xref_start = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(out, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
        objects.len() + 1
    );

    out.into_bytes()
}

fn page_object(index: usize) -> usize {
    4 + index * 2
}

fn page_content(page: usize, total: usize) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "4 w 36 36 {} {} re S", PAGE_WIDTH - 72, PAGE_HEIGHT - 72);
    let _ = writeln!(s, "0.2 0.4 0.8 rg 72 600 468 8 re f 0 g");
    let _ = writeln!(s, "BT /F1 160 Tf 200 300 Td ({page}) Tj ET");
    let _ = write!(
        s,
        "BT /F1 24 Tf 72 680 Td (pagenote sample - page {page} of {total}) Tj ET"
    );
    s
}
