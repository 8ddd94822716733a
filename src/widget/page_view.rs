//! Draws a rendered page with half-block cells
//!
//! Every terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀`, the lower one as its background.

use image::RgbImage;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::pdf::{Pan, RenderedPage, Size};
use crate::theme::Base16Palette;

const UPPER_HALF: &str = "▀";

/// Pixel container a page view offers inside `area`
pub fn container_for(area: Rect) -> Size {
    Size::new(u32::from(area.width), u32::from(area.height) * 2)
}

pub struct PageView<'a> {
    page: Option<&'a RenderedPage>,
    pan: Pan,
    loading: bool,
    error: Option<&'a str>,
    palette: &'a Base16Palette,
}

impl<'a> PageView<'a> {
    pub fn new(palette: &'a Base16Palette) -> Self {
        Self {
            page: None,
            pan: Pan::ORIGIN,
            loading: false,
            error: None,
            palette,
        }
    }

    pub fn page(mut self, page: Option<&'a RenderedPage>) -> Self {
        self.page = page;
        self
    }

    pub fn pan(mut self, pan: Pan) -> Self {
        self.pan = pan;
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }

    fn render_message(&self, text: &str, color: Color, area: Rect, buf: &mut Buffer) {
        let y = area.y + area.height / 2;
        let message_area = Rect::new(area.x, y, area.width, area.height - (y - area.y));
        Paragraph::new(Line::from(text.to_string()))
            .style(Style::default().fg(color).bg(self.palette.base_00))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(message_area, buf);
    }
}

impl Widget for PageView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        buf.set_style(area, Style::default().bg(self.palette.base_00));

        if let Some(error) = self.error {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.palette.base_08))
                .title(" Error ");
            let inner = block.inner(area);
            block.render(area, buf);
            self.render_message(error, self.palette.base_08, inner, buf);
            return;
        }

        match self.page {
            Some(page) => draw_half_blocks(&page.image, self.pan, area, buf, self.palette.base_00),
            None if self.loading => {
                self.render_message("Loading…", self.palette.base_04, area, buf);
            }
            None => {
                self.render_message("No document", self.palette.base_03, area, buf);
            }
        }
    }
}

/// Offset that centers `len` pixels in `space`, zero when they do not fit
fn centering(len: u32, space: u32) -> i64 {
    i64::from(space.saturating_sub(len) / 2)
}

fn draw_half_blocks(image: &RgbImage, pan: Pan, area: Rect, buf: &mut Buffer, backdrop: Color) {
    let container = container_for(area);
    let offset_x = centering(image.width(), container.width);
    let offset_y = centering(image.height(), container.height);

    let pixel = |x: i64, y: i64| -> Color {
        if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
            return backdrop;
        }
        let [r, g, b] = image.get_pixel(x as u32, y as u32).0;
        Color::Rgb(r, g, b)
    };

    for row in 0..area.height {
        let top_y = i64::from(pan.y) + i64::from(row) * 2 - offset_y;
        for col in 0..area.width {
            let x = i64::from(pan.x) + i64::from(col) - offset_x;
            let upper = pixel(x, top_y);
            let lower = pixel(x, top_y + 1);
            buf[(area.x + col, area.y + row)]
                .set_symbol(UPPER_HALF)
                .set_fg(upper)
                .set_bg(lower);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::OCEANIC_NEXT;
    use image::Rgb;

    fn page(width: u32, height: u32) -> RenderedPage {
        let mut image = RgbImage::new(width, height);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = Rgb([x as u8, y as u8, 0]);
        }
        RenderedPage {
            page: 0,
            scale: 1.0,
            image,
        }
    }

    #[test]
    fn container_doubles_rows() {
        assert_eq!(container_for(Rect::new(0, 0, 10, 5)), Size::new(10, 10));
    }

    #[test]
    fn pixels_map_to_half_blocks() {
        let page = page(20, 20);
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        PageView::new(&OCEANIC_NEXT)
            .page(Some(&page))
            .pan(Pan::new(3, 4))
            .render(area, &mut buf);

        let cell = &buf[(1, 1)];
        assert_eq!(cell.symbol(), UPPER_HALF);
        assert_eq!(cell.fg, Color::Rgb(4, 6, 0));
        assert_eq!(cell.bg, Color::Rgb(4, 7, 0));
    }

    #[test]
    fn small_page_is_centered() {
        let page = page(2, 2);
        let area = Rect::new(0, 0, 6, 3);
        let mut buf = Buffer::empty(area);
        PageView::new(&OCEANIC_NEXT)
            .page(Some(&page))
            .render(area, &mut buf);

        assert_eq!(buf[(0, 0)].fg, OCEANIC_NEXT.base_00);
        assert_eq!(buf[(2, 1)].fg, Color::Rgb(0, 0, 0));
        assert_eq!(buf[(3, 1)].bg, Color::Rgb(1, 1, 0));
    }

    #[test]
    fn error_is_shown_verbatim() {
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        PageView::new(&OCEANIC_NEXT)
            .error(Some("Invalid PDF structure"))
            .render(area, &mut buf);

        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect();
        assert!(text.contains("Invalid PDF structure"));
    }
}
