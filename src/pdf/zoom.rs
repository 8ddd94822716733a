//! Zoom and pan math for single-page PDF viewing
//!
//! Manages the zoom scale, the viewport a page occupies at that scale,
//! and the bounds the pan offset has to stay within.

use super::types::{PageSize, Pan, Size};

/// Pan direction for keyboard navigation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Returns true if the direction is vertical (Up or Down)
    pub fn vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Zoom state for PDF viewing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    scale: f32,
    step: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            step: Self::DEFAULT_STEP,
        }
    }
}

impl Zoom {
    /// Minimum allowed zoom scale
    pub const MIN_SCALE: f32 = 0.5;
    /// Maximum allowed zoom scale
    pub const MAX_SCALE: f32 = 5.0;
    pub const DEFAULT_SCALE: f32 = 1.0;
    pub const DEFAULT_STEP: f32 = 0.25;

    /// Base pan step in pixels for horizontal movement
    pub const BASE_PAN_STEP_X: f32 = 8.0;
    /// Base pan step in pixels for vertical movement
    pub const BASE_PAN_STEP_Y: f32 = 8.0;

    #[must_use]
    pub fn with_step(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            Self::DEFAULT_STEP
        };
        Self {
            scale: Self::DEFAULT_SCALE,
            step,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) {
        self.scale = Self::clamp_scale(self.scale + self.step);
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) {
        self.scale = Self::clamp_scale(self.scale - self.step);
    }

    /// Set an explicit scale. Non-finite values are ignored.
    pub fn set(&mut self, scale: f32) {
        if scale.is_finite() {
            self.scale = Self::clamp_scale(scale);
        }
    }

    pub fn reset(&mut self) {
        self.scale = Self::DEFAULT_SCALE;
    }

    /// Pan step for a direction, in pixels, larger when zoomed in
    pub fn pan_step(&self, direction: ScrollDirection) -> (i32, i32) {
        let base = if direction.vertical() {
            Self::BASE_PAN_STEP_Y
        } else {
            Self::BASE_PAN_STEP_X
        };
        let step = (base * self.scale).max(1.0).round() as i32;

        match direction {
            ScrollDirection::Up => (0, -step),
            ScrollDirection::Down => (0, step),
            ScrollDirection::Left => (-step, 0),
            ScrollDirection::Right => (step, 0),
        }
    }

    /// Clamp scale to the valid range, handling NaN/Inf
    pub fn clamp_scale(scale: f32) -> f32 {
        if !scale.is_finite() {
            Self::DEFAULT_SCALE
        } else {
            scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }
}

/// Scale at which the page's limiting dimension matches the container exactly.
///
/// `density` is surface pixels per PDF point at scale 1.0. The result is
/// clamped into the zoom bounds, so a page that would need a scale outside
/// them gets the nearest bound instead.
pub fn fit_scale(page: PageSize, container: Size, density: f32) -> f32 {
    if page.is_degenerate() || container.is_empty() || !(density.is_finite() && density > 0.0) {
        return Zoom::DEFAULT_SCALE;
    }

    let width = container.width as f32 / (page.width * density);
    let height = container.height as f32 / (page.height * density);

    Zoom::clamp_scale(width.min(height))
}

/// Pixel rectangle a page occupies at the given scale
pub fn viewport(page: PageSize, scale: f32, density: f32) -> Size {
    let page = if page.is_degenerate() {
        PageSize::LETTER
    } else {
        page
    };
    let factor = Zoom::clamp_scale(scale) * density.max(f32::EPSILON);

    Size::new(
        ((page.width * factor).round() as u32).max(1),
        ((page.height * factor).round() as u32).max(1),
    )
}

/// Keep the pan offset inside the part of the viewport that overflows the container
pub fn clamp_pan(pan: Pan, viewport: Size, container: Size) -> Pan {
    let max_x = viewport.width.saturating_sub(container.width);
    let max_y = viewport.height.saturating_sub(container.height);

    Pan {
        x: pan.x.clamp(0, i32::try_from(max_x).unwrap_or(i32::MAX)),
        y: pan.y.clamp(0, i32::try_from(max_y).unwrap_or(i32::MAX)),
    }
}
