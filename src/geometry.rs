//! Display-space to image-space coordinate mathematics.
//!
//! The image is shown scaled down to fit the available width. Every selection
//! is recorded in display space and mapped back to original image pixels
//! only at submission time, so this module holds the conversion rules in
//! one place where they can be tested without a draw surface.

use serde::{Deserialize, Serialize};

/// Pixel dimensions of an image or of its on-screen rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Fit this size into `available_width`, preserving the aspect ratio.
    ///
    /// Images narrower than the available width keep their natural size;
    /// images are never upscaled. Both dimensions are at least one pixel.
    pub fn fit_to_width(&self, available_width: u32) -> Size {
        let width = available_width.min(self.width).max(1);
        let ratio = f64::from(self.height) / f64::from(self.width.max(1));
        let height = (f64::from(width) * ratio).floor().max(1.0) as u32;
        Size { width, height }
    }
}

/// A coordinate on the display surface, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp this point onto the display area `[0, width] x [0, height]`.
    ///
    /// Pointer capture keeps delivering move events after the pointer leaves
    /// the surface, so drag coordinates can be negative or past the edge.
    pub fn clamp_to(&self, display: Size) -> DisplayPoint {
        DisplayPoint {
            x: self.x.clamp(0.0, f64::from(display.width)),
            y: self.y.clamp(0.0, f64::from(display.height)),
        }
    }
}

/// A pixel coordinate in the original image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

impl PixelPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in original image pixels, top-left to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Per-axis ratio between natural and display dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactor {
    /// Compute `natural / display` independently for each axis.
    pub fn between(natural: Size, display: Size) -> Self {
        Self {
            x: f64::from(natural.width) / f64::from(display.width.max(1)),
            y: f64::from(natural.height) / f64::from(display.height.max(1)),
        }
    }

    /// Map a display coordinate into the natural pixel grid.
    ///
    /// Rounds half away from zero and clamps into `[0, natural - 1]`.
    pub fn to_natural(&self, point: DisplayPoint, natural: Size) -> PixelPoint {
        PixelPoint {
            x: scale_axis(point.x, self.x, natural.width),
            y: scale_axis(point.y, self.y, natural.height),
        }
    }

    /// Normalize two unordered display corners and map them into the natural grid.
    pub fn rect_to_natural(&self, a: DisplayPoint, b: DisplayPoint, natural: Size) -> PixelRect {
        let (top_left, bottom_right) = normalize_corners(a, b);
        let tl = self.to_natural(top_left, natural);
        let br = self.to_natural(bottom_right, natural);
        PixelRect {
            x1: tl.x,
            y1: tl.y,
            x2: br.x,
            y2: br.y,
        }
    }
}

fn scale_axis(value: f64, factor: f64, natural_extent: u32) -> u32 {
    let max = f64::from(natural_extent.saturating_sub(1));
    (value * factor).round().clamp(0.0, max) as u32
}

/// Order two corners into `(min x, min y)` and `(max x, max y)`.
pub fn normalize_corners(a: DisplayPoint, b: DisplayPoint) -> (DisplayPoint, DisplayPoint) {
    (
        DisplayPoint::new(a.x.min(b.x), a.y.min(b.y)),
        DisplayPoint::new(a.x.max(b.x), a.y.max(b.y)),
    )
}

/// True when the rectangle spanned by two corners has nonzero width and height.
pub fn has_area(a: DisplayPoint, b: DisplayPoint) -> bool {
    a.x != b.x && a.y != b.y
}
