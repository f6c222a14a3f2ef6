//! Overlay rendering.
//!
//! Draws the display-size image with the current selection on top into a
//! `tiny_skia::Pixmap`. The browser copies the pixmap into its canvas, the
//! CLI writes it to a PNG.

use image::RgbaImage;
use tiny_skia::{
    Color, FillRule, IntSize, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::constants::{
    BACKGROUND_POINT_COLOR, BOX_STROKE_WIDTH, OVERLAY_COLOR, POINT_RADIUS, SAMPLE_RING_RADIUS,
};
use crate::geometry::{self, DisplayPoint};
use crate::image_source::LoadedImage;
use crate::selection::{PointLabel, Selection};

/// Draw `image` at display size with `selection` on top.
///
/// Returns `None` if the pixmap cannot be allocated.
pub fn render_overlay(image: &LoadedImage, selection: &Selection) -> Option<Pixmap> {
    let mut pixmap = pixmap_from_rgba(image.preview())?;

    match selection {
        Selection::Empty => {}
        Selection::Points(points) => {
            for p in points {
                let color = match p.label {
                    PointLabel::Foreground => OVERLAY_COLOR,
                    PointLabel::Background => BACKGROUND_POINT_COLOR,
                };
                fill_dot(&mut pixmap, p.point, POINT_RADIUS, color);
            }
        }
        Selection::Box { start, end, .. } => {
            stroke_box(&mut pixmap, *start, *end);
        }
        Selection::ColorSample { point, .. } => {
            stroke_ring(&mut pixmap, *point, SAMPLE_RING_RADIUS);
            fill_dot(&mut pixmap, *point, 2.0, OVERLAY_COLOR);
        }
    }

    Some(pixmap)
}

fn paint_for(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    paint.anti_alias = true;
    paint
}

fn fill_dot(pixmap: &mut Pixmap, at: DisplayPoint, radius: f32, color: [u8; 4]) {
    if let Some(path) = PathBuilder::from_circle(at.x as f32, at.y as f32, radius) {
        pixmap.fill_path(
            &path,
            &paint_for(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

fn stroke_ring(pixmap: &mut Pixmap, at: DisplayPoint, radius: f32) {
    if let Some(path) = PathBuilder::from_circle(at.x as f32, at.y as f32, radius) {
        let stroke = Stroke {
            width: BOX_STROKE_WIDTH,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &path,
            &paint_for(OVERLAY_COLOR),
            &stroke,
            Transform::identity(),
            None,
        );
    }
}

fn stroke_box(pixmap: &mut Pixmap, a: DisplayPoint, b: DisplayPoint) {
    let (tl, br) = geometry::normalize_corners(a, b);
    let Some(rect) = Rect::from_ltrb(tl.x as f32, tl.y as f32, br.x as f32, br.y as f32) else {
        return;
    };
    let path = PathBuilder::from_rect(rect);
    let stroke = Stroke {
        width: BOX_STROKE_WIDTH,
        ..Stroke::default()
    };
    pixmap.stroke_path(
        &path,
        &paint_for(OVERLAY_COLOR),
        &stroke,
        Transform::identity(),
        None,
    );
}

/// Copy straight-alpha RGBA into a premultiplied pixmap.
pub fn pixmap_from_rgba(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = image.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, size)
}

/// Copy a premultiplied pixmap back into straight-alpha RGBA.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::tests::{options, png_bytes};
    use crate::image_source::{ImageFile, LoadedImage};
    use crate::selection::LabeledPoint;

    fn loaded(width: u32, height: u32) -> LoadedImage {
        LoadedImage::decode(
            ImageFile::new("t.png", png_bytes(width, height)),
            &options(width + 32),
        )
        .unwrap()
    }

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = pixmap.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn test_empty_selection_draws_image_only() {
        let img = loaded(20, 10);
        let pixmap = render_overlay(&img, &Selection::Empty).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (20, 10));
        assert_eq!(pixel(&pixmap, 10, 5), [40, 80, 120, 255]);
    }

    #[test]
    fn test_point_dot_is_drawn() {
        let img = loaded(40, 40);
        let selection = Selection::Points(vec![LabeledPoint {
            point: DisplayPoint::new(20.0, 20.0),
            label: PointLabel::Foreground,
        }]);
        let pixmap = render_overlay(&img, &selection).unwrap();
        assert_eq!(pixel(&pixmap, 20, 20), OVERLAY_COLOR);
        assert_eq!(pixel(&pixmap, 2, 2), [40, 80, 120, 255]);
    }

    #[test]
    fn test_box_outline_is_drawn_inside_untouched() {
        let img = loaded(60, 60);
        let selection = Selection::Box {
            start: DisplayPoint::new(50.0, 50.0),
            end: DisplayPoint::new(10.0, 10.0),
            dragging: false,
        };
        let pixmap = render_overlay(&img, &selection).unwrap();
        let edge = pixel(&pixmap, 30, 10);
        assert_ne!(edge, [40, 80, 120, 255]);
        assert!(edge[2] > 200, "edge should be cyan, got {:?}", edge);
        assert_eq!(pixel(&pixmap, 30, 30), [40, 80, 120, 255]);
    }

    #[test]
    fn test_rgba_round_trip_opaque() {
        let img = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let pixmap = pixmap_from_rgba(&img).unwrap();
        assert_eq!(pixmap_to_rgba(&pixmap), img);
    }
}
