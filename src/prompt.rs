//! Scaled selections and the form fields each one contributes to a request.
//!
//! Every selection kind implements [`SegmentPrompt`], which fixes the endpoint,
//! the name of the file part and the text parts of the multipart form. The
//! HTTP client only ever talks to this trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;
use crate::geometry::{PixelPoint, PixelRect};

/// Backend route a prompt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Point,
    Box,
    Color,
}

/// Contract shared by all prompt kinds.
pub trait SegmentPrompt {
    /// Route that accepts this prompt.
    fn endpoint(&self) -> Endpoint;

    /// Name of the multipart field carrying the image bytes.
    fn file_field(&self) -> &'static str;

    /// Text fields of the multipart form, in submission order.
    fn text_fields(&self) -> Result<Vec<(&'static str, String)>, SubmitError>;
}

/// One point as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPoint {
    pub x: u32,
    pub y: u32,
    pub label: u8,
}

/// Labeled points in original image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPrompt {
    pub points: Vec<PromptPoint>,
}

impl SegmentPrompt for PointPrompt {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Point
    }

    fn file_field(&self) -> &'static str {
        "file"
    }

    fn text_fields(&self) -> Result<Vec<(&'static str, String)>, SubmitError> {
        Ok(vec![("points", serde_json::to_string(&self.points)?)])
    }
}

/// A normalized rectangle in original image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPrompt {
    pub rect: PixelRect,
}

impl SegmentPrompt for BoxPrompt {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Box
    }

    fn file_field(&self) -> &'static str {
        "file"
    }

    fn text_fields(&self) -> Result<Vec<(&'static str, String)>, SubmitError> {
        let r = &self.rect;
        Ok(vec![
            ("x1", r.x1.to_string()),
            ("y1", r.y1.to_string()),
            ("x2", r.x2.to_string()),
            ("y2", r.y2.to_string()),
        ])
    }
}

/// A sampled pixel and the color tolerance around it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPrompt {
    pub point: PixelPoint,
    pub tolerance: f64,
}

impl SegmentPrompt for ColorPrompt {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Color
    }

    fn file_field(&self) -> &'static str {
        "image"
    }

    fn text_fields(&self) -> Result<Vec<(&'static str, String)>, SubmitError> {
        Ok(vec![
            ("x", self.point.x.to_string()),
            ("y", self.point.y.to_string()),
            ("tolerance", self.tolerance.to_string()),
        ])
    }
}

/// A selection scaled into original image pixels, ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Points(PointPrompt),
    Box(BoxPrompt),
    Color(ColorPrompt),
}

impl Prompt {
    fn inner(&self) -> &dyn SegmentPrompt {
        match self {
            Prompt::Points(p) => p,
            Prompt::Box(p) => p,
            Prompt::Color(p) => p,
        }
    }
}

impl SegmentPrompt for Prompt {
    fn endpoint(&self) -> Endpoint {
        self.inner().endpoint()
    }

    fn file_field(&self) -> &'static str {
        self.inner().file_field()
    }

    fn text_fields(&self) -> Result<Vec<(&'static str, String)>, SubmitError> {
        self.inner().text_fields()
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Points(p) => {
                write!(f, "{} point(s):", p.points.len())?;
                for pt in &p.points {
                    write!(f, " ({}, {}; label {})", pt.x, pt.y, pt.label)?;
                }
                Ok(())
            }
            Prompt::Box(b) => write!(
                f,
                "box ({}, {}) - ({}, {})",
                b.rect.x1, b.rect.y1, b.rect.x2, b.rect.y2
            ),
            Prompt::Color(c) => write!(
                f,
                "color sample at ({}, {}) with tolerance {}",
                c.point.x, c.point.y, c.tolerance
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_fields() {
        let prompt = Prompt::Points(PointPrompt {
            points: vec![
                PromptPoint { x: 200, y: 100, label: 1 },
                PromptPoint { x: 5, y: 6, label: 0 },
            ],
        });
        assert_eq!(prompt.endpoint(), Endpoint::Point);
        assert_eq!(prompt.file_field(), "file");

        let fields = prompt.text_fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "points");
        assert_eq!(
            fields[0].1,
            r#"[{"x":200,"y":100,"label":1},{"x":5,"y":6,"label":0}]"#
        );
    }

    #[test]
    fn test_box_fields() {
        let prompt = Prompt::Box(BoxPrompt {
            rect: PixelRect {
                x1: 10,
                y1: 11,
                x2: 20,
                y2: 21,
            },
        });
        assert_eq!(prompt.endpoint(), Endpoint::Box);
        assert_eq!(prompt.file_field(), "file");
        assert_eq!(
            prompt.text_fields().unwrap(),
            vec![
                ("x1", "10".to_string()),
                ("y1", "11".to_string()),
                ("x2", "20".to_string()),
                ("y2", "21".to_string()),
            ]
        );
    }

    #[test]
    fn test_color_fields_use_image_part() {
        let prompt = Prompt::Color(ColorPrompt {
            point: PixelPoint::new(3, 4),
            tolerance: 32.0,
        });
        assert_eq!(prompt.endpoint(), Endpoint::Color);
        assert_eq!(prompt.file_field(), "image");
        assert_eq!(
            prompt.text_fields().unwrap(),
            vec![
                ("x", "3".to_string()),
                ("y", "4".to_string()),
                ("tolerance", "32".to_string()),
            ]
        );
    }

    #[test]
    fn test_fractional_tolerance_passes_through() {
        let prompt = ColorPrompt {
            point: PixelPoint::new(0, 0),
            tolerance: 12.5,
        };
        let fields = prompt.text_fields().unwrap();
        assert_eq!(fields[2], ("tolerance", "12.5".to_string()));
    }

    #[test]
    fn test_display_summary() {
        let prompt = Prompt::Box(BoxPrompt {
            rect: PixelRect {
                x1: 1,
                y1: 2,
                x2: 3,
                y2: 4,
            },
        });
        assert_eq!(prompt.to_string(), "box (1, 2) - (3, 4)");
    }
}
