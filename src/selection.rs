//! Selection modes and in-progress selection state.
//!
//! A [`Selection`] is always recorded in display coordinates. It is turned into
//! a request payload by [`Selection::scale_to_original`] at submission time.

use crate::geometry::{self, DisplayPoint, ScaleFactor, Size};
use crate::prompt::{BoxPrompt, ColorPrompt, PointPrompt, Prompt, PromptPoint};

/// How pointer gestures on the image are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Each tap adds a labeled point
    #[default]
    PointTap,
    /// Press, drag and release spans a rectangle
    BoxDrag,
    /// A click samples a color, grown by a tolerance
    ColorSample,
}

impl SelectionMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            SelectionMode::PointTap => "Tap",
            SelectionMode::BoxDrag => "Box",
            SelectionMode::ColorSample => "Color",
        }
    }
}

/// Label attached to a tapped point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointLabel {
    /// Exclude the region around this point
    Background,
    /// Include the region around this point
    #[default]
    Foreground,
}

impl PointLabel {
    /// Numeric label understood by the backend.
    pub fn value(&self) -> u8 {
        match self {
            PointLabel::Background => 0,
            PointLabel::Foreground => 1,
        }
    }

    /// Parse the backend's numeric label.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(PointLabel::Background),
            1 => Some(PointLabel::Foreground),
            _ => None,
        }
    }
}

/// Which pointer button started a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

impl PointerButton {
    fn point_label(self) -> PointLabel {
        match self {
            PointerButton::Primary => PointLabel::Foreground,
            PointerButton::Secondary => PointLabel::Background,
        }
    }
}

/// A tapped point in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledPoint {
    pub point: DisplayPoint,
    pub label: PointLabel,
}

/// The user's current selection, in display coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    Empty,
    /// One or more tapped points.
    Points(Vec<LabeledPoint>),
    /// A rectangle between two unordered corners.
    Box {
        start: DisplayPoint,
        end: DisplayPoint,
        dragging: bool,
    },
    /// A sampled coordinate and the tolerance to grow the region by.
    ColorSample { point: DisplayPoint, tolerance: f64 },
}

impl Selection {
    /// True when the selection is empty or degenerate and cannot be submitted.
    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Empty => true,
            Selection::Points(points) => points.is_empty(),
            Selection::Box { start, end, .. } => !geometry::has_area(*start, *end),
            Selection::ColorSample { .. } => false,
        }
    }

    /// Number of tapped points (zero for other variants).
    pub fn point_count(&self) -> usize {
        match self {
            Selection::Points(points) => points.len(),
            _ => 0,
        }
    }

    /// True while a box drag is in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self, Selection::Box { dragging: true, .. })
    }

    /// Apply a pointer press. Returns whether the overlay changed.
    pub fn pointer_down(
        &mut self,
        mode: SelectionMode,
        point: DisplayPoint,
        button: PointerButton,
        tolerance: f64,
    ) -> bool {
        match mode {
            SelectionMode::PointTap => {
                let labeled = LabeledPoint {
                    point,
                    label: button.point_label(),
                };
                match self {
                    Selection::Points(points) => points.push(labeled),
                    _ => *self = Selection::Points(vec![labeled]),
                }
            }
            SelectionMode::BoxDrag => {
                *self = Selection::Box {
                    start: point,
                    end: point,
                    dragging: true,
                };
            }
            SelectionMode::ColorSample => {
                *self = Selection::ColorSample { point, tolerance };
            }
        }
        true
    }

    /// Apply a pointer move. Only an active box drag reacts.
    pub fn pointer_move(&mut self, point: DisplayPoint) -> bool {
        match self {
            Selection::Box {
                end,
                dragging: true,
                ..
            } => {
                *end = point;
                true
            }
            _ => false,
        }
    }

    /// Apply a pointer release, finishing an active box drag.
    pub fn pointer_up(&mut self, point: DisplayPoint) -> bool {
        match self {
            Selection::Box { end, dragging, .. } if *dragging => {
                *end = point;
                *dragging = false;
                true
            }
            _ => false,
        }
    }

    /// Update the tolerance of an existing color sample.
    pub fn set_tolerance(&mut self, value: f64) {
        if let Selection::ColorSample { tolerance, .. } = self {
            *tolerance = value;
        }
    }

    /// Convert the selection into original-image pixel space.
    ///
    /// The scale factor is derived from `natural` and `display` on every call.
    /// Returns `None` for an empty or degenerate selection.
    pub fn scale_to_original(&self, natural: Size, display: Size) -> Option<Prompt> {
        if self.is_empty() {
            return None;
        }
        let scale = ScaleFactor::between(natural, display);

        let prompt = match self {
            Selection::Empty => return None,
            Selection::Points(points) => Prompt::Points(PointPrompt {
                points: points
                    .iter()
                    .map(|p| {
                        let px = scale.to_natural(p.point, natural);
                        PromptPoint {
                            x: px.x,
                            y: px.y,
                            label: p.label.value(),
                        }
                    })
                    .collect(),
            }),
            Selection::Box { start, end, .. } => Prompt::Box(BoxPrompt {
                rect: scale.rect_to_natural(*start, *end, natural),
            }),
            Selection::ColorSample { point, tolerance } => Prompt::Color(ColorPrompt {
                point: scale.to_natural(*point, natural),
                tolerance: *tolerance,
            }),
        };
        Some(prompt)
    }
}
