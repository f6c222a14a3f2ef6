//! Global constants for maskpick

/// Horizontal space kept free around the display surface, in pixels.
pub const DEFAULT_VIEWPORT_MARGIN: u32 = 32;

/// Viewport width assumed when the surface cannot report one (CLI).
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Radius of the dot drawn for each point selection.
pub const POINT_RADIUS: f32 = 6.0;

/// Stroke width of the selection rectangle.
pub const BOX_STROKE_WIDTH: f32 = 2.0;

/// Radius of the ring drawn around a color sample.
pub const SAMPLE_RING_RADIUS: f32 = 9.0;

/// Overlay color for foreground selections (#22d3ee).
pub const OVERLAY_COLOR: [u8; 4] = [0x22, 0xd3, 0xee, 0xff];

/// Overlay color for background points (#f43f5e).
pub const BACKGROUND_POINT_COLOR: [u8; 4] = [0xf4, 0x3f, 0x5e, 0xff];

/// Bounds of the tolerance slider.
pub const TOLERANCE_MIN: f64 = 0.0;
pub const TOLERANCE_MAX: f64 = 100.0;

/// Initial tolerance value.
pub const DEFAULT_TOLERANCE: f64 = 32.0;

/// Largest image file accepted for upload (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Backend request timeout in seconds (native builds only).
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Base name of the downloaded mask file; the extension follows the mask format.
pub const DEFAULT_DOWNLOAD_NAME: &str = "mask";
