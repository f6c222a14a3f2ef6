//! maskpick - point, box and color selection for remote image segmentation
//!
//! The user picks a region of an image in display coordinates; the session
//! scales it to original pixels, posts it with the image to a segmentation
//! service and keeps the returned mask for display and download.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod image_source;
pub mod logging;
pub mod mask;
pub mod prompt;
pub mod render;
pub mod selection;
pub mod session;

pub use backend::{HttpBackend, PendingRequest, SegmentationBackend};
pub use config::AppConfig;
pub use error::{LoadError, SubmitError};
pub use image_source::{ImageFile, LoadedImage};
pub use mask::MaskResource;
pub use selection::{PointerButton, Selection, SelectionMode};
pub use session::{Session, SessionSettings};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;
