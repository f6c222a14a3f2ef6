//! Selection & submission controller.
//!
//! [`Session`] owns every piece of per-page state: the loaded image, the
//! current mode and selection, the tolerance, the in-flight flag, the last
//! result and the last error. Surfaces feed it user gestures and redraw from
//! [`Session::render`].
//!
//! Submission is split into [`Session::begin_submit`] and
//! [`Session::finish_submit`] so a surface can release its borrow of the
//! session while the request is outstanding. [`Session::submit`] combines
//! both for callers that can hold `&mut Session` across the await.

use tiny_skia::Pixmap;
use web_time::Instant;

use crate::backend::{PendingRequest, SegmentationBackend};
use crate::config::AppConfig;
use crate::constants::{TOLERANCE_MAX, TOLERANCE_MIN};
use crate::error::{LoadError, SubmitError};
use crate::geometry::DisplayPoint;
use crate::image_source::{ImageFile, LoadOptions, LoadedImage};
use crate::mask::MaskResource;
use crate::render;
use crate::selection::{PointerButton, Selection, SelectionMode};


/// Per-session settings taken from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub viewport_margin: u32,
    pub max_upload_bytes: u64,
    pub default_tolerance: f64,
    pub download_name: String,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            viewport_margin: config.preferences.viewport_margin,
            max_upload_bytes: config.limits.max_upload_bytes,
            default_tolerance: config.preferences.default_tolerance,
            download_name: config.preferences.download_name.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// All state of one selection session.
#[derive(Debug)]
pub struct Session {
    settings: SessionSettings,
    viewport_width: u32,
    image: Option<LoadedImage>,
    mode: SelectionMode,
    selection: Selection,
    tolerance: f64,
    in_flight: bool,
    result: Option<MaskResource>,
    last_error: Option<String>,
}

impl Session {
    /// Create an empty session for a viewport of `viewport_width` pixels.
    pub fn new(settings: SessionSettings, viewport_width: u32) -> Self {
        let tolerance = settings.default_tolerance.clamp(TOLERANCE_MIN, TOLERANCE_MAX);
        Self {
            settings,
            viewport_width,
            image: None,
            mode: SelectionMode::default(),
            selection: Selection::Empty,
            tolerance,
            in_flight: false,
            result: None,
            last_error: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// True while a request is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// The most recent successful mask.
    pub fn result(&self) -> Option<&MaskResource> {
        self.result.as_ref()
    }

    pub fn result_mut(&mut self) -> Option<&mut MaskResource> {
        self.result.as_mut()
    }

    /// User-visible text of the last failure, cleared by the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Width used to fit the *next* loaded image.
    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    // ------------------------------------------------------------------
    // Image loading
    // ------------------------------------------------------------------

    /// Load a newly picked file. `None` (picker dismissed) does nothing.
    ///
    /// On failure the error is also kept as [`Session::last_error`] and the
    /// previously loaded image stays in place.
    pub fn load_image(&mut self, file: Option<ImageFile>) -> Result<(), LoadError> {
        let Some(file) = file else {
            log::debug!("No file selected");
            return Ok(());
        };

        let options = LoadOptions {
            viewport_width: self.viewport_width,
            viewport_margin: self.settings.viewport_margin,
            max_upload_bytes: self.settings.max_upload_bytes,
        };

        match LoadedImage::decode(file, &options) {
            Ok(image) => {
                self.image = Some(image);
                self.selection = Selection::Empty;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("Image load failed: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Switch the gesture mode. Always clears the selection.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        if self.mode != mode {
            log::debug!("Mode: {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
        self.selection = Selection::Empty;
    }

    /// Set the color tolerance, clamped to the slider range.
    pub fn set_tolerance(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.tolerance = value.clamp(TOLERANCE_MIN, TOLERANCE_MAX);
        self.selection.set_tolerance(self.tolerance);
    }

    fn clamp_point(&self, point: DisplayPoint) -> Option<DisplayPoint> {
        self.image.as_ref().map(|img| point.clamp_to(img.display()))
    }

    /// Pointer pressed at a display coordinate. Returns whether to redraw.
    pub fn pointer_down(&mut self, point: DisplayPoint, button: PointerButton) -> bool {
        let Some(point) = self.clamp_point(point) else {
            return false;
        };
        log::debug!("{} pointer down at ({:.1}, {:.1})", self.mode.name(), point.x, point.y);
        self.selection
            .pointer_down(self.mode, point, button, self.tolerance)
    }

    /// Pointer moved. Returns whether to redraw.
    pub fn pointer_move(&mut self, point: DisplayPoint) -> bool {
        match self.clamp_point(point) {
            Some(point) => self.selection.pointer_move(point),
            None => false,
        }
    }

    /// Pointer released. Returns whether to redraw.
    pub fn pointer_up(&mut self, point: DisplayPoint) -> bool {
        match self.clamp_point(point) {
            Some(point) => self.selection.pointer_up(point),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.selection.is_empty() && !self.in_flight
    }

    /// Scale the selection and mark a request as in flight.
    pub fn begin_submit(&mut self) -> Result<PendingRequest, SubmitError> {
        if self.in_flight {
            return Err(SubmitError::Busy);
        }
        let image = self.image.as_ref().ok_or(SubmitError::NoImage)?;
        let prompt = self
            .selection
            .scale_to_original(image.natural(), image.display())
            .ok_or(SubmitError::EmptySelection)?;

        log::info!("Submitting {} for '{}'", prompt, image.file().name);

        let request = PendingRequest {
            file_name: image.file().name.clone(),
            mime_type: image.mime_type().to_string(),
            bytes: image.file().bytes.clone(),
            prompt,
        };
        self.in_flight = true;
        self.last_error = None;
        Ok(request)
    }

    /// Record the outcome of a request started with [`Session::begin_submit`].
    ///
    /// Success replaces (and releases) the previous mask and clears the
    /// selection. Failure keeps the selection and previous mask and records
    /// the error text.
    pub fn finish_submit(
        &mut self,
        outcome: Result<Vec<u8>, SubmitError>,
    ) -> Result<&MaskResource, SubmitError> {
        self.in_flight = false;

        let outcome = outcome.and_then(|bytes| {
            if bytes.is_empty() {
                Err(SubmitError::EmptyResponse)
            } else {
                Ok(bytes)
            }
        });

        match outcome {
            Ok(bytes) => {
                let mask = MaskResource::new(bytes, &self.settings.download_name);
                log::info!(
                    "Received mask '{}' ({} bytes)",
                    mask.file_name(),
                    mask.bytes().len()
                );
                if let Some(mut previous) = self.result.replace(mask) {
                    previous.release();
                }
                self.selection = Selection::Empty;
                self.last_error = None;
                self.result.as_ref().ok_or(SubmitError::EmptyResponse)
            }
            Err(e) => {
                log::warn!("Submission failed: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Submit the current selection through `backend`.
    pub async fn submit<B: SegmentationBackend>(
        &mut self,
        backend: &B,
    ) -> Result<&MaskResource, SubmitError> {
        let request = self.begin_submit()?;
        let started = Instant::now();
        let outcome = backend.segment(&request).await;
        log::info!(
            "Segmentation request finished in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        self.finish_submit(outcome)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Draw the image with the selection overlay. `None` with no image.
    pub fn render(&self) -> Option<Pixmap> {
        let image = self.image.as_ref()?;
        render::render_overlay(image, &self.selection)
    }
}
