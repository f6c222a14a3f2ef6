//! Browser front-end.
//!
//! Binds the page's controls by element id, forwards gestures to a
//! [`Session`], draws the overlay into the canvas and publishes the returned
//! mask through the download link.
//!
//! Expected elements: `fileInput`, `canvas`, `maskBtn`, `downloadLink`,
//! `modeTap`, `modeBox`. Optional: `modeColor`, `tolerance`,
//! `toleranceValue`, `errorText`, `maskPreview`.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlAnchorElement,
    HtmlButtonElement, HtmlCanvasElement, HtmlElement, HtmlImageElement, HtmlInputElement,
    ImageData, PointerEvent,
};

use crate::backend::{HttpBackend, SegmentationBackend};
use crate::config::AppConfig;
use crate::constants::DEFAULT_VIEWPORT_WIDTH;
use crate::geometry::DisplayPoint;
use crate::image_source::ImageFile;
use crate::logging;
use crate::render;
use crate::selection::{PointerButton, SelectionMode};
use crate::session::{Session, SessionSettings};

const ACTIVE_CLASS: &str = "bg-emerald-600";
const INACTIVE_CLASS: &str = "bg-slate-700";
const HIDDEN_CLASS: &str = "hidden";
const SUBMIT_LABEL: &str = "Generate Mask";
const BUSY_LABEL: &str = "Processing…";

/// Handles to the page's controls.
struct Ui {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    file_input: HtmlInputElement,
    mask_btn: HtmlButtonElement,
    download_link: HtmlAnchorElement,
    mode_buttons: Vec<(SelectionMode, HtmlElement)>,
    tolerance: Option<HtmlInputElement>,
    tolerance_value: Option<HtmlElement>,
    error_text: Option<HtmlElement>,
    mask_preview: Option<HtmlImageElement>,
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{}", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{} has an unexpected element type", id)))
}

fn optional_element<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document.get_element_by_id(id)?.dyn_into::<T>().ok()
}

/// Add `class` to `element` when `on`, remove it otherwise.
fn set_class(element: &Element, class: &str, on: bool) {
    if let Err(e) = element.class_list().toggle_with_force(class, on) {
        log::debug!("Failed to toggle class {}: {:?}", class, e);
    }
}

impl Ui {
    fn bind(document: &Document) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = element(document, "canvas")?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d canvas context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("unexpected canvas context type"))?;

        let mut mode_buttons = vec![
            (SelectionMode::PointTap, element(document, "modeTap")?),
            (SelectionMode::BoxDrag, element(document, "modeBox")?),
        ];
        if let Some(color) = optional_element(document, "modeColor") {
            mode_buttons.push((SelectionMode::ColorSample, color));
        }

        Ok(Self {
            canvas,
            ctx,
            file_input: element(document, "fileInput")?,
            mask_btn: element(document, "maskBtn")?,
            download_link: element(document, "downloadLink")?,
            mode_buttons,
            tolerance: optional_element(document, "tolerance"),
            tolerance_value: optional_element(document, "toleranceValue"),
            error_text: optional_element(document, "errorText"),
            mask_preview: optional_element(document, "maskPreview"),
        })
    }

    /// Pointer position in canvas pixels.
    fn pointer_position(&self, event: &PointerEvent) -> DisplayPoint {
        let rect = self.canvas.get_bounding_client_rect();
        let sx = if rect.width() > 0.0 {
            f64::from(self.canvas.width()) / rect.width()
        } else {
            1.0
        };
        let sy = if rect.height() > 0.0 {
            f64::from(self.canvas.height()) / rect.height()
        } else {
            1.0
        };
        DisplayPoint::new(
            (f64::from(event.client_x()) - rect.left()) * sx,
            (f64::from(event.client_y()) - rect.top()) * sy,
        )
    }
}

/// Everything the event handlers share.
struct App {
    session: RefCell<Session>,
    backend: HttpBackend,
    ui: Ui,
}

impl App {
    fn redraw(&self) {
        let session = self.session.borrow();
        let Some(pixmap) = session.render() else {
            return;
        };
        let rgba = render::pixmap_to_rgba(&pixmap);
        let result = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(rgba.as_raw().as_slice()),
            rgba.width(),
            rgba.height(),
        )
        .and_then(|data| self.ui.ctx.put_image_data(&data, 0.0, 0.0));
        if let Err(e) = result {
            log::error!("Failed to draw overlay: {:?}", e);
        }
    }

    /// Bring button states, labels and error text in line with the session.
    fn sync_controls(&self) {
        let session = self.session.borrow();
        let ui = &self.ui;

        ui.mask_btn.set_disabled(!session.can_submit());
        ui.mask_btn.set_text_content(Some(if session.is_submitting() {
            BUSY_LABEL
        } else {
            SUBMIT_LABEL
        }));

        for (mode, button) in &ui.mode_buttons {
            let active = *mode == session.mode();
            set_class(button, ACTIVE_CLASS, active);
            set_class(button, INACTIVE_CLASS, !active);
        }

        if let Some(slider) = &ui.tolerance {
            slider.set_disabled(session.mode() != SelectionMode::ColorSample);
        }
        if let Some(label) = &ui.tolerance_value {
            label.set_text_content(Some(&session.tolerance().to_string()));
        }
        if let Some(error_text) = &ui.error_text {
            error_text.set_text_content(session.last_error());
            set_class(error_text, HIDDEN_CLASS, session.last_error().is_none());
        }
    }

    fn show_error(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.alert_with_message(message) {
                log::debug!("alert failed: {:?}", e);
            }
        }
    }

    /// Show the current mask and point the download link at it.
    fn publish_result(&self) {
        let mut session = self.session.borrow_mut();
        let Some(mask) = session.result_mut() else {
            return;
        };
        let file_name = mask.file_name().to_string();
        match mask.object_url() {
            Ok(url) => {
                let link = &self.ui.download_link;
                link.set_href(url);
                link.set_download(&file_name);
                set_class(link, HIDDEN_CLASS, false);
                if let Some(preview) = &self.ui.mask_preview {
                    preview.set_src(url);
                    preview.set_alt(&file_name);
                    set_class(preview, HIDDEN_CLASS, false);
                }
            }
            Err(e) => log::error!("Failed to create object URL: {:?}", e),
        }
    }

    fn set_mode(&self, mode: SelectionMode) {
        self.session.borrow_mut().set_mode(mode);
        self.redraw();
        self.sync_controls();
    }

    fn resize_canvas(&self) {
        if let Some(image) = self.session.borrow().image() {
            let display = image.display();
            self.ui.canvas.set_width(display.width);
            self.ui.canvas.set_height(display.height);
        }
    }
}

fn viewport_width() -> u32 {
    web_sys::window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .map(|w| w.max(0.0) as u32)
        .unwrap_or(DEFAULT_VIEWPORT_WIDTH)
}

fn listen<E: JsCast + 'static>(
    target: &EventTarget,
    event: &str,
    mut handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: Event| {
        if let Ok(event) = event.dyn_into::<E>() {
            handler(event);
        }
    }) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget(); // Leak the closure to keep it alive
    Ok(())
}

fn button_of(event: &PointerEvent) -> PointerButton {
    if event.button() == 2 {
        PointerButton::Secondary
    } else {
        PointerButton::Primary
    }
}

async fn read_file(file: web_sys::File) -> Result<ImageFile, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Ok(ImageFile::new(file.name(), bytes))
}

fn install_handlers(app: &Rc<App>) -> Result<(), JsValue> {
    let ui = &app.ui;

    let a = app.clone();
    listen(&ui.file_input, "change", move |_: Event| {
        let Some(file) = a.ui.file_input.files().and_then(|files| files.get(0)) else {
            return;
        };
        let a = a.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let loaded = match read_file(file).await {
                Ok(image_file) => {
                    let mut session = a.session.borrow_mut();
                    session.set_viewport_width(viewport_width());
                    session.load_image(Some(image_file)).map_err(|e| e.to_string())
                }
                Err(e) => Err(format!("Could not read file: {:?}", e)),
            };
            if let Err(message) = loaded {
                a.show_error(&message);
            }
            a.resize_canvas();
            a.redraw();
            a.sync_controls();
        });
    })?;

    let a = app.clone();
    listen(&ui.canvas, "pointerdown", move |e: PointerEvent| {
        let point = a.ui.pointer_position(&e);
        let changed = a.session.borrow_mut().pointer_down(point, button_of(&e));
        if changed {
            if a.session.borrow().mode() == SelectionMode::BoxDrag {
                if let Err(err) = a.ui.canvas.set_pointer_capture(e.pointer_id()) {
                    log::debug!("Pointer capture failed: {:?}", err);
                }
            }
            a.redraw();
            a.sync_controls();
        }
    })?;

    let a = app.clone();
    listen(&ui.canvas, "pointermove", move |e: PointerEvent| {
        let point = a.ui.pointer_position(&e);
        if a.session.borrow_mut().pointer_move(point) {
            a.redraw();
        }
    })?;

    let a = app.clone();
    listen(&ui.canvas, "pointerup", move |e: PointerEvent| {
        let point = a.ui.pointer_position(&e);
        if a.session.borrow_mut().pointer_up(point) {
            a.redraw();
            a.sync_controls();
        }
    })?;

    // Secondary button places background points; keep the browser menu away.
    listen(&ui.canvas, "contextmenu", |e: Event| e.prevent_default())?;

    for (mode, button) in &ui.mode_buttons {
        let a = app.clone();
        let mode = *mode;
        listen(button, "click", move |_: Event| a.set_mode(mode))?;
    }

    if let Some(slider) = &ui.tolerance {
        let a = app.clone();
        listen(slider, "input", move |_: Event| {
            if let Some(slider) = &a.ui.tolerance {
                let value = slider.value_as_number();
                a.session.borrow_mut().set_tolerance(value);
                a.redraw();
                a.sync_controls();
            }
        })?;
    }

    let a = app.clone();
    listen(&ui.mask_btn, "click", move |_: Event| {
        let request = match a.session.borrow_mut().begin_submit() {
            Ok(request) => request,
            Err(e) => {
                log::debug!("Submit ignored: {}", e);
                return;
            }
        };
        a.sync_controls();

        let a = a.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = a.backend.segment(&request).await;
            let failure = a
                .session
                .borrow_mut()
                .finish_submit(outcome)
                .err()
                .map(|e| e.to_string());
            match failure {
                Some(message) => a.show_error(&message),
                None => a.publish_result(),
            }
            a.redraw();
            a.sync_controls();
        });
    })?;

    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    logging::init(config.preferences.log_level.to_level_filter());
    log::info!("maskpick starting, backend {}", config.backend.base_url);

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let ui = Ui::bind(&document)?;
    let backend =
        HttpBackend::new(config.backend.clone()).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let session = Session::new(SessionSettings::from(&config), viewport_width());

    if let Some(slider) = &ui.tolerance {
        slider.set_value_as_number(session.tolerance());
    }

    let app = Rc::new(App {
        session: RefCell::new(session),
        backend,
        ui,
    });
    install_handlers(&app)?;
    app.set_mode(SelectionMode::PointTap);
    Ok(())
}
