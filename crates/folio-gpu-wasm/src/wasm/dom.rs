use folio_gpu::RendererError;
use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlCanvasElement, HtmlElement, Window};

pub(crate) fn window() -> Result<Window, RendererError> {
    web_sys::window().ok_or(RendererError::MissingGlobal("window"))
}

pub(crate) fn document() -> Result<Document, RendererError> {
    window()?
        .document()
        .ok_or(RendererError::MissingGlobal("document"))
}

/// `performance.now()`, or 0 when unavailable.
pub(crate) fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

pub(crate) fn device_pixel_ratio() -> f64 {
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0);
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}

pub(crate) fn clamp_pixel_size(css: u32, dpr: f64) -> u32 {
    ((css as f64) * dpr).round().max(1.0) as u32
}

/// Best-effort message out of a thrown JS value.
pub(crate) fn js_error(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{err:?}")
}

pub(crate) fn set(obj: &Object, key: &str, value: impl Into<JsValue>) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value.into());
}

pub(crate) fn create_canvas(document: &Document) -> Result<HtmlCanvasElement, RendererError> {
    document
        .create_element("canvas")
        .map_err(|err| RendererError::Backend(format!("createElement failed: {}", js_error(&err))))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| RendererError::NullHandle("canvas"))
}

/// Appends a canvas that fills `container`.
pub(crate) fn attach_canvas(
    container: &HtmlElement,
) -> Result<HtmlCanvasElement, RendererError> {
    let canvas = create_canvas(&document()?)?;
    let style = canvas.style();
    let _ = style.set_property("display", "block");
    let _ = style.set_property("width", "100%");
    let _ = style.set_property("height", "100%");
    container
        .append_child(&canvas)
        .map_err(|err| RendererError::Backend(format!("appendChild failed: {}", js_error(&err))))?;
    fit_canvas(&canvas, container);
    Ok(canvas)
}

/// Sizes the backing store to the container in physical pixels. Returns the
/// new size.
pub(crate) fn fit_canvas(canvas: &HtmlCanvasElement, container: &HtmlElement) -> (u32, u32) {
    let dpr = device_pixel_ratio();
    let width = clamp_pixel_size(container.client_width().max(1) as u32, dpr);
    let height = clamp_pixel_size(container.client_height().max(1) as u32, dpr);
    if canvas.width() != width {
        canvas.set_width(width);
    }
    if canvas.height() != height {
        canvas.set_height(height);
    }
    (width, height)
}

/// Client coordinates to `[0, 1]` coordinates within `canvas`.
pub(crate) fn normalized_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Option<(f32, f32)> {
    let rect = canvas.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    let x = (client_x as f64 - rect.left()) / rect.width();
    let y = (client_y as f64 - rect.top()) / rect.height();
    Some((x as f32, y as f32))
}
