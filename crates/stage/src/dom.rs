//! Element lookup and geometry reads shared by the controllers.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::StageError;

pub fn window() -> Result<Window, StageError> {
    web_sys::window().ok_or(StageError::NoWindow)
}

pub fn document(window: &Window) -> Result<Document, StageError> {
    window.document().ok_or(StageError::NoDocument)
}

pub fn body(document: &Document) -> Result<HtmlElement, StageError> {
    document.body().ok_or(StageError::NoBody)
}

pub fn element_by_id(document: &Document, id: &str) -> Result<Element, StageError> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| StageError::MissingElement(id.to_owned()))
}

/// Looks up an element by id and downcasts it to a concrete DOM type.
pub fn typed_element_by_id<T>(
    document: &Document,
    id: &str,
    expected: &'static str,
) -> Result<T, StageError>
where
    T: JsCast,
{
    let element = element_by_id(document, id)?;
    element.dyn_into::<T>().map_err(|_| StageError::WrongElementType {
        id: id.to_owned(),
        expected,
    })
}

pub fn viewport_height(window: &Window) -> f64 {
    window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

pub fn viewport_width(window: &Window) -> f64 {
    window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

pub fn scroll_y(window: &Window) -> f64 {
    window.scroll_y().unwrap_or(0.0)
}

/// Absolute document-space top of an element, independent of current scroll.
pub fn absolute_top(window: &Window, element: &Element) -> f64 {
    element.get_bounding_client_rect().top() + scroll_y(window)
}

/// Milliseconds on the `performance.now()` clock, falling back to the wall
/// clock when the performance API is missing.
pub fn now_ms(window: &Window) -> f64 {
    window
        .performance()
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

pub fn device_pixel_ratio(window: &Window) -> f64 {
    let ratio = window.device_pixel_ratio();
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}
