use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// `JsValue` errors carry no `std::error::Error`; keep their debug text.
#[inline]
pub fn js_err(e: JsValue) -> anyhow::Error {
    anyhow::anyhow!("{:?}", e)
}

pub fn element_by_id<T: JsCast>(document: &web::Document, id: &str) -> anyhow::Result<T> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("missing #{id}"))?
        .dyn_into::<T>()
        .map_err(|e| anyhow::anyhow!("#{id} has the wrong element type: {:?}", e))
}

/// Keep the canvas backing store at CSS size times device pixel ratio.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) {
    if let Some(w) = web::window() {
        let dpr = w.device_pixel_ratio();
        let rect = canvas.get_bounding_client_rect();
        let w_px = (rect.width() * dpr).round() as u32;
        let h_px = (rect.height() * dpr).round() as u32;
        if canvas.width() != w_px.max(1) || canvas.height() != h_px.max(1) {
            canvas.set_width(w_px.max(1));
            canvas.set_height(h_px.max(1));
            log::debug!("[dom] canvas backing {}x{}", w_px.max(1), h_px.max(1));
        }
    }
}

pub fn add_resize_listener(canvas: &web::HtmlCanvasElement) -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let canvas_resize = canvas.clone();
    let closure = Closure::wrap(Box::new(move || {
        sync_canvas_backing_size(&canvas_resize);
    }) as Box<dyn FnMut()>);
    window
        .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        .map_err(js_err)?;
    closure.forget();
    Ok(())
}

pub fn add_click_listener(
    element: &web::Element,
    mut handler: impl FnMut() + 'static,
) -> anyhow::Result<()> {
    let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
    element
        .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
        .map_err(js_err)?;
    closure.forget();
    Ok(())
}

pub fn create<T: JsCast>(document: &web::Document, tag: &str) -> anyhow::Result<T> {
    document
        .create_element(tag)
        .map_err(js_err)?
        .dyn_into::<T>()
        .map_err(|e| anyhow::anyhow!("<{tag}> has the wrong element type: {:?}", e))
}
