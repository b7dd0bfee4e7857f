use std::cell::RefCell;
use std::rc::Rc;

use heat_core::TouchTracker;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::constants::TOUCH_EVENTS;
use crate::dom::js_err;
use crate::input;

/// Route every touch event on the canvas into the tracker. Listeners are
/// registered non-passive so the page does not scroll or zoom.
pub fn wire_touch_events(
    canvas: &web::HtmlCanvasElement,
    touches: Rc<RefCell<TouchTracker>>,
) -> anyhow::Result<()> {
    let opts = web::AddEventListenerOptions::new();
    opts.set_passive(false);
    for name in TOUCH_EVENTS {
        let canvas_ev = canvas.clone();
        let touches = touches.clone();
        let closure = Closure::wrap(Box::new(move |ev: web::TouchEvent| {
            ev.prevent_default();
            let points = input::touch_points(&ev, &canvas_ev);
            touches.borrow_mut().apply(&points);
        }) as Box<dyn FnMut(web::TouchEvent)>);
        canvas
            .add_event_listener_with_callback_and_add_event_listener_options(
                name,
                closure.as_ref().unchecked_ref(),
                &opts,
            )
            .map_err(js_err)?;
        closure.forget();
    }
    log::info!("[events] touch listeners attached");
    Ok(())
}
