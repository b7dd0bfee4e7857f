use glam::Vec2;
use heat_core::touch::TouchList;
use heat_core::TouchPoint;
use web_sys as web;

/// Touch position relative to the canvas's top-left corner, in CSS pixels.
#[inline]
pub fn canvas_relative(client: Vec2, canvas_origin: Vec2) -> Vec2 {
    client - canvas_origin
}

/// Every touch still on the surface for this event.
pub fn touch_points(ev: &web::TouchEvent, canvas: &web::HtmlCanvasElement) -> TouchList {
    let rect = canvas.get_bounding_client_rect();
    let origin = Vec2::new(rect.left() as f32, rect.top() as f32);
    let list = ev.touches();
    let mut out = TouchList::new();
    for i in 0..list.length() {
        let Some(t) = list.get(i) else {
            continue;
        };
        let p = canvas_relative(Vec2::new(t.client_x() as f32, t.client_y() as f32), origin);
        out.push(TouchPoint::new(
            t.identifier(),
            p.x,
            p.y,
            t.radius_x() as f32,
            t.radius_y() as f32,
        ));
    }
    out
}
