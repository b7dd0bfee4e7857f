#![cfg(target_arch = "wasm32")]
//! Browser front end: WebGPU rendering, touch input and the control panel.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use heat_core::{FramePacer, PipelineParameters, TouchTracker};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

pub mod assets;
pub mod constants;
pub mod dom;
pub mod events;
pub mod frame;
pub mod input;
pub mod panel;
pub mod render;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("heat-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas: web::HtmlCanvasElement = dom::element_by_id(&document, constants::CANVAS_ID)?;

    dom::sync_canvas_backing_size(&canvas);
    dom::add_resize_listener(&canvas)?;

    let shaders = assets::load_shaders().await?;
    let heat_ramp = assets::load_heat_ramp().await?;

    let mut gpu = render::WgpuContext::new(canvas.clone()).await?;
    let pipeline = gpu.create_pipeline(&shaders, heat_ramp).await?;

    let params = Rc::new(RefCell::new(PipelineParameters::default()));
    let touches = Rc::new(RefCell::new(TouchTracker::new()));
    let export_requested = Rc::new(Cell::new(false));

    panel::build(&document, params.clone(), export_requested.clone())?;
    events::wire_touch_events(&canvas, touches.clone())?;

    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
        gpu,
        pipeline,
        params,
        touches,
        export_requested,
        pacer: FramePacer::default(),
        canvas,
        document,
    }));
    frame::start_loop(frame_ctx);
    log::info!("[init] render loop started");
    Ok(())
}
