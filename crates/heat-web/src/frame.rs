use std::cell::{Cell, RefCell};
use std::rc::Rc;

use heat_core::{FrameOutcome, FramePacer, HeatTrailPipeline, PipelineParameters, TouchTracker};
use instant::Instant;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::panel;
use crate::render::WgpuContext;

pub struct FrameContext {
    pub gpu: WgpuContext,
    pub pipeline: HeatTrailPipeline,
    pub params: Rc<RefCell<PipelineParameters>>,
    pub touches: Rc<RefCell<TouchTracker>>,
    pub export_requested: Rc<Cell<bool>>,
    pub pacer: FramePacer,
    pub canvas: web::HtmlCanvasElement,
    pub document: web::Document,
}

impl FrameContext {
    /// Advance one animation-frame tick. Returns false once the pipeline has
    /// failed and the loop should stop.
    pub fn frame(&mut self) -> bool {
        if !self.pacer.ready(Instant::now()) {
            return true;
        }
        crate::dom::sync_canvas_backing_size(&self.canvas);

        let params = *self.params.borrow();
        let outcome = {
            let mut touches = self.touches.borrow_mut();
            self.pipeline.frame(&mut self.gpu, &params, &mut touches)
        };
        match outcome {
            Ok(FrameOutcome::Presented) => {
                if self.export_requested.replace(false) {
                    if let Err(e) = panel::export_canvas(&self.document, &self.canvas) {
                        log::error!("[frame] export failed: {e:?}");
                    }
                }
                true
            }
            Ok(FrameOutcome::Skipped) => true,
            Err(e) => {
                log::error!(
                    "[frame] pipeline failed at frame {}: {e}",
                    self.pipeline.frame_index()
                );
                false
            }
        }
    }
}

type Tick = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn request_frame(tick: &Tick) {
    let Some(window) = web::window() else {
        return;
    };
    if let Some(cb) = tick.borrow().as_ref() {
        if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            log::error!("[frame] requestAnimationFrame: {e:?}");
        }
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext>>) {
    let tick: Tick = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if frame_ctx.borrow_mut().frame() {
            request_frame(&tick_clone);
        } else {
            log::warn!("[frame] render loop stopped");
        }
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}
