//! DOM control panel: three sliders, a display-stage select and a save
//! button. The panel is the only writer of the shared parameters.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use heat_core::constants::{DECAY_RANGE, INTENSITY_RANGE, RADIUS_MULTIPLIER_RANGE};
use heat_core::{DisplayStage, PipelineParameters};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::constants::*;
use crate::dom::{add_click_listener, create, js_err};

struct SliderSpec {
    id: &'static str,
    range: (f32, f32),
    step: f32,
    get: fn(&PipelineParameters) -> f32,
    set: fn(&mut PipelineParameters, f32),
}

const SLIDERS: [SliderSpec; 3] = [
    SliderSpec {
        id: INTENSITY_ID,
        range: INTENSITY_RANGE,
        step: INTENSITY_STEP,
        get: |p| p.intensity,
        set: PipelineParameters::set_intensity,
    },
    SliderSpec {
        id: DECAY_ID,
        range: DECAY_RANGE,
        step: DECAY_STEP,
        get: |p| p.decay,
        set: PipelineParameters::set_decay,
    },
    SliderSpec {
        id: RADIUS_MULTIPLIER_ID,
        range: RADIUS_MULTIPLIER_RANGE,
        step: RADIUS_MULTIPLIER_STEP,
        get: |p| p.radius_multiplier,
        set: PipelineParameters::set_radius_multiplier,
    },
];

/// Build the panel inside `#controls`, creating that container if the page
/// has none.
pub fn build(
    document: &web::Document,
    params: Rc<RefCell<PipelineParameters>>,
    export_requested: Rc<Cell<bool>>,
) -> anyhow::Result<()> {
    let panel = match document.get_element_by_id(PANEL_ID) {
        Some(el) => el,
        None => {
            let el = document.create_element("div").map_err(js_err)?;
            el.set_id(PANEL_ID);
            let body = document
                .body()
                .ok_or_else(|| anyhow::anyhow!("no document body"))?;
            body.append_child(&el).map_err(js_err)?;
            el
        }
    };

    let initial = *params.borrow();
    for spec in &SLIDERS {
        let input = slider(document, &panel, spec, (spec.get)(&initial))?;
        let params = params.clone();
        let set = spec.set;
        let id = spec.id;
        let input_ev = input.clone();
        let closure = Closure::wrap(Box::new(move || {
            let v = input_ev.value_as_number() as f32;
            set(&mut params.borrow_mut(), v);
            log::debug!("[panel] {id} = {v}");
        }) as Box<dyn FnMut()>);
        input
            .add_event_listener_with_callback("input", closure.as_ref().unchecked_ref())
            .map_err(js_err)?;
        closure.forget();
    }

    let select = stage_select(document, &panel, initial.display_stage)?;
    {
        let params = params.clone();
        let select_ev = select.clone();
        let closure = Closure::wrap(Box::new(move || {
            match select_ev.value().parse::<DisplayStage>() {
                Ok(stage) => {
                    params.borrow_mut().set_display_stage(stage);
                    log::debug!("[panel] displayStage = {stage}");
                }
                Err(e) => log::warn!("[panel] {e}"),
            }
        }) as Box<dyn FnMut()>);
        select
            .add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())
            .map_err(js_err)?;
        closure.forget();
    }

    let save = document.create_element("button").map_err(js_err)?;
    save.set_id(SAVE_ID);
    save.set_text_content(Some("save"));
    panel.append_child(&save).map_err(js_err)?;
    add_click_listener(&save, move || {
        export_requested.set(true);
        log::info!("[panel] export requested");
    })?;

    log::info!("[panel] controls ready");
    Ok(())
}

fn labelled(
    document: &web::Document,
    panel: &web::Element,
    id: &str,
    control: &web::Element,
) -> anyhow::Result<()> {
    let label = create::<web::HtmlLabelElement>(document, "label")?;
    label.set_html_for(id);
    label.set_text_content(Some(id));
    panel.append_child(&label).map_err(js_err)?;
    panel.append_child(control).map_err(js_err)?;
    Ok(())
}

fn slider(
    document: &web::Document,
    panel: &web::Element,
    spec: &SliderSpec,
    value: f32,
) -> anyhow::Result<web::HtmlInputElement> {
    let input = create::<web::HtmlInputElement>(document, "input")?;
    input.set_type("range");
    input.set_id(spec.id);
    input.set_min(&spec.range.0.to_string());
    input.set_max(&spec.range.1.to_string());
    input.set_step(&spec.step.to_string());
    input.set_value(&value.to_string());
    labelled(document, panel, spec.id, &input)?;
    Ok(input)
}

fn stage_select(
    document: &web::Document,
    panel: &web::Element,
    current: DisplayStage,
) -> anyhow::Result<web::HtmlSelectElement> {
    let select = create::<web::HtmlSelectElement>(document, "select")?;
    select.set_id(DISPLAY_STAGE_ID);
    for stage in DisplayStage::ALL {
        let option = web::HtmlOptionElement::new_with_text_and_value(stage.label(), stage.label())
            .map_err(js_err)?;
        select.append_child(&option).map_err(js_err)?;
    }
    select.set_value(current.label());
    labelled(document, panel, DISPLAY_STAGE_ID, &select)?;
    Ok(select)
}

/// Download the canvas as a PNG. Must run in the same task as the frame that
/// drew it, before the browser discards the WebGPU drawing buffer.
pub fn export_canvas(
    document: &web::Document,
    canvas: &web::HtmlCanvasElement,
) -> anyhow::Result<()> {
    let url = canvas
        .to_data_url_with_type(EXPORT_MIME)
        .map_err(js_err)?;
    let anchor = create::<web::HtmlAnchorElement>(document, "a")?;
    anchor.set_href(&url);
    anchor.set_download(EXPORT_FILE_NAME);
    anchor.click();
    log::info!("[panel] exported {EXPORT_FILE_NAME}");
    Ok(())
}
