use heat_core::constants::HEAT_RAMP_PATH;
use heat_core::{ramp, ShaderKind, ShaderSet, ShaderSource};
use image::RgbaImage;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use crate::dom::js_err;

async fn fetch_response(path: &str) -> anyhow::Result<web::Response> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let resp = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(js_err)?
        .dyn_into::<web::Response>()
        .map_err(js_err)?;
    if !resp.ok() {
        anyhow::bail!("fetch {path}: HTTP {}", resp.status());
    }
    Ok(resp)
}

pub async fn fetch_text(path: &str) -> anyhow::Result<String> {
    let resp = fetch_response(path).await?;
    let text = JsFuture::from(resp.text().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    text.as_string()
        .ok_or_else(|| anyhow::anyhow!("fetch {path}: body is not text"))
}

pub async fn fetch_bytes(path: &str) -> anyhow::Result<Vec<u8>> {
    let resp = fetch_response(path).await?;
    let buf = JsFuture::from(resp.array_buffer().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

/// Fetch the vertex and fragment source of every pass.
pub async fn load_shaders() -> anyhow::Result<ShaderSet> {
    let mut set = ShaderSet::new();
    for kind in ShaderKind::ALL {
        let vertex = fetch_text(&kind.vertex_path()).await?;
        let fragment = fetch_text(&kind.fragment_path()).await?;
        set.insert(kind, ShaderSource::new(vertex, fragment));
    }
    log::info!("[assets] {} shader programs fetched", set.len());
    Ok(set)
}

pub async fn load_heat_ramp() -> anyhow::Result<RgbaImage> {
    let bytes = fetch_bytes(HEAT_RAMP_PATH).await?;
    let img = ramp::decode_heat_ramp(&bytes)?;
    log::info!("[assets] heat ramp {}x{}", img.width(), img.height());
    Ok(img)
}
