use image::{ImageFormat, RgbaImage};

use crate::error::RenderResult;

/// Decode the heat color ramp. Heat `h` maps to the ramp texel at
/// `(h, 0.5)`, so only the middle row of a taller image is ever read.
pub fn decode_heat_ramp(bytes: &[u8]) -> RenderResult<RgbaImage> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let ramp = img.to_rgba8();
    log::debug!("[ramp] decoded {}x{}", ramp.width(), ramp.height());
    Ok(ramp)
}
