// Shared fixtures for host-side pipeline tests.
// Shaders are read from the web crate's static assets so the sources under
// test are the ones the browser fetches.

#![allow(dead_code)]

use std::path::PathBuf;

use heat_core::soft::SoftwareContext;
use heat_core::{HeatTrailPipeline, ShaderKind, ShaderSet, ShaderSource, TouchPoint};
use image::{Rgba, RgbaImage};

pub fn static_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../heat-web/static")
}

pub fn shader_source(kind: ShaderKind) -> ShaderSource {
    let root = static_root();
    let read = |rel: String| {
        std::fs::read_to_string(root.join(&rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
    };
    ShaderSource::new(read(kind.vertex_path()), read(kind.fragment_path()))
}

pub fn shader_set() -> ShaderSet {
    let mut set = ShaderSet::new();
    for kind in ShaderKind::ALL {
        set.insert(kind, shader_source(kind));
    }
    set
}

/// 256x1 grey ramp: heat `h` maps to grey level `h`, which keeps the heated
/// stage easy to reason about.
pub fn grey_ramp() -> RgbaImage {
    RgbaImage::from_fn(256, 1, |x, _| Rgba([x as u8, x as u8, x as u8, 255]))
}

pub fn setup(width: u32, height: u32) -> (SoftwareContext, HeatTrailPipeline) {
    let mut ctx = SoftwareContext::new(width, height);
    let pipeline = HeatTrailPipeline::new(&mut ctx, &shader_set(), grey_ramp()).unwrap();
    (ctx, pipeline)
}

pub fn touch(id: i32, x: f32, y: f32, radius: f32) -> TouchPoint {
    TouchPoint::new(id, x, y, radius, radius)
}

pub fn red(img: &RgbaImage, x: u32, y: u32) -> u8 {
    img.get_pixel(x, y).0[0]
}
