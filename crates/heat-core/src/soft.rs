//! CPU implementation of [`RenderContext`].
//!
//! Textures are plain RGBA8 buffers and every shader program is evaluated
//! per pixel in Rust, following the same math as the WGSL sources. Pixel
//! centers map to texture coordinates `((x + 0.5) / w, (y + 0.5) / h)` with
//! the origin at the top-left, matching the GPU path. Host tests drive the
//! full pipeline through this context.

use fnv::{FnvHashMap, FnvHashSet};
use glam::{Vec2, Vec4};
use image::{Rgba, RgbaImage};

use crate::constants::BLUR_WEIGHTS;
use crate::context::{FilterMode, RenderContext, TextureDesc, TextureId};
use crate::error::{RenderError, RenderResult};
use crate::shader::{ShaderKind, ShaderPass, ShaderSource};
use crate::touch::Capsule;

struct SoftTexture {
    desc: TextureDesc,
    pixels: RgbaImage,
}

pub struct SoftwareContext {
    canvas: (u32, u32),
    density: f32,
    textures: FnvHashMap<TextureId, SoftTexture>,
    next_id: u32,
    screen: RgbaImage,
    bound: Option<TextureId>,
    compiled: FnvHashSet<ShaderKind>,
    compile_count: usize,
    texture_limit: Option<usize>,
    uploads: usize,
    frame_available: bool,
    presented: u64,
}

impl SoftwareContext {
    /// Context for a canvas of `width`x`height` CSS pixels at density 1.
    pub fn new(width: u32, height: u32) -> Self {
        let mut ctx = Self {
            canvas: (width, height),
            density: 1.0,
            textures: FnvHashMap::default(),
            next_id: 1,
            screen: RgbaImage::new(1, 1),
            bound: None,
            compiled: FnvHashSet::default(),
            compile_count: 0,
            texture_limit: None,
            uploads: 0,
            frame_available: true,
            presented: 0,
        };
        ctx.resize_screen();
        ctx
    }

    pub fn with_pixel_density(mut self, density: f32) -> Self {
        self.density = density;
        self.resize_screen();
        self
    }

    /// Fail allocations with [`RenderError::OutOfMemory`] once `limit`
    /// textures are alive.
    pub fn with_texture_limit(mut self, limit: usize) -> Self {
        self.texture_limit = Some(limit);
        self
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas = (width, height);
        self.resize_screen();
    }

    /// Simulate the canvas becoming unavailable (`false`) or returning.
    pub fn set_frame_available(&mut self, available: bool) {
        self.frame_available = available;
    }

    pub fn texture(&self, id: TextureId) -> Option<&RgbaImage> {
        self.textures.get(&id).map(|t| &t.pixels)
    }

    /// The visible canvas as of the last draw.
    pub fn screen(&self) -> &RgbaImage {
        &self.screen
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn is_compiled(&self, kind: ShaderKind) -> bool {
        self.compiled.contains(&kind)
    }

    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    fn resize_screen(&mut self) {
        let (w, h) = self.physical_size();
        self.screen = RgbaImage::new(w, h);
    }

    fn destination(&mut self) -> Option<&mut RgbaImage> {
        match self.bound {
            None => Some(&mut self.screen),
            Some(id) => self.textures.get_mut(&id).map(|t| &mut t.pixels),
        }
    }

    fn sampler(&self, pass: &ShaderPass, name: &'static str) -> RenderResult<Sampler<'_>> {
        let id = pass
            .texture_id(name)
            .ok_or(RenderError::MissingUniform {
                kind: pass.kind(),
                name,
            })?;
        let tex = self
            .textures
            .get(&id)
            .ok_or(RenderError::UnknownTexture(id))?;
        Ok(Sampler {
            image: &tex.pixels,
            filter: tex.desc.filter,
        })
    }

    fn shade(&self, pass: &ShaderPass, width: u32, height: u32) -> RenderResult<RgbaImage> {
        let float = |name: &str| pass.float_value(name).unwrap_or_default();
        let vec2 = |name: &str| Vec2::from(pass.vec2_value(name).unwrap_or_default());

        let program: Box<dyn Fn(Vec2) -> Vec4 + '_> = match pass.kind() {
            ShaderKind::Heatmask => {
                let last = self.sampler(pass, "last")?;
                let current = self.sampler(pass, "current")?;
                let intensity = float("intensity");
                let decay = float("decay");
                Box::new(move |uv| {
                    let heat = (last.sample(uv).x - decay + intensity * current.sample(uv).x)
                        .clamp(0.0, 1.0);
                    Vec4::new(heat, heat, heat, 1.0)
                })
            }
            ShaderKind::Heatmap => {
                let heated = self.sampler(pass, "heated")?;
                let map = self.sampler(pass, "map")?;
                Box::new(move |uv| map.sample(Vec2::new(heated.sample(uv).x, 0.5)))
            }
            ShaderKind::TextureRender => {
                let image = self.sampler(pass, "image")?;
                Box::new(move |uv| image.sample(uv))
            }
            ShaderKind::Blur => {
                let tex = self.sampler(pass, "tex0")?;
                let step = vec2("texelSize") * vec2("direction");
                Box::new(move |uv| {
                    let mut acc = tex.sample(uv) * BLUR_WEIGHTS[0];
                    for (i, w) in BLUR_WEIGHTS.iter().enumerate().skip(1) {
                        let off = step * i as f32;
                        acc += (tex.sample(uv + off) + tex.sample(uv - off)) * *w;
                    }
                    acc
                })
            }
        };

        let mut out = RgbaImage::new(width, height);
        let size = Vec2::new(width as f32, height as f32);
        for (x, y, px) in out.enumerate_pixels_mut() {
            let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;
            *px = to_rgba8(program(uv));
        }
        Ok(out)
    }
}

struct Sampler<'a> {
    image: &'a RgbaImage,
    filter: FilterMode,
}

impl Sampler<'_> {
    /// Clamp-to-edge lookup at normalized coordinates.
    fn sample(&self, uv: Vec2) -> Vec4 {
        let (w, h) = self.image.dimensions();
        match self.filter {
            FilterMode::Nearest => {
                let x = ((uv.x * w as f32).floor() as i64).clamp(0, w as i64 - 1) as u32;
                let y = ((uv.y * h as f32).floor() as i64).clamp(0, h as i64 - 1) as u32;
                texel(self.image, x, y)
            }
            FilterMode::Linear => {
                let fx = (uv.x * w as f32 - 0.5).clamp(0.0, (w - 1) as f32);
                let fy = (uv.y * h as f32 - 0.5).clamp(0.0, (h - 1) as f32);
                let (x0, y0) = (fx.floor() as u32, fy.floor() as u32);
                let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
                let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);
                let top = texel(self.image, x0, y0).lerp(texel(self.image, x1, y0), tx);
                let bottom = texel(self.image, x0, y1).lerp(texel(self.image, x1, y1), tx);
                top.lerp(bottom, ty)
            }
        }
    }
}

#[inline]
fn texel(image: &RgbaImage, x: u32, y: u32) -> Vec4 {
    let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
    Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
}

#[inline]
fn to_rgba8(c: Vec4) -> Rgba<u8> {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([q(c.x), q(c.y), q(c.z), q(c.w)])
}

impl RenderContext for SoftwareContext {
    fn canvas_size(&self) -> (u32, u32) {
        self.canvas
    }

    fn pixel_density(&self) -> f32 {
        self.density
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureId> {
        if let Some(limit) = self.texture_limit {
            if self.textures.len() >= limit {
                return Err(RenderError::OutOfMemory {
                    label: desc.label.clone(),
                    width: desc.width,
                    height: desc.height,
                });
            }
        }
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(
            id,
            SoftTexture {
                desc: desc.clone(),
                pixels: RgbaImage::new(desc.width, desc.height),
            },
        );
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_none() {
            log::warn!("[soft] destroy of unknown texture {id:?}");
        }
    }

    fn upload_texture(&mut self, id: TextureId, pixels: &RgbaImage) -> RenderResult<()> {
        let tex = self
            .textures
            .get_mut(&id)
            .ok_or(RenderError::UnknownTexture(id))?;
        tex.pixels = pixels.clone();
        self.uploads += 1;
        Ok(())
    }

    fn compile_shader(&mut self, kind: ShaderKind, source: &ShaderSource) -> RenderResult<()> {
        source.check_interface(kind)?;
        self.compiled.insert(kind);
        self.compile_count += 1;
        Ok(())
    }

    fn bind_target(&mut self, target: Option<TextureId>) {
        self.bound = target;
    }

    fn bound_target(&self) -> Option<TextureId> {
        self.bound
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let color = to_rgba8(Vec4::from(rgba));
        match self.destination() {
            Some(dst) => dst.pixels_mut().for_each(|p| *p = color),
            None => log::warn!("[soft] clear with no live destination"),
        }
    }

    fn fill_capsule(&mut self, capsule: &Capsule, rgba: [f32; 4]) {
        let src = Vec4::from(rgba);
        let Some(dst) = self.destination() else {
            log::warn!("[soft] capsule with no live destination");
            return;
        };
        let (w, h) = dst.dimensions();
        let (lo, hi) = capsule.bounds();
        let x0 = lo.x.floor().max(0.0) as u32;
        let y0 = lo.y.floor().max(0.0) as u32;
        let x1 = (hi.x.ceil().max(0.0) as u32).min(w);
        let y1 = (hi.y.ceil().max(0.0) as u32).min(h);
        for y in y0..y1 {
            for x in x0..x1 {
                if !capsule.contains(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                    continue;
                }
                let d = texel(dst, x, y);
                let a = src.w;
                let rgb = src.truncate() * a + d.truncate() * (1.0 - a);
                let out = rgb.extend(a + d.w * (1.0 - a));
                dst.put_pixel(x, y, to_rgba8(out));
            }
        }
    }

    fn draw_pass(&mut self, pass: &ShaderPass) -> RenderResult<()> {
        pass.check_complete()?;
        if !self.compiled.contains(&pass.kind()) {
            return Err(RenderError::ShaderNotLoaded(pass.kind()));
        }
        let (w, h) = match self.bound {
            None => self.screen.dimensions(),
            Some(id) => self
                .textures
                .get(&id)
                .map(|t| t.pixels.dimensions())
                .ok_or(RenderError::UnknownTexture(id))?,
        };
        let shaded = self.shade(pass, w, h)?;
        if let Some(dst) = self.destination() {
            *dst = shaded;
        }
        Ok(())
    }

    fn begin_frame(&mut self) -> RenderResult<bool> {
        Ok(self.frame_available)
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        self.presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_sampling_interpolates_between_texel_centers() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let s = Sampler {
            image: &img,
            filter: FilterMode::Linear,
        };
        assert_eq!(s.sample(Vec2::new(0.25, 0.5)).x, 0.0);
        assert!((s.sample(Vec2::new(0.5, 0.5)).x - 0.5).abs() < 1e-6);
        assert_eq!(s.sample(Vec2::new(1.0, 0.5)).x, 1.0);
    }

    #[test]
    fn draw_into_unknown_target_fails() {
        let mut ctx = SoftwareContext::new(4, 4);
        ctx.compile_shader(
            ShaderKind::TextureRender,
            &ShaderSource::new("fn vs_main() {}", "var image: texture_2d<f32>;"),
        )
        .unwrap();
        let src = ctx
            .create_texture(&TextureDesc::render_target("src", 4, 4))
            .unwrap();
        ctx.bind_target(Some(TextureId(999)));
        let pass = ShaderPass::new(ShaderKind::TextureRender)
            .texture("image", src)
            .unwrap();
        assert!(matches!(
            ctx.draw_pass(&pass),
            Err(RenderError::UnknownTexture(TextureId(999)))
        ));
    }
}
