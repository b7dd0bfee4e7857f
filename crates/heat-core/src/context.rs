//! The host rendering context seen by the pipeline.
//!
//! A context owns GPU textures (addressed by [`TextureId`]), compiled shader
//! programs and the notion of a currently bound render destination. Drawing
//! commands always land in whatever destination is bound; `None` means the
//! visible canvas.

use image::RgbaImage;

use crate::error::RenderResult;
use crate::shader::{ShaderKind, ShaderPass, ShaderSource};
use crate::touch::Capsule;

/// Opaque handle to a texture owned by a [`RenderContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// RGBA8 texture description.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
    pub wrap: WrapMode,
    /// Whether the texture can be bound as a render destination.
    pub renderable: bool,
}

impl TextureDesc {
    /// Render target texture: nearest filtering, clamp-to-edge, contents
    /// produced only by draw calls.
    pub fn render_target(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width: width.max(1),
            height: height.max(1),
            filter: FilterMode::Nearest,
            wrap: WrapMode::ClampToEdge,
            renderable: true,
        }
    }

    /// Client-uploaded lookup image, sampled with linear filtering.
    pub fn sampled(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width: width.max(1),
            height: height.max(1),
            filter: FilterMode::Linear,
            wrap: WrapMode::ClampToEdge,
            renderable: false,
        }
    }
}

pub trait RenderContext {
    /// Canvas size in CSS pixels.
    fn canvas_size(&self) -> (u32, u32);

    fn pixel_density(&self) -> f32;

    /// Canvas size in device pixels; offscreen targets are allocated at this size.
    fn physical_size(&self) -> (u32, u32) {
        let (w, h) = self.canvas_size();
        let d = self.pixel_density();
        (
            ((w as f32 * d).round() as u32).max(1),
            ((h as f32 * d).round() as u32).max(1),
        )
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureId>;

    fn destroy_texture(&mut self, id: TextureId);

    fn upload_texture(&mut self, id: TextureId, pixels: &RgbaImage) -> RenderResult<()>;

    fn compile_shader(&mut self, kind: ShaderKind, source: &ShaderSource) -> RenderResult<()>;

    /// Redirect subsequent drawing to `target`, or to the canvas for `None`.
    fn bind_target(&mut self, target: Option<TextureId>);

    fn bound_target(&self) -> Option<TextureId>;

    /// Overwrite the whole bound destination with `rgba`.
    fn clear(&mut self, rgba: [f32; 4]);

    fn fill_capsule(&mut self, capsule: &Capsule, rgba: [f32; 4]);

    /// Cover the bound destination with one quad shaded by `pass`.
    fn draw_pass(&mut self, pass: &ShaderPass) -> RenderResult<()>;

    /// Acquire the canvas for a new frame. `Ok(false)` means the canvas is
    /// unavailable and the frame must be skipped entirely.
    fn begin_frame(&mut self) -> RenderResult<bool>;

    /// Finish the frame and present the canvas.
    fn end_frame(&mut self) -> RenderResult<()>;
}

/// Texture storage for a context, indexed by [`TextureId`]. Freed slots are
/// handed out again, so repeated resizes do not grow the table.
#[derive(Debug)]
pub struct TextureSlots<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for TextureSlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> TextureSlots<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> TextureId {
        match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(value);
                TextureId(i as u32)
            }
            None => {
                self.slots.push(Some(value));
                TextureId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, id: TextureId) -> Option<&T> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn remove(&mut self, id: TextureId) -> Option<T> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
