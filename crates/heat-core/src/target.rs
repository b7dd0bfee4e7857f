//! Offscreen render targets and the textures the pipeline samples.
//!
//! A texture is either client-uploaded (the heat ramp image) or rendered on
//! the GPU (every offscreen target). Refreshing an uploaded texture pushes
//! pending pixels to the context; refreshing a rendered one does nothing,
//! since its contents only ever come from draw calls.

use std::ops::{Deref, DerefMut};

use image::RgbaImage;

use crate::context::{RenderContext, TextureDesc, TextureId};
use crate::error::RenderResult;

#[derive(Clone, Debug)]
pub enum TextureSource {
    Uploaded { pixels: RgbaImage, dirty: bool },
    Rendered,
}

impl TextureSource {
    pub fn refresh<C: RenderContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        id: TextureId,
    ) -> RenderResult<()> {
        match self {
            TextureSource::Uploaded { pixels, dirty } => {
                if *dirty {
                    ctx.upload_texture(id, pixels)?;
                    *dirty = false;
                }
                Ok(())
            }
            TextureSource::Rendered => Ok(()),
        }
    }
}

/// A context texture together with where its contents come from.
#[derive(Clone, Debug)]
pub struct SampledTexture {
    id: TextureId,
    width: u32,
    height: u32,
    source: TextureSource,
}

impl SampledTexture {
    /// Allocate a linear-filtered texture for client pixels. The upload
    /// happens on the first [`SampledTexture::refresh`].
    pub fn uploaded<C: RenderContext + ?Sized>(
        ctx: &mut C,
        label: &str,
        pixels: RgbaImage,
    ) -> RenderResult<Self> {
        let (width, height) = pixels.dimensions();
        let id = ctx.create_texture(&TextureDesc::sampled(label, width, height))?;
        Ok(Self {
            id,
            width,
            height,
            source: TextureSource::Uploaded {
                pixels,
                dirty: true,
            },
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn source(&self) -> &TextureSource {
        &self.source
    }

    /// Swap in new client pixels; they are uploaded on the next refresh.
    /// Rendered textures ignore this.
    pub fn replace_pixels(&mut self, new_pixels: RgbaImage) {
        if let TextureSource::Uploaded { pixels, dirty } = &mut self.source {
            if new_pixels.dimensions() == pixels.dimensions() {
                *pixels = new_pixels;
                *dirty = true;
            } else {
                log::warn!(
                    "[texture] ignoring {}x{} pixels for {}x{} texture",
                    new_pixels.width(),
                    new_pixels.height(),
                    self.width,
                    self.height
                );
            }
        }
    }

    pub fn refresh<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> RenderResult<()> {
        self.source.refresh(ctx, self.id)
    }

    pub fn release<C: RenderContext + ?Sized>(self, ctx: &mut C) {
        ctx.destroy_texture(self.id);
    }
}

/// RGBA8 color texture usable both as a draw destination and as a sampler
/// input for later passes. Sized to the canvas in device pixels at creation.
#[derive(Clone, Debug)]
pub struct OffscreenTarget {
    label: &'static str,
    texture: SampledTexture,
}

impl OffscreenTarget {
    pub fn create<C: RenderContext + ?Sized>(ctx: &mut C, label: &'static str) -> RenderResult<Self> {
        let (width, height) = ctx.physical_size();
        let id = ctx.create_texture(&TextureDesc::render_target(label, width, height))?;
        log::debug!("[target] created {label} {width}x{height} as {id:?}");
        Ok(Self {
            label,
            texture: SampledTexture {
                id,
                width,
                height,
                source: TextureSource::Rendered,
            },
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn id(&self) -> TextureId {
        self.texture.id
    }

    pub fn size(&self) -> (u32, u32) {
        self.texture.size()
    }

    /// Size of one texel in normalized texture coordinates.
    pub fn texel_size(&self) -> [f32; 2] {
        let (w, h) = self.size();
        [1.0 / w as f32, 1.0 / h as f32]
    }

    pub fn refresh<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> RenderResult<()> {
        self.texture.refresh(ctx)
    }

    pub fn release<C: RenderContext + ?Sized>(self, ctx: &mut C) {
        self.texture.release(ctx);
    }
}

/// Binding of a target for the lifetime of the guard; restores the previous
/// destination when dropped, including while unwinding.
struct BoundTarget<'a, C: RenderContext + ?Sized> {
    ctx: &'a mut C,
    previous: Option<TextureId>,
}

impl<'a, C: RenderContext + ?Sized> BoundTarget<'a, C> {
    fn bind(ctx: &'a mut C, target: TextureId) -> Self {
        let previous = ctx.bound_target();
        ctx.bind_target(Some(target));
        Self { ctx, previous }
    }
}

impl<C: RenderContext + ?Sized> Deref for BoundTarget<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.ctx
    }
}

impl<C: RenderContext + ?Sized> DerefMut for BoundTarget<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.ctx
    }
}

impl<C: RenderContext + ?Sized> Drop for BoundTarget<'_, C> {
    fn drop(&mut self) {
        self.ctx.bind_target(self.previous);
    }
}

/// Run `block` with all drawing redirected to `target`.
///
/// The previously bound destination is restored however `block` exits:
/// normal return, an `Err` value, or a panic. The guard holds the only
/// mutable borrow of the context for the duration, so nothing else can draw
/// between bind and unbind.
pub fn with_target<C, R, F>(ctx: &mut C, target: &OffscreenTarget, block: F) -> R
where
    C: RenderContext + ?Sized,
    F: FnOnce(&mut C) -> R,
{
    let mut bound = BoundTarget::bind(ctx, target.id());
    block(&mut *bound)
}
