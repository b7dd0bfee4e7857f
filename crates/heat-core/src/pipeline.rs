//! The per-frame heat-trail render schedule.
//!
//! Five offscreen passes run in a fixed order every frame, followed by one
//! pass onto the canvas:
//!
//! 1. touch mask: capsules along each touch's motion since last frame
//! 2. current frame: heat accumulation from the last frame and the mask
//! 3. last frame: copy of (2), read by (2) next frame
//! 4. heated: heat mapped through the color ramp
//! 5. blurred: horizontal blur of (4)
//!
//! The canvas then gets the vertical blur of (5), or a straight copy of the
//! stage selected for display.

use image::RgbaImage;
use smallvec::SmallVec;

use crate::constants::*;
use crate::context::{RenderContext, TextureId};
use crate::error::RenderResult;
use crate::params::{DisplayStage, PipelineParameters};
use crate::shader::{ShaderKind, ShaderPass, ShaderSet};
use crate::target::{with_target, OffscreenTarget, SampledTexture};
use crate::touch::TouchTracker;

/// The five permanent accumulation targets.
#[derive(Clone, Debug)]
pub struct StageTargets {
    pub touch_mask: OffscreenTarget,
    pub current_frame: OffscreenTarget,
    pub last_frame: OffscreenTarget,
    pub heated: OffscreenTarget,
    pub blurred: OffscreenTarget,
}

impl StageTargets {
    /// Allocate all five targets, or none: textures created before a
    /// failing allocation are destroyed again.
    fn create<C: RenderContext + ?Sized>(ctx: &mut C) -> RenderResult<Self> {
        let mut made: SmallVec<[TextureId; 5]> = SmallVec::new();
        let targets = match Self::allocate(ctx, &mut made) {
            Ok(targets) => targets,
            Err(e) => {
                for id in made {
                    ctx.destroy_texture(id);
                }
                return Err(e);
            }
        };
        for t in targets.iter() {
            let clear = if t.id() == targets.current_frame.id() {
                OPAQUE_BLACK
            } else {
                TRANSPARENT
            };
            with_target(ctx, t, |ctx| ctx.clear(clear));
        }
        Ok(targets)
    }

    fn allocate<C: RenderContext + ?Sized>(
        ctx: &mut C,
        made: &mut SmallVec<[TextureId; 5]>,
    ) -> RenderResult<Self> {
        let mut target = |ctx: &mut C, label: &'static str| -> RenderResult<OffscreenTarget> {
            let t = OffscreenTarget::create(ctx, label)?;
            made.push(t.id());
            Ok(t)
        };
        Ok(Self {
            touch_mask: target(ctx, "touch_mask")?,
            current_frame: target(ctx, "current_frame")?,
            last_frame: target(ctx, "last_frame")?,
            heated: target(ctx, "heated")?,
            blurred: target(ctx, "blurred")?,
        })
    }

    pub fn get(&self, stage: DisplayStage) -> Option<&OffscreenTarget> {
        match stage {
            DisplayStage::Final => None,
            DisplayStage::TouchMask => Some(&self.touch_mask),
            DisplayStage::CurrentFrame => Some(&self.current_frame),
            DisplayStage::LastFrame => Some(&self.last_frame),
            DisplayStage::Heated => Some(&self.heated),
            DisplayStage::Blurred => Some(&self.blurred),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OffscreenTarget> {
        [
            &self.touch_mask,
            &self.current_frame,
            &self.last_frame,
            &self.heated,
            &self.blurred,
        ]
        .into_iter()
    }

    fn release<C: RenderContext + ?Sized>(self, ctx: &mut C) {
        self.touch_mask.release(ctx);
        self.current_frame.release(ctx);
        self.last_frame.release(ctx);
        self.heated.release(ctx);
        self.blurred.release(ctx);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The canvas was unavailable; nothing was drawn.
    Skipped,
}

pub struct HeatTrailPipeline {
    targets: StageTargets,
    heat_ramp: SampledTexture,
    frame_index: u64,
}

impl HeatTrailPipeline {
    /// Compile every shader, allocate the stage targets and stage the heat
    /// ramp for upload. Any failure here is fatal for the visualization.
    pub fn new<C: RenderContext + ?Sized>(
        ctx: &mut C,
        shaders: &ShaderSet,
        heat_ramp: RgbaImage,
    ) -> RenderResult<Self> {
        for kind in ShaderKind::ALL {
            let source = shaders.get(kind)?;
            source.check_interface(kind)?;
            ctx.compile_shader(kind, source)?;
        }
        let targets = StageTargets::create(ctx)?;
        let heat_ramp = match SampledTexture::uploaded(ctx, "heat_ramp", heat_ramp) {
            Ok(ramp) => ramp,
            Err(e) => {
                targets.release(ctx);
                return Err(e);
            }
        };
        let (w, h) = targets.current_frame.size();
        log::info!("[pipeline] ready: 5 targets at {w}x{h}");
        Ok(Self {
            targets,
            heat_ramp,
            frame_index: 0,
        })
    }

    pub fn targets(&self) -> &StageTargets {
        &self.targets
    }

    pub fn target(&self, stage: DisplayStage) -> Option<&OffscreenTarget> {
        self.targets.get(stage)
    }

    pub fn heat_ramp(&self) -> &SampledTexture {
        &self.heat_ramp
    }

    /// Current size of the stage targets in device pixels.
    pub fn size(&self) -> (u32, u32) {
        self.targets.current_frame.size()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn needs_resize<C: RenderContext + ?Sized>(&self, ctx: &C) -> bool {
        ctx.physical_size() != self.size()
    }

    /// Reallocate the stage targets at the canvas's current size.
    ///
    /// Accumulated heat is discarded. Compiled shaders and the heat ramp are
    /// kept as they are.
    pub fn resize<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> RenderResult<()> {
        let (ow, oh) = self.size();
        let fresh = StageTargets::create(ctx)?;
        let old = std::mem::replace(&mut self.targets, fresh);
        old.release(ctx);
        let (w, h) = self.size();
        log::info!("[pipeline] resized targets {ow}x{oh} -> {w}x{h}");
        Ok(())
    }

    /// Run one full frame. `params` is only read; `touches` gets its
    /// last-position snapshot replaced once the frame has been presented.
    pub fn frame<C: RenderContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        params: &PipelineParameters,
        touches: &mut TouchTracker,
    ) -> RenderResult<FrameOutcome> {
        if self.needs_resize(&*ctx) {
            self.resize(ctx)?;
        }
        if !ctx.begin_frame()? {
            log::warn!("[pipeline] canvas unavailable; skipping frame {}", self.frame_index);
            return Ok(FrameOutcome::Skipped);
        }
        let params = params.sanitized();
        self.heat_ramp.refresh(ctx)?;
        for stage in [
            DisplayStage::TouchMask,
            DisplayStage::CurrentFrame,
            DisplayStage::LastFrame,
            DisplayStage::Heated,
            DisplayStage::Blurred,
        ] {
            self.run_stage(ctx, stage, &params, touches)?;
        }
        self.present(ctx, params.display_stage)?;
        ctx.end_frame()?;

        touches.end_frame();
        self.frame_index += 1;
        log::trace!("[pipeline] frame {} presented", self.frame_index);
        Ok(FrameOutcome::Presented)
    }

    fn run_stage<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        stage: DisplayStage,
        params: &PipelineParameters,
        touches: &TouchTracker,
    ) -> RenderResult<()> {
        let t = &self.targets;
        match stage {
            DisplayStage::TouchMask => with_target(ctx, &t.touch_mask, |ctx| {
                ctx.clear(TRANSPARENT);
                let density = ctx.pixel_density();
                for stroke in touches.strokes() {
                    let capsule = stroke.capsule(params.radius_multiplier, density);
                    ctx.fill_capsule(&capsule, MASK_COLOR);
                }
                Ok(())
            }),
            DisplayStage::CurrentFrame => {
                let pass = ShaderPass::new(ShaderKind::Heatmask)
                    .texture("last", t.last_frame.id())?
                    .texture("current", t.touch_mask.id())?
                    .float("intensity", params.intensity)?
                    .float("decay", params.decay)?;
                with_target(ctx, &t.current_frame, |ctx| {
                    ctx.clear(OPAQUE_BLACK);
                    ctx.draw_pass(&pass)
                })
            }
            DisplayStage::LastFrame => {
                let pass = passthrough(&t.current_frame)?;
                with_target(ctx, &t.last_frame, |ctx| {
                    ctx.clear(OPAQUE_BLACK);
                    ctx.draw_pass(&pass)
                })
            }
            DisplayStage::Heated => {
                let pass = ShaderPass::new(ShaderKind::Heatmap)
                    .texture("heated", t.current_frame.id())?
                    .texture("map", self.heat_ramp.id())?;
                with_target(ctx, &t.heated, |ctx| ctx.draw_pass(&pass))
            }
            DisplayStage::Blurred => {
                let pass = blur(&t.heated, BLUR_HORIZONTAL)?;
                with_target(ctx, &t.blurred, |ctx| ctx.draw_pass(&pass))
            }
            DisplayStage::Final => Ok(()),
        }
    }

    fn present<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        stage: DisplayStage,
    ) -> RenderResult<()> {
        let pass = match self.targets.get(stage) {
            Some(target) => passthrough(target)?,
            None => blur(&self.targets.blurred, BLUR_VERTICAL)?,
        };
        ctx.draw_pass(&pass)
    }

    /// Free every texture this pipeline owns.
    pub fn release<C: RenderContext + ?Sized>(self, ctx: &mut C) {
        self.targets.release(ctx);
        self.heat_ramp.release(ctx);
    }
}

fn passthrough(source: &OffscreenTarget) -> RenderResult<ShaderPass> {
    ShaderPass::new(ShaderKind::TextureRender).texture("image", source.id())
}

fn blur(source: &OffscreenTarget, direction: [f32; 2]) -> RenderResult<ShaderPass> {
    ShaderPass::new(ShaderKind::Blur)
        .texture("tex0", source.id())?
        .vec2("texelSize", source.texel_size())?
        .vec2("direction", direction)
}
