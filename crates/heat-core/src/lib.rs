//! Platform-free core of the heat-trail visualizer.
//!
//! Everything here avoids browser and GPU APIs: the host rendering context is
//! reached through the [`RenderContext`] trait, which the web frontend
//! implements on top of wgpu. With the `soft` feature, `soft::SoftwareContext`
//! implements it on CPU pixel buffers for host-side tests.

pub mod clock;
pub mod constants;
pub mod context;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod ramp;
pub mod shader;
#[cfg(feature = "soft")]
pub mod soft;
pub mod target;
pub mod touch;

pub use clock::FramePacer;
pub use context::{FilterMode, RenderContext, TextureDesc, TextureId, TextureSlots, WrapMode};
pub use error::{RenderError, RenderResult};
pub use params::{DisplayStage, ParseStageError, PipelineParameters};
pub use pipeline::{FrameOutcome, HeatTrailPipeline, StageTargets};
pub use shader::{ShaderKind, ShaderPass, ShaderSet, ShaderSource, Uniform, UniformType};
pub use target::{with_target, OffscreenTarget, SampledTexture, TextureSource};
pub use touch::{Capsule, Stroke, TouchPoint, TouchTracker};
