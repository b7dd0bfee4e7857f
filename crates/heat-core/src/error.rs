use thiserror::Error;

use crate::context::TextureId;
use crate::shader::{ShaderKind, UniformType};

/// Failures surfaced by a [`RenderContext`](crate::RenderContext) or the
/// pipeline built on it. None of these are retried: the visualization is not
/// functional without its targets and shaders.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("out of GPU memory allocating `{label}` ({width}x{height})")]
    OutOfMemory {
        label: String,
        width: u32,
        height: u32,
    },

    #[error("shader `{kind}` failed to compile: {message}")]
    ShaderCompile { kind: ShaderKind, message: String },

    #[error("shader `{0}` used before it was compiled")]
    ShaderNotLoaded(ShaderKind),

    #[error("shader `{kind}` has no uniform named `{name}`")]
    UnknownUniform { kind: ShaderKind, name: String },

    #[error("shader `{kind}` is missing a value for uniform `{name}`")]
    MissingUniform {
        kind: ShaderKind,
        name: &'static str,
    },

    #[error("uniform `{name}` of shader `{kind}` expects a {expected}")]
    UniformType {
        kind: ShaderKind,
        name: &'static str,
        expected: UniformType,
    },

    #[error("texture {0:?} does not exist")]
    UnknownTexture(TextureId),

    #[error("failed to decode image asset: {0}")]
    Image(#[from] image::ImageError),
}

pub type RenderResult<T> = Result<T, RenderError>;
