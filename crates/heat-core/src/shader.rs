use std::fmt;

use fnv::FnvHashMap;
use smallvec::SmallVec;

use crate::constants::SHADER_DIR;
use crate::context::TextureId;
use crate::error::{RenderError, RenderResult};

/// The four shader programs the pipeline runs, keyed by asset name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Heatmask,
    Heatmap,
    TextureRender,
    Blur,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformType {
    Texture,
    Float,
    Vec2,
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniformType::Texture => "texture",
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
        })
    }
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [
        ShaderKind::Heatmask,
        ShaderKind::Heatmap,
        ShaderKind::TextureRender,
        ShaderKind::Blur,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Heatmask => "heatmask",
            ShaderKind::Heatmap => "heatmap",
            ShaderKind::TextureRender => "textureRender",
            ShaderKind::Blur => "blur",
        }
    }

    /// Declared uniform interface, in binding order.
    pub fn uniforms(self) -> &'static [(&'static str, UniformType)] {
        use UniformType::*;
        match self {
            ShaderKind::Heatmask => &[
                ("last", Texture),
                ("current", Texture),
                ("intensity", Float),
                ("decay", Float),
            ],
            ShaderKind::Heatmap => &[("heated", Texture), ("map", Texture)],
            ShaderKind::TextureRender => &[("image", Texture)],
            ShaderKind::Blur => &[("tex0", Texture), ("texelSize", Vec2), ("direction", Vec2)],
        }
    }

    pub fn vertex_path(self) -> String {
        format!("{SHADER_DIR}/{0}/{0}.vert.wgsl", self.name())
    }

    pub fn fragment_path(self) -> String {
        format!("{SHADER_DIR}/{0}/{0}.frag.wgsl", self.name())
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Reject sources that are empty or whose fragment stage never mentions
    /// one of the uniforms `kind` binds by name.
    pub fn check_interface(&self, kind: ShaderKind) -> RenderResult<()> {
        if self.vertex.trim().is_empty() || self.fragment.trim().is_empty() {
            return Err(RenderError::ShaderCompile {
                kind,
                message: "empty shader stage".into(),
            });
        }
        for &(name, _) in kind.uniforms() {
            if !self.fragment.contains(name) {
                return Err(RenderError::ShaderCompile {
                    kind,
                    message: format!("fragment stage does not declare `{name}`"),
                });
            }
        }
        Ok(())
    }
}

/// Shader sources for every [`ShaderKind`], loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct ShaderSet {
    sources: FnvHashMap<ShaderKind, ShaderSource>,
}

impl ShaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ShaderKind, source: ShaderSource) {
        self.sources.insert(kind, source);
    }

    pub fn get(&self, kind: ShaderKind) -> RenderResult<&ShaderSource> {
        self.sources
            .get(&kind)
            .ok_or_else(|| RenderError::ShaderCompile {
                kind,
                message: "no source loaded".into(),
            })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniform {
    Texture(TextureId),
    Float(f32),
    Vec2([f32; 2]),
}

impl Uniform {
    pub fn ty(&self) -> UniformType {
        match self {
            Uniform::Texture(_) => UniformType::Texture,
            Uniform::Float(_) => UniformType::Float,
            Uniform::Vec2(_) => UniformType::Vec2,
        }
    }
}

/// One full-target draw with a shader program and its uniform values.
///
/// Uniforms are set by name and checked against the program's declared
/// interface as they are set; [`ShaderPass::check_complete`] verifies that
/// nothing was left unset before a context draws it.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPass {
    kind: ShaderKind,
    values: SmallVec<[(&'static str, Uniform); 4]>,
}

impl ShaderPass {
    pub fn new(kind: ShaderKind) -> Self {
        Self {
            kind,
            values: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn set(mut self, name: &str, value: Uniform) -> RenderResult<Self> {
        let kind = self.kind;
        let &(declared, expected) = kind
            .uniforms()
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| RenderError::UnknownUniform {
                kind,
                name: name.to_string(),
            })?;
        if value.ty() != expected {
            return Err(RenderError::UniformType {
                kind,
                name: declared,
                expected,
            });
        }
        match self.values.iter_mut().find(|(n, _)| *n == declared) {
            Some(slot) => slot.1 = value,
            None => self.values.push((declared, value)),
        }
        Ok(self)
    }

    pub fn texture(self, name: &str, id: TextureId) -> RenderResult<Self> {
        self.set(name, Uniform::Texture(id))
    }

    pub fn float(self, name: &str, v: f32) -> RenderResult<Self> {
        self.set(name, Uniform::Float(v))
    }

    pub fn vec2(self, name: &str, v: [f32; 2]) -> RenderResult<Self> {
        self.set(name, Uniform::Vec2(v))
    }

    pub fn check_complete(&self) -> RenderResult<()> {
        for &(name, _) in self.kind.uniforms() {
            if self.get(name).is_none() {
                return Err(RenderError::MissingUniform {
                    kind: self.kind,
                    name,
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Uniform> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn texture_id(&self, name: &str) -> Option<TextureId> {
        match self.get(name)? {
            Uniform::Texture(id) => Some(id),
            _ => None,
        }
    }

    pub fn float_value(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            Uniform::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn vec2_value(&self, name: &str) -> Option<[f32; 2]> {
        match self.get(name)? {
            Uniform::Vec2(v) => Some(v),
            _ => None,
        }
    }
}
