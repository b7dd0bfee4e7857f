// Shader assets and uniform validation.

mod common;

use common::*;
use heat_core::soft::SoftwareContext;
use heat_core::{
    OffscreenTarget, RenderContext, RenderError, ShaderKind, ShaderPass, ShaderSource, TextureId,
    UniformType,
};

#[test]
fn shader_assets_declare_their_uniforms() {
    for kind in ShaderKind::ALL {
        let source = shader_source(kind);
        source.check_interface(kind).unwrap();
        assert!(source.vertex.contains("fn vs_main"), "{kind}");
        assert!(source.fragment.contains("fn fs_main"), "{kind}");
    }
}

#[test]
fn empty_stage_fails_to_compile() {
    let mut ctx = SoftwareContext::new(4, 4);
    let src = ShaderSource::new("", shader_source(ShaderKind::Blur).fragment);
    let err = ctx.compile_shader(ShaderKind::Blur, &src).unwrap_err();
    assert!(matches!(err, RenderError::ShaderCompile { kind: ShaderKind::Blur, .. }));
    assert!(!ctx.is_compiled(ShaderKind::Blur));
}

#[test]
fn fragment_without_uniform_fails_to_compile() {
    let src = ShaderSource::new(
        shader_source(ShaderKind::Heatmask).vertex,
        "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
    );
    let err = src.check_interface(ShaderKind::Heatmask).unwrap_err();
    assert!(err.to_string().contains("last"), "{err}");
}

#[test]
fn unknown_uniform_is_rejected() {
    let err = ShaderPass::new(ShaderKind::Heatmap)
        .texture("heat", TextureId(1))
        .unwrap_err();
    assert!(matches!(err, RenderError::UnknownUniform { kind: ShaderKind::Heatmap, ref name } if name == "heat"));
}

#[test]
fn wrong_uniform_type_is_rejected() {
    let err = ShaderPass::new(ShaderKind::Blur)
        .float("texelSize", 0.5)
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::UniformType {
            name: "texelSize",
            expected: UniformType::Vec2,
            ..
        }
    ));
    let err = ShaderPass::new(ShaderKind::Heatmask)
        .vec2("intensity", [1.0, 1.0])
        .unwrap_err();
    assert!(matches!(err, RenderError::UniformType { expected: UniformType::Float, .. }));
}

#[test]
fn incomplete_pass_is_not_drawn() {
    let mut ctx = SoftwareContext::new(4, 4);
    ctx.compile_shader(ShaderKind::Blur, &shader_source(ShaderKind::Blur))
        .unwrap();
    let src = OffscreenTarget::create(&mut ctx, "src").unwrap();
    let pass = ShaderPass::new(ShaderKind::Blur)
        .texture("tex0", src.id())
        .and_then(|p| p.vec2("direction", [1.0, 0.0]))
        .unwrap();
    let err = ctx.draw_pass(&pass).unwrap_err();
    assert!(matches!(err, RenderError::MissingUniform { name: "texelSize", .. }));
    assert!(ctx.screen().pixels().all(|p| p.0 == [0, 0, 0, 0]));
}

#[test]
fn blur_weights_sum_to_one() {
    let w = heat_core::constants::BLUR_WEIGHTS;
    let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
    assert!((total - 1.0).abs() < 1e-5);
    let blur = std::fs::read_to_string(static_root().join(ShaderKind::Blur.fragment_path())).unwrap();
    assert!(blur.contains("0.22702703"));
}
