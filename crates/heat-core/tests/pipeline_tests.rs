// Host-side tests driving the full frame schedule through the CPU context.

mod common;

use common::*;
use heat_core::soft::SoftwareContext;
use heat_core::{
    DisplayStage, FrameOutcome, HeatTrailPipeline, PipelineParameters, RenderContext, RenderError,
    ShaderKind, ShaderSet, Stroke, TouchTracker,
};
use glam::Vec2;

fn hot_params() -> PipelineParameters {
    PipelineParameters {
        intensity: 1.0,
        decay: 0.0,
        radius_multiplier: 1.0,
        display_stage: DisplayStage::Final,
    }
}

/// Two frames: a touch lands at (100, 100), then moves to (110, 100).
fn draw_stroke(
    ctx: &mut SoftwareContext,
    pipeline: &mut HeatTrailPipeline,
    touches: &mut TouchTracker,
    params: &PipelineParameters,
) {
    touches.apply(&[touch(1, 100.0, 100.0, 10.0)]);
    pipeline.frame(ctx, params, touches).unwrap();
    touches.apply(&[touch(1, 110.0, 100.0, 10.0)]);
    pipeline.frame(ctx, params, touches).unwrap();
}

#[test]
fn setup_allocates_five_targets_and_the_ramp() {
    let (ctx, pipeline) = setup(64, 48);
    assert_eq!(ctx.live_textures(), 6);
    assert_eq!(ctx.compile_count(), 4);
    for kind in ShaderKind::ALL {
        assert!(ctx.is_compiled(kind), "{kind} not compiled");
    }
    for target in pipeline.targets().iter() {
        assert_eq!(target.size(), (64, 48), "{}", target.label());
    }
    let current = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert!(current.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    let mask = ctx.texture(pipeline.targets().touch_mask.id()).unwrap();
    assert!(mask.pixels().all(|p| p.0 == [0, 0, 0, 0]));
}

#[test]
fn targets_follow_pixel_density() {
    let mut ctx = SoftwareContext::new(50, 40).with_pixel_density(2.0);
    let pipeline = HeatTrailPipeline::new(&mut ctx, &shader_set(), grey_ramp()).unwrap();
    assert_eq!(pipeline.size(), (100, 80));
    assert_eq!(pipeline.targets().blurred.texel_size(), [0.01, 0.0125]);
}

#[test]
fn empty_mask_is_transparent() {
    let (mut ctx, mut pipeline) = setup(32, 32);
    let mut touches = TouchTracker::new();
    let outcome = pipeline
        .frame(&mut ctx, &PipelineParameters::default(), &mut touches)
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Presented);
    let mask = ctx.texture(pipeline.targets().touch_mask.id()).unwrap();
    assert!(mask.pixels().all(|p| p.0 == [0, 0, 0, 0]));
}

#[test]
fn new_touch_draws_nothing_until_it_moves() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let params = hot_params();

    touches.apply(&[touch(1, 100.0, 100.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    let mask = ctx.texture(pipeline.targets().touch_mask.id()).unwrap();
    assert!(mask.pixels().all(|p| p.0[3] == 0));

    touches.apply(&[touch(1, 110.0, 100.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    let mask = ctx.texture(pipeline.targets().touch_mask.id()).unwrap();
    assert_eq!(mask.get_pixel(105, 100).0, [255, 255, 255, 255]);
}

#[test]
fn stroke_heats_capsule_region() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let params = hot_params();

    touches.apply(&[touch(1, 100.0, 100.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    let first = ctx
        .texture(pipeline.targets().current_frame.id())
        .unwrap()
        .clone();
    touches.apply(&[touch(1, 110.0, 100.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();

    let targets = pipeline.targets();
    let mask = ctx.texture(targets.touch_mask.id()).unwrap();
    for x in 100..=110 {
        assert!(mask.get_pixel(x, 100).0[3] > 0, "mask empty at x={x}");
    }

    let current = ctx.texture(targets.current_frame.id()).unwrap();
    let capsule = Stroke {
        id: 1,
        from: Vec2::new(100.0, 100.0),
        to: Vec2::new(110.0, 100.0),
        radius_x: 10.0,
        radius_y: 10.0,
    }
    .capsule(params.radius_multiplier, 1.0);
    let (lo, hi) = capsule.bounds();
    for (x, y, p) in current.enumerate_pixels() {
        let outside = (x + 1) as f32 <= lo.x
            || x as f32 >= hi.x
            || (y + 1) as f32 <= lo.y
            || y as f32 >= hi.y;
        if outside {
            assert_eq!(p, first.get_pixel(x, y), "texel ({x}, {y}) changed");
        }
    }
    // segment body, half width 5
    assert_eq!(red(current, 105, 100), 255);
    assert_eq!(red(current, 105, 104), 255);
    assert_eq!(red(current, 105, 106), 0);
    // elliptical caps, semi-axes 5
    assert_eq!(red(current, 96, 100), 255);
    assert_eq!(red(current, 113, 100), 255);
    assert_eq!(red(current, 93, 100), 0);
    assert_eq!(red(current, 20, 20), 0);

    let last = ctx.texture(targets.last_frame.id()).unwrap();
    assert_eq!(last.as_raw(), current.as_raw());

    let heated = ctx.texture(targets.heated.id()).unwrap();
    assert_eq!(red(heated, 105, 100), 255);
    assert_eq!(red(heated, 20, 20), 0);

    // every blur tap around the middle of the stroke is inside it
    let screen = ctx.screen();
    assert!(red(screen, 105, 100) >= 254);
    assert_eq!(red(screen, 20, 20), 0);
    // blur spreads a little heat past the edge
    let blurred = ctx.texture(targets.blurred.id()).unwrap();
    assert!(red(blurred, 116, 100) > 0);
    assert!(red(screen, 105, 107) > 0);
}

#[test]
fn stale_touch_is_not_retained() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let params = hot_params();

    touches.apply(&[touch(1, 40.0, 40.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    assert!(touches.last_position(1).is_some());

    // touchend carries no remaining touches
    touches.apply(&[]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    assert!(touches.last_position(1).is_none());

    // same identifier reused far away: no stroke across the screen
    touches.apply(&[touch(1, 150.0, 150.0, 10.0)]);
    assert!(touches.strokes().is_empty());
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    let mask = ctx.texture(pipeline.targets().touch_mask.id()).unwrap();
    assert!(mask.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn zero_intensity_leaves_heat_unchanged() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &hot_params());
    let before = ctx
        .texture(pipeline.targets().current_frame.id())
        .unwrap()
        .clone();

    let params = PipelineParameters {
        intensity: 0.0,
        ..hot_params()
    };
    touches.apply(&[touch(1, 60.0, 60.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    touches.apply(&[touch(1, 30.0, 60.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();

    let after = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert_eq!(after.as_raw(), before.as_raw());
}

/// Heat from the stroke at (100..110, 100), then a second touch dragged
/// across fresh ground so the next frame has a non-empty mask.
fn heated_with_moving_touch() -> (SoftwareContext, HeatTrailPipeline, TouchTracker) {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &hot_params());
    touches.apply(&[touch(1, 110.0, 100.0, 10.0), touch(2, 40.0, 40.0, 10.0)]);
    pipeline.frame(&mut ctx, &hot_params(), &mut touches).unwrap();
    (ctx, pipeline, touches)
}

#[test]
fn zero_intensity_only_decays_the_last_frame() {
    let decay = 0.01;
    let params = PipelineParameters {
        intensity: 0.0,
        decay,
        ..hot_params()
    };

    let (mut ctx, mut pipeline, mut touches) = heated_with_moving_touch();
    let last = ctx
        .texture(pipeline.targets().current_frame.id())
        .unwrap()
        .clone();
    touches.apply(&[touch(1, 110.0, 100.0, 10.0), touch(2, 80.0, 40.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();

    let mask = ctx.texture(pipeline.targets().touch_mask.id()).unwrap();
    assert!(mask.pixels().any(|p| p.0[3] > 0), "mask should not be empty");
    let with_mask = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    for (x, y, p) in with_mask.enumerate_pixels() {
        let l = last.get_pixel(x, y).0[0];
        let expected = ((l as f32 / 255.0 - decay).clamp(0.0, 1.0) * 255.0).round() as u8;
        assert_eq!(p.0[0], expected, "texel ({x}, {y}) from {l}");
    }
    assert_eq!(red(with_mask, 105, 100), 252);

    // same history, no touches at all
    let (mut bare_ctx, mut bare, mut bare_touches) = heated_with_moving_touch();
    bare_touches.apply(&[]);
    bare.frame(&mut bare_ctx, &params, &mut bare_touches).unwrap();
    let without_mask = bare_ctx.texture(bare.targets().current_frame.id()).unwrap();
    assert_eq!(with_mask.as_raw(), without_mask.as_raw());
}

#[test]
fn zero_decay_keeps_heat_without_touches() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &hot_params());
    touches.apply(&[]);
    let before = ctx
        .texture(pipeline.targets().current_frame.id())
        .unwrap()
        .clone();

    for _ in 0..5 {
        pipeline
            .frame(&mut ctx, &hot_params(), &mut touches)
            .unwrap();
    }
    let after = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert_eq!(after.as_raw(), before.as_raw());
}

#[test]
fn positive_decay_cools_every_frame() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &hot_params());
    touches.apply(&[]);

    let params = PipelineParameters {
        decay: 0.01,
        ..hot_params()
    };
    let mut previous = 255;
    for _ in 0..3 {
        pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
        let current = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
        let heat = red(current, 105, 100);
        assert!(heat < previous, "{heat} !< {previous}");
        previous = heat;
    }
    let current = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert_eq!(red(current, 20, 20), 0);
}

#[test]
fn selected_stage_is_shown_verbatim() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let mut params = hot_params();
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &params);

    for stage in [
        DisplayStage::TouchMask,
        DisplayStage::CurrentFrame,
        DisplayStage::LastFrame,
        DisplayStage::Heated,
        DisplayStage::Blurred,
    ] {
        params.set_display_stage(stage);
        pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
        let target = pipeline.target(stage).unwrap();
        let shown = ctx.texture(target.id()).unwrap();
        assert_eq!(ctx.screen().as_raw(), shown.as_raw(), "{stage}");
    }
}

#[test]
fn resize_reallocates_targets_only() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let params = hot_params();
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &params);

    ctx.set_canvas_size(300, 150);
    assert!(pipeline.needs_resize(&ctx));
    touches.apply(&[]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();

    assert_eq!(pipeline.size(), (300, 150));
    for target in pipeline.targets().iter() {
        assert_eq!(target.size(), (300, 150));
    }
    assert_eq!(ctx.live_textures(), 6);
    assert_eq!(ctx.compile_count(), 4);
    assert_eq!(ctx.upload_count(), 1);
    assert_eq!(ctx.screen().dimensions(), (300, 150));
    // accumulated heat starts over
    let current = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert!(current.pixels().all(|p| p.0[0] == 0));
}

#[test]
fn heat_ramp_is_uploaded_once() {
    let (mut ctx, mut pipeline) = setup(16, 16);
    let mut touches = TouchTracker::new();
    for _ in 0..4 {
        pipeline
            .frame(&mut ctx, &PipelineParameters::default(), &mut touches)
            .unwrap();
    }
    assert_eq!(ctx.upload_count(), 1);
    assert_eq!(ctx.presented_frames(), 4);
    assert_eq!(pipeline.frame_index(), 4);
}

#[test]
fn unavailable_canvas_skips_the_whole_frame() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let params = hot_params();
    touches.apply(&[touch(1, 100.0, 100.0, 10.0)]);
    pipeline.frame(&mut ctx, &params, &mut touches).unwrap();

    ctx.set_frame_available(false);
    touches.apply(&[touch(1, 110.0, 100.0, 10.0)]);
    let outcome = pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(ctx.presented_frames(), 1);
    assert_eq!(pipeline.frame_index(), 1);
    assert_eq!(
        touches.last_position(1),
        Some(glam::Vec2::new(100.0, 100.0))
    );

    ctx.set_frame_available(true);
    let outcome = pipeline.frame(&mut ctx, &params, &mut touches).unwrap();
    assert_eq!(outcome, FrameOutcome::Presented);
    let current = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert_eq!(red(current, 105, 100), 255);
}

#[test]
fn out_of_memory_aborts_setup() {
    let mut ctx = SoftwareContext::new(64, 64).with_texture_limit(3);
    let err = HeatTrailPipeline::new(&mut ctx, &shader_set(), grey_ramp())
        .err()
        .unwrap();
    assert!(matches!(err, RenderError::OutOfMemory { .. }), "{err}");
    assert_eq!(ctx.live_textures(), 0);
}

#[test]
fn failed_ramp_allocation_frees_the_targets() {
    let mut ctx = SoftwareContext::new(64, 64).with_texture_limit(5);
    let err = HeatTrailPipeline::new(&mut ctx, &shader_set(), grey_ramp())
        .err()
        .unwrap();
    assert!(
        matches!(&err, RenderError::OutOfMemory { label, .. } if label == "heat_ramp"),
        "{err}"
    );
    assert_eq!(ctx.live_textures(), 0);
}

#[test]
fn failed_resize_keeps_the_old_targets_only() {
    let mut ctx = SoftwareContext::new(32, 32).with_texture_limit(8);
    let mut pipeline = HeatTrailPipeline::new(&mut ctx, &shader_set(), grey_ramp()).unwrap();
    assert_eq!(ctx.live_textures(), 6);

    ctx.set_canvas_size(40, 40);
    let err = pipeline.resize(&mut ctx).err().unwrap();
    assert!(matches!(err, RenderError::OutOfMemory { .. }), "{err}");
    assert_eq!(ctx.live_textures(), 6);
    assert_eq!(pipeline.size(), (32, 32));
    for target in pipeline.targets().iter() {
        assert!(ctx.texture(target.id()).is_some(), "{}", target.label());
    }
}

#[test]
fn missing_shader_source_aborts_setup() {
    let mut ctx = SoftwareContext::new(64, 64);
    let mut shaders = ShaderSet::new();
    shaders.insert(ShaderKind::Heatmask, shader_source(ShaderKind::Heatmask));
    let err = HeatTrailPipeline::new(&mut ctx, &shaders, grey_ramp())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RenderError::ShaderCompile {
            kind: ShaderKind::Heatmap,
            ..
        }
    ));
    assert_eq!(ctx.live_textures(), 0);
}

#[test]
fn out_of_range_parameters_are_clamped_per_frame() {
    let (mut ctx, mut pipeline) = setup(200, 200);
    let mut touches = TouchTracker::new();
    let wild = PipelineParameters {
        intensity: 7.0,
        decay: -1.0,
        radius_multiplier: 1.0,
        display_stage: DisplayStage::Final,
    };
    draw_stroke(&mut ctx, &mut pipeline, &mut touches, &wild);
    let current = ctx.texture(pipeline.targets().current_frame.id()).unwrap();
    assert_eq!(red(current, 105, 100), 255);
    assert_eq!(red(current, 20, 20), 0);
    assert_eq!(wild.intensity, 7.0);
    assert!(ctx.bound_target().is_none());
}
