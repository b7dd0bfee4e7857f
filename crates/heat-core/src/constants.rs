// Heat-trail tuning constants shared by the web frontend and host tests.

// Initial control panel state
pub const DEFAULT_INTENSITY: f32 = 0.3; // how strongly new touches add heat
pub const DEFAULT_DECAY: f32 = 0.01; // heat lost per frame
pub const DEFAULT_RADIUS_MULTIPLIER: f32 = 30.0; // touch radius -> stroke size

// Control ranges (min, max)
pub const INTENSITY_RANGE: (f32, f32) = (0.0, 1.0);
pub const DECAY_RANGE: (f32, f32) = (0.0, 0.01);
pub const RADIUS_MULTIPLIER_RANGE: (f32, f32) = (0.0, 50.0);

// Clear and paint colors (straight RGBA)
pub const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
pub const OPAQUE_BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const MASK_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

// Frame pacing
pub const TARGET_FPS: f32 = 60.0;
pub const FRAME_TOLERANCE_MS: f32 = 5.0; // frames this early still count as due

// 9-tap Gaussian, centre weight first
pub const BLUR_WEIGHTS: [f32; 5] = [
    0.227_027_03,
    0.194_594_6,
    0.121_621_62,
    0.054_054_055,
    0.016_216_217,
];
pub const BLUR_HORIZONTAL: [f32; 2] = [1.0, 0.0];
pub const BLUR_VERTICAL: [f32; 2] = [0.0, 1.0];

// Asset layout, relative to the served site root
pub const SHADER_DIR: &str = "shaders";
pub const HEAT_RAMP_PATH: &str = "images/heat.png";
