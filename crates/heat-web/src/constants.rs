// DOM layout and export settings for the web front end.

pub const CANVAS_ID: &str = "app-canvas";
pub const PANEL_ID: &str = "controls";

// Control element ids, also used as labels
pub const INTENSITY_ID: &str = "intensity";
pub const DECAY_ID: &str = "decay";
pub const RADIUS_MULTIPLIER_ID: &str = "radiusMultiplier";
pub const DISPLAY_STAGE_ID: &str = "displayStage";
pub const SAVE_ID: &str = "save";

// Slider granularity
pub const INTENSITY_STEP: f32 = 0.01;
pub const DECAY_STEP: f32 = 0.0001;
pub const RADIUS_MULTIPLIER_STEP: f32 = 1.0;

pub const EXPORT_FILE_NAME: &str = "heat-trail.png";
pub const EXPORT_MIME: &str = "image/png";

pub const TOUCH_EVENTS: [&str; 4] = ["touchstart", "touchmove", "touchend", "touchcancel"];
