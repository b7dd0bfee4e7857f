use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::*;

/// Which texture ends up on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayStage {
    #[default]
    Final,
    TouchMask,
    CurrentFrame,
    LastFrame,
    Heated,
    Blurred,
}

impl DisplayStage {
    pub const ALL: [DisplayStage; 6] = [
        DisplayStage::Final,
        DisplayStage::TouchMask,
        DisplayStage::CurrentFrame,
        DisplayStage::LastFrame,
        DisplayStage::Heated,
        DisplayStage::Blurred,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DisplayStage::Final => "final",
            DisplayStage::TouchMask => "touchMask",
            DisplayStage::CurrentFrame => "currentFrame",
            DisplayStage::LastFrame => "lastFrame",
            DisplayStage::Heated => "heated",
            DisplayStage::Blurred => "blurred",
        }
    }
}

impl fmt::Display for DisplayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown display stage `{0}`")]
pub struct ParseStageError(pub String);

impl FromStr for DisplayStage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayStage::ALL
            .into_iter()
            .find(|stage| stage.label() == s)
            .ok_or_else(|| ParseStageError(s.to_string()))
    }
}

/// Live-tunable parameters read once per frame.
///
/// Only the control panel writes these; the pipeline takes them by shared
/// reference and never mutates them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineParameters {
    pub intensity: f32,
    pub decay: f32,
    pub radius_multiplier: f32,
    pub display_stage: DisplayStage,
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self {
            intensity: DEFAULT_INTENSITY,
            decay: DEFAULT_DECAY,
            radius_multiplier: DEFAULT_RADIUS_MULTIPLIER,
            display_stage: DisplayStage::Final,
        }
    }
}

#[inline]
fn clamp_range(v: f32, (lo, hi): (f32, f32)) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

impl PipelineParameters {
    pub fn set_intensity(&mut self, v: f32) {
        self.intensity = clamp_range(v, INTENSITY_RANGE);
    }

    pub fn set_decay(&mut self, v: f32) {
        self.decay = clamp_range(v, DECAY_RANGE);
    }

    pub fn set_radius_multiplier(&mut self, v: f32) {
        self.radius_multiplier = clamp_range(v, RADIUS_MULTIPLIER_RANGE);
    }

    pub fn set_display_stage(&mut self, stage: DisplayStage) {
        self.display_stage = stage;
    }

    /// Copy with every scalar clamped into its control range.
    pub fn sanitized(&self) -> Self {
        Self {
            intensity: clamp_range(self.intensity, INTENSITY_RANGE),
            decay: clamp_range(self.decay, DECAY_RANGE),
            radius_multiplier: clamp_range(self.radius_multiplier, RADIUS_MULTIPLIER_RANGE),
            display_stage: self.display_stage,
        }
    }
}
