use std::time::Duration;

use instant::Instant;

use crate::constants::{FRAME_TOLERANCE_MS, TARGET_FPS};

/// Gates animation-frame callbacks down to a target frame rate.
///
/// Browsers fire animation frames at the display refresh rate; a tick only
/// counts as a frame once a full interval has passed since the previous
/// accepted one, less a small tolerance so a 60 Hz display does not drop
/// every other frame to jitter.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    tolerance: Duration,
    last: Option<Instant>,
    accepted: u64,
}

impl FramePacer {
    pub fn new(fps: f32) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            TARGET_FPS
        };
        let interval = Duration::try_from_secs_f32(1.0 / fps)
            .unwrap_or_else(|_| Duration::from_secs_f32(1.0 / TARGET_FPS));
        Self {
            interval,
            tolerance: Duration::from_secs_f32(FRAME_TOLERANCE_MS / 1000.0),
            last: None,
            accepted: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a frame is due at `now`. Accepting a frame moves the baseline.
    pub fn ready(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            let elapsed = if now > last { now - last } else { Duration::ZERO };
            if elapsed + self.tolerance < self.interval {
                return false;
            }
        }
        self.last = Some(now);
        self.accepted = self.accepted.wrapping_add(1);
        true
    }

    /// Forget the baseline so the next tick is accepted immediately.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn accepted_frames(&self) -> u64 {
        self.accepted
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(TARGET_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rate_falls_back_to_default() {
        assert_eq!(FramePacer::new(0.0).interval(), FramePacer::default().interval());
        assert_eq!(FramePacer::new(f32::NAN).interval(), FramePacer::default().interval());
    }

    #[test]
    fn unrepresentable_interval_falls_back_to_default() {
        let pacer = FramePacer::new(f32::MIN_POSITIVE);
        assert_eq!(pacer.interval(), FramePacer::default().interval());
    }
}
