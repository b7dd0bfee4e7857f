//! Touch bookkeeping for the touch-mask pass.
//!
//! The tracker keeps two sets keyed by touch identifier: the active touches
//! reported by the latest input event, and the positions snapshotted at the
//! end of the last drawn frame. A stroke exists only for touches present in
//! both, so a touch's trail starts on the frame after it first appears.

use fnv::FnvHashMap;
use glam::Vec2;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub x: f32,
    pub y: f32,
    pub radius_x: f32,
    pub radius_y: f32,
}

impl TouchPoint {
    pub fn new(id: i32, x: f32, y: f32, radius_x: f32, radius_y: f32) -> Self {
        Self {
            id,
            x,
            y,
            radius_x,
            radius_y,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Touches carried by one input event.
pub type TouchList = SmallVec<[TouchPoint; 10]>;

/// Motion of one touch between the last drawn frame and now, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub id: i32,
    pub from: Vec2,
    pub to: Vec2,
    pub radius_x: f32,
    pub radius_y: f32,
}

impl Stroke {
    /// Capsule in device pixels.
    ///
    /// Line width is `radius_multiplier * mean(radius_x, radius_y)`; the end
    /// caps are ellipses with diameters `radius_multiplier * radius_{x,y}`.
    pub fn capsule(&self, radius_multiplier: f32, pixel_density: f32) -> Capsule {
        let width = radius_multiplier * (self.radius_x + self.radius_y) * 0.5;
        Capsule {
            from: self.from * pixel_density,
            to: self.to * pixel_density,
            half_width: width * 0.5 * pixel_density,
            cap_radii: Vec2::new(self.radius_x, self.radius_y) * radius_multiplier * 0.5
                * pixel_density,
        }
    }
}

/// A thick line segment with elliptical end caps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capsule {
    pub from: Vec2,
    pub to: Vec2,
    pub half_width: f32,
    pub cap_radii: Vec2,
}

impl Capsule {
    pub fn contains(&self, p: Vec2) -> bool {
        if self.half_width > 0.0 && segment_distance(p, self.from, self.to) <= self.half_width {
            return true;
        }
        inside_ellipse(p, self.from, self.cap_radii) || inside_ellipse(p, self.to, self.cap_radii)
    }

    /// Axis-aligned bounds as (min, max).
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let pad = Vec2::splat(self.half_width).max(self.cap_radii);
        (
            self.from.min(self.to) - pad,
            self.from.max(self.to) + pad,
        )
    }
}

#[inline]
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[inline]
fn inside_ellipse(p: Vec2, center: Vec2, radii: Vec2) -> bool {
    if radii.x <= 0.0 || radii.y <= 0.0 {
        return false;
    }
    let d = (p - center) / radii;
    d.length_squared() <= 1.0
}

#[derive(Clone, Debug, Default)]
pub struct TouchTracker {
    active: FnvHashMap<i32, TouchPoint>,
    last: FnvHashMap<i32, Vec2>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active set with the touches of the latest input event.
    pub fn apply(&mut self, touches: &[TouchPoint]) {
        self.active.clear();
        for t in touches {
            self.active.insert(t.id, *t);
        }
        log::trace!("[touch] active={}", self.active.len());
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn active(&self, id: i32) -> Option<&TouchPoint> {
        self.active.get(&id)
    }

    pub fn last_position(&self, id: i32) -> Option<Vec2> {
        self.last.get(&id).copied()
    }

    /// Strokes for active touches that were also present last frame,
    /// ordered by touch id.
    pub fn strokes(&self) -> SmallVec<[Stroke; 10]> {
        let mut out: SmallVec<[Stroke; 10]> = self
            .active
            .values()
            .filter_map(|t| {
                let from = self.last.get(&t.id)?;
                Some(Stroke {
                    id: t.id,
                    from: *from,
                    to: t.position(),
                    radius_x: t.radius_x,
                    radius_y: t.radius_y,
                })
            })
            .collect();
        out.sort_by_key(|s| s.id);
        out
    }

    /// Snapshot the active positions for the next frame's strokes. Touches
    /// no longer active are dropped.
    pub fn end_frame(&mut self) {
        self.last.clear();
        self.last
            .extend(self.active.values().map(|t| (t.id, t.position())));
    }
}
