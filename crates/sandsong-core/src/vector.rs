//! 2D vector helpers layered on `glam::Vec2`.
//!
//! `Vec2` is `Copy`, and every helper here returns a new value. Components
//! mutate only their own fields (`self.velocity += ...`), never a borrowed
//! vector.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Steering-style operations missing from `glam`.
pub trait VecExt: Sized {
    /// Clamp the magnitude to `max`, keeping direction.
    fn limit(self, max: f32) -> Self;
    /// Rescale to `magnitude`; the zero vector stays zero.
    fn with_magnitude(self, magnitude: f32) -> Self;
    /// Angle in radians in `(-PI, PI]`.
    fn heading(self) -> f32;
}

impl VecExt for Vec2 {
    #[inline]
    fn limit(self, max: f32) -> Self {
        self.clamp_length_max(max)
    }

    #[inline]
    fn with_magnitude(self, magnitude: f32) -> Self {
        self.normalize_or_zero() * magnitude
    }

    #[inline]
    fn heading(self) -> f32 {
        self.y.atan2(self.x)
    }
}

/// Unit vector pointing at `angle` radians.
#[inline]
pub fn from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Rotate `v` counter-clockwise by `angle` radians.
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Uniformly distributed unit vector.
#[inline]
pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    from_angle(rng.gen_range(0.0..TAU))
}

/// Uniform vector inside the `[lo, hi)` square.
#[inline]
pub fn random_in<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> Vec2 {
    Vec2::new(rng.gen_range(lo..hi), rng.gen_range(lo..hi))
}

/// Linear re-mapping of `value` from `[in_lo, in_hi]` to `[out_lo, out_hi]`.
///
/// Not clamped. A degenerate input range maps everything to `out_lo`.
#[inline]
pub fn map_range(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    let span = in_hi - in_lo;
    if span.abs() < f32::EPSILON {
        return out_lo;
    }
    out_lo + (value - in_lo) / span * (out_hi - out_lo)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
