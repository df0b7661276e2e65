//! Seeded fractal value noise on top of the `noise` crate.
//!
//! Output is always in `[0, 1)` and identical for identical inputs.

use ::noise::{Fbm, MultiFractal, NoiseFn, Value};

/// A smooth, deterministic scalar field.
pub trait NoiseSampler {
    /// Sample the field at `(x, y)`. Must return a value in `[0, 1)`.
    fn noise(&self, x: f32, y: f32) -> f32;

    /// One-dimensional slice of the field along `y = 0`.
    #[inline]
    fn noise1(&self, x: f32) -> f32 {
        self.noise(x, 0.0)
    }
}

#[derive(Clone, Debug)]
pub struct ValueNoise {
    fbm: Fbm<Value>,
}

impl ValueNoise {
    pub const DEFAULT_OCTAVES: usize = 4;
    pub const DEFAULT_FALLOFF: f64 = 0.5;

    pub fn new(seed: u64) -> Self {
        let seed = (seed ^ (seed >> 32)) as u32;
        let fbm = Fbm::<Value>::new(seed)
            .set_octaves(Self::DEFAULT_OCTAVES)
            .set_persistence(Self::DEFAULT_FALLOFF);
        Self { fbm }
    }

    /// Octave count (at least 1) and per-octave amplitude falloff in `(0, 1)`.
    pub fn with_detail(self, octaves: usize, falloff: f64) -> Self {
        let fbm = self
            .fbm
            .set_octaves(octaves.clamp(1, Fbm::<Value>::MAX_OCTAVES))
            .set_persistence(falloff.clamp(0.01, 0.99));
        Self { fbm }
    }
}

impl Default for ValueNoise {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseSampler for ValueNoise {
    fn noise(&self, x: f32, y: f32) -> f32 {
        if !x.is_finite() || !y.is_finite() {
            return 0.0;
        }
        let v = self.fbm.get([x as f64, y as f64]);
        // [-1, 1] -> [0, 1), fbm can overshoot slightly
        ((v as f32 + 1.0) * 0.5).clamp(0.0, 1.0 - f32::EPSILON)
    }
}
