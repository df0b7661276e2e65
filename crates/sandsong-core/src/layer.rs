//! A fixed population of grains sharing one color and flow texture.

use crate::color::Rgba;
use crate::constants::GRAIN_SPAWN_CHANCE;
use crate::context::{SimulationContext, Viewport};
use crate::grain::Grain;
use crate::noise::NoiseSampler;
use crate::render::Renderer;
use crate::vector::map_range;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

/// A grain that asked to shed a particle this frame.
#[derive(Clone, Copy, Debug)]
pub struct GrainSpawn {
    pub position: Vec2,
    pub color: Rgba,
    pub speed: f32,
}

/// Result of one layer update.
#[derive(Clone, Debug, Default)]
pub struct LayerReport {
    /// Summed grain activity clamped to `[0, 1]`.
    pub activity: f32,
    pub spawns: SmallVec<[GrainSpawn; 4]>,
}

pub struct Layer {
    pub color: Rgba,
    pub texture: f32,
    grains: Vec<Grain>,
    steering: Vec<Vec2>,
    rng: StdRng,
}

impl Layer {
    /// Build layer `index` of `layer_count` with `grain_count` grains scattered
    /// over the viewport. Earlier layers are darker and warmer.
    pub fn new(
        index: usize,
        layer_count: usize,
        grain_count: usize,
        viewport: &Viewport,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let last = layer_count.saturating_sub(1) as f32;
        let i = index as f32;
        let color = Rgba::from_rgb8(
            map_range(i, 0.0, last, 20.0, 60.0),
            map_range(i, 0.0, last, 40.0, 70.0),
            map_range(i, 0.0, last, 50.0, 80.0),
        );
        let texture = rng.gen_range(0.003..0.041);
        let grains = (0..grain_count)
            .map(|_| {
                let pos = Vec2::new(
                    rng.gen_range(0.0..viewport.width),
                    rng.gen_range(0.0..viewport.height),
                );
                Grain::new(pos, color, texture, &mut rng)
            })
            .collect::<Vec<_>>();
        Self {
            color,
            texture,
            steering: vec![Vec2::ZERO; grains.len()],
            grains,
            rng,
        }
    }

    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    pub fn len(&self) -> usize {
        self.grains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grains.is_empty()
    }

    /// Advance every grain one frame.
    ///
    /// Steering is computed for the whole layer from the pre-update state
    /// before any grain moves, so grain order does not matter. Neighbor
    /// search is a linear scan: O(n²) per layer.
    pub fn update<N: NoiseSampler + ?Sized>(
        &mut self,
        ctx: &SimulationContext,
        noise: &N,
    ) -> LayerReport {
        for (slot, grain) in self.steering.iter_mut().zip(self.grains.iter()) {
            *slot = grain.steering(&self.grains, ctx, noise);
        }

        let shimmer = 0.5 + 0.5 * ctx.t.sin();
        let mut report = LayerReport::default();
        let mut activity = 0.0;
        for (grain, steer) in self.grains.iter_mut().zip(self.steering.iter()) {
            grain.update(*steer, &ctx.viewport);
            activity += grain.activity();
            if self.rng.gen::<f32>() < GRAIN_SPAWN_CHANCE {
                report.spawns.push(GrainSpawn {
                    position: grain.position,
                    color: self.color.lerp(Rgba::WHITE, shimmer),
                    speed: grain.velocity.length(),
                });
            }
        }
        report.activity = activity.clamp(0.0, 1.0);
        report
    }

    pub fn display(&self, renderer: &mut dyn Renderer, t: f32) {
        for grain in &self.grains {
            grain.display(renderer, t);
        }
    }
}
