//! One flocking sand grain.

use crate::color::Rgba;
use crate::constants::*;
use crate::context::{SimulationContext, Viewport};
use crate::noise::NoiseSampler;
use crate::render::Renderer;
use crate::vector::{map_range, random_in, VecExt};
use glam::Vec2;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct Grain {
    pub position: Vec2,
    pub velocity: Vec2,
    acceleration: Vec2,
    pub size: f32,
    pub color: Rgba,
    pub texture: f32,
}

impl Grain {
    pub fn new<R: Rng + ?Sized>(position: Vec2, color: Rgba, texture: f32, rng: &mut R) -> Self {
        Self {
            position,
            velocity: random_in(rng, -0.5, 0.5),
            acceleration: Vec2::ZERO,
            size: rng.gen_range(2.0..7.0),
            color,
            texture,
        }
    }

    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    /// Steer away from grains closer than the separation radius, weighting
    /// nearer neighbors more.
    pub fn separate(&self, neighbors: &[Grain]) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;
        for other in neighbors {
            let d = self.position.distance(other.position);
            if d > 0.0 && d < SEPARATION_RADIUS {
                sum += (self.position - other.position).normalize_or_zero() / d;
                count += 1;
            }
        }
        if count == 0 {
            return Vec2::ZERO;
        }
        let avg = sum / count as f32;
        if avg.length_squared() == 0.0 {
            return Vec2::ZERO;
        }
        (avg.with_magnitude(SEPARATION_DESIRED_SPEED) - self.velocity).limit(SEPARATION_MAX_FORCE)
    }

    /// Steer toward the mean heading of nearby grains.
    pub fn align(&self, neighbors: &[Grain]) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;
        for other in neighbors {
            let d = self.position.distance(other.position);
            if d > 0.0 && d < ALIGNMENT_RADIUS {
                sum += other.velocity;
                count += 1;
            }
        }
        if count == 0 {
            return Vec2::ZERO;
        }
        let desired = (sum / count as f32).with_magnitude(ALIGNMENT_DESIRED_SPEED);
        (desired - self.velocity).limit(ALIGNMENT_MAX_FORCE)
    }

    /// Steer toward the centroid of nearby grains.
    pub fn cohere(&self, neighbors: &[Grain]) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;
        for other in neighbors {
            let d = self.position.distance(other.position);
            if d > 0.0 && d < COHESION_RADIUS {
                sum += other.position;
                count += 1;
            }
        }
        if count == 0 {
            return Vec2::ZERO;
        }
        self.seek(sum / count as f32)
    }

    fn seek(&self, target: Vec2) -> Vec2 {
        let desired = (target - self.position).with_magnitude(COHESION_DESIRED_SPEED);
        (desired - self.velocity).limit(COHESION_MAX_FORCE)
    }

    /// Flow-field push sampled at a texture-scaled, time-shifted coordinate.
    pub fn flow<N: NoiseSampler + ?Sized>(&self, ctx: &SimulationContext, noise: &N) -> Vec2 {
        let drift = ctx.t * GRAIN_FLOW_TIME_RATE;
        let nx = self.position.x * self.texture + drift;
        let ny = self.position.y * self.texture + drift;
        Vec2::new(
            map_range(noise.noise(nx, ny), 0.0, 1.0, -GRAIN_FLOW_RANGE, GRAIN_FLOW_RANGE),
            map_range(noise.noise(ny, nx), 0.0, 1.0, -GRAIN_FLOW_RANGE, GRAIN_FLOW_RANGE),
        )
    }

    /// Weighted sum of flocking, flow and gravity for this frame.
    ///
    /// `neighbors` is the whole owning layer (this grain included; zero
    /// distance excludes it).
    pub fn steering<N: NoiseSampler + ?Sized>(
        &self,
        neighbors: &[Grain],
        ctx: &SimulationContext,
        noise: &N,
    ) -> Vec2 {
        self.separate(neighbors) * SEPARATION_WEIGHT
            + self.align(neighbors) * ALIGNMENT_WEIGHT
            + self.cohere(neighbors) * COHESION_WEIGHT
            + self.flow(ctx, noise) * NOISE_WEIGHT
            + ctx.gravity * GRAVITY_WEIGHT
    }

    /// Integrate one frame: accumulate `steering`, clamp speed, Euler step,
    /// wrap toroidally, clear acceleration.
    pub fn update(&mut self, steering: Vec2, viewport: &Viewport) {
        self.apply_force(steering);
        self.velocity = (self.velocity + self.acceleration).limit(GRAIN_MAX_SPEED);
        self.position += self.velocity;
        self.acceleration = Vec2::ZERO;
        self.wrap(viewport);
    }

    fn wrap(&mut self, viewport: &Viewport) {
        if self.position.x < 0.0 {
            self.position.x = viewport.width;
        } else if self.position.x > viewport.width {
            self.position.x = 0.0;
        }
        if self.position.y < 0.0 {
            self.position.y = viewport.height;
        } else if self.position.y > viewport.height {
            self.position.y = 0.0;
        }
    }

    /// Contribution to the owning layer's activity.
    #[inline]
    pub fn activity(&self) -> f32 {
        self.velocity.length() / GRAIN_ACTIVITY_DIVISOR
    }

    pub fn display(&self, renderer: &mut dyn Renderer, t: f32) {
        let haze = Rgba::new(1.0, 1.0, 1.0, 10.0 / 255.0);
        let color = self.color.lerp(haze, 0.75 + 0.5 * t.sin());
        renderer.fill_circle(self.position, self.size, color);
    }
}
