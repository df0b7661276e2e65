//! Particle population with emitters and attractors.

use crate::color::Rgba;
use crate::config::ParticleParams;
use crate::constants::*;
use crate::context::{SimulationContext, Viewport};
use crate::harmony::Scale;
use crate::noise::NoiseSampler;
use crate::particle::Particle;
use crate::render::Renderer;
use crate::vector::{from_angle, map_range, random_unit};
use glam::Vec2;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::f32::consts::TAU;

/// Source that sprinkles particles around a fixed point for a while.
#[derive(Clone, Copy, Debug)]
pub struct Emitter {
    pub position: Vec2,
    /// Per-frame emission probability.
    pub rate: f32,
    pub color: Rgba,
    /// Frames left.
    pub lifespan: i32,
}

/// Point force: positive strength pulls, negative pushes.
#[derive(Clone, Copy, Debug)]
pub struct Attractor {
    pub position: Vec2,
    pub strength: f32,
    pub radius: f32,
    pub mobile: bool,
    pub velocity: Vec2,
}

impl Attractor {
    fn random<R: Rng + ?Sized>(position: Vec2, mobile_chance: f32, rng: &mut R) -> Self {
        Self {
            position,
            strength: random_strength(rng),
            radius: rng.gen_range(100.0..300.0),
            mobile: rng.gen::<f32>() < mobile_chance,
            velocity: random_unit(rng) * rng.gen_range(0.5..1.5),
        }
    }

    /// Force on a particle at `p`, zero outside the radius or at the center.
    pub fn force_at(&self, p: Vec2) -> Vec2 {
        let offset = self.position - p;
        let d = offset.length();
        if d > 0.0 && d < self.radius {
            offset / d * (self.strength / d)
        } else {
            Vec2::ZERO
        }
    }

    fn step(&mut self, viewport: &Viewport) {
        if !self.mobile {
            return;
        }
        self.position += self.velocity;
        // Clamp too; the viewport can shrink under a moving attractor.
        if self.position.x < 0.0 {
            self.position.x = 0.0;
            self.velocity.x = self.velocity.x.abs();
        } else if self.position.x > viewport.width {
            self.position.x = viewport.width;
            self.velocity.x = -self.velocity.x.abs();
        }
        if self.position.y < 0.0 {
            self.position.y = 0.0;
            self.velocity.y = self.velocity.y.abs();
        } else if self.position.y > viewport.height {
            self.position.y = viewport.height;
            self.velocity.y = -self.velocity.y.abs();
        }
    }

    fn display(&self, renderer: &mut dyn Renderer, frame: u64) {
        let f = frame as f32;
        if self.strength > 0.0 {
            let reach = self.radius * 0.2 * (1.0 + 0.3 * (f * 0.1).sin());
            let ray = Rgba::from_rgba8(200.0, 220.0, 255.0, 40.0);
            for i in 0..8 {
                let dir = from_angle(TAU * i as f32 / 8.0 + f * 0.01);
                renderer.line(self.position + dir * 4.0, self.position + dir * reach, ray, 1.0);
            }
            renderer.fill_circle(self.position, 6.0, ray.with_alpha(0.4));
        } else {
            let ripple = Rgba::from_rgba8(255.0, 180.0, 160.0, 35.0);
            let band = self.radius / 3.0;
            for k in 0..3 {
                let r = (f * 0.8 + k as f32 * band) % self.radius;
                renderer.stroke_circle(self.position, r * 2.0, ripple, 1.0);
            }
            renderer.fill_circle(self.position, 5.0, ripple.with_alpha(0.4));
        }
    }
}

fn random_strength<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let magnitude = rng.gen_range(0.1..0.4);
    if rng.gen::<bool>() {
        magnitude
    } else {
        -magnitude
    }
}

/// Where an attractor request landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttractorSlot {
    Inserted(usize),
    /// At cap: the entry at this index was moved and re-weighted.
    Updated(usize),
}

/// Counters from one [`ParticleSystem::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub emitted: usize,
    pub expired: usize,
}

pub struct ParticleSystem {
    particles: Vec<Particle>,
    emitters: Vec<Emitter>,
    attractors: Vec<Attractor>,
    forces: Vec<Vec2>,
    capacity: usize,
    min_capacity: usize,
    max_capacity: usize,
    emitter_cap: usize,
    next_id: u64,
    frame: u64,
    now_ms: f64,
    last_created_ms: Option<f64>,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new(params: &ParticleParams, viewport: &Viewport, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let attractors = (0..params.initial_attractors)
            .map(|_| {
                let pos = Vec2::new(
                    rng.gen_range(0.0..viewport.width),
                    rng.gen_range(0.0..viewport.height),
                );
                Attractor::random(pos, 0.3, &mut rng)
            })
            .collect();
        let min_capacity = params.min_capacity.min(params.max_capacity);
        Self {
            particles: Vec::with_capacity(params.max_capacity),
            emitters: Vec::new(),
            attractors,
            forces: Vec::new(),
            capacity: params.capacity.clamp(min_capacity, params.max_capacity),
            min_capacity,
            max_capacity: params.max_capacity,
            emitter_cap: params.emitter_cap,
            next_id: 0,
            frame: 0,
            now_ms: 0.0,
            last_created_ms: None,
            rng,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    pub fn attractors(&self) -> &[Attractor] {
        &self.attractors
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wall-clock time of the most recent particle creation.
    pub fn last_created_ms(&self) -> Option<f64> {
        self.last_created_ms
    }

    /// Set the live-particle cap within the configured bounds. Shrinking below
    /// the live count retires the oldest particles.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.clamp(self.min_capacity, self.max_capacity);
        if self.particles.len() > self.capacity {
            let excess = self.particles.len() - self.capacity;
            self.particles.drain(..excess);
        }
    }

    /// Add one particle with a random behavior. Returns its id, or `None` at
    /// capacity.
    pub fn add_particle(&mut self, position: Vec2, color: Rgba) -> Option<u64> {
        if self.particles.len() >= self.capacity {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        let particle = Particle::new(id, position, color, self.frame, &mut self.rng);
        self.particles.push(particle);
        self.last_created_ms = Some(self.now_ms);
        Some(id)
    }

    /// Scatter `count` particles within 5..20 px of `position`; sometimes
    /// leaves an emitter behind. Returns how many were added.
    pub fn add_particles_on_beat(&mut self, position: Vec2, count: usize, color: Rgba) -> usize {
        let mut added = 0;
        for _ in 0..count {
            let offset = random_unit(&mut self.rng) * self.rng.gen_range(5.0..20.0);
            if self.add_particle(position + offset, color).is_some() {
                added += 1;
            }
        }
        if self.rng.gen::<f32>() < BEAT_EMITTER_CHANCE {
            self.create_emitter(position);
        }
        added
    }

    /// Returns `false` when the emitter cap is reached.
    pub fn create_emitter(&mut self, position: Vec2) -> bool {
        if self.emitters.len() >= self.emitter_cap {
            debug!("[particles] emitter cap {} reached", self.emitter_cap);
            return false;
        }
        let rng = &mut self.rng;
        self.emitters.push(Emitter {
            position,
            rate: rng.gen_range(0.02..0.1),
            color: Rgba::from_rgb8(
                rng.gen_range(200.0..255.0),
                rng.gen_range(200.0..255.0),
                rng.gen_range(200.0..255.0),
            ),
            lifespan: 300 + rng.gen_range(0..300),
        });
        true
    }

    /// Insert an attractor, or once `cap` entries exist, move and re-weight a
    /// random existing one.
    pub fn request_attractor(&mut self, position: Vec2, cap: usize, mobile_chance: f32) -> AttractorSlot {
        if self.attractors.len() < cap {
            let attractor = Attractor::random(position, mobile_chance, &mut self.rng);
            self.attractors.push(attractor);
            return AttractorSlot::Inserted(self.attractors.len() - 1);
        }
        if self.attractors.is_empty() {
            // cap of zero: nothing to update
            return AttractorSlot::Updated(0);
        }
        let i = self.rng.gen_range(0..self.attractors.len());
        let strength = random_strength(&mut self.rng);
        let slot = &mut self.attractors[i];
        slot.position = position;
        slot.strength = strength;
        AttractorSlot::Updated(i)
    }

    pub fn clear_particles(&mut self) {
        self.particles.clear();
    }

    /// Opening composition: a ring around the center, emitters spread across
    /// the width and a scattering along the edges.
    pub fn seed_pattern(&mut self, viewport: &Viewport) {
        let center = viewport.center();
        for i in 0..15 {
            let angle = TAU * i as f32 / 15.0;
            let r = self.rng.gen_range(50.0..100.0);
            let color = Rgba::from_hsb(i as f32 * 24.0, 70.0, 90.0, 255.0);
            self.add_particle(center + from_angle(angle) * r, color);
        }
        for i in 0..3 {
            if self.rng.gen::<f32>() < 0.7 {
                let x = viewport.width * (i + 1) as f32 / 4.0;
                let y = viewport.height * self.rng.gen_range(0.3..0.7);
                self.create_emitter(Vec2::new(x, y));
            }
        }
        for _ in 0..10 {
            let pos = match self.rng.gen_range(0..4) {
                0 => Vec2::new(self.rng.gen_range(0.0..viewport.width), 0.0),
                1 => Vec2::new(viewport.width, self.rng.gen_range(0.0..viewport.height)),
                2 => Vec2::new(self.rng.gen_range(0.0..viewport.width), viewport.height),
                _ => Vec2::new(0.0, self.rng.gen_range(0.0..viewport.height)),
            };
            let color = Rgba::from_hsb(self.rng.gen_range(180.0..260.0), 50.0, 95.0, 255.0);
            self.add_particle(pos, color);
        }
    }

    /// Advance and draw everything for one frame.
    ///
    /// Order: emitters, attractor motion and indicators, attractor forces,
    /// flow noise, flocking, then per particle gravity, audio response,
    /// integration, edge bounce, drawing and aging. Expired particles are
    /// removed last, so nothing with a negative lifespan is drawn.
    pub fn run<N: NoiseSampler + ?Sized>(
        &mut self,
        ctx: &SimulationContext,
        activity: f32,
        noise: &N,
        renderer: &mut dyn Renderer,
    ) -> RunReport {
        self.frame = ctx.frame;
        self.now_ms = ctx.now_ms;
        let mut report = RunReport::default();

        for i in 0..self.emitters.len() {
            let emitter = self.emitters[i];
            if self.rng.gen::<f32>() < emitter.rate {
                let jitter = Vec2::new(
                    self.rng.gen_range(-EMITTER_SPREAD..EMITTER_SPREAD),
                    self.rng.gen_range(-EMITTER_SPREAD..EMITTER_SPREAD),
                );
                if self.add_particle(emitter.position + jitter, emitter.color).is_some() {
                    report.emitted += 1;
                }
            }
            self.emitters[i].lifespan -= 1;
        }
        self.emitters.retain(|e| e.lifespan > 0);

        for attractor in &mut self.attractors {
            attractor.step(&ctx.viewport);
            attractor.display(renderer, ctx.frame);
        }

        for particle in &mut self.particles {
            for attractor in &self.attractors {
                particle.apply_force(attractor.force_at(particle.position));
            }
        }

        let drift = ctx.t * FIELD_TIME_RATE;
        for particle in &mut self.particles {
            let n = noise.noise(
                particle.position.x * FIELD_SCALE + drift,
                particle.position.y * FIELD_SCALE + drift,
            );
            particle.apply_force(from_angle(n * TAU * 2.0) * FIELD_FORCE);
        }

        self.forces.clear();
        for (i, particle) in self.particles.iter().enumerate() {
            self.forces.push(particle.flock_force(i, &self.particles));
        }
        for (particle, force) in self.particles.iter_mut().zip(self.forces.iter()) {
            particle.apply_force(*force);
        }

        for particle in &mut self.particles {
            particle.apply_force(ctx.gravity);
            particle.respond_to_audio(activity, ctx.frame, &mut self.rng);
            particle.integrate(ctx.frame);
            particle.check_edges(&ctx.viewport);
            particle.display(renderer, ctx.frame);
            particle.age(&mut self.rng);
        }

        let before = self.particles.len();
        self.particles.retain(|p| !p.is_dead());
        report.expired = before - self.particles.len();
        report
    }

    /// React to a played note: nudge a velocity-scaled share of the live
    /// particles toward the pitch direction, and burst new ones on loud notes.
    pub fn notify_note(&mut self, frequency_hz: f32, velocity: f32, scale: &Scale, viewport: &Viewport) {
        let (low, high) = (scale.first(), scale.last());
        let n = self.particles.len();
        if n > 0 {
            let wanted = map_range(velocity, 0.0, 1.0, 3.0, n as f32 * 0.5).floor().max(0.0) as usize;
            let picked = wanted.min(n);
            let direction = map_range(frequency_hz, low, high, 0.0, TAU);
            for i in sample(&mut self.rng, n, picked).into_iter() {
                self.particles[i].respond_to_note(direction, &mut self.rng);
            }
        }

        if velocity > NOTE_BURST_VELOCITY {
            let count = map_range(velocity, NOTE_BURST_VELOCITY, 1.0, 3.0, 10.0).floor().max(0.0) as usize;
            let hue = map_range(frequency_hz, low, high, 20.0, 320.0);
            let pos = Vec2::new(
                self.rng.gen_range(0.0..viewport.width),
                self.rng.gen_range(0.0..viewport.height),
            );
            self.add_particles_on_beat(pos, count, Rgba::from_hsb(hue, 80.0, 100.0, 255.0));
        }
    }

    /// Faint lines between up to eight random particle pairs.
    pub fn draw_constellation(&mut self, renderer: &mut dyn Renderer) {
        let n = self.particles.len();
        if n < 2 {
            return;
        }
        let lines: SmallVec<[(Vec2, Vec2); 8]> = (0..(n / 2).min(8))
            .map(|_| {
                let pair = sample(&mut self.rng, n, 2);
                (self.particles[pair.index(0)].position, self.particles[pair.index(1)].position)
            })
            .collect();
        let color = Rgba::from_rgba8(255.0, 255.0, 255.0, 30.0);
        for (a, b) in lines {
            renderer.line(a, b, color, 0.5);
        }
    }
}
