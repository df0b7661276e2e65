//! Decorative particles and their behavior variants.

use crate::color::Rgba;
use crate::constants::*;
use crate::context::Viewport;
use crate::render::Renderer;
use crate::vector::{from_angle, random_in, random_unit, rotate, VecExt};
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;
use std::f32::consts::{FRAC_PI_2, TAU};

/// Circular path followed by an orbiter instead of force integration.
#[derive(Clone, Copy, Debug)]
pub struct Orbit {
    pub center: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub phase: f32,
}

#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    /// Plain force integration.
    Normal,
    /// Rides a slowly shrinking circle around its spawn point.
    Orbiter(Orbit),
    /// Seeks the nearest other particle.
    Follower,
    /// Pushes away from every particle nearby.
    Repeller,
}

impl Behavior {
    fn random<R: Rng + ?Sized>(position: Vec2, rng: &mut R) -> Self {
        match rng.gen_range(0..4) {
            0 => Behavior::Normal,
            1 => Behavior::Orbiter(Orbit {
                center: position,
                radius: rng.gen_range(30.0..80.0),
                speed: rng.gen_range(0.01..0.05),
                phase: rng.gen_range(0.0..TAU),
            }),
            2 => Behavior::Follower,
            _ => Behavior::Repeller,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Normal => "normal",
            Behavior::Orbiter(_) => "orbiter",
            Behavior::Follower => "follower",
            Behavior::Repeller => "repeller",
        }
    }
}

/// Bounded history of past positions; the oldest point is evicted first.
#[derive(Clone, Debug)]
pub struct Trail {
    points: SmallVec<[Vec2; TRAIL_MAX]>,
    capacity: usize,
}

impl Trail {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: SmallVec::new(),
            capacity: capacity.clamp(1, TRAIL_MAX),
        }
    }

    pub fn push(&mut self, p: Vec2) {
        self.points.push(p);
        while self.points.len() > self.capacity {
            self.points.remove(0);
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    id: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    acceleration: Vec2,
    lifespan: f32,
    color: Rgba,
    base_size: f32,
    size: f32,
    oscillation_speed: f32,
    oscillation_amplitude: f32,
    swell: f32,
    pulse: f32,
    birth_frame: u64,
    max_speed: f32,
    note_affinity: usize,
    trail: Option<Trail>,
    behavior: Behavior,
}

impl Particle {
    pub fn new<R: Rng + ?Sized>(
        id: u64,
        position: Vec2,
        color: Rgba,
        frame: u64,
        rng: &mut R,
    ) -> Self {
        let behavior = Behavior::random(position, rng);
        Self::with_behavior(id, position, color, frame, behavior, rng)
    }

    pub fn with_behavior<R: Rng + ?Sized>(
        id: u64,
        position: Vec2,
        color: Rgba,
        frame: u64,
        behavior: Behavior,
        rng: &mut R,
    ) -> Self {
        let base_size = rng.gen_range(4.0..12.0);
        let trail = (rng.gen::<f32>() < TRAIL_CHANCE).then(|| Trail::new(rng.gen_range(3..TRAIL_MAX)));
        let lifespan = match behavior {
            Behavior::Orbiter(_) => ORBITER_LIFESPAN,
            _ => PARTICLE_LIFESPAN,
        };
        Self {
            id,
            position,
            velocity: random_in(rng, -1.0, 1.0),
            acceleration: Vec2::new(0.0, 0.05),
            lifespan,
            color,
            base_size,
            size: base_size,
            oscillation_speed: rng.gen_range(0.02..0.08),
            oscillation_amplitude: rng.gen_range(0.5..2.0),
            swell: 0.0,
            pulse: 0.0,
            birth_frame: frame,
            max_speed: rng.gen_range(1.5..3.5),
            note_affinity: *NOTE_AFFINITY_DEGREES.choose(rng).unwrap_or(&0),
            trail,
            behavior,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn base_size(&self) -> f32 {
        self.base_size
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    /// Scale degree this particle is tuned to.
    pub fn note_affinity(&self) -> usize {
        self.note_affinity
    }

    pub fn trail(&self) -> Option<&Trail> {
        self.trail.as_ref()
    }

    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.lifespan < 0.0
    }

    /// Accumulate a force; larger particles respond less.
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force / (self.base_size / PARTICLE_MASS_DIVISOR);
    }

    /// Swell with the grain activity; on busy frames, kick in a random direction.
    pub fn respond_to_audio<R: Rng + ?Sized>(&mut self, activity: f32, frame: u64, rng: &mut R) {
        self.swell = activity.max(0.0);
        if activity > AUDIO_IMPULSE_THRESHOLD && frame % AUDIO_IMPULSE_PERIOD == 0 {
            let impulse = random_unit(rng) * activity * AUDIO_IMPULSE_GAIN;
            self.apply_force(impulse);
        }
    }

    /// Push toward the note's direction and flash larger.
    pub fn respond_to_note<R: Rng + ?Sized>(&mut self, direction: f32, rng: &mut R) {
        self.apply_force(from_angle(direction) * NOTE_IMPULSE);
        self.pulse = NOTE_SIZE_PULSE;
        if rng.gen::<f32>() < 0.3 {
            self.velocity += from_angle(direction) * rng.gen_range(0.1..0.4);
        }
    }

    /// Variant-specific flocking force against the rest of the population.
    ///
    /// `index` is this particle's own slot in `others`.
    pub fn flock_force(&self, index: usize, others: &[Particle]) -> Vec2 {
        match self.behavior {
            Behavior::Follower => {
                let mut nearest: Option<Vec2> = None;
                let mut best = FOLLOW_SEARCH_RADIUS;
                for (j, other) in others.iter().enumerate() {
                    if j == index {
                        continue;
                    }
                    let d = self.position.distance(other.position);
                    if d < best {
                        best = d;
                        nearest = Some(other.position);
                    }
                }
                match nearest {
                    Some(target) => {
                        let desired = target - self.position;
                        if desired.length() > FOLLOW_DEAD_ZONE {
                            (desired.with_magnitude(self.max_speed) - self.velocity)
                                .limit(FOLLOW_MAX_FORCE)
                        } else {
                            Vec2::ZERO
                        }
                    }
                    None => Vec2::ZERO,
                }
            }
            Behavior::Repeller => {
                let mut push = Vec2::ZERO;
                for (j, other) in others.iter().enumerate() {
                    if j == index {
                        continue;
                    }
                    let d = self.position.distance(other.position);
                    if d > 0.0 && d < REPEL_RADIUS {
                        push += (self.position - other.position).normalize_or_zero()
                            / (d * REPEL_FALLOFF);
                    }
                }
                push
            }
            Behavior::Normal | Behavior::Orbiter(_) => Vec2::ZERO,
        }
    }

    /// Move one frame. Orbiters follow their circle; everything else
    /// integrates acceleration under its own speed cap.
    pub fn integrate(&mut self, frame: u64) {
        if let Some(trail) = self.trail.as_mut() {
            if frame % 2 == 0 {
                trail.push(self.position);
            }
        }

        match &mut self.behavior {
            Behavior::Orbiter(orbit) => {
                let age = frame.saturating_sub(self.birth_frame) as f32;
                let angle = orbit.phase + age * orbit.speed;
                self.position = orbit.center + Vec2::new(angle.sin(), angle.cos()) * orbit.radius;
                orbit.radius = (orbit.radius * ORBIT_DECAY).max(ORBIT_MIN_RADIUS);
            }
            _ => {
                self.velocity = (self.velocity + self.acceleration).limit(self.max_speed);
                self.position += self.velocity;
            }
        }
        self.acceleration = Vec2::ZERO;

        let wobble = 1.0
            + (frame as f32 * self.oscillation_speed).sin() * self.oscillation_amplitude * 0.3;
        self.size = self.base_size * wobble * (1.0 + self.swell) * (1.0 + self.pulse);
        self.pulse *= NOTE_PULSE_DECAY;
    }

    /// Bounce off the viewport edges, losing some speed.
    pub fn check_edges(&mut self, viewport: &Viewport) {
        if self.position.x < 0.0 || self.position.x > viewport.width {
            self.velocity.x *= PARTICLE_EDGE_DAMPING;
            self.position.x = self.position.x.clamp(0.0, viewport.width);
        }
        if self.position.y < 0.0 || self.position.y > viewport.height {
            self.velocity.y *= PARTICLE_EDGE_DAMPING;
            self.position.y = self.position.y.clamp(0.0, viewport.height);
        }
    }

    /// Burn a random `[1, 3)` frames of lifespan; returns the amount.
    pub fn age<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        let burn = rng.gen_range(1.0..3.0);
        self.lifespan -= burn;
        burn
    }

    pub fn display(&self, renderer: &mut dyn Renderer, frame: u64) {
        let alpha = (self.lifespan / 255.0).clamp(0.0, 1.0);
        let f = frame as f32;

        if let Some(trail) = &self.trail {
            if !trail.points().is_empty() {
                let mut pts: SmallVec<[Vec2; 16]> = trail.points().iter().copied().collect();
                pts.push(self.position);
                renderer.polyline(&pts, self.color.with_alpha(alpha * 0.7), (self.size * 0.35).max(1.0));
            }
        }

        let body = self.color.with_alpha(alpha);
        let s = self.size;
        match self.behavior {
            Behavior::Normal => renderer.fill_circle(self.position, s, body),
            Behavior::Orbiter(_) => {
                renderer.fill_circle(self.position, s, body);
                let accent = self.position + rotate(Vec2::new(s * 0.3, 0.0), f * 0.1);
                renderer.fill_circle(accent, s * 0.3, Rgba::WHITE.with_alpha(alpha * 0.8));
            }
            Behavior::Follower => {
                let rot = self.velocity.heading() + FRAC_PI_2;
                let h = s * 0.5;
                let a = self.position + rotate(Vec2::new(0.0, -h), rot);
                let b = self.position + rotate(Vec2::new(-h, h), rot);
                let c = self.position + rotate(Vec2::new(h, h), rot);
                renderer.fill_triangle(a, b, c, body);
            }
            Behavior::Repeller => {
                let rot = f * 0.05;
                for i in 0..5 {
                    let angle = TAU * i as f32 / 5.0 + rot;
                    let long = self.position + from_angle(angle) * (s * 0.5);
                    let short = self.position + from_angle(angle + TAU / 10.0) * (s * 0.25);
                    renderer.line(self.position, long, body, 1.0);
                    renderer.line(self.position, short, body, 1.0);
                }
            }
        }

        if self.color.brightness() > 70.0 {
            renderer.fill_circle_glow(self.position, s * 0.7, self.color.with_alpha(150.0 / 255.0), 10.0);
        }
    }
}
