//! A running session: sand layers, particles and harmony driven frame by
//! frame, plus the input and audio-lifecycle rules around them.

use crate::audio::{AudioError, NoteDuration, NoteEvent, SoundEngine};
use crate::clock::SimulationClock;
use crate::color::Rgba;
use crate::config::{stream_seed, SketchConfig};
use crate::constants::*;
use crate::context::{SimulationContext, Viewport};
use crate::harmony::HarmonyEngine;
use crate::layer::Layer;
use crate::noise::ValueNoise;
use crate::particles::ParticleSystem;
use crate::render::{Background, Renderer};
use crate::vector::{from_angle, map_range};
use glam::Vec2;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

// rng streams
const STREAM_NOISE: u64 = 0;
const STREAM_PARTICLES: u64 = 1;
const STREAM_HARMONY: u64 = 2;
const STREAM_SKETCH: u64 = 3;
const STREAM_LAYERS: u64 = 16;

/// Host input, already translated to canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Press or tap; the gesture that may start audio.
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerDrag { x: f32, y: f32, dx: f32, dy: f32 },
    Key(char),
    Resize { width: f32, height: f32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioStatus {
    /// No gesture yet.
    Dormant,
    Active,
    /// Activation failed; the next gesture retries.
    Failed(String),
}

/// Per-frame summary returned by [`Sketch::frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub activity: f32,
    pub particles: usize,
    pub capacity: usize,
    pub notes: usize,
    pub fps: f32,
}

pub struct Sketch<S: SoundEngine> {
    config: SketchConfig,
    session: u64,
    clock: SimulationClock,
    ctx: SimulationContext,
    noise: ValueNoise,
    layers: Vec<Layer>,
    particles: ParticleSystem,
    harmony: HarmonyEngine,
    audio: Option<S>,
    status: AudioStatus,
    events: Vec<NoteEvent>,
    pointer: Vec2,
    activity: f32,
    rng: StdRng,
}

impl<S: SoundEngine> Sketch<S> {
    pub fn new(config: SketchConfig, viewport: Viewport, now_ms: f64, audio: S) -> Self {
        let session = 1;
        let world = World::build(&config, viewport, session);
        let mut ctx = SimulationContext::new(viewport);
        ctx.now_ms = now_ms;
        info!(
            "[sketch] session {session}: {} layers x {} grains, {}x{}",
            config.layers.count, config.layers.grains_per_layer, viewport.width, viewport.height
        );
        Self {
            clock: SimulationClock::new(config.clock.clone(), viewport),
            ctx,
            noise: world.noise,
            layers: world.layers,
            particles: world.particles,
            harmony: world.harmony,
            rng: world.rng,
            session,
            audio: Some(audio),
            status: AudioStatus::Dormant,
            events: Vec::new(),
            pointer: viewport.center(),
            activity: 0.0,
            config,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn audio_status(&self) -> &AudioStatus {
        &self.status
    }

    pub fn audio(&self) -> Option<&S> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut S> {
        self.audio.as_mut()
    }

    /// Hand the session a new engine, e.g. after [`Sketch::stop`].
    pub fn attach_audio(&mut self, audio: S) {
        self.audio = Some(audio);
        self.status = AudioStatus::Dormant;
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSystem {
        &mut self.particles
    }

    pub fn harmony(&self) -> &HarmonyEngine {
        &self.harmony
    }

    pub fn harmony_mut(&mut self) -> &mut HarmonyEngine {
        &mut self.harmony
    }

    /// Mean layer activity of the last frame.
    pub fn activity(&self) -> f32 {
        self.activity
    }

    /// Advance and draw one frame.
    pub fn frame(&mut self, now_ms: f64, renderer: &mut dyn Renderer) -> FrameStats {
        let ctx = self.clock.advance(now_ms, &self.noise);
        self.ctx = ctx;

        let t = ctx.t;
        renderer.background(Background::Gradient {
            top: Rgba::from_rgb8(40.0 + 10.0 * t.sin(), 10.0, 90.0),
            bottom: Rgba::from_rgb8(100.0 + 20.0 * t.cos(), 20.0, 140.0),
        });

        let audio_live = self.status == AudioStatus::Active;
        let mut total = 0.0;
        for layer in &mut self.layers {
            let report = layer.update(&ctx, &self.noise);
            total += report.activity;
            for spawn in report.spawns {
                self.particles.add_particle(spawn.position, spawn.color);
                if audio_live && self.rng.gen::<f32>() < GRAIN_NOTE_CHANCE {
                    let delay = self.rng.gen_range(300.0..800.0);
                    let velocity = map_range(spawn.speed, 0.0, 1.0, 0.08, 0.25);
                    self.harmony.schedule_note(now_ms + delay, velocity, 1.5);
                }
            }
            layer.display(renderer, t);
        }
        self.activity = if self.layers.is_empty() {
            0.0
        } else {
            total / self.layers.len() as f32
        };

        self.particles.run(&ctx, self.activity, &self.noise, renderer);

        let mut notes = 0;
        if self.status == AudioStatus::Active {
            let report = self
                .harmony
                .tick(&ctx, self.activity, &mut self.particles, &mut self.events);
            if report.connect_particles {
                self.particles.draw_constellation(renderer);
            }
            notes = self.events.len();
            self.dispatch();
        }

        let (min, max) = (self.config.particles.min_capacity, self.config.particles.max_capacity);
        let capacity = self.clock.next_capacity(self.particles.capacity(), min, max);
        if capacity != self.particles.capacity() {
            self.particles.set_capacity(capacity);
        }

        FrameStats {
            frame: ctx.frame,
            activity: self.activity,
            particles: self.particles.len(),
            capacity: self.particles.capacity(),
            notes,
            fps: self.clock.fps(),
        }
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { x, y } => {
                self.pointer = Vec2::new(x, y);
                if self.status != AudioStatus::Active {
                    self.activate_audio();
                }
            }
            InputEvent::PointerMove { x, y } => self.pointer = Vec2::new(x, y),
            InputEvent::PointerDrag { x, y, dx, dy } => {
                self.pointer = Vec2::new(x, y);
                let frame = self.ctx.frame;
                if frame % DRAG_SPAWN_PERIOD != 0 {
                    return;
                }
                let hue = ((frame * 2) % 360) as f32;
                self.particles
                    .add_particle(self.pointer, Rgba::from_hsb(hue, 80.0, 100.0, 255.0));
                if self.status == AudioStatus::Active && self.rng.gen::<f32>() < DRAG_NOTE_CHANCE {
                    let last = (self.harmony.scale().len() - 1) as f32;
                    let index = map_range(x, 0.0, self.ctx.width(), 0.0, last).floor().clamp(0.0, last) as usize;
                    let velocity = map_range(dx.abs() + dy.abs(), 0.0, 50.0, 0.1, 0.3) * 0.8;
                    self.harmony
                        .play_degree(index, velocity, NoteDuration::Sixteenth, &mut self.events);
                    self.dispatch();
                }
            }
            InputEvent::Key(' ') => {
                let center = self.ctx.viewport.center();
                for i in 0..SPACE_BURST {
                    let angle = TAU * i as f32 / SPACE_BURST as f32;
                    let r = self.rng.gen_range(50.0..150.0);
                    let hue = map_range(i as f32, 0.0, SPACE_BURST as f32, 0.0, 360.0);
                    self.particles
                        .add_particle(center + from_angle(angle) * r, Rgba::from_hsb(hue, 70.0, 100.0, 255.0));
                }
                if self.status == AudioStatus::Active {
                    self.harmony.play_chord(self.ctx.now_ms, &mut self.events);
                    self.dispatch();
                }
            }
            InputEvent::Key('c') => {
                debug!("[sketch] clearing {} particles", self.particles.len());
                self.particles.clear_particles();
            }
            InputEvent::Key('a') => {
                let slot = self.particles.request_attractor(self.pointer, USER_ATTRACTOR_CAP, 0.5);
                debug!("[sketch] attractor {slot:?}");
            }
            InputEvent::Key(_) => {}
            InputEvent::Resize { width, height } => {
                let viewport = Viewport::new(width, height);
                self.clock.resize(viewport);
                self.ctx.viewport = viewport;
            }
        }
    }

    /// End the session: invalidate deferred notes, silence and release the
    /// sound engine. Returns the engine so the host decides its fate.
    pub fn stop(&mut self) -> Option<S> {
        self.session += 1;
        self.harmony.reset(self.session);
        self.events.clear();
        self.status = AudioStatus::Dormant;
        let mut audio = self.audio.take();
        if let Some(engine) = audio.as_mut() {
            engine.stop_all();
        }
        info!("[sketch] stopped; now session {}", self.session);
        audio
    }

    /// Rebuild the world for a fresh session, keeping the sound engine (if any).
    pub fn restart(&mut self, now_ms: f64) {
        self.session += 1;
        if let Some(engine) = self.audio.as_mut() {
            engine.stop_all();
        }
        let viewport = self.clock.viewport();
        let world = World::build(&self.config, viewport, self.session);
        self.noise = world.noise;
        self.layers = world.layers;
        self.particles = world.particles;
        self.harmony = world.harmony;
        self.rng = world.rng;
        self.clock = SimulationClock::new(self.config.clock.clone(), viewport);
        self.ctx = SimulationContext::new(viewport);
        self.ctx.now_ms = now_ms;
        self.events.clear();
        self.activity = 0.0;
        if self.status != AudioStatus::Active {
            self.status = AudioStatus::Dormant;
        }
        info!("[sketch] restarted as session {}", self.session);
    }

    fn activate_audio(&mut self) {
        let Some(engine) = self.audio.as_mut() else {
            debug!("[audio] no engine attached");
            return;
        };
        match engine.activate() {
            Ok(()) => {
                info!("[audio] active");
                self.status = AudioStatus::Active;
            }
            Err(e) => {
                warn!("[audio] {e}; continuing without sound");
                self.status = AudioStatus::Failed(e.to_string());
            }
        }
    }

    fn dispatch(&mut self) {
        let Some(engine) = self.audio.as_mut() else {
            self.events.clear();
            return;
        };
        for event in self.events.drain(..) {
            match engine.play(&event) {
                Ok(()) => {}
                Err(AudioError::MissingVoice(voice)) => {
                    debug!("[audio] no {} voice, note dropped", voice.name());
                }
                Err(e) if e.is_fatal() => {
                    warn!("[audio] {e}; audio disabled until the next gesture");
                    self.status = AudioStatus::Failed(e.to_string());
                    break;
                }
                Err(e) => debug!("[audio] {e}"),
            }
        }
        self.events.clear();
    }
}

/// Everything seeded per session.
struct World {
    noise: ValueNoise,
    layers: Vec<Layer>,
    particles: ParticleSystem,
    harmony: HarmonyEngine,
    rng: StdRng,
}

impl World {
    fn build(config: &SketchConfig, viewport: Viewport, session: u64) -> Self {
        let seed = config.seed;
        let count = config.layers.count;
        let layers = (0..count)
            .map(|i| {
                Layer::new(
                    i,
                    count,
                    config.layers.grains_per_layer,
                    &viewport,
                    stream_seed(seed, STREAM_LAYERS + i as u64),
                )
            })
            .collect();
        let mut particles =
            ParticleSystem::new(&config.particles, &viewport, stream_seed(seed, STREAM_PARTICLES));
        if config.particles.seed_pattern {
            particles.seed_pattern(&viewport);
        }
        Self {
            noise: ValueNoise::new(stream_seed(seed, STREAM_NOISE)),
            layers,
            particles,
            harmony: HarmonyEngine::new(config.harmony.clone(), stream_seed(seed, STREAM_HARMONY), session),
            rng: StdRng::seed_from_u64(stream_seed(seed, STREAM_SKETCH)),
        }
    }
}
