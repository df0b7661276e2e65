use super::scale::{HarmonyError, Mode, Scale};
use super::schedule::{DeferredAction, DeferredQueue};
use crate::audio::{NoteDuration, NoteEvent, Voice};
use crate::color::Rgba;
use crate::config::HarmonyParams;
use crate::constants::*;
use crate::context::SimulationContext;
use crate::particles::ParticleSystem;
use crate::vector::{lerp, map_range, VecExt};
use glam::Vec2;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Natural roots C4..B4 in Hz.
pub const ROOTS: [f32; 7] = [261.63, 293.66, 329.63, 349.23, 392.00, 440.00, 493.88];

/// Circle-of-fifths walk over `ROOTS`: C, G, A, E, B, D, F.
pub const CIRCLE_OF_FIFTHS: [usize; 7] = [0, 4, 5, 2, 6, 1, 3];

/// Root for a gravity heading: the full turn is split into seven equal
/// sectors, sector 0 starting at heading 0.
pub fn root_for_heading(heading: f32) -> f32 {
    let heading = if heading.is_finite() { heading } else { 0.0 };
    let sector = (heading.rem_euclid(TAU) / TAU * 7.0).floor() as usize;
    ROOTS[CIRCLE_OF_FIFTHS[sector.min(6)]]
}

/// `ROOTS` position of `root` mapped to `[0, 1]`; unknown roots map to 0.
fn root_position(root: f32) -> f32 {
    ROOTS
        .iter()
        .position(|r| (r - root).abs() < 0.01)
        .map(|i| i as f32 / (ROOTS.len() - 1) as f32)
        .unwrap_or(0.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayedNote {
    pub degree: usize,
    pub frequency_hz: f32,
    pub velocity: f32,
    pub duration: NoteDuration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoteOutcome {
    Played(PlayedNote),
    /// Refused: the previous note was too recent.
    TooSoon,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootChange {
    pub old_root: f32,
    pub new_root: f32,
    pub mode: Mode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    pub root_change: Option<RootChange>,
    /// Melody notes that passed the spacing gate this tick.
    pub notes_played: usize,
    /// A particle-driven note asked for constellation lines.
    pub connect_particles: bool,
}

/// Turns simulation state into notes.
///
/// The engine never talks to audio directly: every note is pushed onto the
/// caller's `out` buffer as a [`NoteEvent`], with a start offset for notes
/// that should sound slightly later.
pub struct HarmonyEngine {
    params: HarmonyParams,
    scale: Scale,
    last_valid_root: f32,
    last_note_ms: Option<f64>,
    spacing_ms: f64,
    activity: f32,
    queue: DeferredQueue,
    rng: StdRng,
}

impl HarmonyEngine {
    pub fn new(params: HarmonyParams, seed: u64, session: u64) -> Self {
        let scale = Scale::with_fallback(params.root_hz, params.mode, DEFAULT_ROOT_HZ);
        Self {
            last_valid_root: scale.root(),
            spacing_ms: params.initial_spacing_ms,
            scale,
            params,
            last_note_ms: None,
            activity: 0.0,
            queue: DeferredQueue::new(session),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn root(&self) -> f32 {
        self.scale.root()
    }

    pub fn mode(&self) -> Mode {
        self.scale.mode()
    }

    pub fn spacing_ms(&self) -> f64 {
        self.spacing_ms
    }

    /// Minimum gap between melody notes, in milliseconds.
    pub fn set_spacing_ms(&mut self, spacing_ms: f64) {
        self.spacing_ms = spacing_ms.max(0.0);
    }

    pub fn activity(&self) -> f32 {
        self.activity
    }

    pub fn last_note_ms(&self) -> Option<f64> {
        self.last_note_ms
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn session(&self) -> u64 {
        self.queue.session()
    }

    /// Start over for a new session: default key, no note history, empty queue.
    pub fn reset(&mut self, session: u64) {
        self.scale = Scale::with_fallback(self.params.root_hz, self.params.mode, DEFAULT_ROOT_HZ);
        self.last_valid_root = self.scale.root();
        self.last_note_ms = None;
        self.spacing_ms = self.params.initial_spacing_ms;
        self.activity = 0.0;
        self.queue.set_session(session);
    }

    /// Drop every deferred note without changing session.
    pub fn cancel_pending(&mut self) {
        if !self.queue.is_empty() {
            debug!("[harmony] cancelling {} deferred actions", self.queue.len());
        }
        self.queue.clear();
    }

    pub fn set_root(&mut self, root_hz: f32) -> Result<(), HarmonyError> {
        self.scale = Scale::new(root_hz, self.scale.mode())?;
        self.last_valid_root = root_hz;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), HarmonyError> {
        self.scale = Scale::new(self.scale.root(), mode)?;
        Ok(())
    }

    /// Queue a melody note for `fire_at_ms`. It still has to clear
    /// `spacing × spacing_factor` when it fires.
    pub fn schedule_note(&mut self, fire_at_ms: f64, velocity: f32, spacing_factor: f64) {
        self.queue.push(
            fire_at_ms,
            DeferredAction::PlayNote {
                velocity,
                spacing_factor,
            },
        );
    }

    /// One frame of the harmony clock.
    ///
    /// Smooths activity, releases due deferred notes, changes key on
    /// schedule, plays the beat, lets busy particle fields add notes and
    /// finally retunes the note spacing.
    pub fn tick(
        &mut self,
        ctx: &SimulationContext,
        activity: f32,
        particles: &mut ParticleSystem,
        out: &mut Vec<NoteEvent>,
    ) -> TickReport {
        let mut report = TickReport::default();
        let now = ctx.now_ms;
        self.activity = lerp(self.activity, activity.clamp(0.1, 0.9), 0.05);
        let a = self.activity;

        for due in self.queue.drain_due(now, LOOKAHEAD_MS) {
            match due.action {
                DeferredAction::PlayNote {
                    velocity,
                    spacing_factor,
                } => {
                    let clear = self
                        .last_note_ms
                        .map_or(true, |last| now - last > self.spacing_ms * spacing_factor);
                    if clear {
                        if let NoteOutcome::Played(_) = self.play_note(ctx, velocity, particles, out) {
                            report.notes_played += 1;
                        }
                    }
                }
                DeferredAction::Trigger(event) => {
                    let lead_sec = ((due.fire_at_ms - now).max(0.0) / 1000.0) as f32;
                    out.push(NoteEvent {
                        start_offset_sec: event.start_offset_sec + lead_sec,
                        ..event
                    });
                }
            }
        }

        let frame = ctx.frame;
        let turbulent = ctx.gravity.length() > self.params.turbulence_threshold;
        if frame % self.params.root_change_period.max(1) == 0
            || (turbulent && frame % self.params.turbulent_root_change_period.max(1) == 0)
        {
            report.root_change = self.change_root(ctx.gravity.heading(), particles.len(), now, out);
            if self.rng.gen::<f32>() < 0.7 {
                let n = root_position(self.scale.root());
                let pos = Vec2::new(
                    map_range(n, 0.0, 1.0, 0.2 * ctx.width(), 0.8 * ctx.width()),
                    map_range(n, 0.0, 1.0, 0.2 * ctx.height(), 0.8 * ctx.height()),
                );
                particles.request_attractor(pos, HARMONY_ATTRACTOR_CAP, 0.3);
            }
        }

        let frames_per_beat = self.params.frames_per_beat.max(1);
        if frame % frames_per_beat == 0 {
            let beat = (frame / frames_per_beat) % self.params.beats_per_measure.max(1);
            let color = self.palette_color();
            match beat {
                0 => {
                    if self.rng.gen::<f32>() < 0.7 {
                        let delay = self.rng.gen_range(30.0..100.0);
                        self.schedule_note(now + delay, map_range(a, 0.0, 1.0, 0.2, 0.4), 1.0);
                        let pos = ctx.viewport.center()
                            + Vec2::new(self.rng.gen_range(-50.0..50.0), self.rng.gen_range(-50.0..50.0));
                        let count = self.rng.gen_range(5..15);
                        particles.add_particles_on_beat(pos, count, color);
                    }
                }
                2 => {
                    if self.rng.gen::<f32>() < 0.4 {
                        let delay = self.rng.gen_range(20.0..80.0);
                        self.schedule_note(now + delay, map_range(a, 0.0, 1.0, 0.15, 0.35), 1.0);
                        if self.rng.gen::<f32>() < 0.5 {
                            let pos = ctx.viewport.center()
                                + Vec2::new(self.rng.gen_range(-80.0..80.0), self.rng.gen_range(-80.0..80.0));
                            let count = self.rng.gen_range(3..8);
                            particles.add_particles_on_beat(pos, count, color);
                        }
                    }
                }
                _ => {
                    if self.rng.gen::<f32>() < 0.15 {
                        let delay = self.rng.gen_range(10.0..50.0);
                        self.schedule_note(now + delay, map_range(a, 0.0, 1.0, 0.1, 0.3), 1.0);
                    }
                }
            }
        }

        let n = particles.len();
        if frame % 30 == 0 && n > 0 {
            let chance = map_range(n as f32, 0.0, 50.0, 0.03, 0.1);
            if self.rng.gen::<f32>() < chance {
                let delay = self.rng.gen_range(100.0..200.0);
                self.schedule_note(now + delay, map_range(a, 0.0, 1.0, 0.15, 0.3), 1.0);
                if n > 5 && self.rng.gen::<f32>() < 0.3 {
                    report.connect_particles = true;
                }
            }
        }

        self.spacing_ms = map_range(
            a,
            0.0,
            1.0,
            self.params.spacing_slow_ms as f32,
            self.params.spacing_busy_ms as f32,
        ) as f64;
        report
    }

    /// Retune to the circle-of-fifths root for `heading`, in pentatonic when
    /// the canvas is crowded. Plays the transition chord when anything changed.
    pub fn change_root(
        &mut self,
        heading: f32,
        particle_count: usize,
        now_ms: f64,
        out: &mut Vec<NoteEvent>,
    ) -> Option<RootChange> {
        let new_root = root_for_heading(heading);
        let mode = if particle_count > PENTATONIC_POPULATION {
            Mode::Pentatonic
        } else {
            Mode::Minor
        };
        let old_root = self.scale.root();
        if (new_root - old_root).abs() < f32::EPSILON && mode == self.scale.mode() {
            return None;
        }
        self.scale = Scale::with_fallback(new_root, mode, self.last_valid_root);
        if !self.scale.is_fallback() {
            self.last_valid_root = new_root;
        }
        info!("[harmony] root {old_root:.2} -> {new_root:.2} Hz ({})", mode.name());
        self.play_transition_chord(old_root, now_ms, out);
        Some(RootChange {
            old_root,
            new_root,
            mode,
        })
    }

    /// Attempt a melody note. Refused when the previous note is closer than
    /// the current spacing.
    ///
    /// A played attempt pushes the melody trigger first, then any harmony or
    /// bass parts that fall inside the look-ahead window, so `out` may grow by
    /// more than one event. A refused attempt pushes nothing.
    pub fn play_note(
        &mut self,
        ctx: &SimulationContext,
        velocity: f32,
        particles: &mut ParticleSystem,
        out: &mut Vec<NoteEvent>,
    ) -> NoteOutcome {
        let now = ctx.now_ms;
        if let Some(last) = self.last_note_ms {
            if now - last < self.spacing_ms {
                debug!("[harmony] note refused, {:.0} ms since last", now - last);
                return NoteOutcome::TooSoon;
            }
        }

        let r: f32 = self.rng.gen();
        let degree = if r < 0.25 {
            0
        } else if r < 0.4 {
            4
        } else if r < 0.55 {
            2
        } else if r < 0.7 {
            5
        } else {
            *[1, 3, 6, 7].choose(&mut self.rng).unwrap_or(&0)
        };
        let index = self.scale.clamp_index(degree);
        let freq = self.scale.frequency(index);

        particles.notify_note(freq, velocity, &self.scale, &ctx.viewport);

        let velocity = if velocity.is_finite() { velocity.clamp(0.1, 0.6) } else { 0.1 };
        let duration = if self.activity < 0.3 {
            NoteDuration::Quarter
        } else if self.activity > 0.7 {
            NoteDuration::Sixteenth
        } else {
            NoteDuration::Eighth
        };

        out.push(NoteEvent {
            voice: Voice::Melody,
            frequency_hz: freq,
            velocity,
            duration,
            start_offset_sec: 0.0,
        });

        if self.rng.gen::<f32>() < HARMONY_CHANCE {
            let step = *self.scale.mode().harmony_steps().choose(&mut self.rng).unwrap_or(&2);
            let harmony_index = (index + step) % self.scale.len();
            self.schedule_trigger(
                now,
                HARMONY_DELAY_MS,
                NoteEvent {
                    voice: Voice::Harmony,
                    frequency_hz: self.scale.frequency(harmony_index),
                    velocity: velocity * 0.7,
                    duration,
                    start_offset_sec: 0.0,
                },
                out,
            );
        }

        if self.rng.gen::<f32>() < BASS_CHANCE {
            let bass_degree = if self.rng.gen::<bool>() { 0 } else { 4 };
            self.schedule_trigger(
                now,
                BASS_DELAY_MS,
                NoteEvent {
                    voice: Voice::Bass,
                    frequency_hz: self.scale.frequency(bass_degree) * 0.5,
                    velocity: velocity * 0.8,
                    duration,
                    start_offset_sec: 0.0,
                },
                out,
            );
        }

        if velocity > 0.15 {
            let last_index = (self.scale.len() - 1) as f32;
            let i = index as f32;
            let pos = Vec2::new(
                map_range(i, 0.0, last_index, 0.2 * ctx.width(), 0.8 * ctx.width()),
                map_range(freq, self.scale.first(), self.scale.last(), 0.8 * ctx.height(), 0.2 * ctx.height()),
            );
            let count = map_range(velocity, 0.15, 0.5, 2.0, 10.0).floor() as usize;
            let hue = map_range(i, 0.0, last_index, 0.0, 360.0);
            particles.add_particles_on_beat(pos, count, Rgba::from_hsb(hue, 80.0, 100.0, 255.0));
        }

        self.last_note_ms = Some(self.last_note_ms.map_or(now, |last| last.max(now)));
        NoteOutcome::Played(PlayedNote {
            degree: index,
            frequency_hz: freq,
            velocity,
            duration,
        })
    }

    /// Root, third, fifth and a bass root an octave down, lightly rolled.
    /// Not subject to spacing.
    pub fn play_chord(&mut self, now_ms: f64, out: &mut Vec<NoteEvent>) {
        let root = self.scale.first();
        let chord = [
            (0.0, Voice::Melody, root, 1.0),
            (50.0, Voice::Harmony, self.scale.frequency(2), 0.7),
            (100.0, Voice::Harmony, self.scale.frequency(4), 0.6),
            (20.0, Voice::Bass, root * 0.5, 0.8),
        ];
        for (offset, voice, frequency_hz, velocity) in chord {
            self.schedule_trigger(
                now_ms,
                offset,
                NoteEvent {
                    voice,
                    frequency_hz,
                    velocity,
                    duration: NoteDuration::Half,
                    start_offset_sec: 0.0,
                },
                out,
            );
        }
    }

    /// Six-note bridge from the old key into the current scale, all offsets
    /// measured from `now_ms`.
    pub fn play_transition_chord(&mut self, old_root: f32, now_ms: f64, out: &mut Vec<NoteEvent>) {
        let new_root = self.scale.root();
        let steps = [
            (0.0, Voice::Bass, new_root * 0.5, NoteDuration::Half, 0.5),
            (0.0, Voice::Melody, old_root * 1.5, NoteDuration::Quarter, 0.4),
            (50.0, Voice::Harmony, new_root, NoteDuration::Half, 0.3),
            (1000.0, Voice::Melody, self.scale.frequency(0), NoteDuration::Half, 0.5),
            (1100.0, Voice::Harmony, self.scale.frequency(4), NoteDuration::Half, 0.4),
            (1500.0, Voice::Harmony, self.scale.frequency(2), NoteDuration::Half, 0.3),
        ];
        for (offset, voice, frequency_hz, duration, velocity) in steps {
            self.schedule_trigger(
                now_ms,
                offset,
                NoteEvent {
                    voice,
                    frequency_hz,
                    velocity,
                    duration,
                    start_offset_sec: 0.0,
                },
                out,
            );
        }
    }

    /// Ungated melody tap at a scale index (clamped).
    pub fn play_degree(&mut self, index: usize, velocity: f32, duration: NoteDuration, out: &mut Vec<NoteEvent>) {
        out.push(NoteEvent {
            voice: Voice::Melody,
            frequency_hz: self.scale.frequency(index),
            velocity: velocity.clamp(0.0, 1.0),
            duration,
            start_offset_sec: 0.0,
        });
    }

    /// Notes inside the look-ahead window go out now with their offset;
    /// anything later waits in the queue.
    fn schedule_trigger(&mut self, now_ms: f64, offset_ms: f64, event: NoteEvent, out: &mut Vec<NoteEvent>) {
        if offset_ms <= LOOKAHEAD_MS {
            out.push(NoteEvent {
                start_offset_sec: (offset_ms / 1000.0) as f32,
                ..event
            });
        } else {
            self.queue.push(now_ms + offset_ms, DeferredAction::Trigger(event));
        }
    }

    fn palette_color(&self) -> Rgba {
        let hue = map_range(root_position(self.scale.root()), 0.0, 1.0, 180.0, 300.0);
        Rgba::from_hsb(hue, 60.0, 90.0, 255.0)
    }
}
