//! Sample-accurate additive synth shared by the output stream.
//!
//! Notes are placed on a sample clock so `delay_sec` offsets land exactly,
//! independent of how often the host pushes events.

use sandsong_core::{NoteDuration, Voice};
use std::f32::consts::TAU;

/// Attack/decay/release in seconds, sustain as a fraction of peak.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    /// Gain at `t` seconds into a note held for `hold` seconds.
    pub fn level(&self, t: f32, hold: f32) -> f32 {
        let attack_end = self.attack.min(hold * 0.5);
        let decay_end = (self.attack + self.decay).min(hold).max(attack_end);
        let hold_end = hold.max(decay_end);
        if t < 0.0 {
            0.0
        } else if t < attack_end {
            t / attack_end
        } else if t < decay_end {
            let k = (t - attack_end) / (decay_end - attack_end);
            1.0 + (self.sustain - 1.0) * k
        } else if t < hold_end {
            self.sustain
        } else if t < hold_end + self.release {
            self.sustain * (1.0 - (t - hold_end) / self.release)
        } else {
            0.0
        }
    }

    /// Total audible length, release included.
    pub fn span(&self, hold: f32) -> f32 {
        let attack_end = self.attack.min(hold * 0.5);
        let decay_end = (self.attack + self.decay).min(hold).max(attack_end);
        hold.max(decay_end) + self.release
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Patch {
    pub partials: &'static [f32],
    pub envelope: Envelope,
    pub volume_db: f32,
}

pub fn patch(voice: Voice) -> Patch {
    match voice {
        Voice::Melody => Patch {
            partials: &[1.0],
            envelope: Envelope {
                attack: 0.05,
                decay: 0.2,
                sustain: 0.6,
                release: 0.8,
            },
            volume_db: -6.0,
        },
        Voice::Harmony => Patch {
            partials: &[1.0, 0.5, 0.3],
            envelope: Envelope {
                attack: 0.1,
                decay: 0.3,
                sustain: 0.5,
                release: 1.0,
            },
            volume_db: -10.0,
        },
        Voice::Bass => Patch {
            partials: &[1.0, 0.3, 0.1],
            envelope: Envelope {
                attack: 0.08,
                decay: 0.3,
                sustain: 0.7,
                release: 1.2,
            },
            volume_db: -7.0,
        },
    }
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

const MASTER_DB: f32 = -15.0;

struct Tone {
    start: u64,
    hold: f32,
    span: f32,
    phase: f32,
    phase_inc: f32,
    peak: f32,
    patch: Patch,
}

impl Tone {
    fn sample(&self) -> f32 {
        let mut sum = 0.0;
        let mut norm = 0.0;
        for (k, w) in self.patch.partials.iter().enumerate() {
            sum += w * (self.phase * (k + 1) as f32).sin();
            norm += w;
        }
        if norm > 0.0 {
            sum / norm
        } else {
            0.0
        }
    }
}

pub struct Mixer {
    sample_rate: f32,
    bpm: f32,
    clock: u64,
    master: f32,
    tones: Vec<Tone>,
}

impl Mixer {
    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            bpm,
            clock: 0,
            master: db_to_gain(MASTER_DB),
            tones: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Samples rendered so far.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Notes scheduled or still ringing.
    pub fn sounding(&self) -> usize {
        self.tones.len()
    }

    /// Queue a note `delay_sec` after the current sample. Returns `false` for
    /// pitches that cannot be rendered.
    pub fn schedule(
        &mut self,
        voice: Voice,
        frequency_hz: f32,
        duration: NoteDuration,
        velocity: f32,
        delay_sec: f32,
    ) -> bool {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return false;
        }
        let patch = patch(voice);
        let hold = duration.seconds(self.bpm);
        let delay = if delay_sec.is_finite() { delay_sec.max(0.0) } else { 0.0 };
        let velocity = if velocity.is_finite() { velocity.clamp(0.0, 1.0) } else { 0.0 };
        self.tones.push(Tone {
            start: self.clock + (delay * self.sample_rate) as u64,
            hold,
            span: patch.envelope.span(hold),
            phase: 0.0,
            phase_inc: TAU * frequency_hz / self.sample_rate,
            peak: velocity * db_to_gain(patch.volume_db),
            patch,
        });
        true
    }

    /// Render one mono sample and advance the clock.
    pub fn next_sample(&mut self) -> f32 {
        let clock = self.clock;
        let rate = self.sample_rate;
        let mut mix = 0.0;
        self.tones.retain_mut(|tone| {
            if clock < tone.start {
                return true;
            }
            let t = (clock - tone.start) as f32 / rate;
            if t >= tone.span {
                return false;
            }
            mix += tone.sample() * tone.patch.envelope.level(t, tone.hold) * tone.peak;
            tone.phase += tone.phase_inc;
            if tone.phase > TAU {
                tone.phase -= TAU;
            }
            true
        });
        self.clock += 1;
        (mix * self.master).tanh()
    }

    /// Drop every note, sounding or pending. Returns how many were cut.
    pub fn silence(&mut self) -> usize {
        let n = self.tones.len();
        self.tones.clear();
        n
    }
}
