//! Sound-producing collaborator consumed by the harmony engine.

use crate::constants::DEFAULT_BPM;
use thiserror::Error;

/// Named synthesizer voices provided by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Voice {
    Melody,
    Harmony,
    Bass,
}

impl Voice {
    pub const ALL: [Voice; 3] = [Voice::Melody, Voice::Harmony, Voice::Bass];

    pub fn name(&self) -> &'static str {
        match self {
            Voice::Melody => "melody",
            Voice::Harmony => "harmony",
            Voice::Bass => "bass",
        }
    }
}

/// Musical note length token; converted to seconds by the sound engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteDuration {
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteDuration {
    /// Length in beats (quarter note = 1 beat).
    pub fn beats(&self) -> f32 {
        match self {
            NoteDuration::Half => 2.0,
            NoteDuration::Quarter => 1.0,
            NoteDuration::Eighth => 0.5,
            NoteDuration::Sixteenth => 0.25,
        }
    }

    pub fn seconds(&self, bpm: f32) -> f32 {
        let bpm = if bpm > 0.0 { bpm } else { DEFAULT_BPM };
        self.beats() * 60.0 / bpm
    }
}

/// A note ready for playback.
///
/// Fields:
/// - `voice`: which synth plays it
/// - `frequency_hz`: pitch in Hertz
/// - `velocity`: normalized loudness 0..1
/// - `duration`: length token
/// - `start_offset_sec`: delay relative to the audio clock at hand-off
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    pub voice: Voice,
    pub frequency_hz: f32,
    pub velocity: f32,
    pub duration: NoteDuration,
    pub start_offset_sec: f32,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("audio activation failed: {0}")]
    Activation(String),
    #[error("voice `{}` is not available", .0.name())]
    MissingVoice(Voice),
    #[error("audio engine is not active")]
    Inactive,
    #[error("audio backend error: {0}")]
    Backend(String),
}

impl AudioError {
    /// Errors after which the engine should be considered unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AudioError::Activation(_) | AudioError::Backend(_))
    }
}

/// Host-provided playback capability.
pub trait SoundEngine {
    /// Start (or resume) audio output. Called on a user gesture.
    fn activate(&mut self) -> Result<(), AudioError>;

    fn trigger_note(
        &mut self,
        voice: Voice,
        frequency_hz: f32,
        duration: NoteDuration,
        velocity: f32,
        delay_sec: f32,
    ) -> Result<(), AudioError>;

    /// Silence every sounding or scheduled voice.
    fn stop_all(&mut self);

    fn play(&mut self, event: &NoteEvent) -> Result<(), AudioError> {
        self.trigger_note(
            event.voice,
            event.frequency_hz,
            event.duration,
            event.velocity,
            event.start_offset_sec,
        )
    }
}

/// Engine that accepts everything and plays nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentEngine;

impl SoundEngine for SilentEngine {
    fn activate(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn trigger_note(
        &mut self,
        _voice: Voice,
        _frequency_hz: f32,
        _duration: NoteDuration,
        _velocity: f32,
        _delay_sec: f32,
    ) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop_all(&mut self) {}
}

/// Engine that keeps every accepted note; optionally lacks voices or fails
/// activation, for exercising the degradation paths.
#[derive(Clone, Debug, Default)]
pub struct RecordingEngine {
    pub played: Vec<NoteEvent>,
    pub missing: Vec<Voice>,
    pub fail_activation: bool,
    pub activations: u32,
    pub stops: u32,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, voice: Voice) -> usize {
        self.played.iter().filter(|e| e.voice == voice).count()
    }
}

impl SoundEngine for RecordingEngine {
    fn activate(&mut self) -> Result<(), AudioError> {
        self.activations += 1;
        if self.fail_activation {
            return Err(AudioError::Activation("activation refused".into()));
        }
        Ok(())
    }

    fn trigger_note(
        &mut self,
        voice: Voice,
        frequency_hz: f32,
        duration: NoteDuration,
        velocity: f32,
        delay_sec: f32,
    ) -> Result<(), AudioError> {
        if self.missing.contains(&voice) {
            return Err(AudioError::MissingVoice(voice));
        }
        self.played.push(NoteEvent {
            voice,
            frequency_hz,
            velocity,
            duration,
            start_offset_sec: delay_sec,
        });
        Ok(())
    }

    fn stop_all(&mut self) {
        self.stops += 1;
    }
}
