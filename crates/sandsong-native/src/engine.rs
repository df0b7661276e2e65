use crate::synth::Mixer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use sandsong_core::{AudioError, NoteDuration, SoundEngine, Voice};
use std::sync::{Arc, Mutex};

/// Notes accepted per voice, in [`Voice::ALL`] order, and `stop_all` calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub per_voice: [usize; 3],
    pub stops: usize,
}

impl Tally {
    fn note(&mut self, voice: Voice) {
        let slot = Voice::ALL.iter().position(|v| *v == voice).unwrap_or(0);
        self.per_voice[slot] += 1;
    }

    pub fn total(&self) -> usize {
        self.per_voice.iter().sum()
    }
}

/// Sound engine that logs every note instead of playing it.
#[derive(Debug, Default)]
pub struct LogEngine {
    tally: Tally,
}

impl SoundEngine for LogEngine {
    fn activate(&mut self) -> Result<(), AudioError> {
        log::info!("[audio] headless engine active");
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
        self.tally.note(voice);
        log::debug!(
            "[audio] {} {:.2} Hz {:?} vel={:.2} +{:.3}s",
            voice.name(),
            frequency_hz,
            duration,
            velocity,
            delay_sec
        );
        Ok(())
    }

    fn stop_all(&mut self) {
        self.tally.stops += 1;
    }
}

struct Output {
    // Dropping the stream closes the device.
    _stream: cpal::Stream,
    mixer: Arc<Mutex<Mixer>>,
}

/// Plays notes through the default output device. The stream opens on the
/// first activation.
pub struct CpalEngine {
    bpm: f32,
    output: Option<Output>,
    tally: Tally,
}

impl CpalEngine {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm,
            output: None,
            tally: Tally::default(),
        }
    }

    /// Notes still ringing or waiting for their offset.
    pub fn sounding(&self) -> usize {
        self.output
            .as_ref()
            .and_then(|o| o.mixer.lock().ok().map(|m| m.sounding()))
            .unwrap_or(0)
    }
}

fn open_output(bpm: f32) -> Result<Output, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::Activation("no default output device".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::Activation(e.to_string()))?;
    let sample_rate = supported.sample_rate().0 as f32;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.config();
    let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate, bpm)));

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, Arc::clone(&mixer)),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, Arc::clone(&mixer)),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, Arc::clone(&mixer)),
        other => {
            return Err(AudioError::Activation(format!("unsupported sample format {other:?}")));
        }
    }
    .map_err(|e| AudioError::Activation(e.to_string()))?;
    stream
        .play()
        .map_err(|e| AudioError::Activation(e.to_string()))?;
    log::info!("[audio] output stream at {sample_rate} Hz, {channels} channels");
    Ok(Output {
        _stream: stream,
        mixer,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let Ok(mut mixer) = mixer.lock() else {
                data.fill(T::EQUILIBRIUM);
                return;
            };
            for frame in data.chunks_mut(channels.max(1)) {
                frame.fill(T::from_sample(mixer.next_sample()));
            }
        },
        |err| log::error!("[audio] stream error: {err}"),
        None,
    )
}

impl SoundEngine for CpalEngine {
    fn activate(&mut self) -> Result<(), AudioError> {
        if self.output.is_none() {
            self.output = Some(open_output(self.bpm)?);
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
        let output = self.output.as_ref().ok_or(AudioError::Inactive)?;
        let mut mixer = output
            .mixer
            .lock()
            .map_err(|_| AudioError::Backend("mixer lock poisoned".into()))?;
        if mixer.schedule(voice, frequency_hz, duration, velocity, delay_sec) {
            self.tally.note(voice);
        } else {
            log::warn!("[audio] dropped {} note at {frequency_hz} Hz", voice.name());
        }
        Ok(())
    }

    fn stop_all(&mut self) {
        self.tally.stops += 1;
        let Some(output) = self.output.as_ref() else { return };
        if let Ok(mut mixer) = output.mixer.lock() {
            let count = mixer.silence();
            if count > 0 {
                log::info!("[audio] silenced {count} voices");
            }
        }
    }
}

/// Output device when one opens, otherwise the log engine.
pub enum NativeEngine {
    Device(CpalEngine),
    Log(LogEngine),
}

impl NativeEngine {
    /// Try the default output device first and fall back to logging.
    pub fn open(bpm: f32) -> Self {
        let mut device = CpalEngine::new(bpm);
        match device.activate() {
            Ok(()) => NativeEngine::Device(device),
            Err(e) => {
                log::warn!("[audio] {e}; falling back to the log engine");
                NativeEngine::Log(LogEngine::default())
            }
        }
    }

    pub fn tally(&self) -> Tally {
        match self {
            NativeEngine::Device(e) => e.tally,
            NativeEngine::Log(e) => e.tally,
        }
    }

    pub fn is_device(&self) -> bool {
        matches!(self, NativeEngine::Device(_))
    }

    pub fn sounding(&self) -> usize {
        match self {
            NativeEngine::Device(e) => e.sounding(),
            NativeEngine::Log(_) => 0,
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        NativeEngine::Log(LogEngine::default())
    }
}

impl SoundEngine for NativeEngine {
    fn activate(&mut self) -> Result<(), AudioError> {
        match self {
            NativeEngine::Device(e) => e.activate(),
            NativeEngine::Log(e) => e.activate(),
        }
    }

    fn trigger_note(
        &mut self,
        voice: Voice,
        frequency_hz: f32,
        duration: NoteDuration,
        velocity: f32,
        delay_sec: f32,
    ) -> Result<(), AudioError> {
        match self {
            NativeEngine::Device(e) => e.trigger_note(voice, frequency_hz, duration, velocity, delay_sec),
            NativeEngine::Log(e) => e.trigger_note(voice, frequency_hz, duration, velocity, delay_sec),
        }
    }

    fn stop_all(&mut self) {
        match self {
            NativeEngine::Device(e) => e.stop_all(),
            NativeEngine::Log(e) => e.stop_all(),
        }
    }
}
