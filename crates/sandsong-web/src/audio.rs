use fnv::FnvHashMap;
use sandsong_core::{AudioError, NoteDuration, SoundEngine, Voice};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys as web;

/// Attack/decay/release in seconds, sustain as a fraction of peak.
#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
}

/// How one named voice sounds: additive sine partials, envelope and level.
#[derive(Clone, Debug)]
pub struct VoicePatch {
    pub partials: Vec<f32>,
    pub envelope: Envelope,
    pub volume_db: f32,
}

pub fn default_patches() -> FnvHashMap<Voice, VoicePatch> {
    let mut patches = FnvHashMap::default();
    patches.insert(
        Voice::Melody,
        VoicePatch {
            partials: vec![1.0],
            envelope: Envelope {
                attack: 0.05,
                decay: 0.2,
                sustain: 0.6,
                release: 0.8,
            },
            volume_db: -6.0,
        },
    );
    patches.insert(
        Voice::Harmony,
        VoicePatch {
            partials: vec![1.0, 0.5, 0.3],
            envelope: Envelope {
                attack: 0.1,
                decay: 0.3,
                sustain: 0.5,
                release: 1.0,
            },
            volume_db: -10.0,
        },
    );
    patches.insert(
        Voice::Bass,
        VoicePatch {
            partials: vec![1.0, 0.3, 0.1],
            envelope: Envelope {
                attack: 0.08,
                decay: 0.3,
                sustain: 0.7,
                release: 1.2,
            },
            volume_db: -7.0,
        },
    );
    patches
}

#[inline]
fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

struct AudioGraph {
    ctx: web::AudioContext,
    input: web::GainNode,
    waves: FnvHashMap<Voice, web::PeriodicWave>,
}

struct Sounding {
    osc: web::OscillatorNode,
    ends_at: f64,
}

/// WebAudio-backed [`SoundEngine`]. The context and effect chain are built
/// lazily on the first activation, which must happen inside a user gesture.
pub struct WebAudioEngine {
    bpm: f32,
    patches: FnvHashMap<Voice, VoicePatch>,
    graph: Option<AudioGraph>,
    sounding: Vec<Sounding>,
}

impl WebAudioEngine {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm,
            patches: default_patches(),
            graph: None,
            sounding: Vec::new(),
        }
    }

    fn prune(&mut self, now: f64) {
        self.sounding.retain(|s| s.ends_at > now);
    }
}

fn backend(label: &str, e: wasm_bindgen::JsValue) -> AudioError {
    AudioError::Backend(format!("{label}: {e:?}"))
}

fn create_gain(ctx: &web::AudioContext, value: f32, label: &str) -> Result<web::GainNode, AudioError> {
    let g = web::GainNode::new(ctx).map_err(|e| backend(label, e))?;
    g.gain().set_value(value);
    Ok(g)
}

fn create_compressor(
    ctx: &web::AudioContext,
    threshold: f32,
    ratio: f32,
    attack: f32,
    release: f32,
) -> Result<web::DynamicsCompressorNode, AudioError> {
    let c = web::DynamicsCompressorNode::new(ctx).map_err(|e| backend("compressor", e))?;
    c.threshold().set_value(threshold);
    c.ratio().set_value(ratio);
    c.attack().set_value(attack);
    c.release().set_value(release);
    Ok(c)
}

/// Stereo noise burst with an exponential tail, delayed by `pre_delay`.
fn build_impulse(ctx: &web::AudioContext, decay: f32, pre_delay: f32) -> Result<web::AudioBuffer, AudioError> {
    let sr = ctx.sample_rate();
    let len = (sr * (decay + pre_delay)) as u32;
    let ir = ctx
        .create_buffer(2, len.max(1), sr)
        .map_err(|e| backend("impulse buffer", e))?;
    // xorshift32, one seed per channel
    let mut seeds: [u32; 2] = [0x5A4D_2C11, 0x1F2E_3D4C];
    let dt = 1.0 / sr;
    for (ch, seed) in seeds.iter_mut().enumerate() {
        let mut buf = vec![0.0f32; len as usize];
        for (i, v) in buf.iter_mut().enumerate() {
            let t = i as f32 * dt - pre_delay;
            if t < 0.0 {
                continue;
            }
            let mut x = *seed;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            *seed = x;
            let n = (x as f32 / u32::MAX as f32) * 2.0 - 1.0;
            *v = n * (-t * 3.0 / decay).exp();
        }
        ir.copy_to_channel(&mut buf, ch as i32)
            .map_err(|e| backend("impulse copy", e))?;
    }
    Ok(ir)
}

fn build_wave(ctx: &web::AudioContext, partials: &[f32]) -> Result<web::PeriodicWave, AudioError> {
    let mut real = vec![0.0f32; partials.len() + 1];
    let mut imag = Vec::with_capacity(partials.len() + 1);
    imag.push(0.0);
    imag.extend_from_slice(partials);
    ctx.create_periodic_wave(&mut real, &mut imag)
        .map_err(|e| backend("periodic wave", e))
}

/// voices -> compressor -> limiter -> reverb (wet/dry) -> master -> destination
fn build_graph(patches: &FnvHashMap<Voice, VoicePatch>) -> Result<AudioGraph, AudioError> {
    let ctx = web::AudioContext::new().map_err(|e| AudioError::Activation(format!("{e:?}")))?;

    let input = create_gain(&ctx, 1.0, "voice bus")?;
    let compressor = create_compressor(&ctx, -24.0, 3.0, 0.01, 0.1)?;
    let limiter = create_compressor(&ctx, -2.0, 20.0, 0.001, 0.05)?;

    let reverb = web::ConvolverNode::new(&ctx).map_err(|e| backend("convolver", e))?;
    reverb.set_normalize(true);
    reverb.set_buffer(Some(&build_impulse(&ctx, 3.0, 0.05)?));
    let wet = create_gain(&ctx, 0.5, "reverb wet")?;
    let dry = create_gain(&ctx, 0.5, "reverb dry")?;

    let master = create_gain(&ctx, db_to_gain(-40.0), "master")?;
    let t = ctx.current_time();
    let _ = master.gain().set_value_at_time(db_to_gain(-40.0), t);
    let _ = master.gain().linear_ramp_to_value_at_time(db_to_gain(-15.0), t + 1.0);

    let route = |from: &web::AudioNode, to: &web::AudioNode| {
        from.connect_with_audio_node(to)
            .map(|_| ())
            .map_err(|e| backend("connect", e))
    };
    route(&input, &compressor)?;
    route(&compressor, &limiter)?;
    route(&limiter, &reverb)?;
    route(&limiter, &dry)?;
    route(&reverb, &wet)?;
    route(&wet, &master)?;
    route(&dry, &master)?;
    route(&master, &ctx.destination())?;

    let mut waves = FnvHashMap::default();
    for (voice, patch) in patches {
        waves.insert(*voice, build_wave(&ctx, &patch.partials)?);
    }
    log::info!("[audio] graph ready at {} Hz", ctx.sample_rate());
    Ok(AudioGraph { ctx, input, waves })
}

impl SoundEngine for WebAudioEngine {
    fn activate(&mut self) -> Result<(), AudioError> {
        if self.graph.is_none() {
            self.graph = Some(build_graph(&self.patches)?);
        }
        let Some(graph) = self.graph.as_ref() else {
            return Err(AudioError::Inactive);
        };
        if graph.ctx.state() != web::AudioContextState::Running {
            let promise = graph
                .ctx
                .resume()
                .map_err(|e| AudioError::Activation(format!("{e:?}")))?;
            spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    log::warn!("[audio] resume rejected: {:?}", e);
                }
            });
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
        let graph = self.graph.as_ref().ok_or(AudioError::Inactive)?;
        let patch = self.patches.get(&voice).ok_or(AudioError::MissingVoice(voice))?;
        let wave = graph.waves.get(&voice).ok_or(AudioError::MissingVoice(voice))?;
        let ctx = &graph.ctx;

        let osc = web::OscillatorNode::new(ctx).map_err(|e| backend("oscillator", e))?;
        osc.set_periodic_wave(wave);
        osc.frequency().set_value(frequency_hz);
        let amp = create_gain(ctx, 0.0, "note")?;

        let env = patch.envelope;
        let peak = velocity.clamp(0.0, 1.0) * db_to_gain(patch.volume_db);
        let dur = duration.seconds(self.bpm) as f64;
        let t0 = ctx.current_time() + delay_sec.max(0.0) as f64;
        let attack_end = env.attack.min(dur * 0.5);
        let decay_end = (env.attack + env.decay).min(dur).max(attack_end);
        let hold_end = dur.max(decay_end);
        let ends_at = t0 + hold_end + env.release;

        let g = amp.gain();
        let _ = g.set_value_at_time(0.0, t0);
        let _ = g.linear_ramp_to_value_at_time(peak, t0 + attack_end);
        let _ = g.linear_ramp_to_value_at_time(peak * env.sustain, t0 + decay_end);
        let _ = g.set_value_at_time(peak * env.sustain, t0 + hold_end);
        let _ = g.linear_ramp_to_value_at_time(0.0, ends_at);

        osc.connect_with_audio_node(&amp)
            .map_err(|e| backend("connect", e))?;
        amp.connect_with_audio_node(&graph.input)
            .map_err(|e| backend("connect", e))?;
        osc.start_with_when(t0).map_err(|e| backend("start", e))?;
        osc.stop_with_when(ends_at + 0.02)
            .map_err(|e| backend("stop", e))?;

        let now = ctx.current_time();
        self.prune(now);
        self.sounding.push(Sounding { osc, ends_at });
        Ok(())
    }

    fn stop_all(&mut self) {
        let count = self.sounding.len();
        for s in self.sounding.drain(..) {
            let _ = s.osc.stop_with_when(0.0);
        }
        if count > 0 {
            log::info!("[audio] silenced {count} voices");
        }
    }
}

impl Drop for WebAudioEngine {
    fn drop(&mut self) {
        if let Some(graph) = self.graph.take() {
            if let Err(e) = graph.ctx.close() {
                log::warn!("[audio] close failed: {:?}", e);
            }
        }
    }
}
