use crate::constants::*;
use crate::harmony::Mode;

/// Sand layer population.
///
/// Both counts are fixed for the lifetime of a session.
#[derive(Clone, Debug)]
pub struct LayerParams {
    pub count: usize,
    pub grains_per_layer: usize,
}

impl Default for LayerParams {
    fn default() -> Self {
        Self {
            count: DEFAULT_LAYER_COUNT,
            grains_per_layer: DEFAULT_GRAINS_PER_LAYER,
        }
    }
}

/// Particle system limits.
///
/// - `capacity` is the starting live-particle cap
/// - `min_capacity`/`max_capacity` bound the load-shedding controller
/// - `emitter_cap` bounds concurrently live emitters
/// - `seed_pattern` fills the canvas with the opening ring, edge particles and emitters
#[derive(Clone, Debug)]
pub struct ParticleParams {
    pub capacity: usize,
    pub min_capacity: usize,
    pub max_capacity: usize,
    pub emitter_cap: usize,
    pub initial_attractors: usize,
    pub seed_pattern: bool,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            capacity: PARTICLE_CAPACITY,
            min_capacity: PARTICLE_CAPACITY_MIN,
            max_capacity: PARTICLE_CAPACITY_MAX,
            emitter_cap: EMITTER_CAP,
            initial_attractors: INITIAL_ATTRACTORS,
            seed_pattern: true,
        }
    }
}

/// Harmony engine parameters controlling tempo, key and note density.
///
/// - `root_hz`/`mode` set the starting key
/// - `frames_per_beat` and `beats_per_measure` define the frame-driven beat clock
/// - `spacing_slow_ms`/`spacing_busy_ms` are the minimum gaps between notes at
///   activity 0 and 1
/// - `turbulence_threshold` is the gravity magnitude that unlocks faster key changes
/// - `bpm` converts duration tokens to seconds
#[derive(Clone, Debug)]
pub struct HarmonyParams {
    pub root_hz: f32,
    pub mode: Mode,
    pub frames_per_beat: u64,
    pub beats_per_measure: u64,
    pub root_change_period: u64,
    pub turbulent_root_change_period: u64,
    pub turbulence_threshold: f32,
    pub spacing_slow_ms: f64,
    pub spacing_busy_ms: f64,
    pub initial_spacing_ms: f64,
    pub bpm: f32,
}

impl Default for HarmonyParams {
    fn default() -> Self {
        Self {
            root_hz: DEFAULT_ROOT_HZ,
            mode: Mode::Minor,
            frames_per_beat: FRAMES_PER_BEAT,
            beats_per_measure: BEATS_PER_MEASURE,
            root_change_period: ROOT_CHANGE_PERIOD,
            turbulent_root_change_period: TURBULENT_ROOT_CHANGE_PERIOD,
            turbulence_threshold: TURBULENCE_THRESHOLD,
            spacing_slow_ms: SPACING_SLOW_MS,
            spacing_busy_ms: SPACING_BUSY_MS,
            initial_spacing_ms: INITIAL_SPACING_MS,
            bpm: DEFAULT_BPM,
        }
    }
}

/// Clock and load-shedding parameters.
///
/// A `gravity_strength` of zero pins ambient gravity to the zero vector.
#[derive(Clone, Debug)]
pub struct ClockParams {
    pub time_step: f32,
    pub gravity_strength: f32,
    pub fps_low: f32,
    pub fps_high: f32,
    pub adaptive_capacity: bool,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            time_step: TIME_STEP,
            gravity_strength: GRAVITY_STRENGTH,
            fps_low: FPS_LOW,
            fps_high: FPS_HIGH,
            adaptive_capacity: true,
        }
    }
}

/// Everything needed to start a session.
#[derive(Clone, Debug)]
pub struct SketchConfig {
    pub seed: u64,
    pub layers: LayerParams,
    pub particles: ParticleParams,
    pub harmony: HarmonyParams,
    pub clock: ClockParams,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            layers: LayerParams::default(),
            particles: ParticleParams::default(),
            harmony: HarmonyParams::default(),
            clock: ClockParams::default(),
        }
    }
}

/// Derive an independent stream seed per component from the session seed.
#[inline]
pub fn stream_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
