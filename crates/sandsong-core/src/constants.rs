// Shared simulation/audio tuning constants.

// Session defaults
pub const DEFAULT_LAYER_COUNT: usize = 10;
pub const DEFAULT_GRAINS_PER_LAYER: usize = 100;
pub const DEFAULT_SEED: u64 = 42;

// Clock
pub const TIME_STEP: f32 = 0.05; // `t` advance per frame
pub const GRAVITY_ANGLE_RATE: f32 = 0.3; // noise(t * rate) -> heading
pub const GRAVITY_MAGNITUDE_RATE: f32 = 0.2;
pub const GRAVITY_MAGNITUDE_OFFSET: f32 = 10.0; // decorrelates magnitude from heading
pub const GRAVITY_STRENGTH: f32 = 0.05; // max ambient gravity magnitude
pub const FPS_SMOOTHING: f32 = 0.1; // EMA weight of the newest frame-rate sample
pub const FPS_LOW: f32 = 30.0;
pub const FPS_HIGH: f32 = 50.0;

// Grain flocking
pub const SEPARATION_RADIUS: f32 = 15.0;
pub const ALIGNMENT_RADIUS: f32 = 25.0;
pub const COHESION_RADIUS: f32 = 30.0;
pub const SEPARATION_MAX_FORCE: f32 = 0.3;
pub const ALIGNMENT_MAX_FORCE: f32 = 0.2;
pub const COHESION_MAX_FORCE: f32 = 0.1;
pub const SEPARATION_DESIRED_SPEED: f32 = 1.2;
pub const ALIGNMENT_DESIRED_SPEED: f32 = 1.0;
pub const COHESION_DESIRED_SPEED: f32 = 0.8;
pub const SEPARATION_WEIGHT: f32 = 1.5;
pub const ALIGNMENT_WEIGHT: f32 = 0.5;
pub const COHESION_WEIGHT: f32 = 0.3;
pub const NOISE_WEIGHT: f32 = 0.8;
pub const GRAVITY_WEIGHT: f32 = 1.0;
pub const GRAIN_MAX_SPEED: f32 = 1.2;
pub const GRAIN_FLOW_RANGE: f32 = 0.9; // noise force spans [-range, range] per axis
pub const GRAIN_FLOW_TIME_RATE: f32 = 0.1;
pub const GRAIN_ACTIVITY_DIVISOR: f32 = 1000.0;
pub const GRAIN_SPAWN_CHANCE: f32 = 0.001; // per grain per frame
pub const GRAIN_NOTE_CHANCE: f32 = 0.1; // of spawns, when audio is live

// Particles
pub const PARTICLE_CAPACITY: usize = 100;
pub const PARTICLE_CAPACITY_MIN: usize = 50;
pub const PARTICLE_CAPACITY_MAX: usize = 150;
pub const CAPACITY_SHED_STEP: usize = 5;
pub const CAPACITY_GROW_STEP: usize = 1;
pub const PARTICLE_LIFESPAN: f32 = 255.0;
pub const ORBITER_LIFESPAN: f32 = 300.0;
pub const PARTICLE_MASS_DIVISOR: f32 = 8.0; // mass = base_size / divisor
pub const PARTICLE_EDGE_DAMPING: f32 = -0.8;
pub const ORBIT_DECAY: f32 = 0.997;
pub const ORBIT_MIN_RADIUS: f32 = 5.0;
pub const TRAIL_CHANCE: f32 = 0.3;
pub const TRAIL_MAX: usize = 12;
pub const FOLLOW_SEARCH_RADIUS: f32 = 100.0;
pub const FOLLOW_DEAD_ZONE: f32 = 20.0;
pub const FOLLOW_MAX_FORCE: f32 = 0.3;
pub const REPEL_RADIUS: f32 = 50.0;
pub const REPEL_FALLOFF: f32 = 0.05; // push = 1 / (d * falloff)
pub const FIELD_SCALE: f32 = 0.01;
pub const FIELD_TIME_RATE: f32 = 0.05;
pub const FIELD_FORCE: f32 = 0.1;
pub const AUDIO_IMPULSE_THRESHOLD: f32 = 0.5;
pub const AUDIO_IMPULSE_PERIOD: u64 = 30; // frames
pub const AUDIO_IMPULSE_GAIN: f32 = 0.8;
pub const NOTE_IMPULSE: f32 = 0.5;
pub const NOTE_SIZE_PULSE: f32 = 0.5;
pub const NOTE_PULSE_DECAY: f32 = 0.92;
pub const NOTE_BURST_VELOCITY: f32 = 0.4;
pub const NOTE_AFFINITY_DEGREES: [usize; 5] = [0, 2, 4, 5, 7];

// Emitters and attractors
pub const EMITTER_CAP: usize = 16;
pub const EMITTER_SPREAD: f32 = 10.0;
pub const BEAT_EMITTER_CHANCE: f32 = 0.2;
pub const INITIAL_ATTRACTORS: usize = 3;
pub const HARMONY_ATTRACTOR_CAP: usize = 5;
pub const USER_ATTRACTOR_CAP: usize = 6;

// Harmony
pub const DEFAULT_ROOT_HZ: f32 = 261.63; // C4
pub const FRAMES_PER_BEAT: u64 = 60;
pub const BEATS_PER_MEASURE: u64 = 4;
pub const ROOT_CHANGE_PERIOD: u64 = 360; // frames
pub const TURBULENT_ROOT_CHANGE_PERIOD: u64 = 120; // frames
pub const TURBULENCE_THRESHOLD: f32 = 0.04; // gravity magnitude
pub const SPACING_SLOW_MS: f64 = 800.0; // spacing at activity 0
pub const SPACING_BUSY_MS: f64 = 250.0; // spacing at activity 1
pub const INITIAL_SPACING_MS: f64 = 200.0;
pub const LOOKAHEAD_MS: f64 = 20.0;
pub const HARMONY_CHANCE: f32 = 0.3;
pub const BASS_CHANCE: f32 = 0.15;
pub const HARMONY_DELAY_MS: f64 = 30.0;
pub const BASS_DELAY_MS: f64 = 20.0;
pub const PENTATONIC_POPULATION: usize = 30; // particles above which the mode goes pentatonic
pub const DEFAULT_BPM: f32 = 120.0;

// Input
pub const DRAG_SPAWN_PERIOD: u64 = 3; // frames
pub const DRAG_NOTE_CHANCE: f32 = 0.05;
pub const SPACE_BURST: usize = 20;
