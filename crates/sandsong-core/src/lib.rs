pub mod audio;
pub mod clock;
pub mod color;
pub mod config;
pub mod constants;
pub mod context;
pub mod grain;
pub mod harmony;
pub mod layer;
pub mod noise;
pub mod particle;
pub mod particles;
pub mod render;
pub mod sketch;
pub mod vector;

pub use audio::*;
pub use clock::SimulationClock;
pub use color::Rgba;
pub use config::*;
pub use context::{SimulationContext, Viewport};
pub use grain::Grain;
pub use harmony::{HarmonyEngine, HarmonyError, Mode, NoteOutcome, Scale, TickReport};
pub use layer::{Layer, LayerReport};
pub use self::noise::{NoiseSampler, ValueNoise};
pub use particle::{Behavior, Particle};
pub use particles::{Attractor, AttractorSlot, Emitter, ParticleSystem, RunReport};
pub use render::{Background, CommandBuffer, DrawCommand, NullRenderer, Renderer};
pub use sketch::{AudioStatus, FrameStats, InputEvent, Sketch};
