pub mod cli;
pub mod engine;
pub mod synth;

pub use cli::Args;
pub use engine::{CpalEngine, LogEngine, NativeEngine, Tally};
pub use synth::{Envelope, Mixer, Patch};
