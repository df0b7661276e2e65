//! Frame-driven harmony: scales, the deferred note queue and the engine that
//! turns activity, gravity and particles into notes.

mod engine;
mod scale;
mod schedule;

pub use engine::{
    root_for_heading, HarmonyEngine, NoteOutcome, PlayedNote, RootChange, TickReport,
    CIRCLE_OF_FIFTHS, ROOTS,
};
pub use scale::{HarmonyError, Mode, Scale, ROOT_RANGE};
pub use schedule::{DeferredAction, DeferredQueue, Due};
