use crate::constants::DEFAULT_ROOT_HZ;
use log::warn;
use smallvec::SmallVec;
use thiserror::Error;

/// Scale flavor. Minor is the resting mode; a crowded canvas switches to
/// pentatonic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Minor,
    Pentatonic,
}

impl Mode {
    /// Semitone offsets from the root.
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            Mode::Minor => &[0, 2, 3, 5, 7, 8, 10, 12],
            Mode::Pentatonic => &[0, 3, 5, 7, 10, 12, 15, 17],
        }
    }

    /// Scale-index steps a harmony voice may sit above the melody.
    pub fn harmony_steps(&self) -> [usize; 3] {
        match self {
            Mode::Minor => [2, 5, 7],
            Mode::Pentatonic => [2, 4, 7],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Minor => "minor",
            Mode::Pentatonic => "pentatonic",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HarmonyError {
    #[error("root frequency {0} Hz is outside the audible range")]
    InvalidRoot(f32),
    #[error("interval table is empty")]
    EmptyScale,
    #[error("interval {0} semitones is out of range")]
    InvalidInterval(i32),
}

/// Lowest and highest accepted root, in Hz.
pub const ROOT_RANGE: (f32, f32) = (20.0, 8000.0);

/// Just-intonation ratios used when a proper scale cannot be built.
const FALLBACK_RATIOS: [f32; 8] = [1.0, 1.125, 1.25, 1.333, 1.5, 1.667, 1.875, 2.0];

/// Ascending frequencies built from a root. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    root: f32,
    mode: Mode,
    notes: SmallVec<[f32; 8]>,
    fallback: bool,
}

impl Scale {
    pub fn new(root_hz: f32, mode: Mode) -> Result<Self, HarmonyError> {
        Self::from_intervals(root_hz, mode, mode.intervals())
    }

    /// Build from an explicit semitone table; `mode` is kept as a label.
    pub fn from_intervals(root_hz: f32, mode: Mode, intervals: &[i32]) -> Result<Self, HarmonyError> {
        validate_root(root_hz)?;
        if intervals.is_empty() {
            return Err(HarmonyError::EmptyScale);
        }
        let mut notes = SmallVec::new();
        for &s in intervals {
            if !(-48..=48).contains(&s) {
                return Err(HarmonyError::InvalidInterval(s));
            }
            notes.push(root_hz * 2f32.powf(s as f32 / 12.0));
        }
        Ok(Self {
            root: root_hz,
            mode,
            notes,
            fallback: false,
        })
    }

    /// Fixed-ratio scale over `root_hz`, or over the default root if that is
    /// not a usable frequency either.
    pub fn fallback(root_hz: f32, mode: Mode) -> Self {
        let root = if validate_root(root_hz).is_ok() {
            root_hz
        } else {
            DEFAULT_ROOT_HZ
        };
        Self {
            root,
            mode,
            notes: FALLBACK_RATIOS.iter().map(|r| root * r).collect(),
            fallback: true,
        }
    }

    /// [`Scale::new`], degrading to [`Scale::fallback`] over `last_valid_root`.
    pub fn with_fallback(root_hz: f32, mode: Mode, last_valid_root: f32) -> Self {
        match Self::new(root_hz, mode) {
            Ok(scale) => scale,
            Err(e) => {
                warn!("[harmony] {e}; using fallback scale over {last_valid_root} Hz");
                Self::fallback(last_valid_root, mode)
            }
        }
    }

    pub fn root(&self) -> f32 {
        self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn notes(&self) -> &[f32] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> f32 {
        self.notes[0]
    }

    pub fn last(&self) -> f32 {
        self.notes[self.notes.len() - 1]
    }

    #[inline]
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.notes.len() - 1)
    }

    /// Frequency at `index`, clamped to the top of the scale.
    pub fn frequency(&self, index: usize) -> f32 {
        self.notes[self.clamp_index(index)]
    }
}

fn validate_root(root_hz: f32) -> Result<(), HarmonyError> {
    if root_hz.is_finite() && root_hz >= ROOT_RANGE.0 && root_hz <= ROOT_RANGE.1 {
        Ok(())
    } else {
        Err(HarmonyError::InvalidRoot(root_hz))
    }
}
