use glam::Vec2;

/// Drawable area in pixels, supplied by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Per-frame state every component reads instead of ambient globals.
///
/// Built by [`crate::SimulationClock::advance`] once per frame and passed by
/// reference to each update.
#[derive(Clone, Copy, Debug)]
pub struct SimulationContext {
    pub viewport: Viewport,
    /// Frames since the session started; the first advanced frame is 1.
    pub frame: u64,
    /// Slow animation time driving noise lookups.
    pub t: f32,
    /// Host wall clock in milliseconds, used for note spacing.
    pub now_ms: f64,
    /// Ambient gravity for this frame.
    pub gravity: Vec2,
}

impl SimulationContext {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            frame: 0,
            t: 0.0,
            now_ms: 0.0,
            gravity: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.viewport.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.viewport.height
    }
}
