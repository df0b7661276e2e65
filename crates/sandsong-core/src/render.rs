//! Drawing surface consumed by the simulation.
//!
//! The core only ever talks to a [`Renderer`]; the web host backs it with a
//! canvas 2D context and the headless host with a [`CommandBuffer`].

use crate::color::Rgba;
use crate::context::Viewport;
use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Background {
    Solid(Rgba),
    /// Vertical blend from `top` at y = 0 to `bottom` at y = height.
    Gradient { top: Rgba, bottom: Rgba },
}

/// Immediate-mode 2D primitives in viewport pixel coordinates.
///
/// Sizes are diameters, matching how sketches usually specify circles.
pub trait Renderer {
    fn background(&mut self, background: Background);
    fn fill_circle(&mut self, center: Vec2, diameter: f32, color: Rgba);
    fn stroke_circle(&mut self, center: Vec2, diameter: f32, color: Rgba, weight: f32);
    fn line(&mut self, from: Vec2, to: Vec2, color: Rgba, weight: f32);
    fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Rgba);
    fn polyline(&mut self, points: &[Vec2], color: Rgba, weight: f32);

    /// Filled circle with a soft halo. Surfaces without blur draw a plain circle.
    fn fill_circle_glow(&mut self, center: Vec2, diameter: f32, color: Rgba, _blur: f32) {
        self.fill_circle(center, diameter, color);
    }

    fn resize(&mut self, _viewport: Viewport) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Background(Background),
    FillCircle { center: Vec2, diameter: f32, color: Rgba },
    StrokeCircle { center: Vec2, diameter: f32, color: Rgba, weight: f32 },
    Line { from: Vec2, to: Vec2, color: Rgba, weight: f32 },
    Triangle { a: Vec2, b: Vec2, c: Vec2, color: Rgba },
    Polyline { points: Vec<Vec2>, color: Rgba, weight: f32 },
    GlowCircle { center: Vec2, diameter: f32, color: Rgba, blur: f32 },
}

/// Renderer that records every primitive, used headless and in tests.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    pub commands: Vec<DrawCommand>,
    pub viewport: Option<Viewport>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Primitives drawn since the last background fill.
    pub fn since_last_background(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Background(_)))
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.commands[start..]
    }
}

impl Renderer for CommandBuffer {
    fn background(&mut self, background: Background) {
        self.commands.push(DrawCommand::Background(background));
    }

    fn fill_circle(&mut self, center: Vec2, diameter: f32, color: Rgba) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            diameter,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Vec2, diameter: f32, color: Rgba, weight: f32) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            diameter,
            color,
            weight,
        });
    }

    fn line(&mut self, from: Vec2, to: Vec2, color: Rgba, weight: f32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            weight,
        });
    }

    fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Rgba) {
        self.commands.push(DrawCommand::Triangle { a, b, c, color });
    }

    fn polyline(&mut self, points: &[Vec2], color: Rgba, weight: f32) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            color,
            weight,
        });
    }

    fn fill_circle_glow(&mut self, center: Vec2, diameter: f32, color: Rgba, blur: f32) {
        self.commands.push(DrawCommand::GlowCircle {
            center,
            diameter,
            color,
            blur,
        });
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }
}

/// Renderer that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn background(&mut self, _background: Background) {}
    fn fill_circle(&mut self, _center: Vec2, _diameter: f32, _color: Rgba) {}
    fn stroke_circle(&mut self, _center: Vec2, _diameter: f32, _color: Rgba, _weight: f32) {}
    fn line(&mut self, _from: Vec2, _to: Vec2, _color: Rgba, _weight: f32) {}
    fn fill_triangle(&mut self, _a: Vec2, _b: Vec2, _c: Vec2, _color: Rgba) {}
    fn polyline(&mut self, _points: &[Vec2], _color: Rgba, _weight: f32) {}
}
