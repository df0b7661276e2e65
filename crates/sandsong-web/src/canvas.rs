use glam::Vec2;
use sandsong_core::{Background, Renderer, Rgba, Viewport};
use std::f64::consts::TAU;
use web_sys as web;

/// [`Renderer`] over a canvas 2D context. Coordinates arrive in CSS pixels;
/// the context transform scales them to the backing store.
pub struct Canvas2dRenderer {
    ctx: web::CanvasRenderingContext2d,
    viewport: Viewport,
    dpr: f64,
}

impl Canvas2dRenderer {
    pub fn new(ctx: web::CanvasRenderingContext2d, viewport: Viewport, dpr: f64) -> Self {
        let mut renderer = Self { ctx, viewport, dpr };
        renderer.apply_transform();
        renderer
    }

    pub fn set_dpr(&mut self, dpr: f64) {
        self.dpr = dpr;
        self.apply_transform();
    }

    fn apply_transform(&mut self) {
        // resizing the backing store resets the transform
        if let Err(e) = self.ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0) {
            log::warn!("[canvas] set_transform failed: {:?}", e);
        }
    }

    fn circle_path(&self, center: Vec2, diameter: f32) -> bool {
        self.ctx.begin_path();
        let r = (diameter * 0.5).max(0.0) as f64;
        self.ctx
            .arc(center.x as f64, center.y as f64, r, 0.0, TAU)
            .is_ok()
    }
}

impl Renderer for Canvas2dRenderer {
    fn background(&mut self, background: Background) {
        let (w, h) = (self.viewport.width as f64, self.viewport.height as f64);
        match background {
            Background::Solid(color) => self.ctx.set_fill_style_str(&color.to_css()),
            Background::Gradient { top, bottom } => {
                let gradient = self.ctx.create_linear_gradient(0.0, 0.0, 0.0, h);
                let _ = gradient.add_color_stop(0.0, &top.to_css());
                let _ = gradient.add_color_stop(1.0, &bottom.to_css());
                self.ctx.set_fill_style_canvas_gradient(&gradient);
            }
        }
        self.ctx.fill_rect(0.0, 0.0, w, h);
    }

    fn fill_circle(&mut self, center: Vec2, diameter: f32, color: Rgba) {
        if self.circle_path(center, diameter) {
            self.ctx.set_fill_style_str(&color.to_css());
            self.ctx.fill();
        }
    }

    fn stroke_circle(&mut self, center: Vec2, diameter: f32, color: Rgba, weight: f32) {
        if self.circle_path(center, diameter) {
            self.ctx.set_stroke_style_str(&color.to_css());
            self.ctx.set_line_width(weight as f64);
            self.ctx.stroke();
        }
    }

    fn line(&mut self, from: Vec2, to: Vec2, color: Rgba, weight: f32) {
        self.polyline(&[from, to], color, weight);
    }

    fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Rgba) {
        self.ctx.begin_path();
        self.ctx.move_to(a.x as f64, a.y as f64);
        self.ctx.line_to(b.x as f64, b.y as f64);
        self.ctx.line_to(c.x as f64, c.y as f64);
        self.ctx.close_path();
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.fill();
    }

    fn polyline(&mut self, points: &[Vec2], color: Rgba, weight: f32) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.ctx.begin_path();
        self.ctx.move_to(first.x as f64, first.y as f64);
        for p in rest {
            self.ctx.line_to(p.x as f64, p.y as f64);
        }
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(weight as f64);
        self.ctx.stroke();
    }

    fn fill_circle_glow(&mut self, center: Vec2, diameter: f32, color: Rgba, blur: f32) {
        self.ctx.set_shadow_blur(blur as f64);
        self.ctx.set_shadow_color(&color.to_css());
        self.fill_circle(center, diameter, color);
        self.ctx.set_shadow_blur(0.0);
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.apply_transform();
    }
}
