/// Linear RGBA color with every channel in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 8-bit style channels (`0..=255`), as sketch palettes are usually written.
    pub fn from_rgb8(r: f32, g: f32, b: f32) -> Self {
        Self::from_rgba8(r, g, b, 255.0)
    }

    pub fn from_rgba8(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: (r / 255.0).clamp(0.0, 1.0),
            g: (g / 255.0).clamp(0.0, 1.0),
            b: (b / 255.0).clamp(0.0, 1.0),
            a: (a / 255.0).clamp(0.0, 1.0),
        }
    }

    /// Hue in degrees, saturation and brightness in percent, alpha `0..=255`.
    pub fn from_hsb(hue: f32, saturation: f32, brightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let v = (brightness / 100.0).clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = v - c;
        Self {
            r: r + m,
            g: g + m,
            b: b + m,
            a: (alpha / 255.0).clamp(0.0, 1.0),
        }
    }

    /// Component-wise blend; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn with_alpha(self, a: f32) -> Rgba {
        Rgba {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// HSB brightness in percent.
    pub fn brightness(&self) -> f32 {
        self.r.max(self.g).max(self.b) * 100.0
    }

    /// CSS `rgba(...)` string accepted by canvas contexts.
    pub fn to_css(&self) -> String {
        format!(
            "rgba({},{},{},{:.3})",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            self.a
        )
    }
}
