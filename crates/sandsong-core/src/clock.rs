use crate::config::ClockParams;
use crate::constants::*;
use crate::context::{SimulationContext, Viewport};
use crate::noise::NoiseSampler;
use crate::vector::from_angle;
use glam::Vec2;
use log::debug;
use std::f32::consts::TAU;

/// Frame counter, animation time, ambient gravity and a smoothed frame rate.
pub struct SimulationClock {
    params: ClockParams,
    viewport: Viewport,
    frame: u64,
    t: f32,
    last_ms: Option<f64>,
    fps: f32,
    gravity: Vec2,
}

impl SimulationClock {
    pub fn new(params: ClockParams, viewport: Viewport) -> Self {
        Self {
            params,
            viewport,
            frame: 0,
            t: 0.0,
            last_ms: None,
            fps: 60.0,
            gravity: Vec2::ZERO,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn t(&self) -> f32 {
        self.t
    }

    /// Exponentially smoothed frames per second.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Step one frame and produce its context.
    pub fn advance<N: NoiseSampler + ?Sized>(&mut self, now_ms: f64, noise: &N) -> SimulationContext {
        self.frame += 1;
        self.t += self.params.time_step;

        if let Some(last) = self.last_ms {
            let dt = now_ms - last;
            if dt > 0.0 {
                let sample = (1000.0 / dt) as f32;
                self.fps += (sample - self.fps) * FPS_SMOOTHING;
            }
        }
        self.last_ms = Some(now_ms);

        self.gravity = if self.params.gravity_strength > 0.0 {
            let heading = noise.noise1(self.t * GRAVITY_ANGLE_RATE) * TAU;
            let magnitude = noise.noise1(self.t * GRAVITY_MAGNITUDE_RATE + GRAVITY_MAGNITUDE_OFFSET)
                * self.params.gravity_strength;
            from_angle(heading) * magnitude
        } else {
            Vec2::ZERO
        };

        SimulationContext {
            viewport: self.viewport,
            frame: self.frame,
            t: self.t,
            now_ms,
            gravity: self.gravity,
        }
    }

    /// Load shedding: give up particles quickly when the frame rate sags,
    /// take them back slowly when there is headroom.
    pub fn next_capacity(&self, capacity: usize, min: usize, max: usize) -> usize {
        if !self.params.adaptive_capacity {
            return capacity;
        }
        let next = if self.fps < self.params.fps_low && capacity > min {
            capacity.saturating_sub(CAPACITY_SHED_STEP).max(min)
        } else if self.fps > self.params.fps_high && capacity < max {
            (capacity + CAPACITY_GROW_STEP).min(max)
        } else {
            capacity
        };
        if next != capacity {
            debug!("[clock] {:.1} fps, particle capacity {capacity} -> {next}", self.fps);
        }
        next
    }
}
