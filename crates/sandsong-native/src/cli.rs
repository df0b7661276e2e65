use anyhow::ensure;
use clap::Parser;
use sandsong_core::constants::DEFAULT_SEED;
use sandsong_core::Viewport;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run a sandsong session without a window")]
pub struct Args {
    /// Frames to simulate at 60 fps
    #[arg(long, env = "SANDSONG_FRAMES", default_value_t = 600)]
    pub frames: u64,

    /// Session seed
    #[arg(long, env = "SANDSONG_SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Viewport width in pixels
    #[arg(long, env = "SANDSONG_WIDTH", default_value_t = 800.0)]
    pub width: f32,

    /// Viewport height in pixels
    #[arg(long, env = "SANDSONG_HEIGHT", default_value_t = 600.0)]
    pub height: f32,

    /// Play through the default output device and pace frames in real time
    #[arg(long, env = "SANDSONG_AUDIO", default_value_t = false)]
    pub audio: bool,
}

impl Args {
    pub fn viewport(&self) -> anyhow::Result<Viewport> {
        ensure!(
            self.width > 0.0 && self.height > 0.0,
            "viewport must be positive, got {}x{}",
            self.width,
            self.height
        );
        Ok(Viewport::new(self.width, self.height))
    }
}
