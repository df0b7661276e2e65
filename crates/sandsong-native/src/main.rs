use anyhow::Context;
use clap::Parser;
use sandsong_core::{CommandBuffer, DrawCommand, InputEvent, Sketch, SketchConfig, Voice};
use sandsong_native::{Args, NativeEngine};
use std::thread;
use std::time::{Duration, Instant};

const FRAME_MS: f64 = 1000.0 / 60.0;
// Longest release tail among the voice patches, plus margin.
const TAIL: Duration = Duration::from_millis(1500);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let viewport = args.viewport()?;
    let config = SketchConfig {
        seed: args.seed,
        ..SketchConfig::default()
    };

    let engine = if args.audio {
        NativeEngine::open(config.harmony.bpm)
    } else {
        NativeEngine::default()
    };
    let realtime = engine.is_device();
    let mut sketch = Sketch::new(config, viewport, 0.0, engine);
    let center = viewport.center();
    sketch.handle(InputEvent::PointerDown {
        x: center.x,
        y: center.y,
    });

    let mut buffer = CommandBuffer::new();
    let mut draws = 0usize;
    let mut peak_particles = 0usize;
    let mut activity_sum = 0.0f64;
    let mut notes = 0usize;
    let started = Instant::now();
    for i in 1..=args.frames {
        let now_ms = i as f64 * FRAME_MS;
        if realtime {
            let target = Duration::from_secs_f64(now_ms / 1000.0);
            if let Some(wait) = target.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
        buffer.clear();
        let stats = sketch.frame(now_ms, &mut buffer);
        draws += buffer.len();
        peak_particles = peak_particles.max(stats.particles);
        activity_sum += stats.activity as f64;
        notes += stats.notes;
        if i % 600 == 0 {
            log::info!(
                "[frame] {} activity={:.2} particles={}/{}",
                stats.frame,
                stats.activity,
                stats.particles,
                stats.capacity
            );
        }
    }
    let glows = buffer
        .commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::GlowCircle { .. }))
        .count();

    if realtime && sketch.audio().is_some_and(|e| e.sounding() > 0) {
        thread::sleep(TAIL);
    }
    let engine = sketch.stop().context("sound engine was detached mid-run")?;
    let tally = engine.tally();
    let frames = args.frames;
    println!("sandsong headless run");
    println!("  seed            {}", args.seed);
    println!("  viewport        {}x{}", args.width, args.height);
    println!("  frames          {frames}");
    println!("  output          {}", if realtime { "device" } else { "log" });
    println!(
        "  mean activity   {:.3}",
        if frames > 0 { activity_sum / frames as f64 } else { 0.0 }
    );
    println!("  peak particles  {peak_particles}");
    println!("  draw calls      {draws} ({glows} glows in last frame)");
    println!("  note events     {notes}");
    for (voice, count) in Voice::ALL.iter().zip(tally.per_voice) {
        println!("    {:<8} {count}", voice.name());
    }
    println!("  triggered       {} (stops: {})", tally.total(), tally.stops);
    Ok(())
}
