// Whole-session behavior: frame loop, input, audio lifecycle and teardown.

use sandsong_core::constants::{PARTICLE_CAPACITY, USER_ATTRACTOR_CAP};
use sandsong_core::*;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn calm_config() -> SketchConfig {
    SketchConfig {
        clock: ClockParams {
            gravity_strength: 0.0,
            adaptive_capacity: false,
            ..ClockParams::default()
        },
        ..SketchConfig::default()
    }
}

fn small_config() -> SketchConfig {
    SketchConfig {
        layers: LayerParams {
            count: 3,
            grains_per_layer: 40,
        },
        ..calm_config()
    }
}

fn sketch(config: SketchConfig, engine: RecordingEngine) -> Sketch<RecordingEngine> {
    Sketch::new(config, Viewport::new(800.0, 600.0), 0.0, engine)
}

fn run(s: &mut Sketch<RecordingEngine>, start: u64, frames: u64) -> f64 {
    let mut renderer = NullRenderer;
    for i in start..start + frames {
        s.frame(i as f64 * FRAME_MS, &mut renderer);
    }
    (start + frames) as f64 * FRAME_MS
}

fn played(s: &Sketch<RecordingEngine>) -> usize {
    s.audio().map_or(0, |a| a.played.len())
}

#[test]
fn six_hundred_calm_frames_stay_in_bounds() {
    let mut s = sketch(calm_config(), RecordingEngine::new());
    s.handle(InputEvent::PointerDown { x: 400.0, y: 300.0 });
    assert_eq!(s.audio_status(), &AudioStatus::Active);
    let mut renderer = NullRenderer;
    for i in 1..=600 {
        let stats = s.frame(i as f64 * FRAME_MS, &mut renderer);
        assert!((0.0..=1.0).contains(&stats.activity), "activity {}", stats.activity);
        assert!(stats.particles <= PARTICLE_CAPACITY);
        assert_eq!(s.context().gravity, glam::Vec2::ZERO);
    }
    assert_eq!(s.layers().len(), 10);
    assert!(s.layers().iter().all(|l| l.len() == 100));
    assert_eq!(s.context().frame, 600);
    assert!(played(&s) > 0, "an active session went silent for 600 frames");
}

#[test]
fn frames_start_with_a_gradient_background() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    let mut buffer = CommandBuffer::new();
    s.frame(FRAME_MS, &mut buffer);
    assert!(matches!(
        buffer.commands.first(),
        Some(DrawCommand::Background(Background::Gradient { .. }))
    ));
    assert!(buffer.len() > 3 * 40);
}

#[test]
fn no_sound_before_a_gesture() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    run(&mut s, 1, 400);
    assert_eq!(s.audio_status(), &AudioStatus::Dormant);
    assert_eq!(played(&s), 0);
    assert_eq!(s.audio().map(|a| a.activations), Some(0));
}

#[test]
fn gesture_activates_audio_and_space_plays_chord() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    run(&mut s, 1, 10);
    s.handle(InputEvent::PointerDown { x: 10.0, y: 10.0 });
    assert_eq!(s.audio_status(), &AudioStatus::Active);

    let before = s.particles().len();
    s.handle(InputEvent::Key(' '));
    assert!(s.particles().len() > before);
    let engine = s.audio().unwrap();
    assert_eq!(engine.count(Voice::Melody), 1);
    assert_eq!(engine.count(Voice::Bass), 1);

    run(&mut s, 11, 10);
    assert!(s.audio().unwrap().count(Voice::Harmony) >= 2);
}

#[test]
fn active_sessions_make_music_over_time() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    s.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    run(&mut s, 1, 1200);
    assert!(played(&s) > 0);
    let engine = s.audio().unwrap();
    for e in &engine.played {
        assert!(e.frequency_hz > 0.0 && e.frequency_hz.is_finite());
        assert!(e.start_offset_sec >= 0.0);
        assert!((0.0..=1.0).contains(&e.velocity));
    }
}

#[test]
fn failed_activation_keeps_visuals_and_retries() {
    let engine = RecordingEngine {
        fail_activation: true,
        ..RecordingEngine::new()
    };
    let mut s = sketch(small_config(), engine);
    s.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    assert!(matches!(s.audio_status(), AudioStatus::Failed(_)));

    let mut buffer = CommandBuffer::new();
    s.frame(FRAME_MS, &mut buffer);
    assert!(!buffer.is_empty());
    s.handle(InputEvent::Key(' '));
    assert_eq!(played(&s), 0);

    s.audio_mut().unwrap().fail_activation = false;
    s.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    assert_eq!(s.audio_status(), &AudioStatus::Active);
    assert_eq!(s.audio().map(|a| a.activations), Some(2));
}

#[test]
fn missing_voice_is_skipped() {
    let engine = RecordingEngine {
        missing: vec![Voice::Bass],
        ..RecordingEngine::new()
    };
    let mut s = sketch(small_config(), engine);
    s.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    s.handle(InputEvent::Key(' '));
    assert_eq!(s.audio_status(), &AudioStatus::Active);
    let engine = s.audio().unwrap();
    assert_eq!(engine.count(Voice::Bass), 0);
    assert_eq!(engine.count(Voice::Melody), 1);
}

#[test]
fn stop_cancels_pending_notes() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    s.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    s.handle(InputEvent::Key(' '));
    assert!(s.harmony().pending() >= 2);
    let session = s.session();

    let engine = s.stop().unwrap();
    assert_eq!(engine.stops, 1);
    assert_eq!(engine.count(Voice::Harmony), 0);
    assert_eq!(s.session(), session + 1);
    assert_eq!(s.harmony().pending(), 0);
    assert!(s.audio().is_none());

    // the world keeps drawing without an engine
    run(&mut s, 1, 30);
    s.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    assert_eq!(s.audio_status(), &AudioStatus::Dormant);
}

#[test]
fn restart_rebuilds_the_world() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    let end = run(&mut s, 1, 50);
    let session = s.session();
    s.restart(end);
    assert_eq!(s.session(), session + 1);
    assert_eq!(s.context().frame, 0);
    assert_eq!(s.layers().len(), 3);
    assert_eq!(s.harmony().pending(), 0);
    assert_eq!(s.audio().map(|a| a.stops), Some(1));
}

#[test]
fn keys_clear_particles_and_add_attractors() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    run(&mut s, 1, 5);
    s.handle(InputEvent::Key('c'));
    assert!(s.particles().is_empty());

    s.handle(InputEvent::PointerMove { x: 123.0, y: 45.0 });
    for _ in 0..10 {
        s.handle(InputEvent::Key('a'));
    }
    assert_eq!(s.particles().attractors().len(), USER_ATTRACTOR_CAP);
    assert!(s
        .particles()
        .attractors()
        .iter()
        .any(|a| a.position == glam::Vec2::new(123.0, 45.0)));

    s.handle(InputEvent::Key('z'));
}

#[test]
fn dragging_sprinkles_particles_every_third_frame() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    run(&mut s, 1, 3);
    assert_eq!(s.context().frame, 3);
    let before = s.particles().len();
    s.handle(InputEvent::PointerDrag {
        x: 200.0,
        y: 200.0,
        dx: 4.0,
        dy: 2.0,
    });
    assert_eq!(s.particles().len(), before + 1);

    run(&mut s, 4, 1);
    let before = s.particles().len();
    s.handle(InputEvent::PointerDrag {
        x: 210.0,
        y: 200.0,
        dx: 4.0,
        dy: 2.0,
    });
    assert_eq!(s.particles().len(), before);
}

#[test]
fn drag_notes_only_roll_on_spawn_frames() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    s.handle(InputEvent::PointerDown { x: 400.0, y: 300.0 });
    run(&mut s, 1, 4);
    assert_ne!(s.context().frame % 3, 0);
    let before = played(&s);
    for i in 0..400 {
        s.handle(InputEvent::PointerDrag {
            x: 100.0 + i as f32,
            y: 200.0,
            dx: 6.0,
            dy: 3.0,
        });
    }
    assert_eq!(played(&s), before);

    run(&mut s, 5, 2);
    assert_eq!(s.context().frame % 3, 0);
    let before = played(&s);
    for i in 0..400 {
        s.handle(InputEvent::PointerDrag {
            x: 100.0 + i as f32,
            y: 200.0,
            dx: 6.0,
            dy: 3.0,
        });
    }
    assert!(played(&s) > before);
}

#[test]
fn mobile_attractors_follow_a_shrinking_viewport() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    for _ in 0..USER_ATTRACTOR_CAP {
        s.particles_mut()
            .request_attractor(glam::Vec2::new(790.0, 590.0), USER_ATTRACTOR_CAP, 1.0);
    }
    s.handle(InputEvent::Resize {
        width: 200.0,
        height: 150.0,
    });
    run(&mut s, 1, 2);
    let mobile: Vec<_> = s.particles().attractors().iter().filter(|a| a.mobile).collect();
    assert!(!mobile.is_empty());
    for a in mobile {
        assert!(
            (0.0..=200.0).contains(&a.position.x) && (0.0..=150.0).contains(&a.position.y),
            "attractor stranded at {:?}",
            a.position
        );
    }
}

#[test]
fn resize_updates_the_viewport() {
    let mut s = sketch(small_config(), RecordingEngine::new());
    s.handle(InputEvent::Resize {
        width: 320.0,
        height: 240.0,
    });
    let mut renderer = NullRenderer;
    s.frame(FRAME_MS, &mut renderer);
    assert_eq!(s.context().viewport, Viewport::new(320.0, 240.0));
}

#[test]
fn same_seed_same_world() {
    let mut a = sketch(small_config(), RecordingEngine::new());
    let mut b = sketch(small_config(), RecordingEngine::new());
    run(&mut a, 1, 120);
    run(&mut b, 1, 120);
    assert_eq!(a.particles().len(), b.particles().len());
    let pa: Vec<_> = a.particles().particles().iter().map(|p| p.position).collect();
    let pb: Vec<_> = b.particles().particles().iter().map(|p| p.position).collect();
    assert_eq!(pa, pb);
}
