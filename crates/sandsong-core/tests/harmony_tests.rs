// Scales, key changes, note spacing and deferred playback.

use sandsong_core::harmony::{root_for_heading, RootChange, ROOTS};
use sandsong_core::*;
use std::f32::consts::PI;

fn viewport() -> Viewport {
    Viewport::new(800.0, 600.0)
}

fn ctx_at(frame: u64, now_ms: f64) -> SimulationContext {
    let mut ctx = SimulationContext::new(viewport());
    ctx.frame = frame;
    ctx.now_ms = now_ms;
    ctx
}

fn particles() -> ParticleSystem {
    let params = ParticleParams {
        initial_attractors: 0,
        ..ParticleParams::default()
    };
    ParticleSystem::new(&params, &viewport(), 21)
}

fn engine() -> HarmonyEngine {
    HarmonyEngine::new(HarmonyParams::default(), 77, 1)
}

fn melody(events: &[NoteEvent]) -> usize {
    events.iter().filter(|e| e.voice == Voice::Melody).count()
}

#[test]
fn minor_scale_matches_equal_temperament() {
    let scale = Scale::new(261.63, Mode::Minor).unwrap();
    assert_eq!(scale.len(), 8);
    for (f, s) in scale.notes().iter().zip([0, 2, 3, 5, 7, 8, 10, 12]) {
        let expected = 261.63 * 2f32.powf(s as f32 / 12.0);
        assert!((f - expected).abs() < 1e-3, "{f} vs {expected}");
    }
    assert!((scale.first() - 261.63).abs() < 1e-4);
    assert!((scale.last() - 523.26).abs() < 1e-2);
    assert!(scale.notes().windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn pentatonic_spans_more_than_an_octave() {
    let scale = Scale::new(220.0, Mode::Pentatonic).unwrap();
    assert_eq!(scale.len(), 8);
    assert!(scale.last() > 2.0 * scale.first());
}

#[test]
fn out_of_range_index_clamps_to_top() {
    let scale = Scale::new(261.63, Mode::Minor).unwrap();
    assert_eq!(scale.frequency(99), scale.last());
    assert_eq!(scale.clamp_index(99), 7);
}

#[test]
fn invalid_roots_and_tables_are_rejected() {
    assert_eq!(Scale::new(0.0, Mode::Minor), Err(HarmonyError::InvalidRoot(0.0)));
    assert!(Scale::new(f32::NAN, Mode::Minor).is_err());
    assert_eq!(
        Scale::from_intervals(261.63, Mode::Minor, &[]),
        Err(HarmonyError::EmptyScale)
    );
}

#[test]
fn fallback_scale_uses_last_valid_root() {
    let scale = Scale::with_fallback(f32::INFINITY, Mode::Minor, 440.0);
    assert!(scale.is_fallback());
    assert_eq!(scale.len(), 8);
    assert!((scale.first() - 440.0).abs() < 1e-4);
    assert!((scale.last() - 880.0).abs() < 1e-3);

    let scale = Scale::fallback(-1.0, Mode::Minor);
    assert!((scale.first() - 261.63).abs() < 1e-4);
}

#[test]
fn heading_maps_onto_circle_of_fifths() {
    assert_eq!(root_for_heading(0.0), 261.63);
    // sector 3 of 7 is E
    assert_eq!(root_for_heading(PI), 329.63);
    assert_eq!(root_for_heading(-0.01), 349.23);
    assert_eq!(root_for_heading(f32::NAN), 261.63);
    let expected = [261.63, 392.00, 440.00, 329.63, 493.88, 293.66, 349.23];
    for (sector, root) in expected.iter().enumerate() {
        let heading = (sector as f32 + 0.5) / 7.0 * std::f32::consts::TAU;
        assert_eq!(root_for_heading(heading), *root);
        assert_eq!(root_for_heading(heading - std::f32::consts::TAU), *root);
        assert!(ROOTS.contains(root));
    }
}

#[test]
fn second_note_within_spacing_is_refused() {
    let mut h = engine();
    let mut p = particles();
    let mut out = Vec::new();
    let first = h.play_note(&ctx_at(1, 1000.0), 0.5, &mut p, &mut out);
    assert!(matches!(first, NoteOutcome::Played(_)));
    assert_eq!(out[0].voice, Voice::Melody);
    assert!(out[1..]
        .iter()
        .all(|e| matches!(e.voice, Voice::Harmony | Voice::Bass) && e.start_offset_sec > 0.0));
    let after_first = out.len();
    let second = h.play_note(&ctx_at(2, 1100.0), 0.5, &mut p, &mut out);
    assert_eq!(second, NoteOutcome::TooSoon);
    assert_eq!(out.len(), after_first);
    assert_eq!(melody(&out), 1);

    let third = h.play_note(&ctx_at(3, 1250.0), 0.5, &mut p, &mut out);
    assert!(matches!(third, NoteOutcome::Played(_)));
    assert_eq!(melody(&out), 2);
}

#[test]
fn rapid_burst_yields_one_note() {
    let mut h = engine();
    h.set_spacing_ms(200.0);
    let mut p = particles();
    let mut out = Vec::new();
    let played = (0..5)
        .map(|i| h.play_note(&ctx_at(i + 1, 5000.0 + i as f64 * 10.0), 0.3, &mut p, &mut out))
        .filter(|o| matches!(o, NoteOutcome::Played(_)))
        .count();
    assert_eq!(played, 1);
    assert_eq!(melody(&out), 1);
}

#[test]
fn played_notes_stay_in_scale_and_velocity_range() {
    let mut h = engine();
    h.set_spacing_ms(0.0);
    let mut p = particles();
    let mut out = Vec::new();
    for i in 0..200 {
        let v = i as f32 / 100.0 - 0.5;
        if let NoteOutcome::Played(note) = h.play_note(&ctx_at(i, i as f64 * 10.0), v, &mut p, &mut out) {
            assert!(h.scale().notes().contains(&note.frequency_hz));
            assert!((0.1..=0.6).contains(&note.velocity));
        }
    }
    for e in out.iter().filter(|e| e.voice == Voice::Melody) {
        assert!(e.velocity >= 0.1 && e.velocity <= 0.6);
    }
}

#[test]
fn spacing_follows_activity() {
    let mut h = engine();
    let mut p = particles();
    let mut out = Vec::new();
    for frame in 1..=600 {
        h.tick(&ctx_at(frame, frame as f64 * 16.0), 1.0, &mut p, &mut out);
        assert!(h.spacing_ms() >= 250.0 && h.spacing_ms() <= 800.0);
    }
    assert!(h.activity() > 0.85 && h.activity() <= 0.9 + 1e-5);
    assert!(h.spacing_ms() < 350.0);
}

#[test]
fn key_change_plays_transition_chord_over_time() {
    let mut h = engine();
    let mut p = particles();
    let mut out = Vec::new();
    let change = h.change_root(PI, 0, 0.0, &mut out);
    assert_eq!(
        change,
        Some(RootChange {
            old_root: 261.63,
            new_root: 329.63,
            mode: Mode::Minor
        })
    );
    // bass and old-root melody sound at once
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|e| e.start_offset_sec == 0.0));
    assert_eq!(h.pending(), 4);

    out.clear();
    h.tick(&ctx_at(1, 40.0), 0.0, &mut p, &mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].voice, Voice::Harmony);
    assert!((out[0].start_offset_sec - 0.01).abs() < 1e-4);
    assert!((out[0].frequency_hz - 329.63).abs() < 1e-3);

    out.clear();
    h.tick(&ctx_at(2, 1490.0), 0.0, &mut p, &mut out);
    assert_eq!(out.len(), 3);
    assert_eq!(h.pending(), 0);

    // same heading, same population: nothing to change
    assert!(h.change_root(PI, 0, 2000.0, &mut out).is_none());
    let crowded = h.change_root(PI, 40, 2000.0, &mut out);
    assert_eq!(crowded.map(|c| c.mode), Some(Mode::Pentatonic));
}

#[test]
fn chord_is_ungated_and_rolled() {
    let mut h = engine();
    let mut p = particles();
    let mut out = Vec::new();
    h.play_note(&ctx_at(1, 0.0), 0.5, &mut p, &mut out);
    out.clear();
    let queued = h.pending();
    h.play_chord(10.0, &mut out);
    assert_eq!(melody(&out), 1);
    assert!(out.iter().any(|e| e.voice == Voice::Bass && (e.start_offset_sec - 0.02).abs() < 1e-6));
    assert_eq!(h.pending(), queued + 2);
    h.tick(&ctx_at(2, 200.0), 0.0, &mut p, &mut out);
    assert!(out.iter().filter(|e| e.voice == Voice::Harmony).count() >= 2);
    assert_eq!(h.pending(), 0);
}

#[test]
fn reset_discards_pending_notes() {
    let mut h = engine();
    let mut out = Vec::new();
    h.play_transition_chord(261.63, 0.0, &mut out);
    assert!(h.pending() > 0);
    h.reset(2);
    assert_eq!(h.pending(), 0);
    assert_eq!(h.session(), 2);
    assert_eq!(h.last_note_ms(), None);

    h.schedule_note(100.0, 0.3, 1.0);
    h.cancel_pending();
    assert_eq!(h.pending(), 0);
}

#[test]
fn deferred_notes_respect_spacing_factor() {
    let mut h = engine();
    h.set_spacing_ms(200.0);
    let mut p = particles();
    let mut out = Vec::new();
    h.play_note(&ctx_at(1, 1000.0), 0.3, &mut p, &mut out);
    out.clear();
    // 250 ms after the last note: enough for spacing, not for 1.5x spacing
    h.schedule_note(1250.0, 0.3, 1.5);
    let report = h.tick(&ctx_at(2, 1250.0), 0.0, &mut p, &mut out);
    assert_eq!(report.notes_played, 0);
    assert_eq!(melody(&out), 0);
}

#[test]
fn set_root_rejects_bad_frequencies() {
    let mut h = engine();
    assert!(h.set_root(-5.0).is_err());
    assert!((h.root() - 261.63).abs() < 1e-4);
    assert!(h.set_root(440.0).is_ok());
    assert!((h.scale().first() - 440.0).abs() < 1e-4);
    assert!(h.set_mode(Mode::Pentatonic).is_ok());
    assert_eq!(h.mode(), Mode::Pentatonic);
}

#[test]
fn degree_taps_clamp_index() {
    let mut h = engine();
    let mut out = Vec::new();
    h.play_degree(42, 0.2, NoteDuration::Sixteenth, &mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].frequency_hz, h.scale().last());
}
