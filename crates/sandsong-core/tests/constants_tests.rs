// Tuning constants and their relationships.

use sandsong_core::constants::*;
use sandsong_core::harmony::{CIRCLE_OF_FIFTHS, ROOTS};
use sandsong_core::Mode;

#[test]
#[allow(clippy::assertions_on_constants)]
fn particle_limits_are_consistent() {
    assert!(PARTICLE_CAPACITY_MIN <= PARTICLE_CAPACITY);
    assert!(PARTICLE_CAPACITY <= PARTICLE_CAPACITY_MAX);
    assert!(CAPACITY_SHED_STEP > CAPACITY_GROW_STEP);
    assert!(HARMONY_ATTRACTOR_CAP < USER_ATTRACTOR_CAP);
    assert!(INITIAL_ATTRACTORS <= HARMONY_ATTRACTOR_CAP);
    assert!(ORBITER_LIFESPAN > PARTICLE_LIFESPAN);
    assert!(TRAIL_MAX > 3);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn flocking_radii_nest() {
    assert!(SEPARATION_RADIUS < ALIGNMENT_RADIUS);
    assert!(ALIGNMENT_RADIUS < COHESION_RADIUS);
    assert!(COHESION_MAX_FORCE < ALIGNMENT_MAX_FORCE);
    assert!(ALIGNMENT_MAX_FORCE < SEPARATION_MAX_FORCE);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn turbulence_is_reachable() {
    assert!(TURBULENCE_THRESHOLD > 0.0);
    assert!(TURBULENCE_THRESHOLD < GRAVITY_STRENGTH);
    assert!(TURBULENT_ROOT_CHANGE_PERIOD < ROOT_CHANGE_PERIOD);
    assert_eq!(ROOT_CHANGE_PERIOD % FRAMES_PER_BEAT, 0);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn spacing_shrinks_with_activity() {
    assert!(SPACING_BUSY_MS < SPACING_SLOW_MS);
    assert!(LOOKAHEAD_MS < HARMONY_DELAY_MS);
    assert!(BASS_DELAY_MS <= LOOKAHEAD_MS);
}

#[test]
fn circle_of_fifths_visits_every_root_once() {
    let mut seen = CIRCLE_OF_FIFTHS.to_vec();
    seen.sort_unstable();
    assert_eq!(seen, (0..ROOTS.len()).collect::<Vec<_>>());
    assert!(ROOTS.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(ROOTS[0], DEFAULT_ROOT_HZ);
}

#[test]
fn affinity_degrees_fit_both_modes() {
    for mode in [Mode::Minor, Mode::Pentatonic] {
        let len = mode.intervals().len();
        assert!(NOTE_AFFINITY_DEGREES.iter().all(|&d| d < len));
        assert!(mode.harmony_steps().iter().all(|&s| s < len));
        assert_eq!(mode.intervals()[0], 0);
    }
}
