// Particle lifecycle, caps and behavior variants.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sandsong_core::constants::*;
use sandsong_core::particle::{Orbit, Trail};
use sandsong_core::*;
use std::collections::HashMap;

fn viewport() -> Viewport {
    Viewport::new(800.0, 600.0)
}

fn empty_system(capacity: usize) -> ParticleSystem {
    let params = ParticleParams {
        capacity,
        initial_attractors: 0,
        seed_pattern: false,
        ..ParticleParams::default()
    };
    ParticleSystem::new(&params, &viewport(), 9)
}

fn ctx(frame: u64) -> SimulationContext {
    let mut ctx = SimulationContext::new(viewport());
    ctx.frame = frame;
    ctx.t = frame as f32 * TIME_STEP;
    ctx.now_ms = frame as f64 * 16.0;
    ctx
}

fn particle(behavior: Behavior, pos: Vec2) -> Particle {
    let mut rng = StdRng::seed_from_u64(3);
    let mut p = Particle::with_behavior(0, pos, Rgba::WHITE, 0, behavior, &mut rng);
    p.velocity = Vec2::ZERO;
    p
}

#[test]
fn lifespan_drops_between_one_and_three_per_frame() {
    let mut system = empty_system(100);
    for i in 0..40 {
        system.add_particle(Vec2::new(100.0 + i as f32 * 10.0, 300.0), Rgba::WHITE);
    }
    let noise = ValueNoise::new(1);
    let mut renderer = NullRenderer;
    for frame in 1..=30 {
        let before: HashMap<u64, f32> = system
            .particles()
            .iter()
            .map(|p| (p.id(), p.lifespan()))
            .collect();
        system.run(&ctx(frame), 0.0, &noise, &mut renderer);
        for p in system.particles() {
            let drop = before[&p.id()] - p.lifespan();
            assert!(drop > 1.0 - 1e-3 && drop < 3.0 + 1e-3, "drop {drop}");
        }
    }
}

#[test]
fn expired_particles_are_removed_and_never_drawn() {
    let mut system = empty_system(100);
    for _ in 0..10 {
        system.add_particle(Vec2::new(400.0, 300.0), Rgba::WHITE);
    }
    let noise = ValueNoise::new(2);
    let mut frame = 0;
    while !system.is_empty() {
        frame += 1;
        assert!(frame <= 301, "particles outlived their lifespan");
        let mut buffer = NullRenderer;
        system.run(&ctx(frame), 0.0, &noise, &mut buffer);
        assert!(system.particles().iter().all(|p| !p.is_dead()));
    }
    let mut buffer = CommandBuffer::new();
    system.run(&ctx(frame + 1), 0.0, &noise, &mut buffer);
    assert!(buffer.is_empty());
}

#[test]
fn add_particle_at_capacity_is_a_no_op() {
    let mut system = empty_system(50);
    for i in 0..50 {
        assert!(system.add_particle(Vec2::new(i as f32, 10.0), Rgba::WHITE).is_some());
    }
    assert!(system.add_particle(Vec2::new(1.0, 1.0), Rgba::WHITE).is_none());
    assert_eq!(system.len(), 50);
    let added = system.add_particles_on_beat(Vec2::new(300.0, 300.0), 10, Rgba::WHITE);
    assert_eq!(added, 0);
    assert_eq!(system.len(), 50);
}

#[test]
fn count_stays_under_capacity_while_running() {
    let mut system = empty_system(60);
    for i in 0..10 {
        system.create_emitter(Vec2::new(50.0 + i as f32 * 60.0, 300.0));
    }
    let noise = ValueNoise::new(3);
    let mut renderer = NullRenderer;
    for frame in 1..=400 {
        system.add_particles_on_beat(Vec2::new(400.0, 300.0), 3, Rgba::WHITE);
        system.run(&ctx(frame), 0.6, &noise, &mut renderer);
        assert!(system.len() <= 60);
        assert!(system.emitters().len() <= EMITTER_CAP);
    }
}

#[test]
fn set_capacity_is_bounded_and_trims_oldest() {
    let mut system = empty_system(150);
    for i in 0..120 {
        system.add_particle(Vec2::new(i as f32, 0.0), Rgba::WHITE);
    }
    system.set_capacity(10);
    assert_eq!(system.capacity(), PARTICLE_CAPACITY_MIN);
    assert_eq!(system.len(), PARTICLE_CAPACITY_MIN);
    assert_eq!(system.particles()[0].id(), 70);
    system.set_capacity(1000);
    assert_eq!(system.capacity(), PARTICLE_CAPACITY_MAX);
}

#[test]
fn emitters_are_capped() {
    let mut system = empty_system(100);
    let created = (0..40)
        .filter(|_| system.create_emitter(Vec2::new(10.0, 10.0)))
        .count();
    assert_eq!(created, EMITTER_CAP);
}

#[test]
fn attractor_requests_respect_cap() {
    let params = ParticleParams::default();
    let mut system = ParticleSystem::new(&params, &viewport(), 4);
    assert_eq!(system.attractors().len(), INITIAL_ATTRACTORS);

    let mut inserted = 0;
    for i in 0..20 {
        let pos = Vec2::new(i as f32 * 10.0, 50.0);
        match system.request_attractor(pos, HARMONY_ATTRACTOR_CAP, 0.3) {
            AttractorSlot::Inserted(_) => inserted += 1,
            AttractorSlot::Updated(idx) => {
                assert_eq!(system.attractors()[idx].position, pos);
            }
        }
        assert!(system.attractors().len() <= HARMONY_ATTRACTOR_CAP);
    }
    assert_eq!(inserted, HARMONY_ATTRACTOR_CAP - INITIAL_ATTRACTORS);

    for _ in 0..10 {
        system.request_attractor(Vec2::ZERO, USER_ATTRACTOR_CAP, 0.5);
    }
    assert_eq!(system.attractors().len(), USER_ATTRACTOR_CAP);
}

#[test]
fn attractor_force_falls_off_and_vanishes_outside_radius() {
    let a = Attractor {
        position: Vec2::new(100.0, 100.0),
        strength: 0.2,
        radius: 150.0,
        mobile: false,
        velocity: Vec2::ZERO,
    };
    let near = a.force_at(Vec2::new(90.0, 100.0));
    let far = a.force_at(Vec2::new(0.0, 100.0));
    assert!(near.x > far.x && far.x > 0.0);
    assert!((near.x - 0.02).abs() < 1e-6);
    assert_eq!(a.force_at(Vec2::new(400.0, 100.0)), Vec2::ZERO);
    assert_eq!(a.force_at(a.position), Vec2::ZERO);
}

#[test]
fn heavier_particles_accelerate_less() {
    let mut p = particle(Behavior::Normal, Vec2::new(10.0, 10.0));
    let before = p.acceleration();
    p.apply_force(Vec2::new(1.0, 0.0));
    let expected = PARTICLE_MASS_DIVISOR / p.base_size();
    assert!((p.acceleration().x - before.x - expected).abs() < 1e-5);
}

#[test]
fn follower_seeks_nearest_outside_dead_zone() {
    let follower = particle(Behavior::Follower, Vec2::new(100.0, 100.0));
    let target = particle(Behavior::Normal, Vec2::new(160.0, 100.0));
    let decoy = particle(Behavior::Normal, Vec2::new(100.0, 190.0));
    let all = vec![follower.clone(), target, decoy];
    let f = follower.flock_force(0, &all);
    assert!(f.x > 0.0 && f.y.abs() < 1e-5);
    assert!(f.length() <= FOLLOW_MAX_FORCE + 1e-5);

    let close = particle(Behavior::Normal, Vec2::new(110.0, 100.0));
    let all = vec![follower.clone(), close];
    assert_eq!(follower.flock_force(0, &all), Vec2::ZERO);
}

#[test]
fn repeller_pushes_neighbors_away() {
    let repeller = particle(Behavior::Repeller, Vec2::new(100.0, 100.0));
    let other = particle(Behavior::Normal, Vec2::new(110.0, 100.0));
    let all = vec![repeller.clone(), other];
    let f = repeller.flock_force(0, &all);
    assert!(f.x < 0.0);
    assert!((f.x + 1.0 / (10.0 * REPEL_FALLOFF)).abs() < 1e-4);
}

#[test]
fn orbiters_ride_a_shrinking_circle() {
    let center = Vec2::new(300.0, 300.0);
    let orbit = Orbit {
        center,
        radius: 40.0,
        speed: 0.03,
        phase: 0.0,
    };
    let mut p = particle(Behavior::Orbiter(orbit), center);
    assert_eq!(p.lifespan(), ORBITER_LIFESPAN);
    let mut last = f32::MAX;
    for frame in 1..2000 {
        p.integrate(frame);
        let r = p.position.distance(center);
        assert!(r <= last + 1e-3 && r >= ORBIT_MIN_RADIUS - 1e-3);
        last = r;
    }
    assert!((last - ORBIT_MIN_RADIUS).abs() < 1e-3);
}

#[test]
fn particles_bounce_inside_viewport() {
    let mut p = particle(Behavior::Normal, Vec2::new(-5.0, 650.0));
    p.velocity = Vec2::new(-2.0, 1.0);
    p.check_edges(&viewport());
    assert_eq!(p.position, Vec2::new(0.0, 600.0));
    assert!((p.velocity.x - 1.6).abs() < 1e-6);
    assert!((p.velocity.y + 0.8).abs() < 1e-6);
}

#[test]
fn trails_keep_only_the_newest_points() {
    let mut trail = Trail::new(5);
    for i in 0..10 {
        trail.push(Vec2::new(i as f32, 0.0));
    }
    assert_eq!(trail.points().len(), 5);
    assert_eq!(trail.points()[0], Vec2::new(5.0, 0.0));
    assert_eq!(trail.points()[4], Vec2::new(9.0, 0.0));
}

#[test]
fn loud_notes_burst_new_particles() {
    let mut system = empty_system(100);
    let scale = Scale::new(261.63, Mode::Minor).unwrap();
    system.notify_note(scale.frequency(3), 0.9, &scale, &viewport());
    assert!(system.len() >= 3);

    let mut quiet = empty_system(100);
    quiet.notify_note(scale.frequency(3), 0.2, &scale, &viewport());
    assert!(quiet.is_empty());
}

#[test]
fn seed_pattern_fills_the_canvas() {
    let mut system = empty_system(100);
    system.seed_pattern(&viewport());
    assert_eq!(system.len(), 25);
    assert!(system.emitters().len() <= 3);
}

#[test]
fn clear_particles_empties_the_system() {
    let mut system = empty_system(100);
    system.add_particles_on_beat(Vec2::new(50.0, 50.0), 12, Rgba::WHITE);
    assert!(!system.is_empty());
    system.clear_particles();
    assert!(system.is_empty());
}
