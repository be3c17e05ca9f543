//! The per-tick pipeline.
//!
//! [`step_character`] runs one fixed tick for one character, in strict order:
//!
//! 1. count down the horizontal lock and update facing,
//! 2. poll moves and run their callbacks,
//! 3. stagger: apply forces, move, resolve collisions, confirm the surface
//!    angle, repeated in sub-steps no longer than the anti-tunneling distance,
//! 4. expire transient flags from the previous tick.
//!
//! It is engine independent; the ECS systems in [`crate::systems`] call it
//! once per entity per fixed tick.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::events::PhysicsObserver;
use crate::integrator;
use crate::intent::ControlIntent;
use crate::moves::{MoveContext, MoveSet};
use crate::resolver::{self, Resolver};
use crate::state::CharacterBody;
use crate::terrain::TerrainQuery;

/// Remaining time below this ends the stagger loop.
const STAGGER_EPSILON: f32 = 1e-6;

/// Upper bound on sub-steps per tick, far above anything the speed cap allows.
const MAX_SUBSTEPS: u32 = 1024;

/// Summary of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Number of stagger sub-steps taken.
    pub substeps: u32,
    /// The body attached to a surface at least once.
    pub attached: bool,
    /// The body detached from a surface at least once.
    pub detached: bool,
}

/// Forwards to another observer while remembering what it saw.
struct Tracking<'a> {
    inner: &'a mut dyn PhysicsObserver,
    attached: bool,
    detached: bool,
}

impl PhysicsObserver for Tracking<'_> {
    fn notify_attach(&mut self, body: &CharacterBody) {
        self.attached = true;
        self.inner.notify_attach(body);
    }

    fn notify_detach(&mut self, body: &CharacterBody) {
        self.detached = true;
        self.inner.notify_detach(body);
    }

    fn notify_collision(&mut self, hit: &crate::collision::TerrainHit) {
        self.inner.notify_collision(hit);
    }
}

/// Run one fixed tick of `dt` seconds for a character.
///
/// `intent` must already be latched for this tick.
pub fn step_character<T: TerrainQuery + ?Sized>(
    body: &mut CharacterBody,
    moves: &mut MoveSet,
    intent: &ControlIntent,
    config: &ControllerConfig,
    terrain: &T,
    observer: &mut dyn PhysicsObserver,
    dt: f32,
) -> StepReport {
    assert!(dt.is_finite() && dt > 0.0, "invalid timestep {dt}");
    assert!(
        config.anti_tunneling_distance > 0.0,
        "anti-tunneling distance must be positive"
    );

    let scale = config.time_scale(dt);
    let expiring_jump = body.just_jumped;
    let expiring_detach = body.just_detached;
    let mut observer = Tracking {
        inner: observer,
        attached: false,
        detached: false,
    };

    body.tick_horizontal_lock(scale);
    if !body.horizontal_lock {
        if intent.right() {
            body.facing_right = true;
        } else if intent.left() {
            body.facing_right = false;
        }
    }

    {
        let mut ctx = MoveContext {
            body: &mut *body,
            config,
            intent,
            observer: &mut observer,
            scale,
        };
        moves.update(&mut ctx);
        moves.fixed_update(&mut ctx);
    }

    let has_input = intent.has_horizontal();
    let mut resolver = Resolver::new(config, terrain, body.terrain_layer);
    let substeps = stagger(body, config, &mut resolver, &mut observer, has_input, scale);

    if expiring_jump {
        body.just_jumped = false;
    }
    if expiring_detach {
        body.just_detached = false;
    }

    StepReport {
        substeps,
        attached: observer.attached,
        detached: observer.detached,
    }
}

/// Consume `scale` reference ticks of motion in bounded sub-steps.
fn stagger<T: TerrainQuery + ?Sized>(
    body: &mut CharacterBody,
    config: &ControllerConfig,
    resolver: &mut Resolver<'_, T>,
    observer: &mut dyn PhysicsObserver,
    has_input: bool,
    scale: f32,
) -> u32 {
    let threshold = config.anti_tunneling_distance;
    let mut remaining = scale;
    let mut substeps = 0;

    while remaining > STAGGER_EPSILON && substeps < MAX_SUBSTEPS {
        substeps += 1;

        let speed = body.speed();
        let step = if speed * remaining > threshold {
            threshold / speed
        } else {
            remaining
        };

        if integrator::apply_forces(body, config, has_input, step).detach {
            resolver::detach(body, observer);
        }

        body.position += (body.velocity * step).clamp_length_max(threshold);
        resolver.handle_collisions(body, observer);
        resolver.update_surface_angle(body);

        remaining -= step;
    }

    if substeps == MAX_SUBSTEPS {
        warn!("stagger gave up after {MAX_SUBSTEPS} sub-steps at {:?}", body.position);
    }
    substeps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CharacterEvents;
    use crate::segment_terrain::SegmentTerrain;
    use crate::state::WallMode;

    const DT: f32 = 1.0 / 60.0;

    fn weightless() -> ControllerConfig {
        ControllerConfig::default().with_air_gravity(0.0)
    }

    fn step(body: &mut CharacterBody, config: &ControllerConfig, terrain: &SegmentTerrain) -> StepReport {
        let mut moves = MoveSet::new();
        step_character(body, &mut moves, &ControlIntent::new(), config, terrain, &mut (), DT)
    }

    #[test]
    fn one_substep_at_threshold_speed() {
        let config = weightless();
        let terrain = SegmentTerrain::new();
        let mut body = CharacterBody::new(Vec2::ZERO, &config)
            .with_velocity(Vec2::new(config.anti_tunneling_distance, 0.0));
        let report = step(&mut body, &config, &terrain);
        assert_eq!(report.substeps, 1);
        assert!((body.position.x - config.anti_tunneling_distance).abs() < 1e-4);
    }

    #[test]
    fn substeps_cover_distance_in_bounded_moves() {
        let config = weightless();
        let terrain = SegmentTerrain::new();
        for speed in [9.0f32, 16.0, 20.0, 31.5] {
            let mut body =
                CharacterBody::new(Vec2::ZERO, &config).with_velocity(Vec2::new(speed, 0.0));
            let report = step(&mut body, &config, &terrain);
            let expected = (speed / config.anti_tunneling_distance).ceil() as u32;
            assert_eq!(report.substeps, expected, "speed {speed}");
            assert!((body.position.x - speed).abs() < 1e-3, "speed {speed}");
        }
    }

    #[test]
    fn fast_fall_does_not_tunnel_through_thin_floor() {
        let config = ControllerConfig::default();
        let terrain = SegmentTerrain::new().with_box(Vec2::new(-100.0, -2.0), Vec2::new(100.0, 0.0));
        let mut body = CharacterBody::new(Vec2::new(0.0, 30.0), &config)
            .with_velocity(Vec2::new(0.0, -16.0));
        let report = step(&mut body, &config, &terrain);
        assert!(report.attached);
        assert!(body.grounded);
        assert!((body.position.y - 19.0).abs() < 1e-3);
    }

    #[test]
    fn transient_flags_last_one_extra_tick() {
        let config = weightless();
        let terrain = SegmentTerrain::new();
        let mut body = CharacterBody::new(Vec2::new(0.0, 100.0), &config);
        body.just_jumped = true;
        body.just_detached = true;

        step(&mut body, &config, &terrain);
        assert!(!body.just_jumped);
        assert!(!body.just_detached);
    }

    #[test]
    fn grounded_invariant_after_every_tick() {
        let config = ControllerConfig::default();
        let slope = 0.25;
        let terrain = SegmentTerrain::new().with_polygon(vec![
            Vec2::new(-1000.0, -1000.0),
            Vec2::new(1000.0, -1000.0),
            Vec2::new(1000.0, 1000.0 * slope),
            Vec2::new(-1000.0, -1000.0 * slope),
        ]);
        let mut body = CharacterBody::new(Vec2::new(0.0, 22.0), &config);
        let mut moves = MoveSet::standard();
        let mut intent = ControlIntent::new();
        let mut events = CharacterEvents::default();

        for tick in 0..240 {
            intent.set_horizontal(if tick < 120 { 1.0 } else { -1.0 });
            intent.latch();
            events.clear();
            step_character(&mut body, &mut moves, &intent, &config, &terrain, &mut events, DT);
            if body.grounded {
                let expected = crate::math::direction(body.surface_angle) * body.ground_velocity;
                assert!((body.velocity - expected).length() < 1e-3, "tick {tick}");
                assert_eq!(body.wall_mode, WallMode::Floor);
            }
        }
        assert!(body.grounded);
    }

    #[test]
    fn jump_scenario_leaves_ground_immediately() {
        let config = ControllerConfig::default().with_jump_speed(8.0);
        let terrain = SegmentTerrain::new().with_box(Vec2::new(-100.0, -20.0), Vec2::new(100.0, 0.0));
        let mut body = CharacterBody::new(Vec2::new(0.0, 19.0), &config);
        body.attach(0.0, 0.0, WallMode::Floor);
        let mut moves = MoveSet::standard();
        let mut intent = ControlIntent::new();
        intent.set_jump_held(true);
        intent.latch();

        let report = step_character(&mut body, &mut moves, &intent, &config, &terrain, &mut (), DT);
        assert!(report.detached);
        assert!(!body.grounded);
        assert!(body.just_jumped);
        assert!(body.velocity.y > 7.0);
    }

    #[test]
    fn slipping_off_a_wall_locks_input_after_landing() {
        let config = ControllerConfig::default();
        let terrain = SegmentTerrain::new()
            .with_box(Vec2::new(-200.0, -20.0), Vec2::new(200.0, 0.0))
            .with_box(Vec2::new(19.0, 0.0), Vec2::new(60.0, 300.0));
        let mut body = CharacterBody::new(Vec2::new(0.0, 100.0), &config);
        body.attach(1.0, 90.0, WallMode::Right);
        body.just_landed = false;
        let mut moves = MoveSet::standard();
        let mut intent = ControlIntent::new();
        intent.latch();

        let report = step_character(&mut body, &mut moves, &intent, &config, &terrain, &mut (), DT);
        assert!(report.detached);
        assert!(!body.grounded);
        assert!(body.pending_horizontal_lock);

        for _ in 0..120 {
            step_character(&mut body, &mut moves, &intent, &config, &terrain, &mut (), DT);
            if body.grounded {
                break;
            }
        }
        assert!(body.grounded);
        assert!(body.horizontal_lock);
    }
}
