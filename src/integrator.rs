//! Velocity and force integration.
//!
//! The integrator applies the forces the core owns: slope gravity, friction
//! without input, the speed cap, and air gravity. Input acceleration is not
//! here; it belongs to the control moves, which change `ground_velocity` or
//! `velocity` before the collision pass reads them.
//!
//! Every function takes a `scale` in reference ticks, so the same constants
//! work at any fixed timestep and for partial stagger sub-steps.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::math;
use crate::state::CharacterBody;

/// What the integrator asks the caller to do after applying forces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceOutcome {
    /// The body is on a steep surface below detach speed and must let go.
    ///
    /// A horizontal lock has already been queued for the next landing.
    pub detach: bool,
}

/// Apply one (sub-)step of forces to `body`.
///
/// `has_input` is whether directional input is being applied to the ground
/// speed this tick; friction only acts without it.
pub fn apply_forces(
    body: &mut CharacterBody,
    config: &ControllerConfig,
    has_input: bool,
    scale: f32,
) -> ForceOutcome {
    if body.grounded {
        apply_ground_forces(body, config, has_input, scale)
    } else {
        apply_air_forces(body, config, scale);
        ForceOutcome::default()
    }
}

fn apply_ground_forces(
    body: &mut CharacterBody,
    config: &ControllerConfig,
    has_input: bool,
    scale: f32,
) -> ForceOutcome {
    let angle = body.surface_angle;

    if math::angle_delta(0.0, angle).abs() > config.min_slope_gravity_angle {
        let sin = angle.to_radians().sin();
        // Moving along +tangent on a positive-sine slope is moving uphill.
        let uphill = body.ground_velocity * sin > 0.0;
        let gravity = if uphill {
            body.params.slope_gravity_uphill
        } else {
            body.params.slope_gravity_downhill
        };
        body.ground_velocity -= gravity * sin * scale;
    }

    if !has_input || body.horizontal_lock {
        body.ground_velocity = math::approach_zero(body.ground_velocity, body.params.friction * scale);
    }

    body.ground_velocity = body
        .ground_velocity
        .clamp(-config.max_speed, config.max_speed);
    body.sync_velocity_from_ground();

    if config.is_steep(angle) && body.ground_velocity.abs() < config.detach_speed {
        debug!(
            "too slow for surface at {:.1} degrees (ground speed {:.3}), letting go",
            angle, body.ground_velocity
        );
        body.queue_horizontal_lock(config.horizontal_lock_time);
        return ForceOutcome { detach: true };
    }

    ForceOutcome::default()
}

fn apply_air_forces(body: &mut CharacterBody, config: &ControllerConfig, scale: f32) {
    body.velocity.y -= body.params.air_gravity * scale;
    body.velocity.y = body.velocity.y.max(-config.max_fall_speed);
    body.rotation = 0.0;
}

/// Velocity after jumping off a surface at `surface_angle`.
///
/// Adds `jump_speed` along the surface normal. If that changes the direction
/// of travel by less than `force_angle` degrees, the result is rotated away
/// from the old direction until the change is exactly `force_angle`, keeping
/// its magnitude.
pub fn jump_velocity(velocity: Vec2, surface_angle: f32, jump_speed: f32, force_angle: f32) -> Vec2 {
    let normal_angle = surface_angle + 90.0;
    let jumped = velocity + math::direction(normal_angle) * jump_speed;

    if force_angle <= 0.0
        || velocity.length_squared() <= f32::EPSILON
        || jumped.length_squared() <= f32::EPSILON
    {
        return jumped;
    }

    let before = math::vector_angle(velocity);
    let change = math::angle_delta(before, math::vector_angle(jumped));
    if change.abs() >= force_angle {
        return jumped;
    }

    let toward = if change != 0.0 {
        change
    } else {
        math::angle_delta(before, normal_angle)
    };
    if toward == 0.0 {
        return jumped;
    }
    math::rotate_to(jumped, before + force_angle.copysign(toward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WallMode;

    const EPS: f32 = 1e-4;

    fn grounded(vg: f32, angle: f32) -> CharacterBody {
        let mut body = CharacterBody::default();
        body.attach(vg, angle, WallMode::from_surface_angle(angle, 0.0));
        body.just_landed = false;
        body
    }

    #[test]
    fn friction_without_input() {
        let config = ControllerConfig::default();
        let mut body = grounded(1.0, 0.0);
        apply_forces(&mut body, &config, false, 1.0);
        assert!((body.ground_velocity - (1.0 - config.friction)).abs() < EPS);

        // Input suppresses friction.
        let mut body = grounded(1.0, 0.0);
        apply_forces(&mut body, &config, true, 1.0);
        assert_eq!(body.ground_velocity, 1.0);
    }

    #[test]
    fn friction_stops_at_zero() {
        let config = ControllerConfig::default();
        let mut body = grounded(0.01, 0.0);
        apply_forces(&mut body, &config, false, 1.0);
        assert_eq!(body.ground_velocity, 0.0);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn horizontal_lock_applies_friction_despite_input() {
        let config = ControllerConfig::default();
        let mut body = grounded(1.0, 0.0);
        body.horizontal_lock = true;
        apply_forces(&mut body, &config, true, 1.0);
        assert!(body.ground_velocity < 1.0);
    }

    #[test]
    fn slope_gravity_pulls_downhill() {
        let config = ControllerConfig::default();
        // Standing still on a slope rising to the right slides left.
        let mut body = grounded(0.0, 30.0);
        apply_forces(&mut body, &config, true, 1.0);
        let expected = -config.slope_gravity * 0.5;
        assert!((body.ground_velocity - expected).abs() < EPS);
        assert!(body.velocity.x < 0.0 && body.velocity.y < 0.0);
    }

    #[test]
    fn slope_gravity_ignored_on_gentle_slopes() {
        let config = ControllerConfig::default();
        let mut body = grounded(3.0, 3.0);
        apply_forces(&mut body, &config, true, 1.0);
        assert_eq!(body.ground_velocity, 3.0);
    }

    #[test]
    fn slope_gravity_picks_uphill_parameter() {
        let config = ControllerConfig::default();
        let mut body = grounded(4.0, 30.0);
        body.params.slope_gravity_uphill = 0.2;
        body.params.slope_gravity_downhill = 1.0;
        apply_forces(&mut body, &config, true, 1.0);
        assert!((body.ground_velocity - (4.0 - 0.1)).abs() < EPS);
    }

    #[test]
    fn ground_speed_is_capped() {
        let config = ControllerConfig::default();
        let mut body = grounded(40.0, 0.0);
        apply_forces(&mut body, &config, true, 1.0);
        assert_eq!(body.ground_velocity, config.max_speed);
    }

    #[test]
    fn grounded_velocity_tracks_ground_speed() {
        let config = ControllerConfig::default();
        let mut body = grounded(5.0, 20.0);
        apply_forces(&mut body, &config, false, 1.0);
        let expected = math::direction(20.0) * body.ground_velocity;
        assert!((body.velocity - expected).length() < EPS);
    }

    #[test]
    fn slow_on_steep_surface_requests_detach() {
        let config = ControllerConfig::default();
        let mut body = grounded(1.0, 90.0);
        let outcome = apply_forces(&mut body, &config, true, 1.0);
        assert!(outcome.detach);
        assert!(body.pending_horizontal_lock);

        let mut body = grounded(8.0, 90.0);
        let outcome = apply_forces(&mut body, &config, true, 1.0);
        assert!(!outcome.detach);
    }

    #[test]
    fn air_gravity_and_fall_cap() {
        let config = ControllerConfig::default();
        let mut body = CharacterBody::default();
        body.rotation = 25.0;
        apply_forces(&mut body, &config, false, 1.0);
        assert!((body.velocity.y + config.air_gravity).abs() < EPS);
        assert_eq!(body.rotation, 0.0);

        body.velocity.y = -config.max_fall_speed;
        apply_forces(&mut body, &config, false, 1.0);
        assert_eq!(body.velocity.y, -config.max_fall_speed);
    }

    #[test]
    fn forces_scale_with_time() {
        let config = ControllerConfig::default();
        let mut body = CharacterBody::default();
        apply_forces(&mut body, &config, false, 0.5);
        assert!((body.velocity.y + config.air_gravity * 0.5).abs() < EPS);
    }

    #[test]
    fn jump_from_flat_ground_adds_normal_speed() {
        let v = jump_velocity(Vec2::new(3.0, 0.0), 0.0, 8.0, 0.0);
        assert!((v - Vec2::new(3.0, 8.0)).length() < EPS);
    }

    #[test]
    fn jump_from_wall_pushes_away() {
        // A right wall's normal points to -X.
        let v = jump_velocity(Vec2::new(0.0, 2.0), 90.0, 6.0, 0.0);
        assert!((v - Vec2::new(-6.0, 2.0)).length() < EPS);
    }

    #[test]
    fn forced_divergence_rotates_velocity() {
        let v = jump_velocity(Vec2::new(10.0, 0.0), 0.0, 8.0, 45.0);
        // Natural change is atan(0.8) = 38.7 degrees, below the 45 minimum.
        assert!((math::vector_angle(v) - 45.0).abs() < 1e-3);
        assert!((v.length() - Vec2::new(10.0, 8.0).length()).abs() < 1e-3);
    }

    #[test]
    fn forced_divergence_leaves_large_changes_alone() {
        let v = jump_velocity(Vec2::new(2.0, 0.0), 0.0, 8.0, 45.0);
        assert!((v - Vec2::new(2.0, 8.0)).length() < EPS);
    }

    #[test]
    fn forced_divergence_follows_the_turn_direction() {
        // Running left on flat ground: the jump turns clockwise.
        let v = jump_velocity(Vec2::new(-10.0, 0.0), 0.0, 8.0, 45.0);
        assert!((math::vector_angle(v) - 135.0).abs() < 1e-3);
    }
}
