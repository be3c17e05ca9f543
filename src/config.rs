//! Controller configuration.
//!
//! [`ControllerConfig`] holds every tuning constant of the physics core. It is
//! treated as immutable while the simulation runs: moves that need to change
//! a parameter temporarily change the body's
//! [`MotionParams`](crate::state::MotionParams) instead and restore them from
//! the config on exit.
//!
//! Units: angles are degrees, speeds are world units per reference tick,
//! accelerations are units per reference tick squared, and timers count
//! reference ticks. A simulation running at a different fixed timestep scales
//! everything by `timestep / reference_timestep`.

use bevy::prelude::*;

use crate::math;
use crate::state::Hitbox;

/// Placement of the sensor rig relative to the hitbox.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    /// Horizontal reach of the push sensors from the body centre.
    pub side_extent: f32,
    /// Local height of the push sensors (0 = body centre).
    pub side_height: f32,
    /// How far above each foot the grounded foot casts start.
    ///
    /// Steps up to this height are climbed without losing the surface.
    pub ledge_climb_height: f32,
    /// How far below each foot the grounded foot casts reach.
    ///
    /// Drops up to this height are followed without detaching.
    pub ledge_drop_height: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            side_extent: 10.0,
            side_height: 0.0,
            ledge_climb_height: 8.0,
            ledge_drop_height: 14.0,
        }
    }
}

/// Configuration parameters for the character physics core.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === Time ===
    /// Timestep the constants are tuned for, in seconds.
    pub reference_timestep: f32,

    // === Ground movement ===
    /// Acceleration from input while grounded.
    pub acceleration: f32,
    /// Braking when input opposes the direction of travel.
    pub deceleration: f32,
    /// Deceleration toward zero without input.
    pub friction: f32,
    /// Speed at which input acceleration stops.
    pub top_speed: f32,
    /// Hard cap on ground speed.
    pub max_speed: f32,

    // === Slopes ===
    /// Slope gravity constant, scaled by `sin(surface_angle)`.
    pub slope_gravity: f32,
    /// Slopes flatter than this get no slope gravity.
    pub min_slope_gravity_angle: f32,
    /// Ground speed below which a steep surface cannot be held.
    pub detach_speed: f32,
    /// Surfaces within this many degrees of vertical count as walls when
    /// evaluating landings; anything at least `90 - max_vertical_detach_angle`
    /// away from a flat floor is steep.
    pub max_vertical_detach_angle: f32,
    /// Ticks of horizontal lock after slipping off a steep surface.
    pub horizontal_lock_time: f32,

    // === Air movement ===
    /// Acceleration from input while airborne.
    pub air_acceleration: f32,
    /// Downward acceleration while airborne.
    pub air_gravity: f32,
    /// Terminal falling speed.
    pub max_fall_speed: f32,
    /// Horizontal speed multiplier applied per tick while rising slowly.
    pub air_drag: f32,
    /// Air drag only applies above this horizontal speed.
    pub air_drag_min_speed: f32,
    /// Air drag only applies while rising slower than this.
    pub air_drag_max_rise: f32,

    // === Jumping ===
    /// Speed added along the surface normal on jump.
    pub jump_speed: f32,
    /// Upward speed cap once the jump button is released.
    pub jump_release_speed: f32,
    /// Minimum angle between the pre-jump and post-jump air direction.
    ///
    /// A jump at high ground speed barely changes the direction of travel; the
    /// velocity is rotated further away from the surface until the change is
    /// at least this large. Zero disables the correction.
    pub force_jump_angle_difference: f32,

    // === Rolling ===
    /// Minimum ground speed to start rolling.
    pub min_roll_speed: f32,
    /// Rolling stops below this ground speed.
    pub unroll_speed: f32,
    /// Friction while rolling.
    pub roll_friction: f32,
    /// Braking while rolling.
    pub roll_deceleration: f32,
    /// Slope gravity while rolling uphill.
    pub roll_slope_gravity_uphill: f32,
    /// Slope gravity while rolling downhill.
    pub roll_slope_gravity_downhill: f32,
    /// Collision box while rolling.
    pub roll_hitbox: Hitbox,

    // === Spindash ===
    /// Launch speed of an uncharged spindash.
    pub spindash_base_speed: f32,
    /// Charge added per jump press.
    pub spindash_charge_per_press: f32,
    /// Maximum charge.
    pub spindash_max_charge: f32,
    /// Charge multiplier applied per tick.
    pub spindash_charge_decay: f32,
    /// A spindash can only start below this ground speed.
    pub spindash_max_start_speed: f32,

    // === Surface tracking ===
    /// Largest surface angle change accepted between ticks.
    pub max_surface_angle_difference: f32,
    /// Surfaces within this many degrees of a cardinal angle count as flat.
    pub min_flat_attach_angle: f32,
    /// Feet disagreeing by more than this are bridged by the line between them.
    pub min_flat_overlap_range: f32,
    /// Signed foot disagreement must exceed this for the bridge to be used.
    pub min_overlap_angle: f32,
    /// Bias of the wall-mode buckets on attach (see
    /// [`WallMode::from_surface_angle`](crate::state::WallMode::from_surface_angle)).
    pub attach_wall_mode_weight: f32,
    /// Hysteresis beyond the 45 degree boundaries before the wall mode changes.
    pub wall_mode_switch_tolerance: f32,

    // === Collision ===
    /// Largest displacement of a single position update.
    pub anti_tunneling_distance: f32,
    /// Collision box while standing.
    pub hitbox: Hitbox,
    /// Sensor placement.
    pub sensors: SensorConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reference_timestep: 1.0 / 60.0,

            acceleration: 0.046875,
            deceleration: 0.5,
            friction: 0.046875,
            top_speed: 6.0,
            max_speed: 16.0,

            slope_gravity: 0.125,
            min_slope_gravity_angle: 5.0,
            detach_speed: 2.5,
            max_vertical_detach_angle: 44.0,
            horizontal_lock_time: 30.0,

            air_acceleration: 0.09375,
            air_gravity: 0.21875,
            max_fall_speed: 16.0,
            air_drag: 0.96875,
            air_drag_min_speed: 0.125,
            air_drag_max_rise: 4.0,

            jump_speed: 6.5,
            jump_release_speed: 4.0,
            force_jump_angle_difference: 0.0,

            min_roll_speed: 1.03125,
            unroll_speed: 0.5,
            roll_friction: 0.0234375,
            roll_deceleration: 0.125,
            roll_slope_gravity_uphill: 0.078125,
            roll_slope_gravity_downhill: 0.3125,
            roll_hitbox: Hitbox {
                half_width: 7.0,
                half_height: 14.0,
            },

            spindash_base_speed: 8.0,
            spindash_charge_per_press: 2.0,
            spindash_max_charge: 8.0,
            spindash_charge_decay: 0.96875,
            spindash_max_start_speed: 0.5,

            max_surface_angle_difference: 70.0,
            min_flat_attach_angle: 5.0,
            min_flat_overlap_range: 7.0,
            min_overlap_angle: -40.0,
            attach_wall_mode_weight: 0.0,
            wall_mode_switch_tolerance: 5.0,

            anti_tunneling_distance: 8.0,
            hitbox: Hitbox::default(),
            sensors: SensorConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Classic tuning (the default).
    pub fn classic() -> Self {
        Self::default()
    }

    /// Low gravity, strong air control.
    pub fn floaty() -> Self {
        Self {
            air_gravity: 0.109375,
            air_acceleration: 0.1875,
            jump_speed: 5.5,
            jump_release_speed: 3.0,
            ..default()
        }
    }

    /// Scale factor from a fixed timestep to reference ticks.
    #[inline]
    pub fn time_scale(&self, timestep: f32) -> f32 {
        timestep / self.reference_timestep
    }

    /// Whether a surface is too steep to hold at low speed.
    pub fn is_steep(&self, surface_angle: f32) -> bool {
        math::angle_delta(0.0, surface_angle).abs() >= 90.0 - self.max_vertical_detach_angle
    }

    /// Whether a surface is within `max_vertical_detach_angle` of a wall.
    pub fn is_near_vertical(&self, surface_angle: f32) -> bool {
        math::angle_near(surface_angle, 90.0, self.max_vertical_detach_angle)
            || math::angle_near(surface_angle, 270.0, self.max_vertical_detach_angle)
    }

    /// Builder: set the reference timestep.
    pub fn with_reference_timestep(mut self, timestep: f32) -> Self {
        self.reference_timestep = timestep;
        self
    }

    /// Builder: set ground acceleration parameters.
    pub fn with_ground_movement(mut self, acceleration: f32, deceleration: f32, friction: f32) -> Self {
        self.acceleration = acceleration;
        self.deceleration = deceleration;
        self.friction = friction;
        self
    }

    /// Builder: set friction.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Builder: set top and max speed.
    pub fn with_speeds(mut self, top_speed: f32, max_speed: f32) -> Self {
        self.top_speed = top_speed;
        self.max_speed = max_speed;
        self
    }

    /// Builder: set air gravity.
    pub fn with_air_gravity(mut self, gravity: f32) -> Self {
        self.air_gravity = gravity;
        self
    }

    /// Builder: set slope gravity.
    pub fn with_slope_gravity(mut self, gravity: f32) -> Self {
        self.slope_gravity = gravity;
        self
    }

    /// Builder: set jump speed.
    pub fn with_jump_speed(mut self, speed: f32) -> Self {
        self.jump_speed = speed;
        self
    }

    /// Builder: set the forced jump divergence angle.
    pub fn with_force_jump_angle_difference(mut self, degrees: f32) -> Self {
        self.force_jump_angle_difference = degrees;
        self
    }

    /// Builder: set the detach speed floor.
    pub fn with_detach_speed(mut self, speed: f32) -> Self {
        self.detach_speed = speed;
        self
    }

    /// Builder: set the surface angle tolerance.
    pub fn with_max_surface_angle_difference(mut self, degrees: f32) -> Self {
        self.max_surface_angle_difference = degrees;
        self
    }

    /// Builder: set the anti-tunneling distance.
    pub fn with_anti_tunneling_distance(mut self, distance: f32) -> Self {
        self.anti_tunneling_distance = distance;
        self
    }

    /// Builder: set the horizontal lock duration.
    pub fn with_horizontal_lock_time(mut self, ticks: f32) -> Self {
        self.horizontal_lock_time = ticks;
        self
    }

    /// Builder: set the standing hitbox.
    pub fn with_hitbox(mut self, half_width: f32, half_height: f32) -> Self {
        self.hitbox = Hitbox {
            half_width,
            half_height,
        };
        self
    }

    /// Builder: set ledge climb and drop allowances.
    pub fn with_ledge_heights(mut self, climb: f32, drop: f32) -> Self {
        self.sensors.ledge_climb_height = climb;
        self.sensors.ledge_drop_height = drop;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_classic() {
        assert_eq!(ControllerConfig::default(), ControllerConfig::classic());
    }

    #[test]
    fn floaty_preset_falls_slower() {
        let floaty = ControllerConfig::floaty();
        let classic = ControllerConfig::classic();
        assert!(floaty.air_gravity < classic.air_gravity);
    }

    #[test]
    fn time_scale_is_one_at_reference() {
        let config = ControllerConfig::default();
        assert!((config.time_scale(1.0 / 60.0) - 1.0).abs() < 1e-6);
        assert!((config.time_scale(1.0 / 120.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn steepness() {
        let config = ControllerConfig::default();
        assert!(!config.is_steep(0.0));
        assert!(!config.is_steep(30.0));
        assert!(config.is_steep(60.0));
        assert!(config.is_steep(180.0));
        assert!(config.is_steep(300.0));
        assert!(!config.is_steep(330.0));
    }

    #[test]
    fn near_vertical() {
        let config = ControllerConfig::default().with_hitbox(9.0, 19.0);
        assert!(config.is_near_vertical(90.0));
        assert!(config.is_near_vertical(270.0));
        assert!(!config.is_near_vertical(0.0));
        assert!(!config.is_near_vertical(180.0));
    }

    #[test]
    fn stagger_distance_fits_hitbox() {
        let config = ControllerConfig::default();
        assert!(config.anti_tunneling_distance < config.hitbox.half_height);
        assert!(config.anti_tunneling_distance <= config.sensors.ledge_climb_height);
    }

    #[test]
    fn builders() {
        let config = ControllerConfig::default()
            .with_jump_speed(8.0)
            .with_force_jump_angle_difference(20.0)
            .with_ledge_heights(4.0, 10.0);
        assert_eq!(config.jump_speed, 8.0);
        assert_eq!(config.force_jump_angle_difference, 20.0);
        assert_eq!(config.sensors.ledge_climb_height, 4.0);
        assert_eq!(config.sensors.ledge_drop_height, 10.0);
    }
}
