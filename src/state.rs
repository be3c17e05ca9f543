//! Character state.
//!
//! [`CharacterBody`] is the simulated entity. While grounded its canonical
//! velocity is the scalar `ground_velocity`; while airborne it is the world
//! space `velocity`. The other representation is always a projection.
//!
//! [`Grounded`] and [`Airborne`] are marker components kept in sync with the
//! body by the controller systems, for convenient filtering in queries.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::math;

/// Marker component indicating the character is grounded.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use hedgehog_physics::prelude::*;
///
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Which cardinal direction currently acts as "down" for the character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WallMode {
    /// Airborne; no surface defines down.
    #[default]
    None,
    /// Standing on a floor, down is world -Y.
    Floor,
    /// Running on a wall to the right, down is world +X.
    Right,
    /// Running on a ceiling, down is world +Y.
    Ceiling,
    /// Running on a wall to the left, down is world -X.
    Left,
}

impl WallMode {
    /// All surface modes in counter-clockwise order.
    pub const SURFACES: [WallMode; 4] = [
        WallMode::Floor,
        WallMode::Right,
        WallMode::Ceiling,
        WallMode::Left,
    ];

    /// Centre surface angle of the mode. `None` maps to the floor angle.
    pub fn angle(self) -> f32 {
        match self {
            WallMode::None | WallMode::Floor => 0.0,
            WallMode::Right => 90.0,
            WallMode::Ceiling => 180.0,
            WallMode::Left => 270.0,
        }
    }

    /// World direction the character's feet point toward.
    pub fn down(self) -> Vec2 {
        match self {
            WallMode::None | WallMode::Floor => Vec2::NEG_Y,
            WallMode::Right => Vec2::X,
            WallMode::Ceiling => Vec2::Y,
            WallMode::Left => Vec2::NEG_X,
        }
    }

    /// World direction the character's head points toward.
    pub fn up(self) -> Vec2 {
        -self.down()
    }

    /// World direction of positive ground velocity.
    pub fn forward(self) -> Vec2 {
        math::direction(self.angle())
    }

    /// Neighbouring mode one quarter turn clockwise.
    pub fn clockwise(self) -> WallMode {
        match self {
            WallMode::None | WallMode::Floor => WallMode::Left,
            WallMode::Left => WallMode::Ceiling,
            WallMode::Ceiling => WallMode::Right,
            WallMode::Right => WallMode::Floor,
        }
    }

    /// Neighbouring mode one quarter turn counter-clockwise.
    pub fn counter_clockwise(self) -> WallMode {
        match self {
            WallMode::None | WallMode::Floor => WallMode::Right,
            WallMode::Right => WallMode::Ceiling,
            WallMode::Ceiling => WallMode::Left,
            WallMode::Left => WallMode::Floor,
        }
    }

    /// Bucket a surface angle into a mode.
    ///
    /// The four buckets are 90 degrees wide and centred on 0/90/180/270.
    /// A positive `weight` widens the floor and ceiling buckets by that many
    /// degrees on each side at the expense of the walls; a negative weight
    /// favours the walls.
    pub fn from_surface_angle(angle: f32, weight: f32) -> WallMode {
        let half = 45.0 + weight.clamp(-44.0, 44.0);
        if math::angle_near(angle, 0.0, half) {
            WallMode::Floor
        } else if math::angle_near(angle, 180.0, half) {
            WallMode::Ceiling
        } else if math::angle_delta(90.0, angle).abs() < 90.0 {
            WallMode::Right
        } else {
            WallMode::Left
        }
    }

    /// Next mode for a continuously changing surface angle.
    ///
    /// The current mode is kept until the angle is more than
    /// `45 + tolerance` degrees from its centre, which stops the mode from
    /// flickering on a surface that sits right on a bucket boundary.
    pub fn transition(self, angle: f32, tolerance: f32) -> WallMode {
        if self == WallMode::None {
            return WallMode::from_surface_angle(angle, 0.0);
        }
        if math::angle_delta(self.angle(), angle).abs() > 45.0 + tolerance {
            WallMode::from_surface_angle(angle, 0.0)
        } else {
            self
        }
    }
}

/// Which foot currently defines the surface.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Footing {
    /// No foot is in contact.
    #[default]
    None,
    /// The left foot sensor.
    Left,
    /// The right foot sensor.
    Right,
}

impl Footing {
    /// The other foot. `None` stays `None`.
    pub fn opposite(self) -> Footing {
        match self {
            Footing::None => Footing::None,
            Footing::Left => Footing::Right,
            Footing::Right => Footing::Left,
        }
    }
}

/// Half extents of the character's collision box.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    /// Distance from centre to each foot / push sensor column.
    pub half_width: f32,
    /// Distance from centre to the feet and to the head.
    pub half_height: f32,
}

impl Default for Hitbox {
    fn default() -> Self {
        Self {
            half_width: 9.0,
            half_height: 19.0,
        }
    }
}

/// Physics parameters moves are allowed to change while active.
///
/// Initialized from [`ControllerConfig`] and restored from it when a move
/// that changed them exits. The resolver reads these every tick, so a change
/// takes effect on the next collision pass.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Ground acceleration from input.
    pub acceleration: f32,
    /// Ground braking when input opposes motion.
    pub deceleration: f32,
    /// Ground friction without input.
    pub friction: f32,
    /// Speed input acceleration stops at.
    pub top_speed: f32,
    /// Air acceleration from input.
    pub air_acceleration: f32,
    /// Downward acceleration in the air.
    pub air_gravity: f32,
    /// Slope gravity while moving uphill.
    pub slope_gravity_uphill: f32,
    /// Slope gravity while moving downhill.
    pub slope_gravity_downhill: f32,
    /// Collision box.
    pub hitbox: Hitbox,
}

impl MotionParams {
    /// Parameters for a character in its default (standing) shape.
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            acceleration: config.acceleration,
            deceleration: config.deceleration,
            friction: config.friction,
            top_speed: config.top_speed,
            air_acceleration: config.air_acceleration,
            air_gravity: config.air_gravity,
            slope_gravity_uphill: config.slope_gravity,
            slope_gravity_downhill: config.slope_gravity,
            hitbox: config.hitbox,
        }
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

/// The simulated character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterBody {
    // === Pose ===
    /// World position of the body centre.
    pub position: Vec2,
    /// Body rotation in degrees. Matches the surface angle while grounded.
    pub rotation: f32,

    // === Motion ===
    /// World velocity in units per reference tick. Canonical while airborne.
    pub velocity: Vec2,
    /// Signed speed along the surface. Canonical while grounded.
    pub ground_velocity: f32,

    // === Surface ===
    /// Whether the body is attached to a surface.
    pub grounded: bool,
    /// Which direction is "down".
    pub wall_mode: WallMode,
    /// Angle of the surface under the feet, `[0, 360)`.
    pub surface_angle: f32,
    /// Surface angle of the previous bookkeeping pass.
    pub last_surface_angle: f32,
    /// Which foot defines the surface.
    pub footing: Footing,
    /// Terrain layer used for path switching.
    pub terrain_layer: u8,
    /// Last horizontal input direction.
    pub facing_right: bool,

    // === Transient flags ===
    /// Set by a jump; lasts through the next full tick.
    pub just_jumped: bool,
    /// Set by a detach; lasts through the next full tick.
    pub just_detached: bool,
    /// Set by attach; cleared once the surface bookkeeping accepts the angle.
    pub just_landed: bool,

    // === Horizontal lock ===
    /// Directional input is ignored on the ground while set.
    pub horizontal_lock: bool,
    /// Remaining lock time in reference ticks.
    pub horizontal_lock_timer: f32,
    /// Lock to apply on the next attach.
    pub pending_horizontal_lock: bool,

    // === Parameters ===
    /// Parameters active moves may change.
    pub params: MotionParams,
}

impl Default for CharacterBody {
    fn default() -> Self {
        Self::new(Vec2::ZERO, &ControllerConfig::default())
    }
}

impl CharacterBody {
    /// Create an airborne body at `position`.
    pub fn new(position: Vec2, config: &ControllerConfig) -> Self {
        Self {
            position,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            ground_velocity: 0.0,
            grounded: false,
            wall_mode: WallMode::None,
            surface_angle: 0.0,
            last_surface_angle: 0.0,
            footing: Footing::None,
            terrain_layer: 0,
            facing_right: true,
            just_jumped: false,
            just_detached: false,
            just_landed: false,
            horizontal_lock: false,
            horizontal_lock_timer: 0.0,
            pending_horizontal_lock: false,
            params: MotionParams::from_config(config),
        }
    }

    /// Builder: set the initial velocity.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: set the terrain layer.
    pub fn with_terrain_layer(mut self, layer: u8) -> Self {
        self.terrain_layer = layer;
        self
    }

    /// Magnitude of the world velocity.
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Unit vector along the surface in the direction of positive ground velocity.
    pub fn surface_tangent(&self) -> Vec2 {
        math::direction(self.surface_angle)
    }

    /// Unit vector pointing away from the surface.
    pub fn surface_normal(&self) -> Vec2 {
        math::direction(self.surface_angle + 90.0)
    }

    /// Recompute `velocity` from `ground_velocity` and `surface_angle`.
    pub fn sync_velocity_from_ground(&mut self) {
        self.velocity = self.surface_tangent() * self.ground_velocity;
    }

    /// Enter the grounded state. No terrain is consulted.
    pub fn attach(&mut self, ground_velocity: f32, angle: f32, wall_mode: WallMode) {
        let angle = math::normalize_angle(angle);
        self.ground_velocity = ground_velocity;
        self.surface_angle = angle;
        self.last_surface_angle = angle;
        self.rotation = angle;
        self.grounded = true;
        self.just_landed = true;
        self.wall_mode = wall_mode;
        if self.pending_horizontal_lock {
            self.pending_horizontal_lock = false;
            self.horizontal_lock = true;
        }
        self.sync_velocity_from_ground();
    }

    /// Leave the grounded state, keeping the projected world velocity.
    pub fn detach(&mut self) {
        if self.grounded {
            self.sync_velocity_from_ground();
        }
        self.grounded = false;
        self.just_detached = true;
        self.just_landed = false;
        self.wall_mode = WallMode::None;
        self.footing = Footing::None;
    }

    /// Queue a horizontal lock of `ticks` for the next landing.
    pub fn queue_horizontal_lock(&mut self, ticks: f32) {
        self.pending_horizontal_lock = true;
        self.horizontal_lock_timer = self.horizontal_lock_timer.max(ticks);
    }

    /// Count the horizontal lock down by `ticks`.
    pub fn tick_horizontal_lock(&mut self, ticks: f32) {
        if !self.horizontal_lock {
            return;
        }
        self.horizontal_lock_timer -= ticks;
        if self.horizontal_lock_timer <= 0.0 {
            self.horizontal_lock_timer = 0.0;
            self.horizontal_lock = false;
        }
    }
}
