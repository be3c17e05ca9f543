//! # `hedgehog_physics`
//!
//! Sensor-based 2D character physics in the style of classic high-speed
//! platformers, for Bevy.
//!
//! This crate provides a kinematic character that:
//! - Runs along arbitrary terrain angles, including walls, ceilings and loops
//! - Finds the ground with a rig of line-cast sensors around a small hitbox
//! - Switches between floor, wall and ceiling modes with hysteresis
//! - Keeps a signed ground speed while attached and a free velocity in the air
//! - Sub-steps fast motion so it never skips through thin terrain
//! - Drives moves (running, jumping, rolling, spindash) through a layered
//!   state machine
//! - Abstracts the terrain source (Rapier2D and a pure segment terrain included)
//!
//! ## Architecture
//!
//! Every fixed tick, each character runs a strict pipeline:
//! 1. Moves are polled and may change velocity or parameters
//! 2. Forces are applied (slope gravity, friction, air gravity)
//! 3. The body moves, at most `anti_tunneling_distance` per sub-step
//! 4. The resolver pushes it out of walls and ceilings, snaps it to the
//!    ground, and attaches or detaches it
//! 5. The surface angle and wall mode are confirmed
//!
//! The pipeline lives in [`controller::step_character`] and needs nothing
//! from the ECS; the plugin only schedules it.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use hedgehog_physics::prelude::*;
//!
//! let mut app = App::new();
//! app.add_plugins(MinimalPlugins)
//!     .add_plugins(HedgehogPhysicsPlugin::<SegmentTerrainBackend>::default())
//!     .insert_resource(
//!         SegmentTerrain::new().with_box(Vec2::new(-500.0, -50.0), Vec2::new(500.0, 0.0)),
//!     );
//!
//! app.world_mut().spawn(HedgehogCharacterBundle::new(
//!     Vec2::new(0.0, 40.0),
//!     ControllerConfig::classic(),
//! ));
//! ```

use bevy::prelude::*;

pub mod abilities;
pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod events;
pub mod integrator;
pub mod intent;
pub mod math;
pub mod moves;
pub mod resolver;
pub mod segment_terrain;
pub mod sensors;
pub mod state;
pub mod systems;
pub mod terrain;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::abilities::{AirControl, GroundControl, Jump, Roll, Spindash};
    pub use crate::backend::{PoseSink, SegmentTerrainBackend, TerrainBackend};
    pub use crate::collision::{SensorSide, TerrainHit};
    pub use crate::config::{ControllerConfig, SensorConfig};
    pub use crate::controller::{step_character, StepReport};
    pub use crate::events::{CharacterEvent, CharacterEvents, PhysicsObserver};
    pub use crate::intent::ControlIntent;
    pub use crate::moves::{Move, MoveContext, MoveLayer, MoveSet, MoveState};
    pub use crate::segment_terrain::SegmentTerrain;
    pub use crate::state::{Airborne, CharacterBody, Footing, Grounded, Hitbox, WallMode};
    pub use crate::terrain::{TerrainMask, TerrainQuery};
    pub use crate::{HedgehogCharacterBundle, HedgehogPhysicsPlugin, HedgehogPhysicsSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::Rapier2dBackend;
}

/// Ordered phases of the per-tick pipeline in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HedgehogPhysicsSet {
    /// Clear events and latch input.
    Preparation,
    /// Step every character against the backend's terrain.
    Simulation,
    /// Publish poses and state markers.
    Sync,
}

/// Main plugin for hedgehog physics.
///
/// This plugin is generic over a terrain backend `B` which provides the line
/// cast and schedules the simulation system.
///
/// # Type Parameters
/// - `B`: The terrain backend (e.g., `Rapier2dBackend`, `SegmentTerrainBackend`)
///
/// # Examples
///
/// With Rapier2D terrain:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use hedgehog_physics::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(HedgehogPhysicsPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct HedgehogPhysicsPlugin<B: backend::TerrainBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::TerrainBackend> Default for HedgehogPhysicsPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::TerrainBackend> Plugin for HedgehogPhysicsPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::SensorConfig>();
        app.register_type::<intent::ControlIntent>();
        app.register_type::<state::CharacterBody>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<events::CharacterEvents>();

        app.configure_sets(
            FixedUpdate,
            (
                HedgehogPhysicsSet::Preparation,
                HedgehogPhysicsSet::Simulation,
                HedgehogPhysicsSet::Sync,
            )
                .chain(),
        );

        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (systems::clear_character_events, systems::latch_intents)
                .in_set(HedgehogPhysicsSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            (systems::write_body_pose, systems::sync_state_markers)
                .in_set(HedgehogPhysicsSet::Sync),
        );
    }
}

/// Everything a simulated character needs.
///
/// Pair it with a backend bundle (such as `Rapier2dCharacterBundle`) when the
/// backend needs one.
#[derive(Bundle)]
pub struct HedgehogCharacterBundle {
    /// Simulation state.
    pub body: state::CharacterBody,
    /// Tunables.
    pub config: config::ControllerConfig,
    /// Input, written by the application every frame.
    pub intent: intent::ControlIntent,
    /// Registered moves.
    pub moves: moves::MoveSet,
    /// Per-tick event buffer.
    pub events: events::CharacterEvents,
    /// Rendered pose.
    pub transform: Transform,
}

impl HedgehogCharacterBundle {
    /// An airborne character at `position` with the standard moveset.
    pub fn new(position: Vec2, config: config::ControllerConfig) -> Self {
        Self {
            body: state::CharacterBody::new(position, &config),
            config,
            intent: intent::ControlIntent::default(),
            moves: moves::MoveSet::standard(),
            events: events::CharacterEvents::default(),
            transform: Transform::from_translation(position.extend(0.0)),
        }
    }

    /// Replace the moveset.
    pub fn with_moves(mut self, moves: moves::MoveSet) -> Self {
        self.moves = moves;
        self
    }
}
