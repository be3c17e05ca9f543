//! Terrain backend abstraction.
//!
//! The simulation core only needs one primitive from the outside world: a
//! nearest-hit line cast ([`TerrainQuery`](crate::terrain::TerrainQuery)).
//! A backend decides where that terrain lives and schedules the simulation
//! system that feeds it to [`step_character`](crate::controller::step_character).
//! Swapping backends swaps the terrain source; the physics stay the same.

use bevy::prelude::*;

use crate::segment_terrain::SegmentTerrain;
use crate::systems;
use crate::HedgehogPhysicsSet;

/// Trait for terrain backend implementations.
///
/// A backend supplies a plugin that registers whatever resources it needs and
/// adds a simulation system to [`HedgehogPhysicsSet::Simulation`].
///
/// # Example
///
/// For an engine-backed implementation, see the `rapier` module's
/// `Rapier2dBackend`. The headless [`SegmentTerrainBackend`] is the smallest
/// possible backend:
///
/// ```rust
/// use bevy::prelude::*;
/// use hedgehog_physics::prelude::*;
///
/// let mut app = App::new();
/// app.add_plugins(MinimalPlugins)
///     .add_plugins(HedgehogPhysicsPlugin::<SegmentTerrainBackend>::default());
/// assert!(app.world().contains_resource::<SegmentTerrain>());
/// ```
pub trait TerrainBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;
}

/// Receives the resolved pose of a character each tick.
///
/// Angles are in degrees, counter-clockwise.
pub trait PoseSink {
    /// Apply a resolved pose.
    fn set_body_pose(&mut self, position: Vec2, rotation: f32);
}

impl PoseSink for Transform {
    fn set_body_pose(&mut self, position: Vec2, rotation: f32) {
        // Depth is left to the caller.
        self.translation.x = position.x;
        self.translation.y = position.y;
        self.rotation = Quat::from_rotation_z(rotation.to_radians());
    }
}

/// Backend that casts against the [`SegmentTerrain`] resource.
///
/// Needs no physics engine, which makes it the backend of choice for headless
/// simulation and tests.
pub struct SegmentTerrainBackend;

impl TerrainBackend for SegmentTerrainBackend {
    fn plugin() -> impl Plugin {
        SegmentTerrainBackendPlugin
    }
}

/// Plugin installed by [`SegmentTerrainBackend`].
pub struct SegmentTerrainBackendPlugin;

impl Plugin for SegmentTerrainBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SegmentTerrain>();
        app.init_resource::<SegmentTerrain>();
        app.add_systems(
            FixedUpdate,
            simulate_on_segment_terrain.in_set(HedgehogPhysicsSet::Simulation),
        );
    }
}

fn simulate_on_segment_terrain(
    time: Res<Time<Fixed>>,
    terrain: Res<SegmentTerrain>,
    mut characters: Query<systems::CharacterQueryData>,
) {
    let dt = time.timestep().as_secs_f32();
    for (_, mut body, mut moves, intent, config, mut events) in characters.iter_mut() {
        systems::simulate_character(
            &mut body,
            &mut moves,
            intent,
            config,
            events.as_deref_mut(),
            &*terrain,
            dt,
        );
    }
}
