//! Rapier2D terrain backend.
//!
//! Terrain is any non-sensor Rapier collider. Its [`CollisionGroups`]
//! memberships select which terrain layers it belongs to (see
//! [`TerrainMask`]); colliders without groups are solid for every character.
//! Characters themselves are moved kinematically by the simulation, so the
//! bundle below gives them a kinematic body and a sensor collider that other
//! characters' casts ignore.

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;

use crate::backend::TerrainBackend;
use crate::config::ControllerConfig;
use crate::systems::{self, CharacterQueryData};
use crate::terrain::{RawHit, TerrainMask, TerrainQuery};
use crate::HedgehogPhysicsSet;

/// Rapier2D backend.
///
/// Requires `RapierPhysicsPlugin` to be added by the application.
pub struct Rapier2dBackend;

impl TerrainBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }
}

/// Plugin that sets up the Rapier2D simulation system.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            simulate_on_rapier_terrain.in_set(HedgehogPhysicsSet::Simulation),
        );
    }
}

/// Line casts against a Rapier context, skipping one entity (the caster).
pub struct RapierTerrain<'a> {
    context: &'a RapierContext<'a>,
    exclude: Option<Entity>,
}

impl<'a> RapierTerrain<'a> {
    /// Cast against every collider in `context`.
    pub fn new(context: &'a RapierContext<'a>) -> Self {
        Self {
            context,
            exclude: None,
        }
    }

    /// Ignore the rigid body and collider of `entity`.
    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }
}

impl TerrainQuery for RapierTerrain<'_> {
    fn line_cast(&self, start: Vec2, end: Vec2, mask: TerrainMask) -> Option<RawHit> {
        let ray = end - start;
        assert!(ray.length_squared() > 0.0, "zero-length terrain cast at {start:?}");

        let mut filter = QueryFilter::default()
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(mask.bits()),
            ));
        if let Some(entity) = self.exclude {
            filter = filter.exclude_rigid_body(entity).exclude_collider(entity);
        }

        // With an unnormalized direction and a max of 1.0 the time of impact
        // is the fraction along the segment.
        self.context
            .cast_ray_and_get_normal(start, ray, 1.0, true, filter)
            .map(|(entity, hit)| {
                let normal = if hit.normal.length_squared() > 0.0 {
                    hit.normal.normalize()
                } else {
                    // Rays starting inside a solid report no normal.
                    -ray.normalize()
                };
                RawHit {
                    point: hit.point,
                    normal,
                    fraction: hit.time_of_impact.clamp(0.0, 1.0),
                    entity: Some(entity),
                }
            })
    }
}

fn simulate_on_rapier_terrain(
    time: Res<Time<Fixed>>,
    rapier_context: ReadRapierContext,
    mut characters: Query<CharacterQueryData>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let dt = time.timestep().as_secs_f32();

    for (entity, mut body, mut moves, intent, config, mut events) in characters.iter_mut() {
        let terrain = RapierTerrain::new(&context).excluding(entity);
        systems::simulate_character(
            &mut body,
            &mut moves,
            intent,
            config,
            events.as_deref_mut(),
            &terrain,
            dt,
        );
    }
}

/// Physics components for a character simulated against Rapier terrain.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use hedgehog_physics::prelude::*;
/// use hedgehog_physics::rapier::Rapier2dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     let config = ControllerConfig::classic();
///     commands.spawn((
///         HedgehogCharacterBundle::new(Vec2::new(0.0, 100.0), config),
///         Rapier2dCharacterBundle::new(&config),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::KinematicPositionBased`], moved by the
///   pose the simulation writes to `Transform`
/// - `collider`: a cuboid matching the configured hitbox
/// - `sensor`: the collider never blocks other characters' casts
/// - `active_events`: collision events on, so gameplay can react to overlaps
#[derive(Bundle)]
pub struct Rapier2dCharacterBundle {
    /// The rigid body type.
    pub rigid_body: RigidBody,
    /// The character's overlap shape.
    pub collider: Collider,
    /// Marks the collider as a sensor.
    pub sensor: Sensor,
    /// Which collision events Rapier reports for the character.
    pub active_events: ActiveEvents,
    /// Collision groups of the character's collider.
    pub collision_groups: CollisionGroups,
}

impl Rapier2dCharacterBundle {
    /// Create a bundle sized to the standing hitbox in `config`.
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            collider: Collider::cuboid(config.hitbox.half_width, config.hitbox.half_height),
            sensor: Sensor,
            active_events: ActiveEvents::COLLISION_EVENTS,
            collision_groups: CollisionGroups::default(),
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the collision groups of the character's collider.
    pub fn with_collision_groups(mut self, groups: CollisionGroups) -> Self {
        self.collision_groups = groups;
        self
    }
}

/// Collision groups for a terrain collider on the given terrain layers.
///
/// ```rust
/// use hedgehog_physics::rapier::terrain_groups;
/// use hedgehog_physics::terrain::TerrainMask;
///
/// let loop_front = terrain_groups(TerrainMask::layer(0));
/// assert_eq!(loop_front.memberships.bits(), 0b10);
/// ```
pub fn terrain_groups(layers: TerrainMask) -> CollisionGroups {
    CollisionGroups::new(Group::from_bits_truncate(layers.bits()), Group::ALL)
}
