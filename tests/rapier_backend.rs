//! Integration tests for the Rapier2D terrain backend.
//!
//! Terrain is made of ordinary Rapier colliders; the character is simulated
//! by the plugin and only queries them.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use hedgehog_physics::prelude::*;
use hedgehog_physics::rapier::{terrain_groups, Rapier2dCharacterBundle};

/// Create a minimal test app with Rapier and the Rapier terrain backend.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
    app.add_plugins(HedgehogPhysicsPlugin::<Rapier2dBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a static terrain collider and let Rapier pick it up.
fn spawn_ground(app: &mut App, position: Vec2, half_size: Vec2) -> Entity {
    let transform = Transform::from_translation(position.extend(0.0));
    let entity = app
        .world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Fixed,
            Collider::cuboid(half_size.x, half_size.y),
        ))
        .id();
    app.update();
    app.update();
    entity
}

fn spawn_character(app: &mut App, position: Vec2) -> Entity {
    let config = ControllerConfig::default();
    let transform = Transform::from_translation(position.extend(0.0));
    app.world_mut()
        .spawn((
            HedgehogCharacterBundle::new(position, config),
            GlobalTransform::from(transform),
            Rapier2dCharacterBundle::new(&config),
        ))
        .id()
}

/// Run one physics tick.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_until_grounded(app: &mut App, entity: Entity, limit: usize) -> Option<usize> {
    for n in 1..=limit {
        tick(app);
        if app.world().get::<CharacterBody>(entity).unwrap().grounded {
            return Some(n);
        }
    }
    None
}

#[test]
fn character_lands_on_rapier_ground() {
    let mut app = create_test_app();
    spawn_ground(&mut app, Vec2::new(0.0, -10.0), Vec2::new(500.0, 10.0));
    let entity = spawn_character(&mut app, Vec2::new(0.0, 60.0));

    let ticks = run_until_grounded(&mut app, entity, 120);
    let body = app.world().get::<CharacterBody>(entity).unwrap();
    println!("PROOF: landed after {ticks:?} ticks at {:?}", body.position);

    assert!(ticks.is_some());
    assert!((body.position.y - 19.0).abs() < 0.05);
    assert_eq!(body.wall_mode, WallMode::Floor);
}

#[test]
fn ground_hit_reports_terrain_entity() {
    let mut app = create_test_app();
    let ground = spawn_ground(&mut app, Vec2::new(0.0, -10.0), Vec2::new(500.0, 10.0));
    let entity = spawn_character(&mut app, Vec2::new(0.0, 30.0));

    run_until_grounded(&mut app, entity, 120);

    let events = app.world().get::<CharacterEvents>(entity).unwrap();
    let collided: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            CharacterEvent::Collided { entity, .. } => *entity,
            _ => None,
        })
        .collect();
    println!("PROOF: collided with {collided:?}, ground={ground:?}");
    assert!(collided.contains(&ground));
}

#[test]
fn characters_do_not_stand_on_each_other() {
    let mut app = create_test_app();
    spawn_ground(&mut app, Vec2::new(0.0, -10.0), Vec2::new(500.0, 10.0));
    let lower = spawn_character(&mut app, Vec2::new(0.0, 19.5));
    let upper = spawn_character(&mut app, Vec2::new(0.0, 60.0));

    run_until_grounded(&mut app, upper, 120);
    for _ in 0..5 {
        tick(&mut app);
    }

    let lower_y = app.world().get::<CharacterBody>(lower).unwrap().position.y;
    let upper_y = app.world().get::<CharacterBody>(upper).unwrap().position.y;
    println!("PROOF: lower y={lower_y}, upper y={upper_y}");
    assert!((lower_y - 19.0).abs() < 0.05);
    assert!((upper_y - 19.0).abs() < 0.05);
}

#[test]
fn terrain_groups_select_layer() {
    let mut app = create_test_app();
    let transform = Transform::from_xyz(0.0, -10.0, 0.0);
    app.world_mut().spawn((
        transform,
        GlobalTransform::from(transform),
        RigidBody::Fixed,
        Collider::cuboid(500.0, 10.0),
        terrain_groups(TerrainMask::layer(1)),
    ));
    spawn_ground(&mut app, Vec2::new(0.0, -70.0), Vec2::new(500.0, 10.0));

    let entity = spawn_character(&mut app, Vec2::new(0.0, 30.0));
    run_until_grounded(&mut app, entity, 120);

    let y = app.world().get::<CharacterBody>(entity).unwrap().position.y;
    println!("PROOF: layer 0 character came to rest at y={y}");
    assert!((y - -41.0).abs() < 0.05);
}
