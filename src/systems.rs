//! Core controller systems.
//!
//! These systems wrap the engine-independent pipeline for Bevy. They are
//! scheduled by [`HedgehogPhysicsPlugin`](crate::HedgehogPhysicsPlugin) in
//! `FixedUpdate`:
//!
//! - [`HedgehogPhysicsSet::Preparation`](crate::HedgehogPhysicsSet): clear
//!   last tick's events, latch input edges.
//! - `Simulation`: the backend's system, which calls [`simulate_character`]
//!   for every character.
//! - `Sync`: write poses to `Transform`, update state markers.

use bevy::prelude::*;

use crate::backend::PoseSink;
use crate::config::ControllerConfig;
use crate::controller::{step_character, StepReport};
use crate::events::{CharacterEvents, PhysicsObserver};
use crate::intent::ControlIntent;
use crate::moves::MoveSet;
use crate::state::{Airborne, CharacterBody, Grounded};
use crate::terrain::TerrainQuery;

/// Query data every simulation system iterates.
pub type CharacterQueryData = (
    Entity,
    &'static mut CharacterBody,
    &'static mut MoveSet,
    &'static ControlIntent,
    &'static ControllerConfig,
    Option<&'static mut CharacterEvents>,
);

/// Run one tick for one character, reporting into its event buffer if it
/// has one.
pub fn simulate_character<T: TerrainQuery + ?Sized>(
    body: &mut CharacterBody,
    moves: &mut MoveSet,
    intent: &ControlIntent,
    config: &ControllerConfig,
    events: Option<&mut CharacterEvents>,
    terrain: &T,
    dt: f32,
) -> StepReport {
    let mut silent = ();
    let observer: &mut dyn PhysicsObserver = match events {
        Some(events) => events,
        None => &mut silent,
    };
    let report = step_character(body, moves, intent, config, terrain, observer, dt);
    trace!(
        "stepped character at {:?}: {} sub-steps, grounded {}",
        body.position, report.substeps, body.grounded
    );
    report
}

/// Drop events from the previous tick.
pub fn clear_character_events(mut q_events: Query<&mut CharacterEvents>) {
    for mut events in &mut q_events {
        if events.iter().next().is_some() {
            events.clear();
        }
    }
}

/// Compute the jump edge for this tick.
pub fn latch_intents(mut q_intents: Query<&mut ControlIntent>) {
    for mut intent in &mut q_intents {
        intent.latch();
    }
}

/// Copy the resolved pose onto the entity's transform.
pub fn write_body_pose(mut q_bodies: Query<(&CharacterBody, &mut Transform)>) {
    for (body, mut transform) in &mut q_bodies {
        transform.set_body_pose(body.position, body.rotation);
    }
}

/// Keep the [`Grounded`] / [`Airborne`] markers in step with the body.
pub fn sync_state_markers(
    mut commands: Commands,
    q_bodies: Query<(Entity, &CharacterBody, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, body, has_grounded, has_airborne) in &q_bodies {
        if body.grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !body.grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}
