//! Observer hooks.
//!
//! The resolver reports surface transitions and collisions through a
//! [`PhysicsObserver`]. Gameplay code (springs, rings, sound) reacts to these
//! without the core knowing it exists. Inside Bevy the observer is the
//! [`CharacterEvents`] component, which buffers one fixed tick of events.

use bevy::prelude::*;

use crate::collision::{SensorSide, TerrainHit};
use crate::state::{CharacterBody, WallMode};

/// Receives notifications from the resolver.
///
/// All methods default to doing nothing.
pub trait PhysicsObserver {
    /// The body attached to a surface.
    fn notify_attach(&mut self, _body: &CharacterBody) {}
    /// The body left its surface.
    fn notify_detach(&mut self, _body: &CharacterBody) {}
    /// A sensor touched terrain and the resolver responded to it.
    fn notify_collision(&mut self, _hit: &TerrainHit) {}
}

/// Observer that ignores everything.
impl PhysicsObserver for () {}

/// A buffered physics event.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum CharacterEvent {
    /// Attached to a surface.
    Attached {
        /// Surface angle at attach time.
        surface_angle: f32,
        /// Ground velocity at attach time.
        ground_velocity: f32,
        /// Wall mode chosen on attach.
        wall_mode: WallMode,
    },
    /// Left a surface.
    Detached {
        /// World velocity at detach time.
        velocity: Vec2,
    },
    /// A sensor collided with terrain.
    Collided {
        /// Which sensor.
        side: SensorSide,
        /// Hit point.
        point: Vec2,
        /// Surface angle at the hit.
        surface_angle: f32,
        /// Entity that was hit, if known.
        #[reflect(ignore)]
        entity: Option<Entity>,
    },
}

/// Per-tick event buffer.
///
/// Cleared at the start of every fixed tick by the controller systems; read it
/// in `FixedUpdate` after [`HedgehogPhysicsSet::Simulation`](crate::HedgehogPhysicsSet).
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct CharacterEvents {
    /// Events raised this tick, in order.
    pub events: Vec<CharacterEvent>,
}

impl CharacterEvents {
    /// Drop all buffered events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Iterate buffered events.
    pub fn iter(&self) -> impl Iterator<Item = &CharacterEvent> {
        self.events.iter()
    }

    /// Whether the body attached this tick.
    pub fn attached(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CharacterEvent::Attached { .. }))
    }

    /// Whether the body detached this tick.
    pub fn detached(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CharacterEvent::Detached { .. }))
    }
}

impl PhysicsObserver for CharacterEvents {
    fn notify_attach(&mut self, body: &CharacterBody) {
        self.events.push(CharacterEvent::Attached {
            surface_angle: body.surface_angle,
            ground_velocity: body.ground_velocity,
            wall_mode: body.wall_mode,
        });
    }

    fn notify_detach(&mut self, body: &CharacterBody) {
        self.events.push(CharacterEvent::Detached {
            velocity: body.velocity,
        });
    }

    fn notify_collision(&mut self, hit: &TerrainHit) {
        self.events.push(CharacterEvent::Collided {
            side: hit.side,
            point: hit.point,
            surface_angle: hit.surface_angle,
            entity: hit.entity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_records_in_order() {
        let mut events = CharacterEvents::default();
        let mut body = CharacterBody::default();
        body.attach(3.0, 0.0, WallMode::Floor);
        events.notify_attach(&body);
        body.detach();
        events.notify_detach(&body);

        assert!(events.attached());
        assert!(events.detached());
        assert!(matches!(
            events.events[0],
            CharacterEvent::Attached {
                wall_mode: WallMode::Floor,
                ..
            }
        ));
        assert!(matches!(events.events[1], CharacterEvent::Detached { .. }));

        events.clear();
        assert!(events.iter().next().is_none());
    }

    #[test]
    fn collision_event_carries_hit_data() {
        let mut events = CharacterEvents::default();
        let hit = TerrainHit::new(
            Vec2::new(1.0, 2.0),
            Vec2::NEG_X,
            0.5,
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 2.0),
            SensorSide::Right,
            None,
        );
        events.notify_collision(&hit);
        match events.events[0] {
            CharacterEvent::Collided {
                side,
                point,
                surface_angle,
                ..
            } => {
                assert_eq!(side, SensorSide::Right);
                assert_eq!(point, Vec2::new(1.0, 2.0));
                assert!((surface_angle - 90.0).abs() < 1e-4);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
