//! The sensor rig.
//!
//! Nine named points fixed in the body's local frame. They rotate and move
//! with the body and are recomputed from the body pose on every query; nothing
//! is cached between ticks because both the body and the terrain can move.

use bevy::prelude::*;

use crate::config::SensorConfig;
use crate::math;
use crate::state::{CharacterBody, Hitbox};

/// Named sample points of the rig.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorName {
    /// Left foot.
    BottomLeft,
    /// Right foot.
    BottomRight,
    /// End of the left push sensor.
    SideLeft,
    /// End of the right push sensor.
    SideRight,
    /// Origin of both push sensors.
    SideMiddle,
    /// Top-left corner of the hitbox.
    TopLeft,
    /// Top centre of the hitbox.
    TopMiddle,
    /// Top-right corner of the hitbox.
    TopRight,
    /// Body centre.
    Center,
}

impl SensorName {
    /// Every sensor in the rig.
    pub const ALL: [SensorName; 9] = [
        SensorName::BottomLeft,
        SensorName::BottomRight,
        SensorName::SideLeft,
        SensorName::SideRight,
        SensorName::SideMiddle,
        SensorName::TopLeft,
        SensorName::TopMiddle,
        SensorName::TopRight,
        SensorName::Center,
    ];
}

/// Local sensor offsets for one hitbox shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRig {
    hitbox: Hitbox,
    sensors: SensorConfig,
}

impl SensorRig {
    /// Rig for the given hitbox and sensor placement.
    pub fn new(hitbox: Hitbox, sensors: SensorConfig) -> Self {
        assert!(
            hitbox.half_width > 0.0 && hitbox.half_height > 0.0,
            "sensor rig needs a positive hitbox, got {hitbox:?}"
        );
        assert!(
            sensors.side_extent > 0.0,
            "push sensors need a positive reach"
        );
        Self { hitbox, sensors }
    }

    /// Rig matching the body's current hitbox.
    pub fn for_body(body: &CharacterBody, sensors: SensorConfig) -> Self {
        Self::new(body.params.hitbox, sensors)
    }

    /// Hitbox the rig was built from.
    pub fn hitbox(&self) -> Hitbox {
        self.hitbox
    }

    /// Sensor placement the rig was built from.
    pub fn config(&self) -> SensorConfig {
        self.sensors
    }

    /// Offset of a sensor in the body's local frame.
    pub fn local(&self, name: SensorName) -> Vec2 {
        let w = self.hitbox.half_width;
        let h = self.hitbox.half_height;
        let side = self.sensors.side_extent;
        let side_y = self.sensors.side_height;
        match name {
            SensorName::BottomLeft => Vec2::new(-w, -h),
            SensorName::BottomRight => Vec2::new(w, -h),
            SensorName::SideLeft => Vec2::new(-side, side_y),
            SensorName::SideRight => Vec2::new(side, side_y),
            SensorName::SideMiddle => Vec2::new(0.0, side_y),
            SensorName::TopLeft => Vec2::new(-w, h),
            SensorName::TopMiddle => Vec2::new(0.0, h),
            SensorName::TopRight => Vec2::new(w, h),
            SensorName::Center => Vec2::ZERO,
        }
    }

    /// World position of a sensor for a body at `position` rotated by `rotation` degrees.
    pub fn position_at(&self, name: SensorName, position: Vec2, rotation: f32) -> Vec2 {
        position + math::rotate_by(self.local(name), rotation)
    }

    /// World position of a sensor on `body`.
    pub fn position(&self, name: SensorName, body: &CharacterBody) -> Vec2 {
        self.position_at(name, body.position, body.rotation)
    }

    /// World offset of a local vector for a body rotated by `rotation` degrees.
    pub fn to_world(&self, local: Vec2, rotation: f32) -> Vec2 {
        math::rotate_by(local, rotation)
    }
}
