//! The collision resolver and orientation state machine.
//!
//! Every (sub-)step the resolver casts the sensor rig against the terrain and
//! decides, from what it finds, whether the body is on a floor, a wall, a
//! ceiling, or in the air. Grounded bodies are rotated to the surface under
//! their feet and snapped onto it; airborne bodies are pushed out of terrain
//! and offered to the landing evaluator.
//!
//! The resolver never fails. Each pass either finds a coherent surface or
//! detaches the body.

use bevy::prelude::*;

use crate::collision::{SensorSide, TerrainHit};
use crate::config::ControllerConfig;
use crate::events::PhysicsObserver;
use crate::integrator;
use crate::math;
use crate::sensors::{SensorName, SensorRig};
use crate::state::{CharacterBody, Footing, WallMode};
use crate::terrain::{TerrainCaster, TerrainQuery};

/// Feet closer than this along the up axis are considered level.
const FOOT_TIE_DISTANCE: f32 = 0.01;

/// Enter the grounded state on a surface at `surface_angle` and notify `observer`.
///
/// The wall mode is bucketed from the angle using
/// [`ControllerConfig::attach_wall_mode_weight`].
pub fn attach(
    body: &mut CharacterBody,
    config: &ControllerConfig,
    ground_velocity: f32,
    surface_angle: f32,
    observer: &mut dyn PhysicsObserver,
) {
    let mode = WallMode::from_surface_angle(surface_angle, config.attach_wall_mode_weight);
    attach_with_mode(body, ground_velocity, surface_angle, mode, observer);
}

fn attach_with_mode(
    body: &mut CharacterBody,
    ground_velocity: f32,
    surface_angle: f32,
    mode: WallMode,
    observer: &mut dyn PhysicsObserver,
) {
    body.attach(ground_velocity, surface_angle, mode);
    debug!(
        "attached to {:?} surface at {:.1} degrees, ground speed {:.3}",
        mode, body.surface_angle, body.ground_velocity
    );
    observer.notify_attach(body);
}

/// Leave the current surface and notify `observer`. Does nothing when airborne.
pub fn detach(body: &mut CharacterBody, observer: &mut dyn PhysicsObserver) {
    if !body.grounded {
        return;
    }
    body.detach();
    debug!("detached with velocity {:?}", body.velocity);
    observer.notify_detach(body);
}

/// Jump off the current surface.
///
/// See [`integrator::jump_velocity`] for how the launch velocity is formed.
pub fn jump(
    body: &mut CharacterBody,
    config: &ControllerConfig,
    observer: &mut dyn PhysicsObserver,
) {
    let velocity = integrator::jump_velocity(
        body.velocity,
        body.surface_angle,
        config.jump_speed,
        config.force_jump_angle_difference,
    );
    detach(body, observer);
    body.velocity = velocity;
    body.just_jumped = true;
}

fn footing_of(side: SensorSide) -> Footing {
    match side {
        SensorSide::BottomLeft => Footing::Left,
        SensorSide::BottomRight => Footing::Right,
        _ => Footing::None,
    }
}

/// Move the body back along the cast so the sensor end sits on the hit point.
fn push_out(body: &mut CharacterBody, hit: &TerrainHit) {
    body.position += hit.point - hit.end;
}

/// Remove the part of `velocity` that points along `direction`, if any.
fn cancel_into(velocity: &mut Vec2, direction: Vec2) {
    let into = velocity.dot(direction);
    if into > 0.0 {
        *velocity -= direction * into;
    }
}

/// Per-tick collision resolver for one character.
pub struct Resolver<'a, T: TerrainQuery + ?Sized> {
    config: &'a ControllerConfig,
    caster: TerrainCaster<'a, T>,
}

impl<'a, T: TerrainQuery + ?Sized> Resolver<'a, T> {
    /// Create a resolver casting against `terrain` for a character on `terrain_layer`.
    pub fn new(config: &'a ControllerConfig, terrain: &'a T, terrain_layer: u8) -> Self {
        Self {
            config,
            caster: TerrainCaster::new(terrain, terrain_layer),
        }
    }

    fn rig(&self, body: &CharacterBody) -> SensorRig {
        SensorRig::for_body(body, self.config.sensors)
    }

    fn cast_outside(&mut self, start: Vec2, end: Vec2, side: SensorSide) -> Option<TerrainHit> {
        self.caster
            .cast(start, end, side)
            .filter(|hit| !hit.started_inside())
    }

    fn tolerable(&self, body: &CharacterBody, angle: f32) -> bool {
        body.just_landed
            || math::angle_delta(body.surface_angle, angle).abs()
                <= self.config.max_surface_angle_difference
    }

    /// Resolve the body against terrain after it has moved.
    pub fn handle_collisions(&mut self, body: &mut CharacterBody, observer: &mut dyn PhysicsObserver) {
        assert!(
            body.position.is_finite() && body.rotation.is_finite(),
            "character pose is not finite: {:?} rotated {}",
            body.position,
            body.rotation
        );
        self.caster.set_layer(body.terrain_layer);

        if body.grounded {
            self.grounded_collisions(body, observer);
        } else {
            self.airborne_collisions(body, observer);
        }
    }

    fn airborne_collisions(&mut self, body: &mut CharacterBody, observer: &mut dyn PhysicsObserver) {
        body.surface_angle = 0.0;
        self.airborne_side_check(body, observer);
        if self.airborne_ceiling_check(body, observer) {
            return;
        }
        self.airborne_ground_check(body, observer);
    }

    fn airborne_side_check(&mut self, body: &mut CharacterBody, observer: &mut dyn PhysicsObserver) {
        for (side, name) in [
            (SensorSide::Left, SensorName::SideLeft),
            (SensorSide::Right, SensorName::SideRight),
        ] {
            let rig = self.rig(body);
            let origin = rig.position(SensorName::SideMiddle, body);
            let end = rig.position(name, body);
            let Some(hit) = self.cast_outside(origin, end, side) else {
                continue;
            };
            push_out(body, &hit);
            if !body.just_jumped && body.velocity.dot(hit.cast_direction()) > 0.0 {
                body.velocity.x = 0.0;
            }
            observer.notify_collision(&hit);
        }
    }

    /// Returns true if the body attached to the ceiling.
    fn airborne_ceiling_check(
        &mut self,
        body: &mut CharacterBody,
        observer: &mut dyn PhysicsObserver,
    ) -> bool {
        for (side, name) in [
            (SensorSide::TopLeft, SensorName::TopLeft),
            (SensorSide::TopRight, SensorName::TopRight),
        ] {
            let rig = self.rig(body);
            let corner = rig.position(name, body);
            let across = rig.position(SensorName::TopMiddle, body);
            let below = body.position + rig.to_world(Vec2::new(rig.local(name).x, 0.0), body.rotation);

            let horizontal = self.cast_outside(across, corner, side);
            let vertical = self.cast_outside(below, corner, side);
            let hit = match (horizontal, vertical) {
                (Some(h), Some(v)) if h.penetration() <= v.penetration() => h,
                (_, Some(v)) => v,
                (Some(h), None) => h,
                (None, None) => continue,
            };

            push_out(body, &hit);
            observer.notify_collision(&hit);

            if !body.just_detached && self.handle_impact(body, hit.surface_angle, observer) {
                body.footing = Footing::None;
                return true;
            }
            // Refused or skipped impacts bump the head.
            cancel_into(&mut body.velocity, hit.cast_direction());
        }
        false
    }

    /// Returns true if the body landed.
    fn airborne_ground_check(
        &mut self,
        body: &mut CharacterBody,
        observer: &mut dyn PhysicsObserver,
    ) -> bool {
        let rig = self.rig(body);
        let mut deepest: Option<TerrainHit> = None;
        for (side, name) in [
            (SensorSide::BottomLeft, SensorName::BottomLeft),
            (SensorSide::BottomRight, SensorName::BottomRight),
        ] {
            let foot = rig.position(name, body);
            let column = body.position + rig.to_world(Vec2::new(rig.local(name).x, 0.0), body.rotation);
            if let Some(hit) = self.cast_outside(column, foot, side) {
                if deepest.is_none_or(|d| hit.penetration() > d.penetration()) {
                    deepest = Some(hit);
                }
            }
        }

        let Some(hit) = deepest else {
            return false;
        };
        push_out(body, &hit);
        observer.notify_collision(&hit);
        if body.just_jumped {
            return false;
        }

        if self.handle_impact(body, hit.surface_angle, observer) {
            body.footing = footing_of(hit.side);
            return true;
        }
        // Refused landings slide along the surface instead of sinking into it.
        cancel_into(&mut body.velocity, -hit.normal);
        false
    }

    fn grounded_collisions(&mut self, body: &mut CharacterBody, observer: &mut dyn PhysicsObserver) {
        self.grounded_side_check(body, observer);
        self.grounded_ceiling_check(body, observer);

        if self.ground_surface_check(body, observer).is_none() {
            return;
        }

        let jump = math::angle_delta(body.surface_angle, body.rotation);
        if !body.just_landed && jump.abs() > self.config.max_surface_angle_difference {
            debug!(
                "surface angle jumped {:.1} degrees ({:.1} -> {:.1}), detaching",
                jump, body.surface_angle, body.rotation
            );
            detach(body, observer);
        }
    }

    fn grounded_side_check(&mut self, body: &mut CharacterBody, observer: &mut dyn PhysicsObserver) {
        for (side, name, sign) in [
            (SensorSide::Left, SensorName::SideLeft, -1.0),
            (SensorSide::Right, SensorName::SideRight, 1.0),
        ] {
            let rig = self.rig(body);
            let origin = rig.position(SensorName::SideMiddle, body);
            let end = rig.position(name, body);
            let Some(hit) = self.cast_outside(origin, end, side) else {
                continue;
            };
            observer.notify_collision(&hit);
            let moving_into = body.ground_velocity * sign > 0.0;

            // Running down a wall straight into the floor below it.
            if moving_into
                && matches!(body.wall_mode, WallMode::Right | WallMode::Left)
                && WallMode::from_surface_angle(hit.surface_angle, 0.0) == WallMode::Floor
            {
                let height = (body.position - hit.point).dot(hit.normal);
                body.position += hit.normal * (rig.hitbox().half_height - height);
                let ground_velocity = body.ground_velocity;
                attach_with_mode(body, ground_velocity, hit.surface_angle, WallMode::Floor, observer);
                continue;
            }

            push_out(body, &hit);
            if moving_into {
                body.ground_velocity = 0.0;
                body.sync_velocity_from_ground();
            }
        }
    }

    fn grounded_ceiling_check(
        &mut self,
        body: &mut CharacterBody,
        observer: &mut dyn PhysicsObserver,
    ) {
        for (side, name, sign) in [
            (SensorSide::TopLeft, SensorName::TopLeft, -1.0),
            (SensorSide::TopRight, SensorName::TopRight, 1.0),
        ] {
            let rig = self.rig(body);
            let origin = rig.position(SensorName::TopMiddle, body);
            let end = rig.position(name, body);
            let Some(hit) = self.cast_outside(origin, end, side) else {
                continue;
            };
            observer.notify_collision(&hit);
            push_out(body, &hit);
            if body.ground_velocity * sign > 0.0 {
                body.ground_velocity = 0.0;
                body.sync_velocity_from_ground();
            }
        }
    }

    /// Evaluate an impact with a surface at `surface_angle` and attach if it holds.
    ///
    /// Returns whether the body attached.
    pub fn handle_impact(
        &self,
        body: &mut CharacterBody,
        surface_angle: f32,
        observer: &mut dyn PhysicsObserver,
    ) -> bool {
        assert!(surface_angle.is_finite(), "impact surface angle is not finite");
        let surface = math::normalize_angle(surface_angle);
        let speed = body.speed();
        let air_direction = if speed > f32::EPSILON {
            math::vector_angle(body.velocity)
        } else {
            270.0
        };

        // Moving away from the surface or skimming along it.
        if math::angle_delta(air_direction, surface + 90.0).abs() < 90.0 {
            trace!(
                "impact at {:.1} degrees rejected, moving along {:.1}",
                surface,
                air_direction
            );
            return false;
        }

        let flat = self.config.min_flat_attach_angle;
        let ground_velocity = if math::angle_near(surface, 0.0, flat) {
            body.velocity.x
        } else if math::angle_near(surface, 180.0, flat) {
            -body.velocity.x
        } else {
            let share = math::angle_delta(air_direction, surface - 90.0) / 90.0;
            speed * -share.clamp(-1.0, 1.0)
        };

        if self.config.is_near_vertical(surface) && ground_velocity.abs() < self.config.detach_speed {
            trace!(
                "impact at {:.1} degrees rejected, ground speed {:.3} too low",
                surface,
                ground_velocity
            );
            return false;
        }

        attach(body, self.config, ground_velocity, surface, observer);
        true
    }

    fn foot_cast(
        &mut self,
        body: &CharacterBody,
        rig: &SensorRig,
        name: SensorName,
        side: SensorSide,
        mode: WallMode,
    ) -> Option<TerrainHit> {
        let foot = rig.position(name, body);
        let climb = self.config.sensors.ledge_climb_height;
        let drop = self.config.sensors.ledge_drop_height;
        for axis in [mode, mode.clockwise(), mode.counter_clockwise()] {
            let start = foot + axis.up() * climb;
            let end = foot + axis.down() * drop;
            match self.caster.cast(start, end, side) {
                Some(hit) if hit.started_inside() => continue,
                hit => return hit,
            }
        }
        None
    }

    fn defining_foot(
        &self,
        body: &CharacterBody,
        left: &TerrainHit,
        right: &TerrainHit,
        up: Vec2,
    ) -> Footing {
        let lead = left.point.dot(up) - right.point.dot(up);
        if lead > FOOT_TIE_DISTANCE {
            Footing::Left
        } else if lead < -FOOT_TIE_DISTANCE {
            Footing::Right
        } else if body.ground_velocity > 0.0 {
            Footing::Right
        } else if body.ground_velocity < 0.0 {
            Footing::Left
        } else if body.footing == Footing::None {
            Footing::Left
        } else {
            body.footing
        }
    }

    /// Track the surface under the feet of a grounded body.
    ///
    /// Rotates the body to the surface, snaps it onto it and returns the foot
    /// that defines it. Detaches and returns `None` when no tolerable surface
    /// is found. The body's `surface_angle` is left for
    /// [`Resolver::update_surface_angle`] to confirm.
    pub fn ground_surface_check(
        &mut self,
        body: &mut CharacterBody,
        observer: &mut dyn PhysicsObserver,
    ) -> Option<Footing> {
        let rig = self.rig(body);
        let mode = match body.wall_mode {
            WallMode::None => WallMode::from_surface_angle(body.surface_angle, 0.0),
            mode => mode,
        };
        let left = self.foot_cast(body, &rig, SensorName::BottomLeft, SensorSide::BottomLeft, mode);
        let right = self.foot_cast(body, &rig, SensorName::BottomRight, SensorSide::BottomRight, mode);

        let choice = match (left, right) {
            (Some(l), Some(r)) => {
                let footing = self.defining_foot(body, &l, &r, mode.up());
                let (primary, secondary) = match footing {
                    Footing::Right => (r, l),
                    _ => (l, r),
                };
                if self.tolerable(body, primary.surface_angle) {
                    let overlap = math::angle_delta(l.surface_angle, r.surface_angle);
                    let span = r.point - l.point;
                    let bridge = overlap.abs() > self.config.min_flat_overlap_range
                        && overlap > self.config.min_overlap_angle
                        && span.length_squared() > f32::EPSILON;
                    let angle = if bridge {
                        math::vector_angle(span)
                    } else {
                        primary.surface_angle
                    };
                    Some((primary, footing, angle))
                } else if self.tolerable(body, secondary.surface_angle) {
                    Some((secondary, footing.opposite(), secondary.surface_angle))
                } else {
                    None
                }
            }
            (Some(hit), None) | (None, Some(hit)) => self
                .tolerable(body, hit.surface_angle)
                .then(|| (hit, footing_of(hit.side), hit.surface_angle)),
            (None, None) => None,
        };

        let Some((anchor, footing, angle)) = choice else {
            debug!(
                "no tolerable surface under {:?} at {:.1} degrees, detaching",
                body.position, body.surface_angle
            );
            detach(body, observer);
            return None;
        };

        body.rotation = math::normalize_angle(angle);
        body.footing = footing;
        self.snap_to_surface(body, &anchor, angle, footing);
        Some(footing)
    }

    /// Move the body along the anchor's cast axis until the defining foot lies
    /// on the line through the anchor point at `angle`.
    fn snap_to_surface(&self, body: &mut CharacterBody, anchor: &TerrainHit, angle: f32, footing: Footing) {
        let rig = self.rig(body);
        let name = match footing {
            Footing::Right => SensorName::BottomRight,
            _ => SensorName::BottomLeft,
        };
        let foot = rig.position(name, body);
        let axis = anchor.cast_direction();
        let normal = math::direction(angle + 90.0);
        let along = axis.dot(normal);
        let offset = if along.abs() > 1e-3 {
            (anchor.point - foot).dot(normal) / along
        } else {
            (anchor.point - foot).dot(axis)
        };
        body.position += axis * offset;
    }

    /// Confirm the body's rotation as its surface angle.
    ///
    /// Grounded bodies update their wall mode with hysteresis, get their
    /// world velocity recomputed from the ground speed, and stop counting as
    /// just landed.
    pub fn update_surface_angle(&self, body: &mut CharacterBody) {
        body.last_surface_angle = body.surface_angle;
        body.surface_angle = math::normalize_angle(body.rotation);
        if !body.grounded {
            return;
        }
        if self.tolerable(body, body.last_surface_angle) {
            let mode = body
                .wall_mode
                .transition(body.surface_angle, self.config.wall_mode_switch_tolerance);
            if mode != body.wall_mode {
                trace!("wall mode {:?} -> {:?}", body.wall_mode, mode);
                body.wall_mode = mode;
            }
        }
        body.sync_velocity_from_ground();
        body.just_landed = false;
    }
}
