//! Terrain hit records.
//!
//! A [`TerrainHit`] is the normalized result of a single terrain cast. It is
//! created, consumed and discarded within one simulation tick.

use bevy::prelude::*;

use crate::math;

/// Which logical side of the body started a cast.
///
/// The side does not influence the cast itself; the resolver uses it to pick
/// the right response (push out sideways, bonk a ceiling, land on a foot).
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSide {
    /// Left foot.
    BottomLeft,
    /// Right foot.
    BottomRight,
    /// Left push sensor.
    Left,
    /// Right push sensor.
    Right,
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
}

/// Information about a terrain cast that hit something.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainHit {
    /// World position of the hit point.
    pub point: Vec2,
    /// Surface normal at the hit point (unit length).
    pub normal: Vec2,
    /// Angle of the normal, `atan2(normal.y, normal.x)` in `[0, 360)`.
    pub normal_angle: f32,
    /// Angle of the surface tangent, `normal_angle - 90` in `[0, 360)`.
    pub surface_angle: f32,
    /// Position along the cast, `0.0` at the start and `1.0` at the end.
    ///
    /// A fraction of exactly zero means the cast started inside terrain.
    pub fraction: f32,
    /// Start of the cast segment.
    pub origin: Vec2,
    /// End of the cast segment.
    pub end: Vec2,
    /// Which side of the body requested the cast.
    pub side: SensorSide,
    /// Entity that was hit (if the backend knows it).
    pub entity: Option<Entity>,
}

impl TerrainHit {
    /// Build a hit record, deriving both angles from the normal.
    pub fn new(
        point: Vec2,
        normal: Vec2,
        fraction: f32,
        origin: Vec2,
        end: Vec2,
        side: SensorSide,
        entity: Option<Entity>,
    ) -> Self {
        let normal_angle = math::vector_angle(normal);
        Self {
            point,
            normal,
            normal_angle,
            surface_angle: math::normalize_angle(normal_angle - 90.0),
            fraction,
            origin,
            end,
            side,
            entity,
        }
    }

    /// Unit direction of the cast that produced this hit.
    pub fn cast_direction(&self) -> Vec2 {
        (self.end - self.origin).normalize_or_zero()
    }

    /// Whether the cast started inside terrain.
    pub fn started_inside(&self) -> bool {
        self.fraction <= 0.0
    }

    /// How far the cast end lies past the hit point, measured along the cast.
    pub fn penetration(&self) -> f32 {
        self.point.distance(self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with_normal(normal: Vec2) -> TerrainHit {
        TerrainHit::new(
            Vec2::ZERO,
            normal,
            0.5,
            Vec2::new(0.0, 5.0),
            Vec2::new(0.0, -5.0),
            SensorSide::BottomLeft,
            None,
        )
    }

    #[test]
    fn floor_hit_angles() {
        let hit = hit_with_normal(Vec2::Y);
        assert!((hit.normal_angle - 90.0).abs() < 1e-4);
        assert!(hit.surface_angle.abs() < 1e-4);
    }

    #[test]
    fn wall_and_ceiling_hit_angles() {
        // Wall on the character's right faces left.
        assert!((hit_with_normal(Vec2::NEG_X).surface_angle - 90.0).abs() < 1e-4);
        assert!((hit_with_normal(Vec2::NEG_Y).surface_angle - 180.0).abs() < 1e-4);
        assert!((hit_with_normal(Vec2::X).surface_angle - 270.0).abs() < 1e-4);
    }

    #[test]
    fn cast_geometry() {
        let hit = hit_with_normal(Vec2::Y);
        assert_eq!(hit.cast_direction(), Vec2::NEG_Y);
        assert!((hit.penetration() - 5.0).abs() < 1e-4);
        assert!(!hit.started_inside());
    }
}
