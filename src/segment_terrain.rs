//! Pure geometric terrain made of polygons and polylines.
//!
//! [`SegmentTerrain`] needs no physics engine, which makes it the backend of
//! choice for headless simulation, replays and tests.

use bevy::prelude::*;

use crate::math::cross;
use crate::terrain::{RawHit, TerrainMask, TerrainQuery};

/// One piece of terrain geometry.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct TerrainShape {
    /// Vertices in world space.
    pub points: Vec<Vec2>,
    /// Closed shapes are solid: a cast starting inside reports fraction zero.
    pub closed: bool,
    /// Layers this shape belongs to.
    pub layers: TerrainMask,
}

impl TerrainShape {
    /// Iterate the edges of the shape.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let open_edges = self.points.windows(2).map(|w| (w[0], w[1]));
        let closing = if self.closed && self.points.len() > 2 {
            Some((self.points[self.points.len() - 1], self.points[0]))
        } else {
            None
        };
        open_edges.chain(closing)
    }

    /// Even-odd point containment. Always false for open shapes.
    pub fn contains(&self, point: Vec2) -> bool {
        if !self.closed || self.points.len() < 3 {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// Terrain made of line segments.
///
/// Edge normals are two-sided: a hit always reports the normal facing back
/// toward the cast origin.
#[derive(Resource, Reflect, Debug, Clone, Default)]
#[reflect(Resource)]
pub struct SegmentTerrain {
    /// All shapes, in insertion order.
    pub shapes: Vec<TerrainShape>,
}

impl SegmentTerrain {
    /// Create empty terrain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a solid polygon on the always layer.
    pub fn with_polygon(mut self, points: impl Into<Vec<Vec2>>) -> Self {
        self.add_polygon(points, TerrainMask::ALWAYS);
        self
    }

    /// Add an open polyline on the always layer.
    pub fn with_chain(mut self, points: impl Into<Vec<Vec2>>) -> Self {
        self.add_chain(points, TerrainMask::ALWAYS);
        self
    }

    /// Add an axis-aligned solid box on the always layer.
    pub fn with_box(mut self, min: Vec2, max: Vec2) -> Self {
        self.add_box(min, max, TerrainMask::ALWAYS);
        self
    }

    /// Add a solid polygon.
    pub fn add_polygon(&mut self, points: impl Into<Vec<Vec2>>, layers: TerrainMask) {
        let points = points.into();
        assert!(points.len() >= 3, "terrain polygon needs at least 3 points");
        self.shapes.push(TerrainShape {
            points,
            closed: true,
            layers,
        });
    }

    /// Add an open polyline.
    pub fn add_chain(&mut self, points: impl Into<Vec<Vec2>>, layers: TerrainMask) {
        let points = points.into();
        assert!(points.len() >= 2, "terrain chain needs at least 2 points");
        self.shapes.push(TerrainShape {
            points,
            closed: false,
            layers,
        });
    }

    /// Add an axis-aligned solid box.
    pub fn add_box(&mut self, min: Vec2, max: Vec2, layers: TerrainMask) {
        self.add_polygon(
            vec![
                min,
                Vec2::new(max.x, min.y),
                max,
                Vec2::new(min.x, max.y),
            ],
            layers,
        );
    }

    /// Remove all geometry.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

impl TerrainQuery for SegmentTerrain {
    fn line_cast(&self, start: Vec2, end: Vec2, mask: TerrainMask) -> Option<RawHit> {
        let ray = end - start;
        let mut best: Option<RawHit> = None;

        for shape in self.shapes.iter().filter(|s| s.layers.intersects(mask)) {
            if shape.contains(start) {
                return Some(RawHit {
                    point: start,
                    normal: -ray.normalize_or_zero(),
                    fraction: 0.0,
                    entity: None,
                });
            }

            for (a, b) in shape.edges() {
                let edge = b - a;
                let denom = cross(ray, edge);
                if denom.abs() < 1e-9 {
                    continue;
                }
                let offset = a - start;
                let t = cross(offset, edge) / denom;
                let u = cross(offset, ray) / denom;
                if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
                    continue;
                }
                if best.is_some_and(|hit| hit.fraction <= t) {
                    continue;
                }
                let mut normal = edge.perp().normalize();
                if normal.dot(ray) > 0.0 {
                    normal = -normal;
                }
                best = Some(RawHit {
                    point: start + ray * t,
                    normal,
                    fraction: t,
                    entity: None,
                });
            }
        }

        best
    }
}
