//! Terrain query layer.
//!
//! Backends implement [`TerrainQuery`], a single nearest-hit line cast against
//! the terrain. The resolver never calls a backend directly: it goes through a
//! [`TerrainCaster`], which computes the collision mask from the character's
//! terrain layer, turns raw hits into [`TerrainHit`] records, and skips casts
//! that were already answered during the current tick.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::collision::{SensorSide, TerrainHit};

/// Collision mask used to select terrain.
///
/// Bit 0 is the "always collide" layer. Bit `n + 1` is terrain layer `n`,
/// which lets a character switch between overlapping paths (loops, branches)
/// by changing its assigned layer.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerrainMask(pub u32);

impl TerrainMask {
    /// Terrain every character collides with.
    pub const ALWAYS: TerrainMask = TerrainMask(1);
    /// Every layer.
    pub const ALL: TerrainMask = TerrainMask(u32::MAX);
    /// Highest terrain layer that fits in the mask.
    pub const MAX_LAYER: u8 = 30;

    /// The bit for a single terrain layer (without the always layer).
    pub fn layer(layer: u8) -> Self {
        assert!(
            layer <= Self::MAX_LAYER,
            "terrain layer {layer} exceeds maximum {}",
            Self::MAX_LAYER
        );
        TerrainMask(1 << (layer + 1))
    }

    /// The mask a character on `layer` casts with: the always layer plus its own.
    pub fn for_character(layer: u8) -> Self {
        Self::ALWAYS | Self::layer(layer)
    }

    /// Raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether any bit is shared with `other`.
    pub fn intersects(self, other: TerrainMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for TerrainMask {
    fn default() -> Self {
        Self::ALWAYS
    }
}

impl std::ops::BitOr for TerrainMask {
    type Output = TerrainMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        TerrainMask(self.0 | rhs.0)
    }
}

/// Un-normalized result of a backend line cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawHit {
    /// World position of the hit.
    pub point: Vec2,
    /// Surface normal (unit length).
    pub normal: Vec2,
    /// Position along the segment, `0.0..=1.0`.
    pub fraction: f32,
    /// Entity that was hit, if known.
    pub entity: Option<Entity>,
}

/// The line-cast primitive a terrain backend must provide.
///
/// Implementations must be deterministic: the same query against unchanged
/// terrain returns the same answer.
pub trait TerrainQuery {
    /// Cast the segment `start -> end` and return the nearest hit on terrain
    /// whose membership intersects `mask`.
    ///
    /// A cast that starts inside solid terrain reports a hit with fraction `0.0`.
    fn line_cast(&self, start: Vec2, end: Vec2, mask: TerrainMask) -> Option<RawHit>;
}

impl<T: TerrainQuery + ?Sized> TerrainQuery for &T {
    fn line_cast(&self, start: Vec2, end: Vec2, mask: TerrainMask) -> Option<RawHit> {
        (**self).line_cast(start, end, mask)
    }
}

type CastKey = (u32, u32, u32, u32);

/// Per-tick wrapper around a [`TerrainQuery`].
pub struct TerrainCaster<'a, T: TerrainQuery + ?Sized> {
    terrain: &'a T,
    mask: TerrainMask,
    cache: HashMap<CastKey, Option<RawHit>>,
    casts: u32,
}

impl<'a, T: TerrainQuery + ?Sized> TerrainCaster<'a, T> {
    /// Create a caster for a character assigned to `terrain_layer`.
    pub fn new(terrain: &'a T, terrain_layer: u8) -> Self {
        Self::with_mask(terrain, TerrainMask::for_character(terrain_layer))
    }

    /// Create a caster with an explicit mask.
    pub fn with_mask(terrain: &'a T, mask: TerrainMask) -> Self {
        Self {
            terrain,
            mask,
            cache: HashMap::new(),
            casts: 0,
        }
    }

    /// The mask every cast uses.
    pub fn mask(&self) -> TerrainMask {
        self.mask
    }

    /// Number of casts actually forwarded to the backend.
    pub fn backend_casts(&self) -> u32 {
        self.casts
    }

    /// Forget cached answers (the terrain or the mask changed).
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Change the character's terrain layer. Clears the cache.
    pub fn set_layer(&mut self, terrain_layer: u8) {
        let mask = TerrainMask::for_character(terrain_layer);
        if mask != self.mask {
            self.mask = mask;
            self.cache.clear();
        }
    }

    /// Cast `start -> end` on behalf of `side`.
    pub fn cast(&mut self, start: Vec2, end: Vec2, side: SensorSide) -> Option<TerrainHit> {
        assert!(
            start.is_finite() && end.is_finite(),
            "terrain cast with non-finite endpoints {start:?} -> {end:?}"
        );
        assert!(
            start.distance_squared(end) > f32::EPSILON,
            "zero-length terrain cast at {start:?}"
        );

        let key = (
            start.x.to_bits(),
            start.y.to_bits(),
            end.x.to_bits(),
            end.y.to_bits(),
        );
        let raw = match self.cache.get(&key) {
            Some(cached) => *cached,
            None => {
                self.casts += 1;
                let raw = self.terrain.line_cast(start, end, self.mask);
                self.cache.insert(key, raw);
                raw
            }
        };

        let raw = raw?;
        // A hit that started inside terrain may not carry a usable normal.
        let normal = if raw.normal.length_squared() > f32::EPSILON {
            raw.normal.normalize()
        } else {
            (start - end).normalize()
        };
        trace!(
            "terrain cast {:?} {:?}->{:?} hit {:?} at fraction {}",
            side,
            start,
            end,
            raw.point,
            raw.fraction
        );
        Some(TerrainHit::new(
            raw.point,
            normal,
            raw.fraction.clamp(0.0, 1.0),
            start,
            end,
            side,
            raw.entity,
        ))
    }
}
