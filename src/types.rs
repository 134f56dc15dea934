use glam::Vec2;
use std::sync::Arc;

use crate::mask::CollisionMask;

/// Axis-aligned rectangle (top-left origin + size, y grows downwards).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, size: max - min }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    /// True when the rectangle covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.size.x > 0.0 && self.size.y > 0.0)
    }

    /// Intersection of two rectangles; `None` when they only touch or are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.min.max(other.min);
        let max = self.max().min(other.max());
        let r = Rect::from_min_max(min, max);
        if r.is_empty() { None } else { Some(r) }
    }

    /// Overlap extents along X and Y (negative when separated on that axis).
    pub fn overlap_extents(&self, other: &Rect) -> Vec2 {
        self.max().min(other.max()) - self.min.max(other.min)
    }
}

/// Normal-computation strategy for a body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ShapeKind {
    /// Axis of least overlap between the two bounding rectangles.
    #[default]
    Rectangle,
    /// Direction from the bounds centre to the contact point.
    Circle,
}

/// Generational handle to a body owned by a [`crate::SpatialIndex`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId {
    pub index: u32,
    pub generation: u32,
}

/// Grid cell coordinate plus layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub x: i32,
    pub y: i32,
    pub layer: i32,
}

/// One simulated body. Movement logic outside this crate writes `position`/`velocity`;
/// the index and resolver read them and write back collision responses.
#[derive(Clone, Debug)]
pub struct Body {
    /// Top-left corner of the bounding rectangle.
    pub position: Vec2,
    pub prev_position: Vec2,
    pub velocity: Vec2,
    pub prev_velocity: Vec2,
    pub size: Vec2,
    pub mass: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub layer: i32,
    pub shape: ShapeKind,
    /// Pixel mask; `None` means solid over the whole bounding rectangle.
    pub mask: Option<Arc<CollisionMask>>,
    /// Last non-degenerate collision normal, reused when a new one cannot be computed.
    pub last_normal: Vec2,
}

impl Body {
    /// Movable rectangular body with unit mass and full restitution.
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            prev_position: position,
            velocity: Vec2::ZERO,
            prev_velocity: Vec2::ZERO,
            size,
            mass: 1.0,
            restitution: 1.0,
            is_static: false,
            layer: 0,
            shape: ShapeKind::Rectangle,
            mask: None,
            last_normal: Vec2::Y,
        }
    }

    /// Static (infinite-mass) body.
    pub fn fixed(position: Vec2, size: Vec2) -> Self {
        Self { is_static: true, ..Self::new(position, size) }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self.prev_velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Restitution is clamped to `0.0..=1.0`.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_shape(mut self, shape: ShapeKind) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_mask(mut self, mask: Arc<CollisionMask>) -> Self {
        self.mask = Some(mask);
        self
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    /// Opacity of the body at a world-space integer coordinate inside its bounds.
    pub fn is_opaque_at_world(&self, x: i32, y: i32) -> bool {
        let Some(mask) = &self.mask else { return true };
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return false;
        }
        let sprite = Vec2::new(mask.width() as f32, mask.height() as f32);
        let local = (Vec2::new(x as f32, y as f32) - self.position) * sprite / self.size;
        if !(local.x >= 0.0 && local.y >= 0.0) {
            return false;
        }
        mask.is_opaque_at(local.x.floor() as usize, local.y.floor() as usize)
    }
}

/// Narrow-phase confirmation for one pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    /// Intersection of the two bounding rectangles.
    pub overlap: Rect,
    /// First integer coordinate (row-major) where both bodies are opaque.
    pub point: Vec2,
}

/// Collision response tuning.
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Positional correction per unit of overlap area per unit of mass.
    pub separation_factor: f32,
    /// Cap a single correction at the overlap depth along the normal.
    pub clamp_separation_to_depth: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            separation_factor: 0.1,
            clamp_separation_to_depth: true,
        }
    }
}

/// Spatial index configuration.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Cell size used until the first re-optimization.
    pub initial_cell_size: Vec2,
    /// Ideal cell size as a multiple of the average movable footprint.
    pub cell_size_factor: f32,
    /// Relative drift between actual and ideal cell size that triggers a rebuild.
    pub reoptimize_threshold: f32,
    /// Lower bound on either cell dimension.
    pub min_cell_size: f32,
    /// Enable internal timing instrumentation (adds small overhead when true).
    pub enable_timing: bool,
    pub resolver: ResolverConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_cell_size: Vec2::splat(64.0),
            cell_size_factor: 3.0,
            reoptimize_threshold: 0.10,
            min_cell_size: 1.0,
            enable_timing: false,
            resolver: ResolverConfig::default(),
        }
    }
}

/// Snapshot of the index's occupancy and sizing state.
#[derive(Copy, Clone, Debug, Default)]
pub struct IndexStats {
    pub bodies: usize,
    pub movable: usize,
    pub statics: usize,
    /// Non-empty partitions.
    pub partitions: usize,
    /// Sum of partition sizes (a body in k cells counts k times).
    pub occupancy: usize,
    pub cell_size: Vec2,
    pub average_footprint: Vec2,
    pub reoptimizations: u64,
}

/// Counters for the last `update` call.
#[derive(Copy, Clone, Debug, Default)]
pub struct TickStats {
    pub advanced: usize,
    pub pairs_tested: usize,
    pub collisions: usize,
    /// Only filled when `IndexConfig::enable_timing` is set.
    pub update_ms: f64,
}
