use glam::Vec2;

use crate::types::*;

/// Per-pixel alpha supplied by the asset layer; read only while a mask is scanned.
pub trait AlphaSource {
    fn alpha(&self, x: u32, y: u32) -> u8;
}

impl<F> AlphaSource for F
where
    F: Fn(u32, u32) -> u8,
{
    fn alpha(&self, x: u32, y: u32) -> u8 {
        self(x, y)
    }
}

/// Public API contract for the self-tuning spatial index.
pub trait SpatialIndexApi {
    /// Construct an empty index with the given configuration.
    fn new(cfg: IndexConfig) -> Self
    where
        Self: Sized;

    // --- Membership ----------------------------------------------------------

    /// Insert a body into every partition its bounds overlap and return its handle.
    /// Movable bodies feed the running-average footprint and may trigger a rebuild.
    fn add(&mut self, body: Body) -> BodyId;

    /// Inverse of `add`; returns the body if the handle was live.
    fn remove(&mut self, id: BodyId) -> Option<Body>;

    /// Drop every body and reset the grid sizing state.
    fn clear(&mut self);

    // --- Tick ----------------------------------------------------------------

    /// Advance every movable body in insertion order through `advance`, resolve
    /// collisions against co-resident bodies and migrate partition membership.
    fn update<F>(&mut self, dt: f32, advance: F) -> TickStats
    where
        F: FnMut(&mut Body, f32);

    /// Recompute the cell size from the running average and rebuild all partitions.
    fn reoptimize(&mut self);

    // --- Access --------------------------------------------------------------

    fn body(&self, id: BodyId) -> Option<&Body>;

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body>;

    /// Re-bucket a body after its bounds were edited through `body_mut`.
    fn refresh(&mut self, id: BodyId);

    /// Live handles in enumeration (insertion) order.
    fn ids(&self) -> &[BodyId];
}

/// Pairwise narrow phase and impulse response.
pub trait CollisionResolverApi {
    /// Pixel-accurate collision test; `None` when static/static, disjoint,
    /// separating, or no mutually opaque pixel exists in the overlap.
    fn is_colliding(&self, a: &Body, b: &Body) -> Option<Contact>;

    /// Unit normal for `body` pointing toward `other` / the contact point.
    fn collision_normal(&self, body: &Body, other: &Body, point: Vec2) -> Vec2;

    /// Apply velocity exchange and positional separation to a confirmed pair.
    fn resolve(&self, a: &mut Body, b: &mut Body, contact: &Contact);
}
