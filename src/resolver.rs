use glam::Vec2;

use crate::api::CollisionResolverApi;
use crate::types::*;

/// Pixel-accurate narrow phase plus impulse response.
#[derive(Clone, Debug, Default)]
pub struct CollisionResolver {
    pub cfg: ResolverConfig,
}

impl CollisionResolver {
    pub fn new(cfg: ResolverConfig) -> Self {
        Self { cfg }
    }

    /// Sum of speeds over the participants this resolver may change.
    fn combined_speed(a: &Body, b: &Body) -> f32 {
        let speed = |body: &Body| if body.is_static { 0.0 } else { body.velocity.length() };
        speed(a) + speed(b)
    }

    /// Displace a movable body against its normal by `factor * area / mass`, capped at
    /// `share` of the overlap depth along the normal.
    fn separate(&self, body: &mut Body, normal: Vec2, overlap: &Rect, share: f32) {
        let mut dist = self.cfg.separation_factor * overlap.area() / body.mass.max(f32::EPSILON);
        if self.cfg.clamp_separation_to_depth {
            dist = dist.min(overlap.size.dot(normal.abs()) * share);
        }
        if dist.is_finite() && dist > 0.0 {
            body.position -= normal * dist;
        }
    }
}

#[inline]
fn axis_sign(d: f32) -> f32 {
    if d < 0.0 { -1.0 } else { 1.0 }
}

/// Fractions of the overlap depth `a` and `b` may each take; the lighter body takes more.
fn depth_shares(a: &Body, b: &Body) -> (f32, f32) {
    match (a.is_static, b.is_static) {
        (false, true) => (1.0, 0.0),
        (true, false) => (0.0, 1.0),
        _ => {
            let (ma, mb) = (a.mass.max(0.0), b.mass.max(0.0));
            let total = ma + mb;
            if total > 0.0 && total.is_finite() { (mb / total, ma / total) } else { (0.5, 0.5) }
        }
    }
}

/// Rebuild a velocity from its components along `n` and along `n.perp()`.
#[inline]
fn recompose(n: Vec2, along: f32, across: f32) -> Vec2 {
    n * along + n.perp() * across
}

impl CollisionResolverApi for CollisionResolver {
    fn is_colliding(&self, a: &Body, b: &Body) -> Option<Contact> {
        if a.is_static && b.is_static {
            return None;
        }
        let overlap = a.bounds().intersection(&b.bounds())?;

        // Only approaching pairs; separating pairs would otherwise stutter on grazing contact.
        let rel_pos = b.center() - a.center();
        let rel_vel = b.velocity - a.velocity;
        if rel_pos.dot(rel_vel) >= 0.0 {
            return None;
        }

        let max = overlap.max();
        let (x0, x1) = (overlap.min.x.floor() as i32, max.x.ceil() as i32);
        let (y0, y1) = (overlap.min.y.floor() as i32, max.y.ceil() as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                if a.is_opaque_at_world(x, y) && b.is_opaque_at_world(x, y) {
                    return Some(Contact { overlap, point: Vec2::new(x as f32, y as f32) });
                }
            }
        }
        None
    }

    fn collision_normal(&self, body: &Body, other: &Body, point: Vec2) -> Vec2 {
        match body.shape {
            ShapeKind::Rectangle => {
                // Axis of minimum overlap; Y wins ties
                let ext = body.bounds().overlap_extents(&other.bounds());
                let d = other.center() - body.center();
                if ext.x < ext.y {
                    Vec2::new(axis_sign(d.x), 0.0)
                } else {
                    Vec2::new(0.0, axis_sign(d.y))
                }
            }
            ShapeKind::Circle => {
                let n = point - body.center();
                let len = n.length();
                if len.is_finite() && len > f32::EPSILON {
                    n / len
                } else {
                    body.last_normal
                }
            }
        }
    }

    fn resolve(&self, a: &mut Body, b: &mut Body, contact: &Contact) {
        if a.is_static && b.is_static {
            return;
        }
        let na = self.collision_normal(a, b, contact.point);
        let nb = self.collision_normal(b, a, contact.point);
        let before = Self::combined_speed(a, b);

        // Components along each body's own normal (positive = toward the other body).
        let (ua, ta) = (a.velocity.dot(na), na.perp_dot(a.velocity));
        let (ub, tb) = (b.velocity.dot(nb), nb.perp_dot(b.velocity));

        match (a.is_static, b.is_static) {
            (false, true) => {
                a.velocity = recompose(na, -ua * a.restitution, ta);
            }
            (true, false) => {
                b.velocity = recompose(nb, -ub * b.restitution, tb);
            }
            _ => {
                // 1-D exchange on a's axis: b moves along -nb
                let (ma, mb) = (a.mass, b.mass);
                let total = ma + mb;
                if total > 0.0 {
                    let e = (a.restitution + b.restitution) * 0.5;
                    let (u1, u2) = (ua, -ub);
                    let v1 = (ma * u1 + mb * u2 + mb * e * (u2 - u1)) / total;
                    let v2 = (ma * u1 + mb * u2 + ma * e * (u1 - u2)) / total;
                    a.velocity = recompose(na, v1, ta);
                    b.velocity = recompose(nb, -v2, tb);
                }
            }
        }

        // Never let a response add energy.
        let after = Self::combined_speed(a, b);
        if after > 0.0 && after >= before {
            let scale = before / after;
            if !a.is_static {
                a.velocity *= scale;
            }
            if !b.is_static {
                b.velocity *= scale;
            }
        }

        let (share_a, share_b) = depth_shares(a, b);
        if !a.is_static {
            a.last_normal = na;
            self.separate(a, na, &contact.overlap, share_a);
        }
        if !b.is_static {
            b.last_normal = nb;
            self.separate(b, nb, &contact.overlap, share_b);
        }
    }
}
