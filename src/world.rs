use glam::Vec2;

use rustc_hash::FxHashMap;
use std::time::Instant;

use crate::api::{CollisionResolverApi, SpatialIndexApi};
use crate::pool::{ScratchPool, ScratchSet};
use crate::resolver::CollisionResolver;
use crate::types::*;

/// Uniform-grid index over a persistent body population. Cell size follows the
/// running-average footprint of movable bodies.
pub struct SpatialIndex {
    pub cfg: IndexConfig,
    resolver: CollisionResolver,

    // Body arena; `order` is the live enumeration order
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<BodyId>,

    // Cell key -> bodies whose bounds overlap that cell
    partitions: FxHashMap<PartitionKey, Vec<BodyId>>,

    // Grid sizing state
    cell_size: Vec2,
    footprint_sum: (f64, f64),
    movable: usize,
    // Movable bodies with non-zero area; only these feed the average
    sized: usize,
    reoptimizations: u64,

    key_pool: ScratchPool<PartitionKey>,
    id_pool: ScratchPool<BodyId>,
    pair_pool: ScratchPool<(BodyId, BodyId)>,

    last_tick: Option<TickStats>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

struct Entry {
    body: Body,
    /// Partitions this body is currently a member of.
    cells: Vec<PartitionKey>,
    /// Size counted into the running average at insertion (`None` for statics and points).
    footprint: Option<Vec2>,
}

impl SpatialIndexApi for SpatialIndex {
    fn new(cfg: IndexConfig) -> Self {
        let cell_size = cfg.initial_cell_size.max(Vec2::splat(cfg.min_cell_size));
        Self {
            resolver: CollisionResolver::new(cfg.resolver.clone()),
            cfg,
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            partitions: FxHashMap::default(),
            cell_size,
            footprint_sum: (0.0, 0.0),
            movable: 0,
            sized: 0,
            reoptimizations: 0,
            key_pool: ScratchPool::new(),
            id_pool: ScratchPool::new(),
            pair_pool: ScratchPool::new(),
            last_tick: None,
        }
    }

    fn add(&mut self, body: Body) -> BodyId {
        let movable = !body.is_static;
        let footprint = (movable && body.size.x > 0.0 && body.size.y > 0.0).then_some(body.size);
        let entry = Entry { body, cells: Vec::new(), footprint };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                BodyId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                BodyId { index, generation: 0 }
            }
        };
        self.order.push(id);
        self.rebucket(id);

        if movable {
            self.movable += 1;
        }
        if let Some(footprint) = footprint {
            self.footprint_sum.0 += footprint.x as f64;
            self.footprint_sum.1 += footprint.y as f64;
            self.sized += 1;
            if self.needs_reoptimize() {
                self.reoptimize();
            }
        }
        id
    }

    fn remove(&mut self, id: BodyId) -> Option<Body> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order.retain(|&o| o != id);
        for key in &entry.cells {
            remove_from_partition(&mut self.partitions, key, id);
        }

        if !entry.body.is_static {
            self.movable -= 1;
        }
        if let Some(footprint) = entry.footprint {
            self.sized -= 1;
            if self.sized == 0 {
                self.footprint_sum = (0.0, 0.0);
            } else {
                self.footprint_sum.0 -= footprint.x as f64;
                self.footprint_sum.1 -= footprint.y as f64;
                if self.needs_reoptimize() {
                    self.reoptimize();
                }
            }
        }
        Some(entry.body)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.order.clear();
        self.partitions.clear();
        self.cell_size = self.cfg.initial_cell_size.max(Vec2::splat(self.cfg.min_cell_size));
        self.footprint_sum = (0.0, 0.0);
        self.movable = 0;
        self.sized = 0;
        self.reoptimizations = 0;
        self.last_tick = None;
    }

    fn update<F>(&mut self, dt: f32, mut advance: F) -> TickStats
    where
        F: FnMut(&mut Body, f32),
    {
        let t_all = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        let mut stats = TickStats::default();
        let mut seen_pairs = self.pair_pool.take();

        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(entry) = entry_mut(&mut self.slots, id) else { continue };
            if entry.body.is_static {
                continue;
            }

            // Current membership stays in `entry.cells` until the migration below
            entry.body.prev_position = entry.body.position;
            entry.body.prev_velocity = entry.body.velocity;
            advance(&mut entry.body, dt);
            stats.advanced += 1;

            let mut new_keys = self.key_pool.take();
            collect_cell_keys(self.cell_size, &entry.body.bounds(), entry.body.layer, &mut new_keys);
            let mut candidates = self.id_pool.take();
            for key in new_keys.iter() {
                if let Some(members) = self.partitions.get(key) {
                    candidates.extend(members.iter().copied().filter(|&o| o != id));
                }
            }
            self.key_pool.give(new_keys);

            for &other in candidates.iter() {
                let pair = if id < other { (id, other) } else { (other, id) };
                if !seen_pairs.insert(pair) {
                    continue;
                }
                let Some((a, b)) = pair_mut(&mut self.slots, id, other) else { continue };
                stats.pairs_tested += 1;
                let Some(contact) = self.resolver.is_colliding(a, b) else { continue };
                self.resolver.resolve(a, b, &contact);
                stats.collisions += 1;
                if !b.is_static {
                    // Keep the other body's membership exact if it was already visited
                    self.rebucket(other);
                }
            }
            self.id_pool.give(candidates);

            self.rebucket(id);
        }
        self.pair_pool.give(seen_pairs);

        if let Some(t_all) = t_all {
            stats.update_ms = t_all.elapsed().as_secs_f64() * 1000.0;
        }
        log::trace!(
            "[SpatialIndex] tick dt={} advanced={} pairs={} collisions={}",
            dt,
            stats.advanced,
            stats.pairs_tested,
            stats.collisions
        );
        self.last_tick = Some(stats);
        stats
    }

    fn reoptimize(&mut self) {
        let old = self.cell_size;
        if let Some(ideal) = self.ideal_cell_size() {
            self.cell_size = ideal;
        }
        self.partitions.clear();

        let mut keys = self.key_pool.take();
        for &id in &self.order {
            let Some(entry) = entry_mut(&mut self.slots, id) else { continue };
            keys.clear();
            collect_cell_keys(self.cell_size, &entry.body.bounds(), entry.body.layer, &mut keys);
            for &key in keys.iter() {
                self.partitions.entry(key).or_default().push(id);
            }
            entry.cells.clear();
            entry.cells.extend_from_slice(keys.as_slice());
        }
        self.key_pool.give(keys);

        self.reoptimizations += 1;
        log::debug!(
            "[SpatialIndex] reoptimized cell size ({:.2},{:.2}) -> ({:.2},{:.2}) for {} bodies, {} partitions",
            old.x,
            old.y,
            self.cell_size.x,
            self.cell_size.y,
            self.order.len(),
            self.partitions.len()
        );
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref().map(|e| &e.body)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        entry_mut(&mut self.slots, id).map(|e| &mut e.body)
    }

    fn refresh(&mut self, id: BodyId) {
        self.rebucket(id);
    }

    fn ids(&self) -> &[BodyId] {
        &self.order
    }
}

impl SpatialIndex {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    /// Running-average size of movable bodies with non-zero area (zero when there are none).
    pub fn average_footprint(&self) -> Vec2 {
        if self.sized == 0 {
            return Vec2::ZERO;
        }
        let n = self.sized as f64;
        Vec2::new((self.footprint_sum.0 / n) as f32, (self.footprint_sum.1 / n) as f32)
    }

    /// Cell keys `rect` projects onto at the current cell size.
    pub fn cell_keys(&self, rect: &Rect, layer: i32) -> Vec<PartitionKey> {
        let mut keys = ScratchSet::new();
        collect_cell_keys(self.cell_size, rect, layer, &mut keys);
        keys.as_slice().to_vec()
    }

    /// Partitions a body is currently a member of.
    pub fn partitions_of(&self, id: BodyId) -> Option<&[PartitionKey]> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref().map(|e| e.cells.as_slice())
    }

    /// Members of one partition, in insertion order.
    pub fn partition(&self, key: &PartitionKey) -> &[BodyId] {
        self.partitions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Return debug stats for the current grid.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            bodies: self.order.len(),
            movable: self.movable,
            statics: self.order.len() - self.movable,
            partitions: self.partitions.len(),
            occupancy: self.partitions.values().map(Vec::len).sum(),
            cell_size: self.cell_size,
            average_footprint: self.average_footprint(),
            reoptimizations: self.reoptimizations,
        }
    }

    /// Counters for the last `update`.
    pub fn last_tick(&self) -> Option<TickStats> {
        self.last_tick
    }

    fn ideal_cell_size(&self) -> Option<Vec2> {
        if self.sized == 0 {
            return None;
        }
        let ideal = self.average_footprint() * self.cfg.cell_size_factor;
        Some(ideal.max(Vec2::splat(self.cfg.min_cell_size)))
    }

    fn needs_reoptimize(&self) -> bool {
        let Some(ideal) = self.ideal_cell_size() else { return false };
        let drift = (ideal - self.cell_size).abs() / self.cell_size;
        drift.max_element() > self.cfg.reoptimize_threshold
    }

    /// Bring a body's partition membership in line with its current bounds.
    fn rebucket(&mut self, id: BodyId) {
        let mut keys = self.key_pool.take();
        if let Some(entry) = entry_mut(&mut self.slots, id) {
            collect_cell_keys(self.cell_size, &entry.body.bounds(), entry.body.layer, &mut keys);
            if entry.cells.as_slice() != keys.as_slice() {
                for old in &entry.cells {
                    if !keys.contains(old) {
                        remove_from_partition(&mut self.partitions, old, id);
                    }
                }
                for &new in keys.iter() {
                    if !entry.cells.contains(&new) {
                        self.partitions.entry(new).or_default().push(id);
                    }
                }
                entry.cells.clear();
                entry.cells.extend_from_slice(keys.as_slice());
            }
        }
        self.key_pool.give(keys);
    }
}

/// Cell coordinates are clamped to +/- this; bodies beyond it share the border cells.
const MAX_CELL_COORD: i32 = 1 << 24;

#[inline]
fn clamp_cell(v: f32) -> i32 {
    // NaN casts to 0
    v.clamp(-(MAX_CELL_COORD as f32), MAX_CELL_COORD as f32) as i32
}

/// Cells covered by `rect`; the max edge is exclusive so touching bodies do not share cells.
fn collect_cell_keys(cs: Vec2, rect: &Rect, layer: i32, out: &mut ScratchSet<PartitionKey>) {
    let min = rect.min / cs;
    let max = rect.max() / cs;
    let ix0 = clamp_cell(min.x.floor());
    let iy0 = clamp_cell(min.y.floor());
    let ix1 = clamp_cell(max.x.ceil()).saturating_sub(1).max(ix0);
    let iy1 = clamp_cell(max.y.ceil()).saturating_sub(1).max(iy0);
    for y in iy0..=iy1 {
        for x in ix0..=ix1 {
            out.insert(PartitionKey { x, y, layer });
        }
    }
}

fn remove_from_partition(
    partitions: &mut FxHashMap<PartitionKey, Vec<BodyId>>,
    key: &PartitionKey,
    id: BodyId,
) {
    if let Some(members) = partitions.get_mut(key) {
        members.retain(|&m| m != id);
        if members.is_empty() {
            partitions.remove(key);
        }
    }
}

fn entry_mut(slots: &mut [Slot], id: BodyId) -> Option<&mut Entry> {
    let slot = slots.get_mut(id.index as usize)?;
    if slot.generation != id.generation {
        return None;
    }
    slot.entry.as_mut()
}

/// Two distinct live bodies borrowed mutably at once.
fn pair_mut(slots: &mut [Slot], a: BodyId, b: BodyId) -> Option<(&mut Body, &mut Body)> {
    let (ia, ib) = (a.index as usize, b.index as usize);
    if ia == ib || ia >= slots.len() || ib >= slots.len() {
        return None;
    }
    let (sa, sb) = if ia < ib {
        let (lo, hi) = slots.split_at_mut(ib);
        (&mut lo[ia], &mut hi[0])
    } else {
        let (lo, hi) = slots.split_at_mut(ia);
        (&mut hi[0], &mut lo[ib])
    };
    if sa.generation != a.generation || sb.generation != b.generation {
        return None;
    }
    Some((&mut sa.entry.as_mut()?.body, &mut sb.entry.as_mut()?.body))
}

/// Plain Euler step used by the tests.
#[cfg(test)]
pub(crate) fn integrate(body: &mut Body, dt: f32) {
    body.position += body.velocity * dt;
}
