//! Reusable scratch containers for per-tick bookkeeping.

use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Insertion-ordered set. Iteration follows insertion order so results stay
/// deterministic regardless of hashing.
#[derive(Debug)]
pub struct ScratchSet<T> {
    order: Vec<T>,
    seen: FxHashSet<T>,
}

impl<T: Copy + Eq + Hash> ScratchSet<T> {
    pub fn new() -> Self {
        Self { order: Vec::new(), seen: FxHashSet::default() }
    }

    /// Returns `false` if `value` was already present.
    pub fn insert(&mut self, value: T) -> bool {
        if self.seen.insert(value) {
            self.order.push(value);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.seen.contains(value)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

impl<T: Copy + Eq + Hash> Default for ScratchSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> Extend<T> for ScratchSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}

/// Free list of cleared [`ScratchSet`]s. A set taken from the pool is owned by
/// the caller until it is given back; capacity is kept across ticks.
#[derive(Debug)]
pub struct ScratchPool<T> {
    free: Vec<ScratchSet<T>>,
}

impl<T: Copy + Eq + Hash> ScratchPool<T> {
    pub fn new() -> Self {
        Self { free: Vec::new() }
    }

    pub fn take(&mut self) -> ScratchSet<T> {
        self.free.pop().unwrap_or_default()
    }

    pub fn give(&mut self, mut set: ScratchSet<T>) {
        set.clear();
        self.free.push(set);
    }

    /// Number of idle sets.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl<T: Copy + Eq + Hash> Default for ScratchPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
