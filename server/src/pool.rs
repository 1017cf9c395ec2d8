//! Dense entity pools with free-list reuse.
//!
//! Slot 0 is a permanent sentinel so that "id 0" can mean "none" in every
//! cross-reference. Allocation pops the free list; death pushes it back.
//! Compaction policy lives with the entity code, which knows how to choose
//! victims and patch back-references; the pool only provides the mechanics.

/// Implemented by pooled entity types.
pub trait PoolSlot: Default {
    /// A dead slot is skipped by iteration and reusable by `alloc`.
    fn is_alive(&self) -> bool;
}

pub struct Pool<T: PoolSlot> {
    slots: Vec<T>,
    free: Vec<u16>,
    alive: usize,
}

impl<T: PoolSlot> Pool<T> {
    pub fn new(capacity: usize) -> Pool<T> {
        assert!(capacity >= 2 && capacity <= u16::MAX as usize);
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(T::default());
        }
        // Slot 0 is never handed out.
        let free = (1..capacity as u16).rev().collect();
        Pool { slots, free, alive: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn alive(&self) -> usize {
        self.alive
    }

    /// Fill check against the compaction high-water mark.
    pub fn over_high_water(&self) -> bool {
        use deephold_core::constants::{POOL_HIGH_WATER_DEN, POOL_HIGH_WATER_NUM};
        self.alive * POOL_HIGH_WATER_DEN >= self.capacity() * POOL_HIGH_WATER_NUM
    }

    /// Claim a slot and initialise it with `value`. Returns `None` when the
    /// pool is exhausted; the caller decides whether to compact and retry.
    pub fn alloc(&mut self, value: T) -> Option<u16> {
        debug_assert!(value.is_alive());
        let id = self.free.pop()?;
        self.slots[id as usize] = value;
        self.alive += 1;
        Some(id)
    }

    /// Release a slot. The entity code must have cleared every
    /// back-reference before calling this.
    pub fn release(&mut self, id: u16) {
        debug_assert!(id != 0);
        if self.slots[id as usize].is_alive() {
            self.slots[id as usize] = T::default();
            self.free.push(id);
            self.alive -= 1;
        }
    }

    pub fn get(&self, id: u16) -> Option<&T> {
        let slot = self.slots.get(id as usize)?;
        if id != 0 && slot.is_alive() {
            Some(slot)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut T> {
        let slot = self.slots.get_mut(id as usize)?;
        if id != 0 && slot.is_alive() {
            Some(slot)
        } else {
            None
        }
    }

    /// Direct slot access for code that has already validated the id.
    pub fn slot_mut(&mut self, id: u16) -> &mut T {
        &mut self.slots[id as usize]
    }

    /// Walk only live slots.
    pub fn iter_alive(&self) -> impl Iterator<Item = (u16, &T)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.is_alive())
            .map(|(i, s)| (i as u16, s))
    }

    /// Ids of live slots, for callers that need to mutate while walking.
    pub fn alive_ids(&self) -> Vec<u16> {
        self.iter_alive().map(|(i, _)| i).collect()
    }

    /// Move the entity in `from` into the lowest free slot below it, if
    /// any, returning `(from, to)`. Compaction drives this repeatedly and
    /// patches back-references with the returned mapping.
    pub fn relocate_down(&mut self, from: u16) -> Option<(u16, u16)> {
        if !self.slots[from as usize].is_alive() {
            return None;
        }
        // The free list is kept unordered; find the smallest candidate.
        let (pos, &to) = self
            .free
            .iter()
            .enumerate()
            .min_by_key(|(_, &id)| id)?;
        if to >= from {
            return None;
        }
        self.free.swap_remove(pos);
        self.slots.swap(from as usize, to as usize);
        self.free.push(from);
        Some((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Dummy {
        tag: u32,
    }

    impl PoolSlot for Dummy {
        fn is_alive(&self) -> bool {
            self.tag != 0
        }
    }

    #[test]
    fn alloc_never_returns_zero() {
        let mut p: Pool<Dummy> = Pool::new(8);
        let mut seen = Vec::new();
        while let Some(id) = p.alloc(Dummy { tag: 1 }) {
            assert_ne!(id, 0);
            seen.push(id);
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(p.alive(), 7);
    }

    #[test]
    fn release_recycles_slots() {
        let mut p: Pool<Dummy> = Pool::new(4);
        let a = p.alloc(Dummy { tag: 1 }).unwrap();
        let _b = p.alloc(Dummy { tag: 2 }).unwrap();
        p.release(a);
        assert_eq!(p.alive(), 1);
        let c = p.alloc(Dummy { tag: 3 }).unwrap();
        assert_eq!(c, a);
        // Double release is a no-op.
        p.release(a);
        p.release(a);
        assert_eq!(p.alive(), 1);
    }

    #[test]
    fn iteration_skips_dead() {
        let mut p: Pool<Dummy> = Pool::new(8);
        let a = p.alloc(Dummy { tag: 10 }).unwrap();
        let b = p.alloc(Dummy { tag: 20 }).unwrap();
        let c = p.alloc(Dummy { tag: 30 }).unwrap();
        p.release(b);
        let tags: Vec<u32> = p.iter_alive().map(|(_, d)| d.tag).collect();
        assert_eq!(tags, vec![10, 30]);
        assert_eq!(p.alive_ids(), vec![a, c]);
    }

    #[test]
    fn relocate_moves_into_lowest_hole() {
        let mut p: Pool<Dummy> = Pool::new(8);
        let ids: Vec<u16> = (0..5).map(|i| p.alloc(Dummy { tag: 100 + i }).unwrap()).collect();
        p.release(ids[0]);
        p.release(ids[2]);
        // The highest live entity should land in the lowest hole.
        let (from, to) = p.relocate_down(ids[4]).unwrap();
        assert_eq!(from, ids[4]);
        assert_eq!(to, ids[0]);
        assert_eq!(p.get(to).unwrap().tag, 104);
        assert!(p.get(from).is_none());
    }

    #[test]
    fn high_water_trips_at_three_quarters() {
        let mut p: Pool<Dummy> = Pool::new(8);
        for _ in 0..5 {
            p.alloc(Dummy { tag: 1 });
        }
        assert!(!p.over_high_water());
        p.alloc(Dummy { tag: 1 });
        assert!(p.over_high_water());
    }
}
