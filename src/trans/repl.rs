/*!
Replacement policies for the set-associative translation arrays.

A policy ranks eviction candidates within one set and is notified on
every access and eviction. Policies are pre-sized to the entry count of
the store they serve.
*/

use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use super::TransReq;

/// Ranks eviction candidates and tracks access recency.
///
/// Slot ids are global across the store; one set's candidates form a
/// contiguous range.
pub trait ReplPolicy: Send {
    /// Called on every hit and on every insert, after the slot holds
    /// the accessed entry.
    fn update(&mut self, slot: u32, req: &TransReq<'_>);

    /// Called when a slot's entry is evicted or invalidated.
    fn replaced(&mut self, slot: u32);

    /// Picks the victim among the candidate slots of one set.
    fn rank(&mut self, req: &TransReq<'_>, cands: Range<u32>) -> u32;
}

/// Least-recently-used replacement.
///
/// Keeps one monotone timestamp per slot; `replaced` zeroes the stamp
/// so freed slots win ranking before any resident entry.
pub struct LruReplPolicy {
    timestamps: Box<[u64]>,
    tick: u64,
}

impl LruReplPolicy {
    pub fn new(num_entries: u32) -> Self {
        Self {
            timestamps: vec![0; num_entries as usize].into_boxed_slice(),
            tick: 0,
        }
    }
}

impl ReplPolicy for LruReplPolicy {
    fn update(&mut self, slot: u32, _req: &TransReq<'_>) {
        self.tick += 1;
        self.timestamps[slot as usize] = self.tick;
    }

    fn replaced(&mut self, slot: u32) {
        self.timestamps[slot as usize] = 0;
    }

    fn rank(&mut self, _req: &TransReq<'_>, cands: Range<u32>) -> u32 {
        let mut best = cands.start;
        for slot in cands {
            if self.timestamps[slot as usize] < self.timestamps[best as usize] {
                best = slot;
            }
        }
        best
    }
}

/// Uniform random replacement.
///
/// Seeded explicitly so simulated timings stay reproducible.
pub struct RandReplPolicy {
    rng: XorShiftRng,
}

impl RandReplPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }
}

impl ReplPolicy for RandReplPolicy {
    fn update(&mut self, _slot: u32, _req: &TransReq<'_>) {}

    fn replaced(&mut self, _slot: u32) {}

    fn rank(&mut self, _req: &TransReq<'_>, cands: Range<u32>) -> u32 {
        self.rng.gen_range(cands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;
    use parking_lot::Mutex;

    fn touch(rp: &mut dyn ReplPolicy, slot: u32) {
        let lock = Mutex::new(());
        let req = TransReq::new(Address::from(0x1000_u64), 0, &lock);
        rp.update(slot, &req);
    }

    fn rank(rp: &mut dyn ReplPolicy, cands: Range<u32>) -> u32 {
        let lock = Mutex::new(());
        let req = TransReq::new(Address::from(0x1000_u64), 0, &lock);
        rp.rank(&req, cands)
    }

    #[test]
    fn test_lru_order() {
        let mut rp = LruReplPolicy::new(4);
        for slot in 0..4 {
            touch(&mut rp, slot);
        }
        assert_eq!(rank(&mut rp, 0..4), 0);

        // refreshing slot 0 moves the victim to slot 1
        touch(&mut rp, 0);
        assert_eq!(rank(&mut rp, 0..4), 1);
    }

    #[test]
    fn test_lru_prefers_freed_slot() {
        let mut rp = LruReplPolicy::new(4);
        for slot in 0..4 {
            touch(&mut rp, slot);
        }
        rp.replaced(2);
        assert_eq!(rank(&mut rp, 0..4), 2);
    }

    #[test]
    fn test_rand_in_range() {
        let mut rp = RandReplPolicy::new(0x5eed);
        for _ in 0..100 {
            let slot = rank(&mut rp, 4..8);
            assert!((4..8).contains(&slot));
        }
    }

    #[test]
    fn test_rand_reproducible() {
        let mut a = RandReplPolicy::new(7);
        let mut b = RandReplPolicy::new(7);
        for _ in 0..16 {
            assert_eq!(rank(&mut a, 0..16), rank(&mut b, 0..16));
        }
    }
}
