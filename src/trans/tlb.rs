/*!
One level of the translation hierarchy.

The replacement policy and translation array are mix and match; the
level itself only owns the lock discipline, the latency composition and
the chaining to its parent.
*/

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::error::Result;
use crate::hash::{HashFamily, MixHashFamily};
use crate::stats::{Counter, StatGroup};

use super::repl::{LruReplPolicy, ReplPolicy};
use super::tlb_array::{SetAssocArray, TlbArray};
use super::{trans_trace, InvKind, ParentRef, TransInvReq, TransObject, TransReq};

/// A single coherent TLB level.
///
/// Owns its translation array and replacement state behind one lock,
/// held for the full local duration of an access or invalidation,
/// including while calling into the parent. Parents never call back
/// into children, so lock acquisition order is strictly child then
/// parent and cannot cycle.
pub struct Tlb {
    parent: Option<ParentRef>,
    array: Mutex<Box<dyn TlbArray>>,

    /// Latency of a normal access.
    acc_lat: u64,
    /// Latency of an invalidation.
    inv_lat: u64,

    /// Ordinal of this level in the hierarchy; invalidations stop
    /// here unless their target level is greater.
    level: u32,
    name: String,

    prof_hit: Arc<Counter>,
    prof_miss: Arc<Counter>,
    prof_inv_entry: Arc<Counter>,
    prof_inv_all: Arc<Counter>,
    prof_next_level_lat: Arc<Counter>,
    prof_inv_next_level_lat: Arc<Counter>,
}

impl Tlb {
    pub fn builder(name: impl Into<String>) -> TlbBuilder {
        TlbBuilder::new(name)
    }

    pub fn access_latency(&self) -> u64 {
        self.acc_lat
    }

    pub fn invalidate_latency(&self) -> u64 {
        self.inv_lat
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Registers this level's counters into an existing group.
    ///
    /// The filter front end reuses this to fold the wrapped level's
    /// counters into its own group.
    pub(crate) fn init_tlb_stats(&self, group: &mut StatGroup) {
        group.counter("hLKUP", "lookup hits", &self.prof_hit);
        group.counter("mLKUP", "lookup misses", &self.prof_miss);
        group.counter("INVPTE", "single-entry invalidations", &self.prof_inv_entry);
        group.counter("INVALL", "full invalidations", &self.prof_inv_all);
        group.counter(
            "latLKUPnl",
            "lookup latency spent on the next level",
            &self.prof_next_level_lat,
        );
        group.counter(
            "latINVnl",
            "invalidation latency spent on the next level",
            &self.prof_inv_next_level_lat,
        );
    }
}

impl TransObject for Tlb {
    fn access(&self, req: TransReq<'_>) -> u64 {
        trans_trace!("[{}] access {:x} @ {}", self.name, req.page_addr, req.cycle);
        let mut resp = req.cycle;

        let mut array = self.array.lock();
        let hit = array.lookup(req.page_addr, &req, true);
        resp += self.acc_lat;

        if hit.is_none() {
            self.prof_miss.inc();
            if let Some(parent) = &self.parent {
                let next_level_lat = parent.access(req.forwarded(resp)) - resp;
                self.prof_next_level_lat.add(next_level_lat);
                resp += next_level_lat;
            }
            let (_slot, victim) = array.insert(req.page_addr, &req);
            if let Some(victim) = victim {
                log::trace!("[{}] evicting {:x}", self.name, victim);
            }
        } else {
            self.prof_hit.inc();
        }
        drop(array);

        assert!(
            resp >= req.cycle + self.acc_lat,
            "[{}] completion before arrival: page {:x}, resp cycle {}, req cycle {}",
            self.name,
            req.page_addr,
            resp,
            req.cycle
        );
        resp
    }

    fn invalidate(&self, req: TransInvReq) -> u64 {
        trans_trace!(
            "[{}] {} {:x} @ {}",
            self.name,
            req.kind.name(),
            req.page_addr,
            req.cycle
        );
        let mut resp = req.cycle + self.inv_lat;

        let mut array = self.array.lock();
        match req.kind {
            InvKind::Entry => {
                self.prof_inv_entry.inc();
                array.invalidate_entry(req.page_addr);
            }
            InvKind::All => {
                self.prof_inv_all.inc();
                array.invalidate_all();
            }
        }

        if req.level > self.level {
            if let Some(parent) = &self.parent {
                let fwd = TransInvReq { cycle: resp, ..req };
                let next_level_lat = parent.invalidate(fwd) - resp;
                self.prof_inv_next_level_lat.add(next_level_lat);
                resp += next_level_lat;
            }
        }
        drop(array);

        resp
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init_stats(&self, parent: &mut StatGroup) {
        let mut group = StatGroup::new(self.name.clone(), "tlb stats");
        self.init_tlb_stats(&mut group);
        parent.append(group);
    }
}

/// Builder for a [`Tlb`] level.
pub struct TlbBuilder {
    name: String,
    entries: u32,
    assoc: u32,
    acc_lat: u64,
    inv_lat: u64,
    level: u32,
    parent: Option<ParentRef>,
    hash: Option<Box<dyn HashFamily>>,
    policy: Option<Box<dyn ReplPolicy>>,
    array: Option<Box<dyn TlbArray>>,
}

impl TlbBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: 64,
            assoc: 4,
            acc_lat: 1,
            inv_lat: 1,
            level: 1,
            parent: None,
            hash: None,
            policy: None,
            array: None,
        }
    }

    pub fn entries(mut self, entries: u32) -> Self {
        self.entries = entries;
        self
    }

    pub fn assoc(mut self, assoc: u32) -> Self {
        self.assoc = assoc;
        self
    }

    pub fn access_latency(mut self, cycles: u64) -> Self {
        self.acc_lat = cycles;
        self
    }

    pub fn invalidate_latency(mut self, cycles: u64) -> Self {
        self.inv_lat = cycles;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn parent(mut self, parent: ParentRef) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Overrides the default set-selection hash family.
    pub fn hash(mut self, hash: Box<dyn HashFamily>) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Overrides the default LRU policy. The policy must be pre-sized
    /// to the configured entry count.
    pub fn policy(mut self, policy: Box<dyn ReplPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replaces the whole translation array, bypassing the
    /// entries/assoc/hash/policy knobs.
    pub fn array(mut self, array: Box<dyn TlbArray>) -> Self {
        self.array = Some(array);
        self
    }

    pub fn build(self) -> Result<Tlb> {
        let entries = self.entries;
        let array = match self.array {
            Some(array) => array,
            None => {
                let policy = self
                    .policy
                    .unwrap_or_else(|| Box::new(LruReplPolicy::new(entries)));
                let hash = self
                    .hash
                    .unwrap_or_else(|| Box::new(MixHashFamily::new()));
                Box::new(SetAssocArray::new(entries, self.assoc, policy, hash)?)
            }
        };

        debug!(
            "[{}] level {} tlb: {} entries, {}-way, accLat {}, invLat {}",
            self.name, self.level, entries, self.assoc, self.acc_lat, self.inv_lat
        );

        Ok(Tlb {
            parent: self.parent,
            array: Mutex::new(array),
            acc_lat: self.acc_lat,
            inv_lat: self.inv_lat,
            level: self.level,
            name: self.name,
            prof_hit: Counter::new(),
            prof_miss: Counter::new(),
            prof_inv_entry: Counter::new(),
            prof_inv_all: Counter::new(),
            prof_next_level_lat: Counter::new(),
            prof_inv_next_level_lat: Counter::new(),
        })
    }
}
