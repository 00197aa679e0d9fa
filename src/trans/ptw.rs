/*!
The page-table walker, terminal level of the hierarchy.

The walker prices a fixed-depth radix-table traversal without modeling
actual page-table contents. In real-memory mode every level issues a
timed fetch against the backing memory model; pseudo table addresses
for the inner levels are derived with a hash family standing in for the
unmodeled table data.
*/

use std::sync::Arc;

use log::{debug, error};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::hash::{HashFamily, MixHashFamily};
use crate::mem::{MemAccessKind, MemReq, MemoryModel};
use crate::stats::{Counter, StatGroup};
use crate::types::{Address, LINE_BITS_64B, PAGE_SIZE_2M, PAGE_SIZE_4K};

use super::{trans_trace, InvKind, TransInvReq, TransObject, TransReq};

/// Base address of the simulated top-level table.
const WALK_BASE_ADDR: u64 = 0xAAAA_u64 << 32;

/// Index bits consumed per radix-table level.
const RADIX_BITS: u32 = 9;
const RADIX_MASK: u64 = 0x1ff;

/// Size of one page-table entry in bytes.
const PTE_BYTES: u64 = 8;

/// Fixed per-level walk overhead on top of the memory latency.
const WALK_STEP_LAT: u64 = 1;

/// Floor substituted when the backing access reports a near-zero
/// latency; a walk step never resolves faster than a shared-cache hit.
const SHARED_CACHE_LAT: u64 = 7;

/// Simulated page-table walker.
///
/// One lock serializes the walk bookkeeping per instance; the backing
/// memory model orders its own state internally.
pub struct Ptw {
    mem: Option<Arc<dyn MemoryModel>>,
    hf: Box<dyn HashFamily>,

    /// Radix-table depth, derived from the configured page size.
    levels: u32,
    base_addr: u64,
    line_bits: u32,

    /// Latency of a request in fixed mode.
    acc_lat: u64,
    /// Latency of an invalidation.
    inv_lat: u64,

    walk_lock: Mutex<()>,
    name: String,

    prof_req: Arc<Counter>,
    prof_inv_entry: Arc<Counter>,
    prof_inv_all: Arc<Counter>,
    prof_mem_access: Arc<Counter>,
    prof_mem_access_lat: Arc<Counter>,
    prof_walk_lat: Arc<Counter>,
}

impl Ptw {
    pub fn builder(name: impl Into<String>) -> PtwBuilder {
        PtwBuilder::new(name)
    }

    pub fn levels(&self) -> u32 {
        self.levels
    }
}

impl TransObject for Ptw {
    fn access(&self, req: TransReq<'_>) -> u64 {
        let mut resp = req.cycle;

        let _guard = self.walk_lock.lock();
        self.prof_req.inc();

        match &self.mem {
            None => {
                resp += self.acc_lat;
            }
            Some(mem) => {
                let mut table_addr = self.base_addr;
                for level in 1..=self.levels {
                    let idx = (req.page_addr.as_u64() >> (RADIX_BITS * (self.levels - level)))
                        & RADIX_MASK;
                    let pte_addr = table_addr.wrapping_add(idx * PTE_BYTES);

                    let mem_req = MemReq {
                        line_addr: Address::from(pte_addr).to_line(self.line_bits),
                        kind: MemAccessKind::PageTableFetch,
                        cycle: resp,
                        src_id: req.src_id,
                        req_lock: &self.walk_lock,
                    };
                    let done = mem.access(mem_req);
                    assert!(
                        done >= resp,
                        "[{}] backing memory went backwards: pte {:x}, done {}, issued {}",
                        self.name,
                        pte_addr,
                        done,
                        resp
                    );
                    let mut mem_lat = done - resp;
                    if mem_lat == 0 {
                        mem_lat = SHARED_CACHE_LAT;
                    }
                    trans_trace!(
                        "[{}] level {} fetch pte {:x}, lat {}",
                        self.name,
                        level,
                        pte_addr,
                        mem_lat
                    );

                    self.prof_mem_access.inc();
                    self.prof_mem_access_lat.add(mem_lat);
                    self.prof_walk_lat.add(mem_lat + WALK_STEP_LAT);
                    resp += mem_lat + WALK_STEP_LAT;

                    if level != self.levels {
                        // pseudo address of the next table, standing in
                        // for the unmodeled table contents
                        table_addr = self.hf.hash(0, pte_addr);
                    }
                }
            }
        }

        assert!(
            resp >= req.cycle,
            "[{}] completion before arrival: page {:x}, resp cycle {}, req cycle {}",
            self.name,
            req.page_addr,
            resp,
            req.cycle
        );
        resp
    }

    fn invalidate(&self, req: TransInvReq) -> u64 {
        let _guard = self.walk_lock.lock();
        match req.kind {
            InvKind::Entry => self.prof_inv_entry.inc(),
            InvKind::All => self.prof_inv_all.inc(),
        }
        req.cycle + self.inv_lat
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init_stats(&self, parent: &mut StatGroup) {
        let mut group = StatGroup::new(self.name.clone(), "ptw stats");
        group.counter("REQ", "requests", &self.prof_req);
        group.counter("INVPTE", "single-entry invalidations", &self.prof_inv_entry);
        group.counter("INVALL", "full invalidations", &self.prof_inv_all);
        group.counter("MemAccess", "memory accesses", &self.prof_mem_access);
        group.counter("MemAccessLat", "memory access latency", &self.prof_mem_access_lat);
        group.counter(
            "WalkLat",
            "walk latency including memory access",
            &self.prof_walk_lat,
        );
        parent.append(group);
    }
}

/// Builder for a [`Ptw`].
///
/// Fixed mode is the default; wiring a backing memory model with
/// [`PtwBuilder::real_memory`] switches the walker to per-level timed
/// fetches.
pub struct PtwBuilder {
    name: String,
    page_size: u64,
    acc_lat: u64,
    inv_lat: u64,
    line_bits: u32,
    mem: Option<Arc<dyn MemoryModel>>,
    hash: Option<Box<dyn HashFamily>>,
}

impl PtwBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page_size: PAGE_SIZE_4K,
            acc_lat: 20,
            inv_lat: 1,
            line_bits: LINE_BITS_64B,
            mem: None,
            hash: None,
        }
    }

    pub fn page_size(mut self, bytes: u64) -> Self {
        self.page_size = bytes;
        self
    }

    /// Latency of a whole walk in fixed mode.
    pub fn access_latency(mut self, cycles: u64) -> Self {
        self.acc_lat = cycles;
        self
    }

    pub fn invalidate_latency(mut self, cycles: u64) -> Self {
        self.inv_lat = cycles;
        self
    }

    pub fn line_bits(mut self, line_bits: u32) -> Self {
        self.line_bits = line_bits;
        self
    }

    /// Switches to real-memory mode, walking against `mem`.
    pub fn real_memory(mut self, mem: Arc<dyn MemoryModel>) -> Self {
        self.mem = Some(mem);
        self
    }

    /// Overrides the pseudo table-address hash family.
    pub fn hash(mut self, hash: Box<dyn HashFamily>) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn build(self) -> Result<Ptw> {
        let levels = match self.page_size {
            PAGE_SIZE_4K => 4,
            PAGE_SIZE_2M => 3,
            _ => {
                error!("[{}] unsupported page size {}", self.name, self.page_size);
                return Err(Error::UnsupportedPageSize);
            }
        };

        debug!(
            "[{}] ptw: {}-level walk, {} mode, accLat {}, invLat {}",
            self.name,
            levels,
            if self.mem.is_some() { "real-memory" } else { "fixed" },
            self.acc_lat,
            self.inv_lat
        );

        Ok(Ptw {
            mem: self.mem,
            hf: self.hash.unwrap_or_else(|| Box::new(MixHashFamily::new())),
            levels,
            base_addr: WALK_BASE_ADDR,
            line_bits: self.line_bits,
            acc_lat: self.acc_lat,
            inv_lat: self.inv_lat,
            walk_lock: Mutex::new(()),
            name: self.name,
            prof_req: Counter::new(),
            prof_inv_entry: Counter::new(),
            prof_inv_all: Counter::new(),
            prof_mem_access: Counter::new(),
            prof_mem_access_lat: Counter::new(),
            prof_walk_lat: Counter::new(),
        })
    }
}
