/*!
Backing-memory collaborator of the page-table walker.

The walker does not model the cache hierarchy below it; it issues timed
accesses against anything implementing [`MemoryModel`] and composes the
reported latencies. [`FixedLatencyMemory`] is the standalone model used
when no full memory hierarchy is wired up.
*/

use std::sync::Arc;

use parking_lot::Mutex;

use crate::stats::{Counter, StatGroup};
use crate::types::Address;

/// Kind of a backing-memory access.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemAccessKind {
    /// Plain data read.
    Read,
    /// Page-table entry fetch issued by the walker.
    PageTableFetch,
}

/// A timed request against the backing memory model.
#[derive(Copy, Clone)]
pub struct MemReq<'a> {
    /// Cache-line address of the access.
    pub line_addr: Address,
    pub kind: MemAccessKind,
    /// Cycle at which the request arrives at the memory model.
    pub cycle: u64,
    /// Requester id, used for contention simulation.
    pub src_id: u32,
    /// Lock owned by the requester, used by the memory model to
    /// synchronize races against the issuing walker.
    pub req_lock: &'a Mutex<()>,
}

/// A memory object the walker can issue timed accesses against.
pub trait MemoryModel: Send + Sync {
    /// Returns the cycle at which the access completes.
    fn access(&self, req: MemReq<'_>) -> u64;

    fn name(&self) -> &str;

    fn init_stats(&self, _parent: &mut StatGroup) {}
}

/// Memory model with a single constant access latency.
pub struct FixedLatencyMemory {
    latency: u64,
    name: String,
    prof_req: Arc<Counter>,
}

impl FixedLatencyMemory {
    pub fn new(name: impl Into<String>, latency: u64) -> Self {
        Self {
            latency,
            name: name.into(),
            prof_req: Counter::new(),
        }
    }
}

impl MemoryModel for FixedLatencyMemory {
    fn access(&self, req: MemReq<'_>) -> u64 {
        self.prof_req.inc();
        req.cycle + self.latency
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init_stats(&self, parent: &mut StatGroup) {
        let mut group = StatGroup::new(self.name.clone(), "memory stats");
        group.counter("REQ", "requests", &self.prof_req);
        parent.append(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_latency() {
        let mem = FixedLatencyMemory::new("mem", 35);
        let lock = Mutex::new(());
        let req = MemReq {
            line_addr: Address::from(0x40_u64),
            kind: MemAccessKind::Read,
            cycle: 100,
            src_id: 0,
            req_lock: &lock,
        };
        assert_eq!(mem.access(req), 135);

        let mut root = StatGroup::new("root", "");
        mem.init_stats(&mut root);
        assert_eq!(root.counter_value("REQ"), Some(1));
    }
}
