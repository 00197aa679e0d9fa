/*!
The translation hierarchy: request/interface types, per-level TLBs, the
lock-free filter front end and the page-table walker.

A translation request enters at the top of the hierarchy (the
[`FilterTlb`] when present, else the top [`Tlb`]), flows downward on
misses through the parent chain, and terminates at the [`Ptw`].
Invalidations flow the same direction, bounded by the target level
carried in the request.
*/

use std::sync::Arc;

use parking_lot::Mutex;

use crate::stats::StatGroup;
use crate::types::Address;

pub mod repl;
pub mod tlb_array;

pub mod filter_tlb;
pub mod ptw;
pub mod tlb;

pub use filter_tlb::{FilterTlb, FilterTlbBuilder};
pub use ptw::{Ptw, PtwBuilder};
pub use repl::{LruReplPolicy, RandReplPolicy, ReplPolicy};
pub use tlb::{Tlb, TlbBuilder};
pub use tlb_array::{SetAssocArray, TlbArray};

#[cfg(feature = "trace_trans")]
macro_rules! trans_trace {
    ( $( $x:expr ),* ) => {
        log::trace!( $($x, )* );
    }
}

#[cfg(not(feature = "trace_trans"))]
macro_rules! trans_trace {
    ( $( $x:expr ),* ) => {};
}

pub(crate) use trans_trace;

bitflags! {
    /// Request flags; they propagate across levels, though not to
    /// evictions.
    pub struct ReqFlags: u32 {
        /// Prefetch rather than demand access.
        const PREFETCH = 1 << 1;
    }
}

/// A translation request.
///
/// Immutable once issued; a level forwards a derived copy with an
/// updated arrival cycle to its parent (see [`TransReq::forwarded`]).
#[derive(Copy, Clone)]
pub struct TransReq<'a> {
    /// Page address being translated.
    pub page_addr: Address,
    /// Child identifier at the issuing level.
    pub child_id: u32,
    /// Cycle at which the request arrives at the component.
    pub cycle: u64,
    /// Lock owned by the requester, used to synchronize cross-level
    /// races.
    pub child_lock: &'a Mutex<()>,
    /// Requester id, used for contention simulation.
    pub src_id: u32,
    pub flags: ReqFlags,
}

impl<'a> TransReq<'a> {
    pub fn new(page_addr: Address, cycle: u64, child_lock: &'a Mutex<()>) -> Self {
        Self {
            page_addr,
            child_id: 0,
            cycle,
            child_lock,
            src_id: 0,
            flags: ReqFlags::empty(),
        }
    }

    /// Derives the copy of this request a level hands to its parent,
    /// arriving at `cycle`.
    pub fn forwarded(&self, cycle: u64) -> TransReq<'a> {
        TransReq { cycle, ..*self }
    }

    pub fn is(&self, flag: ReqFlags) -> bool {
        self.flags.contains(flag)
    }
}

/// Kind of an invalidation request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InvKind {
    /// Invalidate the entry for one page address.
    Entry,
    /// Invalidate every entry.
    All,
}

impl InvKind {
    /// Convenience method for clearer debug traces.
    pub fn name(self) -> &'static str {
        match self {
            InvKind::Entry => "INVPTE",
            InvKind::All => "INVALL",
        }
    }
}

/// An invalidation request, issued from upper to lower levels.
#[derive(Copy, Clone)]
pub struct TransInvReq {
    pub page_addr: Address,
    pub kind: InvKind,
    /// Cycle at which the request arrives at the component.
    pub cycle: u64,
    /// Deepest level ordinal the invalidation applies to; a level only
    /// forwards the request while `level` exceeds its own ordinal.
    pub level: u32,
}

/// A component of the translation hierarchy (TLB level or walker).
///
/// Both entry points must be safe under concurrent invocation from
/// different requesters; each implementation serializes its own state
/// behind its own lock, acquired strictly child-before-parent.
pub trait TransObject: Send + Sync {
    /// Runs a translation request, returning its completion cycle.
    fn access(&self, req: TransReq<'_>) -> u64;

    /// Applies an invalidation, returning its completion cycle.
    fn invalidate(&self, req: TransInvReq) -> u64;

    fn name(&self) -> &str;

    fn init_stats(&self, _parent: &mut StatGroup) {}
}

/// Shared handle to a parent component in the hierarchy.
pub type ParentRef = Arc<dyn TransObject>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded() {
        let lock = Mutex::new(());
        let mut req = TransReq::new(Address::from(0x1000_u64), 50, &lock);
        req.flags = ReqFlags::PREFETCH;

        let fwd = req.forwarded(75);
        assert_eq!(fwd.cycle, 75);
        assert_eq!(fwd.page_addr, req.page_addr);
        assert!(fwd.is(ReqFlags::PREFETCH));
    }

    #[test]
    fn test_inv_kind_name() {
        assert_eq!(InvKind::Entry.name(), "INVPTE");
        assert_eq!(InvKind::All.name(), "INVALL");
    }

    #[test]
    fn test_full_hierarchy() {
        use crate::mem::FixedLatencyMemory;
        use crate::types::{PAGE_BITS_4K, PAGE_SIZE_4K};

        let mem = Arc::new(FixedLatencyMemory::new("mem", 20));
        let ptw: ParentRef = Arc::new(
            Ptw::builder("ptw")
                .page_size(PAGE_SIZE_4K)
                .real_memory(mem)
                .build()
                .unwrap(),
        );
        let l2: ParentRef = Arc::new(
            Tlb::builder("l2tlb")
                .entries(64)
                .assoc(8)
                .access_latency(7)
                .invalidate_latency(3)
                .level(2)
                .parent(ptw)
                .build()
                .unwrap(),
        );
        let l1 = FilterTlb::builder("l1tlb")
            .sets(4)
            .entries(16)
            .assoc(4)
            .access_latency(1)
            .invalidate_latency(2)
            .level(1)
            .parent(l2.clone())
            .build()
            .unwrap();

        let vaddr = Address::from(0xabcd_e000_u64);
        let vpage = vaddr.to_page(PAGE_BITS_4K);

        // cold walk: l1 + l2 + four timed fetches with step overhead
        assert_eq!(l1.lookup(vaddr, 0), 1 + 7 + 4 * (20 + 1));
        // repeat hit comes straight from the filter
        assert_eq!(l1.lookup(vaddr, 93), 93);

        // invalidate down to level 2; the walker is left alone
        let resp = l1.invalidate(TransInvReq {
            page_addr: vpage,
            kind: InvKind::Entry,
            cycle: 100,
            level: 2,
        });
        assert_eq!(resp, 100 + 2 + 3);

        // everything below refills on the next access
        assert_eq!(l1.lookup(vaddr, 200), 200 + 1 + 7 + 4 * (20 + 1));

        // a full invalidation targeted at level 3 reaches the walker
        let resp = l1.invalidate(TransInvReq {
            page_addr: Address::NULL,
            kind: InvKind::All,
            cycle: 0,
            level: 3,
        });
        assert_eq!(resp, 2 + 3 + 1);

        let mut root = StatGroup::new("root", "all stats");
        l1.init_stats(&mut root);
        l2.init_stats(&mut root);
        assert_eq!(root.group("l1tlb").unwrap().counter_value("INVALL"), Some(1));
        assert_eq!(root.group("l2tlb").unwrap().counter_value("INVALL"), Some(1));
        assert_eq!(root.counter_value("fhLKUP"), Some(1));
    }
}
