/*!
Lock-free fast path in front of a TLB level.

Lookups at the first level are dominated by overhead: taking the level
lock and dispatching into the replacement policy. This decorator keeps
the last request serviced for each set in a tiny direct-mapped array
and answers repeat hits from it without acquiring any lock.
*/

use std::cmp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::stats::{Counter, StatGroup};
use crate::types::{Address, PAGE_BITS_4K};

use super::tlb::TlbBuilder;
use super::{trans_trace, ParentRef, ReqFlags, Tlb, TransInvReq, TransObject, TransReq};

/// The last request serviced for one filter set.
///
/// Both fields are read on the lock-free hit path. The availability
/// cycle must be read before the tag, and `replace` publishes the tag
/// before the cycle; a torn pair then fails the tag compare instead of
/// returning another entry's completion cycle.
struct FilterEntry {
    tag: AtomicU64,
    avail_cycle: AtomicU64,
}

impl FilterEntry {
    fn new() -> Self {
        Self {
            tag: AtomicU64::new(Address::INVALID.as_u64()),
            avail_cycle: AtomicU64::new(0),
        }
    }

    fn clear(&self) {
        self.tag.store(Address::INVALID.as_u64(), Ordering::Release);
        self.avail_cycle.store(0, Ordering::Release);
    }
}

/// A [`Tlb`] level fronted by a direct-mapped filter array.
///
/// The filter holds one entry per set and bypasses the wrapped level
/// entirely on repeat hits to the same page. The filter's own lock is
/// distinct from the wrapped level's lock and is always acquired
/// before it.
pub struct FilterTlb {
    tlb: Tlb,

    filter: Box<[FilterEntry]>,
    set_mask: u64,
    page_bits: u32,

    /// Address-space bits folded into requests sent down the
    /// hierarchy; must sit above the page-number bits.
    asid_mask: AtomicU64,
    /// Requester id, should match the owning core.
    src_id: u32,
    req_flags: ReqFlags,

    filter_lock: Mutex<()>,
    prof_filter_hit: Arc<Counter>,
}

impl FilterTlb {
    pub fn builder(name: impl Into<String>) -> FilterTlbBuilder {
        FilterTlbBuilder::new(name)
    }

    /// Looks up a full virtual address, returning the completion cycle.
    ///
    /// On a filter hit this takes no lock at all; otherwise the entry
    /// is replaced through the wrapped level.
    pub fn lookup(&self, vaddr: Address, cur_cycle: u64) -> u64 {
        let vpage = vaddr.to_page(self.page_bits);
        let idx = (vpage.as_u64() & self.set_mask) as usize;
        let entry = &self.filter[idx];

        // availability before tag; see FilterEntry
        let avail_cycle = entry.avail_cycle.load(Ordering::Acquire);
        if entry.tag.load(Ordering::Acquire) == vpage.as_u64() {
            self.prof_filter_hit.inc();
            cmp::max(cur_cycle, avail_cycle)
        } else {
            self.replace(vpage, idx, cur_cycle)
        }
    }

    /// Runs the real access through the wrapped level and installs the
    /// result in the filter.
    fn replace(&self, vpage: Address, idx: usize, cur_cycle: u64) -> u64 {
        let _guard = self.filter_lock.lock();

        let tagged_page =
            Address::from(self.asid_mask.load(Ordering::Relaxed) | vpage.as_u64());
        let req = TransReq {
            page_addr: tagged_page,
            child_id: 0,
            cycle: cur_cycle,
            child_lock: &self.filter_lock,
            src_id: self.src_id,
            flags: self.req_flags,
        };
        // the wrapped level takes its own lock internally
        let resp_cycle = self.tlb.access(req);

        let entry = &self.filter[idx];
        // tag first, then the cycle, and only when the tag actually
        // changed: a concurrent request for the already-present page
        // may still rely on the stored cycle
        let old_tag = entry.tag.swap(vpage.as_u64(), Ordering::Release);
        if old_tag != vpage.as_u64() {
            entry.avail_cycle.store(resp_cycle, Ordering::Release);
        }

        resp_cycle
    }

    /// Wipes every filter entry.
    ///
    /// The wrapped level is left untouched; its contents may still be
    /// valid for other execution contexts sharing the same mappings.
    pub fn context_switch(&self) {
        let _guard = self.filter_lock.lock();
        for entry in self.filter.iter() {
            entry.clear();
        }
    }

    /// Installs the address-space bits folded into forwarded requests.
    pub fn set_asid_mask(&self, mask: u64) {
        let _guard = self.filter_lock.lock();
        self.asid_mask.store(mask, Ordering::Relaxed);
    }
}

impl TransObject for FilterTlb {
    fn access(&self, req: TransReq<'_>) -> u64 {
        self.tlb.access(req)
    }

    fn invalidate(&self, req: TransInvReq) -> u64 {
        let _guard = self.filter_lock.lock();

        let idx = (req.page_addr.as_u64() & self.set_mask) as usize;
        let entry = &self.filter[idx];
        // Filter tags drop the address-space bits, so an invalidation
        // arriving from another address space that aliases this index
        // can leave a stale entry behind or clear an unrelated one.
        let tag = entry.tag.load(Ordering::Acquire);
        if (tag | self.asid_mask.load(Ordering::Relaxed)) == req.page_addr.as_u64() {
            trans_trace!("[{}] filter drop {:x}", self.tlb.name(), req.page_addr);
            entry.tag.store(Address::INVALID.as_u64(), Ordering::Release);
        }

        // the wrapped level manages its own lock internally
        self.tlb.invalidate(req)
    }

    fn name(&self) -> &str {
        self.tlb.name()
    }

    fn init_stats(&self, parent: &mut StatGroup) {
        let mut group = StatGroup::new(self.tlb.name(), "filter tlb stats");
        group.counter("fhLKUP", "filtered lookup hits", &self.prof_filter_hit);
        self.tlb.init_tlb_stats(&mut group);
        parent.append(group);
    }
}

/// Builder for a [`FilterTlb`]; wraps a [`TlbBuilder`] for the
/// underlying level.
pub struct FilterTlbBuilder {
    sets: u32,
    page_bits: u32,
    src_id: u32,
    flags: ReqFlags,
    inner: TlbBuilder,
}

impl FilterTlbBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            sets: 8,
            page_bits: PAGE_BITS_4K,
            src_id: 0,
            flags: ReqFlags::empty(),
            inner: TlbBuilder::new(name),
        }
    }

    /// Number of filter sets; must be a power of two.
    pub fn sets(mut self, sets: u32) -> Self {
        self.sets = sets;
        self
    }

    pub fn page_bits(mut self, page_bits: u32) -> Self {
        self.page_bits = page_bits;
        self
    }

    pub fn source_id(mut self, src_id: u32) -> Self {
        self.src_id = src_id;
        self
    }

    pub fn flags(mut self, flags: ReqFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn entries(mut self, entries: u32) -> Self {
        self.inner = self.inner.entries(entries);
        self
    }

    pub fn assoc(mut self, assoc: u32) -> Self {
        self.inner = self.inner.assoc(assoc);
        self
    }

    pub fn access_latency(mut self, cycles: u64) -> Self {
        self.inner = self.inner.access_latency(cycles);
        self
    }

    pub fn invalidate_latency(mut self, cycles: u64) -> Self {
        self.inner = self.inner.invalidate_latency(cycles);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.inner = self.inner.level(level);
        self
    }

    pub fn parent(mut self, parent: ParentRef) -> Self {
        self.inner = self.inner.parent(parent);
        self
    }

    pub fn build(self) -> Result<FilterTlb> {
        if self.sets == 0 || !self.sets.is_power_of_two() {
            return Err(Error::Configuration(
                "filter set count must be a power of two",
            ));
        }

        let filter = (0..self.sets)
            .map(|_| FilterEntry::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(FilterTlb {
            tlb: self.inner.build()?,
            filter,
            set_mask: u64::from(self.sets) - 1,
            page_bits: self.page_bits,
            asid_mask: AtomicU64::new(0),
            src_id: self.src_id,
            req_flags: self.flags,
            filter_lock: Mutex::new(()),
            prof_filter_hit: Counter::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trans::InvKind;

    fn filter_tlb(sets: u32, acc_lat: u64) -> FilterTlb {
        FilterTlb::builder("l1tlb")
            .sets(sets)
            .entries(16)
            .assoc(4)
            .access_latency(acc_lat)
            .invalidate_latency(1)
            .build()
            .unwrap()
    }

    fn stats(tlb: &FilterTlb) -> StatGroup {
        let mut root = StatGroup::new("root", "");
        tlb.init_stats(&mut root);
        root
    }

    #[test]
    fn test_set_count_must_be_pow2() {
        assert_eq!(
            FilterTlb::builder("bad").sets(3).build().err(),
            Some(Error::Configuration(
                "filter set count must be a power of two"
            ))
        );
    }

    #[test]
    fn test_replace_then_hit() {
        // single filter set, 10-cycle level
        let tlb = filter_tlb(1, 10);
        let vaddr = Address::from(0x1234_5000_u64);

        // install at cycle 100; the underlying level fills and reports 110
        assert_eq!(tlb.lookup(vaddr, 100), 110);

        // earlier in-flight request: bounded by the stored availability
        assert_eq!(tlb.lookup(vaddr, 105), 110);
        // later request: its own cycle wins
        assert_eq!(tlb.lookup(vaddr, 120), 120);

        // both hits came from the filter, not the wrapped level
        let root = stats(&tlb);
        assert_eq!(root.counter_value("fhLKUP"), Some(2));
        assert_eq!(root.counter_value("hLKUP"), Some(0));
        assert_eq!(root.counter_value("mLKUP"), Some(1));
    }

    #[test]
    fn test_aliasing_pages_share_one_entry() {
        // single filter set; both pages fight over the same entry but
        // stay resident in the wrapped level
        let tlb = filter_tlb(1, 10);
        let a = Address::from(0x1000_0000_u64);
        let b = Address::from(0x2000_0000_u64);

        assert_eq!(tlb.lookup(a, 0), 10);
        assert_eq!(tlb.lookup(b, 20), 30);

        // a displaced b in the filter, but hits the wrapped level
        assert_eq!(tlb.lookup(a, 40), 50);
        // and now hits the filter again
        assert_eq!(tlb.lookup(a, 45), 50);

        let root = stats(&tlb);
        assert_eq!(root.counter_value("fhLKUP"), Some(1));
        assert_eq!(root.counter_value("hLKUP"), Some(1));
        assert_eq!(root.counter_value("mLKUP"), Some(2));
    }

    #[test]
    fn test_context_switch_wipes_filter_only() {
        let tlb = filter_tlb(4, 5);
        let vaddr = Address::from(0x8000_u64);

        tlb.lookup(vaddr, 0);
        tlb.context_switch();

        // filter miss, but the wrapped level still holds the page
        tlb.lookup(vaddr, 100);
        let root = stats(&tlb);
        assert_eq!(root.counter_value("fhLKUP"), Some(0));
        assert_eq!(root.counter_value("hLKUP"), Some(1));
        assert_eq!(root.counter_value("mLKUP"), Some(1));
    }

    #[test]
    fn test_invalidate_clears_matching_entry() {
        let tlb = filter_tlb(4, 5);
        let vaddr = Address::from(0x3000_u64);
        let vpage = vaddr.to_page(PAGE_BITS_4K);

        tlb.lookup(vaddr, 0);
        tlb.invalidate(TransInvReq {
            page_addr: vpage,
            kind: InvKind::Entry,
            cycle: 50,
            level: 1,
        });

        // both the filter entry and the underlying entry are gone
        tlb.lookup(vaddr, 100);
        let root = stats(&tlb);
        assert_eq!(root.counter_value("fhLKUP"), Some(0));
        assert_eq!(root.counter_value("mLKUP"), Some(2));
    }

    #[test]
    fn test_concurrent_lookups() {
        use std::thread;

        let tlb = Arc::new(filter_tlb(8, 3));
        let mut handles = Vec::new();
        for t in 0..4_u64 {
            let tlb = tlb.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1000_u64 {
                    let vaddr = Address::from(((i % 16) << 12) + t);
                    let resp = tlb.lookup(vaddr, i);
                    assert!(resp >= i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
