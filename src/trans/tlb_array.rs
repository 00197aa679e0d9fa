/*!
Associative storage of one TLB level.

The array is a fixed-size associative container that maps page
addresses to slot ids. A slot id represents the position of the tag;
it owns no policy logic itself and delegates tie-breaks to the
replacement policy.
*/

use log::error;

use crate::error::{Error, Result};
use crate::hash::HashFamily;
use crate::types::Address;

use super::repl::ReplPolicy;
use super::TransReq;

/// General interface of a translation array.
pub trait TlbArray: Send {
    /// Returns the slot id holding `page_addr`, or `None` on a miss.
    /// If `update_replacement` is set, the replacement policy's
    /// `update()` is called on the slot accessed.
    fn lookup(
        &mut self,
        page_addr: Address,
        req: &TransReq<'_>,
        update_replacement: bool,
    ) -> Option<u32>;

    /// Runs the replacement scheme and installs `page_addr`. Returns
    /// the chosen slot id and the evicted page address, `None` when
    /// the slot was unoccupied.
    fn insert(&mut self, page_addr: Address, req: &TransReq<'_>) -> (u32, Option<Address>);

    /// Drops the entry for one page address, returning its slot id if
    /// it was present. A subsequent lookup for the address is
    /// guaranteed to miss.
    fn invalidate_entry(&mut self, page_addr: Address) -> Option<u32>;

    /// Drops every entry.
    fn invalidate_all(&mut self);
}

/// Set-associative translation array.
///
/// Owns the tag storage, its replacement policy and the hash family
/// used for set selection. The set count must be a power of two.
pub struct SetAssocArray {
    tags: Box<[Address]>,
    rp: Box<dyn ReplPolicy>,
    hf: Box<dyn HashFamily>,
    assoc: u32,
    set_mask: u64,
}

impl SetAssocArray {
    pub fn new(
        num_entries: u32,
        assoc: u32,
        rp: Box<dyn ReplPolicy>,
        hf: Box<dyn HashFamily>,
    ) -> Result<Self> {
        if num_entries == 0 || assoc == 0 || num_entries % assoc != 0 {
            error!(
                "invalid array geometry: {} entries / {} ways",
                num_entries, assoc
            );
            return Err(Error::Configuration(
                "associativity must evenly divide the entry count",
            ));
        }
        let num_sets = num_entries / assoc;
        if !num_sets.is_power_of_two() {
            error!(
                "set count {} ({} entries / {} ways) is not a power of two",
                num_sets, num_entries, assoc
            );
            return Err(Error::Configuration("set count must be a power of two"));
        }

        Ok(Self {
            tags: vec![Address::INVALID; num_entries as usize].into_boxed_slice(),
            rp,
            hf,
            assoc,
            set_mask: u64::from(num_sets) - 1,
        })
    }

    /// First slot id of the set `page_addr` maps to.
    fn set_base(&self, page_addr: Address) -> u32 {
        let set = self.hf.hash(0, page_addr.as_u64()) & self.set_mask;
        set as u32 * self.assoc
    }
}

impl TlbArray for SetAssocArray {
    fn lookup(
        &mut self,
        page_addr: Address,
        req: &TransReq<'_>,
        update_replacement: bool,
    ) -> Option<u32> {
        let first = self.set_base(page_addr);
        for slot in first..first + self.assoc {
            if self.tags[slot as usize] == page_addr {
                if update_replacement {
                    self.rp.update(slot, req);
                }
                return Some(slot);
            }
        }
        None
    }

    fn insert(&mut self, page_addr: Address, req: &TransReq<'_>) -> (u32, Option<Address>) {
        let first = self.set_base(page_addr);
        let slot = self.rp.rank(req, first..first + self.assoc);

        let victim = self.tags[slot as usize];
        let victim = if victim.is_valid() { Some(victim) } else { None };

        self.rp.replaced(slot);
        self.tags[slot as usize] = page_addr;
        self.rp.update(slot, req);

        (slot, victim)
    }

    fn invalidate_entry(&mut self, page_addr: Address) -> Option<u32> {
        let first = self.set_base(page_addr);
        for slot in first..first + self.assoc {
            if self.tags[slot as usize] == page_addr {
                self.rp.replaced(slot);
                self.tags[slot as usize] = Address::INVALID;
                return Some(slot);
            }
        }
        None
    }

    fn invalidate_all(&mut self) {
        for slot in 0..self.tags.len() {
            self.rp.replaced(slot as u32);
            self.tags[slot] = Address::INVALID;
        }
    }
}
