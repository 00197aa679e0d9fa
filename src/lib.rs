/*!
Timing model of a multi-level TLB hierarchy backed by a simulated
page-table walker, for multicore architecture simulators.

The crate computes, for every simulated translation request, the cycle
at which the request completes. It contains abstractions over
[addresses](types/index.html), the per-level
[translation caches and walker](trans/index.html), the
[hash](hash/index.html) and [replacement](trans/repl/index.html)
capabilities they compose, and the
[backing-memory collaborator](mem/index.html) the walker issues timed
fetches against.

A hierarchy is built bottom-up:

```
use std::sync::Arc;
use simtlb::{FilterTlb, Ptw, Tlb, ParentRef, PAGE_SIZE_4K};

let ptw: ParentRef = Arc::new(
    Ptw::builder("ptw")
        .page_size(PAGE_SIZE_4K)
        .access_latency(50)
        .build()
        .unwrap(),
);
let l2: ParentRef = Arc::new(
    Tlb::builder("l2tlb")
        .entries(512)
        .assoc(8)
        .access_latency(7)
        .level(2)
        .parent(ptw)
        .build()
        .unwrap(),
);
let l1 = FilterTlb::builder("l1tlb")
    .sets(8)
    .entries(64)
    .assoc(4)
    .access_latency(1)
    .level(1)
    .parent(l2)
    .build()
    .unwrap();

let done = l1.lookup(0x7fff_1234_5000_u64.into(), 100);
assert!(done >= 101);
```
*/

#[macro_use]
extern crate bitflags;

pub mod error;
#[doc(hidden)]
pub use error::*;

pub mod types;
#[doc(hidden)]
pub use types::*;

pub mod hash;
#[doc(hidden)]
pub use hash::*;

pub mod stats;
#[doc(hidden)]
pub use stats::*;

pub mod mem;
#[doc(hidden)]
pub use mem::*;

pub mod trans;
#[doc(hidden)]
pub use trans::*;
