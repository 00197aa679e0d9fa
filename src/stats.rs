/*!
Hierarchical counter registration sink.

Every component of the hierarchy owns its profiling counters and
registers them into a [`StatGroup`] tree on request. The tree is an
opaque aggregation surface for the surrounding simulator; nothing in the
timing contract depends on it.
*/

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically increasing event counter.
///
/// Counters are bumped from hot paths that already hold a component
/// lock as well as from the lock-free filter hit path, so they use
/// relaxed atomics throughout.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Creates a counter behind a shared handle; components keep one
    /// clone and hand others to the registration sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A named node in the statistics tree.
///
/// Groups hold registered counters and child groups. Components append
/// one group per instance, named after the component.
pub struct StatGroup {
    name: String,
    desc: &'static str,
    counters: Vec<(&'static str, &'static str, Arc<Counter>)>,
    children: Vec<StatGroup>,
}

impl StatGroup {
    pub fn new(name: impl Into<String>, desc: &'static str) -> Self {
        Self {
            name: name.into(),
            desc,
            counters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a counter under this group.
    pub fn counter(&mut self, name: &'static str, desc: &'static str, counter: &Arc<Counter>) {
        self.counters.push((name, desc, counter.clone()));
    }

    /// Appends a child group.
    pub fn append(&mut self, child: StatGroup) {
        self.children.push(child);
    }

    /// Finds a group by name, searching this group and its children.
    pub fn group(&self, name: &str) -> Option<&StatGroup> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.group(name))
    }

    /// Returns the current value of a registered counter, searching
    /// this group first and then its children depth-first.
    pub fn counter_value(&self, name: &str) -> Option<u64> {
        self.counters
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, c)| c.get())
            .or_else(|| self.children.iter().find_map(|c| c.counter_value(name)))
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        writeln!(f, "{}{}: # {}", pad, self.name, self.desc)?;
        for (name, desc, counter) in &self.counters {
            writeln!(f, "{}  {}: {} # {}", pad, name, counter.get(), desc)?;
        }
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for StatGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let c = Counter::new();
        c.inc();
        c.add(41);
        assert_eq!(c.get(), 42);
    }

    #[test]
    fn test_group_lookup() {
        let hits = Counter::new();
        hits.add(3);

        let mut root = StatGroup::new("root", "all stats");
        let mut l1 = StatGroup::new("l1tlb", "tlb stats");
        l1.counter("hLKUP", "lookup hits", &hits);
        root.append(l1);

        assert_eq!(root.counter_value("hLKUP"), Some(3));
        assert_eq!(root.group("l1tlb").unwrap().counter_value("hLKUP"), Some(3));
        assert_eq!(root.counter_value("missing"), None);
        assert!(root.group("l2tlb").is_none());
    }

    #[test]
    fn test_display() {
        let reqs = Counter::new();
        reqs.inc();

        let mut root = StatGroup::new("ptw", "ptw stats");
        root.counter("REQ", "requests", &reqs);
        let dump = format!("{}", root);
        assert!(dump.contains("ptw:"));
        assert!(dump.contains("REQ: 1"));
    }
}
