//! Delete sets: per-replica sorted, disjoint `(clock, len)` ranges.

use std::collections::BTreeMap;

use crate::clock::Id;

/// A run of deleted clocks `[clock, clock + len)` of one replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRange {
    pub clock: u64,
    pub len: u64,
}

impl DeleteRange {
    pub const fn new(clock: u64, len: u64) -> Self {
        Self { clock, len }
    }

    /// Exclusive end, saturating at `u64::MAX`.
    pub fn end(&self) -> u64 {
        self.clock.saturating_add(self.len)
    }
}

/// Deleted identifiers grouped by replica.
///
/// Ranges are kept sorted and merged after every mutation, so two sets
/// covering the same ids compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSet {
    clients: BTreeMap<u64, Vec<DeleteRange>>,
}

impl DeleteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `[start, start + len)` as deleted. Ranges are clipped at
    /// `u64::MAX`.
    pub fn insert(&mut self, start: Id, len: u64) {
        let len = len.min(u64::MAX - start.clock);
        if len == 0 {
            return;
        }
        let ranges = self.clients.entry(start.replica).or_default();
        ranges.push(DeleteRange::new(start.clock, len));
        squash(ranges);
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: &DeleteSet) {
        for (&replica, ranges) in &other.clients {
            let entry = self.clients.entry(replica).or_default();
            entry.extend_from_slice(ranges);
            squash(entry);
        }
    }

    pub fn is_deleted(&self, target: Id) -> bool {
        let Some(ranges) = self.clients.get(&target.replica) else {
            return false;
        };
        let idx = ranges.partition_point(|r| r.end() <= target.clock);
        ranges
            .get(idx)
            .is_some_and(|r| r.clock <= target.clock && target.clock < r.end())
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Number of replicas with at least one range.
    pub fn replica_count(&self) -> usize {
        self.clients.len()
    }

    /// Total number of ranges across all replicas.
    pub fn range_count(&self) -> usize {
        self.clients.values().map(Vec::len).sum()
    }

    /// Total number of deleted ids.
    pub fn id_count(&self) -> u64 {
        self.clients.values().flatten().map(|r| r.len).sum()
    }

    pub fn ranges(&self, replica: u64) -> &[DeleteRange] {
        self.clients.get(&replica).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &[DeleteRange])> + '_ {
        self.clients.iter().map(|(&r, v)| (r, v.as_slice()))
    }

    /// Remove and return everything, leaving an empty set.
    pub fn take(&mut self) -> DeleteSet {
        std::mem::take(self)
    }
}

/// Sort and coalesce overlapping or adjacent ranges in place.
fn squash(ranges: &mut Vec<DeleteRange>) {
    ranges.sort_unstable_by_key(|r| r.clock);
    let mut out: Vec<DeleteRange> = Vec::with_capacity(ranges.len());
    for r in ranges.drain(..) {
        match out.last_mut() {
            Some(last) if r.clock <= last.end() => {
                let end = last.end().max(r.end());
                last.len = end - last.clock;
            }
            _ => out.push(r),
        }
    }
    *ranges = out;
}
