//! Identifiers, the per-replica logical clock and state vectors.

use std::collections::BTreeMap;
use std::fmt;

// ── Core structs ───────────────────────────────────────────────────────────

/// Globally unique operation identifier: `(replica, clock)`.
///
/// Clocks are dense per replica and start at `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id {
    pub replica: u64,
    pub clock: u64,
}

impl Id {
    pub const fn new(replica: u64, clock: u64) -> Self {
        Self { replica, clock }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.replica, self.clock)
    }
}

/// Create an identifier.
#[inline]
pub fn id(replica: u64, clock: u64) -> Id {
    Id::new(replica, clock)
}

/// Advance an identifier by `cycles` within the same replica.
#[inline]
pub fn tick(stamp: Id, cycles: u64) -> Id {
    Id::new(stamp.replica, stamp.clock + cycles)
}

/// Returns `true` if `[start, start + span)` contains `point`.
pub fn contains_id(start: Id, span: u64, point: Id) -> bool {
    start.replica == point.replica
        && start.clock <= point.clock
        && point.clock < start.clock + span
}

// ── LogicalClock ───────────────────────────────────────────────────────────

/// The local replica's clock: the next identifier it will issue.
#[derive(Debug, Clone)]
pub struct LogicalClock {
    pub replica: u64,
    pub time: u64,
}

impl LogicalClock {
    pub fn new(replica: u64) -> Self {
        Self { replica, time: 0 }
    }

    /// Returns the id of the first of `count` contiguous new ops and
    /// advances the clock past all of them.
    pub fn next_id(&mut self, count: u64) -> Id {
        let stamp = Id::new(self.replica, self.time);
        self.time += count;
        stamp
    }

    /// Observe an id of this replica that arrived from elsewhere, so it is
    /// never issued again.
    pub fn observe(&mut self, stamp: Id) {
        if stamp.replica == self.replica && stamp.clock >= self.time {
            self.time = stamp.clock + 1;
        }
    }

    pub fn peek(&self) -> Id {
        Id::new(self.replica, self.time)
    }
}

// ── StateVector ────────────────────────────────────────────────────────────

/// Per-replica count of integrated ops (`next_clock`).
///
/// A missing entry means `0`. Entries are ordered by replica id so encoding
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateVector {
    clocks: BTreeMap<u64, u64>,
}

impl StateVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next clock expected from `replica`.
    pub fn get(&self, replica: u64) -> u64 {
        self.clocks.get(&replica).copied().unwrap_or(0)
    }

    /// Record `next_clock` for `replica`. Zero entries are not stored.
    pub fn set(&mut self, replica: u64, next_clock: u64) {
        if next_clock == 0 {
            self.clocks.remove(&replica);
        } else {
            self.clocks.insert(replica, next_clock);
        }
    }

    /// Raise the entry for `replica` to at least `next_clock`.
    pub fn set_max(&mut self, replica: u64, next_clock: u64) {
        if next_clock > self.get(replica) {
            self.clocks.insert(replica, next_clock);
        }
    }

    /// Whether the op `stamp` is covered by this vector.
    pub fn contains(&self, stamp: Id) -> bool {
        stamp.clock < self.get(stamp.replica)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.clocks.iter().map(|(&r, &c)| (r, c))
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// `true` when every entry of `other` is covered by `self`.
    pub fn dominates(&self, other: &StateVector) -> bool {
        other.iter().all(|(replica, clock)| self.get(replica) >= clock)
    }
}

impl FromIterator<(u64, u64)> for StateVector {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut sv = StateVector::new();
        for (replica, clock) in iter {
            sv.set_max(replica, clock);
        }
        sv
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (replica, clock)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{replica}: {clock}")?;
        }
        write!(f, "}}")
    }
}
