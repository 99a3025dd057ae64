//! The item graph: every item ever integrated, the containers they live in,
//! and the per-replica index that turns an [`Id`] into an item.
//!
//! Items are stored in an arena and never removed. Deletion only flips
//! `deleted`. Each item holds one element, so item `replica:clock` sits at
//! position `clock` of its replica's index and lookups are O(1).

mod integrate;

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::clock::{Id, StateVector};
use crate::content::Content;
use crate::delete_set::DeleteSet;
use crate::types::{Container, ContainerId, ContainerIdx, ContainerKind};

/// Index of an item in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ItemRef(pub(crate) usize);

/// Where an item lives.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parent {
    Container(ContainerIdx),
    /// The named parent does not resolve to a container (its creating item
    /// holds a scalar). Such items are kept for clock continuity only.
    Detached(ContainerId),
}

/// One element of a container, with its provenance.
#[derive(Debug, Clone)]
pub(crate) struct Item {
    pub id: Id,
    pub parent: Parent,
    /// Map key for register items, `None` for sequence items.
    pub parent_sub: Option<String>,
    /// Item this was inserted immediately after, at creation time.
    pub origin: Option<Id>,
    /// Item this was inserted immediately before, at creation time.
    pub right_origin: Option<Id>,
    pub left: Option<ItemRef>,
    pub right: Option<ItemRef>,
    pub content: Content,
    pub deleted: bool,
}

/// Parent container and map key of an origin-less item.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentInfo {
    pub container: ContainerId,
    pub key: Option<String>,
}

/// Serializable form of an item, as carried in updates.
///
/// `parent` is present exactly when both origins are absent; otherwise the
/// parent and key are inherited from whichever origin resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: Id,
    pub origin: Option<Id>,
    pub right_origin: Option<Id>,
    pub parent: Option<ParentInfo>,
    pub content: Content,
    pub deleted: bool,
}

impl ItemRecord {
    /// Ids this record needs integrated before it can be placed.
    pub fn dependencies(&self) -> impl Iterator<Item = Id> + '_ {
        let parent = match &self.parent {
            Some(ParentInfo {
                container: ContainerId::Nested(id),
                ..
            }) => Some(*id),
            _ => None,
        };
        self.origin.into_iter().chain(self.right_origin).chain(parent)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ItemGraph {
    items: Vec<Item>,
    /// replica → item refs ordered by clock (position == clock).
    clients: HashMap<u64, Vec<ItemRef>>,
    containers: Vec<Container>,
    roots: HashMap<String, ContainerIdx>,
    nested: HashMap<Id, ContainerIdx>,
    /// Ids deleted since the last [`ItemGraph::take_recent_deletes`].
    recent_deletes: DeleteSet,
}

impl ItemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    pub fn item(&self, r: ItemRef) -> &Item {
        &self.items[r.0]
    }

    pub fn find(&self, target: Id) -> Option<ItemRef> {
        let refs = self.clients.get(&target.replica)?;
        let idx = usize::try_from(target.clock).ok()?;
        refs.get(idx).copied()
    }

    /// Next clock expected from `replica`.
    pub fn state(&self, replica: u64) -> u64 {
        self.clients.get(&replica).map_or(0, |v| v.len() as u64)
    }

    pub fn contains(&self, target: Id) -> bool {
        target.clock < self.state(target.replica)
    }

    pub fn state_vector(&self) -> StateVector {
        self.clients
            .iter()
            .map(|(&replica, refs)| (replica, refs.len() as u64))
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    // ── Containers ───────────────────────────────────────────────────────

    pub fn container(&self, idx: ContainerIdx) -> &Container {
        &self.containers[idx.0]
    }

    pub fn container_mut(&mut self, idx: ContainerIdx) -> &mut Container {
        &mut self.containers[idx.0]
    }

    /// Root container `name`, created without a kind if absent.
    pub fn root(&mut self, name: &str) -> ContainerIdx {
        if let Some(&idx) = self.roots.get(name) {
            return idx;
        }
        let idx = ContainerIdx(self.containers.len());
        self.containers
            .push(Container::new(ContainerId::Root(name.to_owned()), None, None));
        self.roots.insert(name.to_owned(), idx);
        idx
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.roots.keys().map(String::as_str)
    }

    /// Existing container for `id`, without creating roots.
    pub fn lookup(&self, id: &ContainerId) -> Option<ContainerIdx> {
        match id {
            ContainerId::Root(name) => self.roots.get(name).copied(),
            ContainerId::Nested(item) => self.nested.get(item).copied(),
        }
    }

    fn resolve_parent(&mut self, id: &ContainerId) -> Parent {
        match id {
            ContainerId::Root(name) => Parent::Container(self.root(name)),
            ContainerId::Nested(item) => match self.nested.get(item) {
                Some(&idx) => Parent::Container(idx),
                None => Parent::Detached(id.clone()),
            },
        }
    }

    /// Whether items of `idx` are hidden because its creating item is gone.
    pub fn is_container_deleted(&self, idx: ContainerIdx) -> bool {
        self.containers[idx.0]
            .item
            .is_some_and(|r| self.items[r.0].deleted)
    }

    // ── Chains ───────────────────────────────────────────────────────────

    /// Every chain item of `idx`, tombstones included, in order.
    pub fn chain(&self, idx: ContainerIdx) -> ChainIter<'_> {
        ChainIter {
            graph: self,
            next: self.containers[idx.0].start,
        }
    }

    /// Non-deleted chain items of `idx`, in order.
    pub fn visible(&self, idx: ContainerIdx) -> impl Iterator<Item = ItemRef> + '_ {
        self.chain(idx).filter(|r| !self.items[r.0].deleted)
    }

    /// The `(left, right)` neighbours for an insertion at visible `index`.
    ///
    /// `left` is the `index`-th visible item (1-based) and `right` is
    /// whatever follows it in the chain, tombstone or not.
    pub fn position(&self, idx: ContainerIdx, index: usize) -> (Option<ItemRef>, Option<ItemRef>) {
        if index == 0 {
            return (None, self.containers[idx.0].start);
        }
        match self.visible(idx).nth(index - 1) {
            Some(left) => (Some(left), self.items[left.0].right),
            None => (None, self.containers[idx.0].start),
        }
    }

    /// Walk to the first item of a chain.
    fn leftmost(&self, mut r: ItemRef) -> ItemRef {
        while let Some(l) = self.items[r.0].left {
            r = l;
        }
        r
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Place a decoded record. Every dependency must already be integrated
    /// and `record.id.clock` must equal the replica's state.
    pub fn integrate_record(&mut self, record: ItemRecord) -> ItemRef {
        let left = record.origin.and_then(|o| self.find(o));
        let right = record.right_origin.and_then(|o| self.find(o));
        let (parent, parent_sub) = match (left.or(right), record.parent) {
            (Some(neighbour), _) => {
                let n = &self.items[neighbour.0];
                (n.parent.clone(), n.parent_sub.clone())
            }
            (None, Some(info)) => (self.resolve_parent(&info.container), info.key),
            (None, None) => (Parent::Detached(ContainerId::Root(String::new())), None),
        };
        let item = Item {
            id: record.id,
            parent,
            parent_sub,
            origin: record.origin,
            right_origin: record.right_origin,
            left,
            right,
            content: record.content,
            deleted: false,
        };
        let this = self.integrate(item);
        if record.deleted {
            self.delete(this);
        }
        this
    }

    /// Tombstone `target` and, if it holds a container, everything inside.
    ///
    /// Returns `true` if `target` was not already deleted.
    pub fn delete(&mut self, target: ItemRef) -> bool {
        if self.items[target.0].deleted {
            return false;
        }
        let mut stack = vec![target];
        while let Some(r) = stack.pop() {
            let item = &mut self.items[r.0];
            if item.deleted {
                continue;
            }
            item.deleted = true;
            let id = item.id;
            if item.parent_sub.is_none() {
                if let Parent::Container(c) = item.parent {
                    self.containers[c.0].len -= 1;
                }
            }
            self.recent_deletes.insert(id, 1);
            trace!(id = %id, "item deleted");

            if matches!(self.items[r.0].content, Content::Container(_)) {
                if let Some(&inner) = self.nested.get(&id) {
                    stack.extend(self.visible(inner));
                    let container = &self.containers[inner.0];
                    stack.extend(
                        container
                            .map
                            .values()
                            .copied()
                            .filter(|v| !self.items[v.0].deleted),
                    );
                }
            }
        }
        true
    }

    /// Apply `ds` to integrated items. Ranges beyond the current state are
    /// returned untouched so the caller can retry them later.
    ///
    /// Returns `(newly_deleted, unapplied)`.
    pub fn apply_delete_set(&mut self, ds: &DeleteSet) -> (usize, DeleteSet) {
        let mut deleted = 0;
        let mut unapplied = DeleteSet::new();
        for (replica, ranges) in ds.iter() {
            let state = self.state(replica);
            for range in ranges {
                let known_end = range.end().min(state);
                for clock in range.clock..known_end {
                    if let Some(r) = self.find(Id::new(replica, clock)) {
                        if self.delete(r) {
                            deleted += 1;
                        }
                    }
                }
                if range.end() > state {
                    let start = range.clock.max(state);
                    unapplied.insert(Id::new(replica, start), range.end() - start);
                }
            }
        }
        (deleted, unapplied)
    }

    pub fn take_recent_deletes(&mut self) -> DeleteSet {
        self.recent_deletes.take()
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// All deleted ids, as a delete set.
    pub fn delete_set(&self) -> DeleteSet {
        let mut ds = DeleteSet::new();
        for (&replica, refs) in &self.clients {
            let mut run: Option<(u64, u64)> = None;
            for (clock, r) in refs.iter().enumerate() {
                let clock = clock as u64;
                if self.items[r.0].deleted {
                    run = match run {
                        Some((start, len)) => Some((start, len + 1)),
                        None => Some((clock, 1)),
                    };
                } else if let Some((start, len)) = run.take() {
                    ds.insert(Id::new(replica, start), len);
                }
            }
            if let Some((start, len)) = run {
                ds.insert(Id::new(replica, start), len);
            }
        }
        ds
    }

    /// Records for every item not covered by `since`, grouped by replica in
    /// clock order.
    pub fn records_since(&self, since: &StateVector) -> BTreeMap<u64, Vec<ItemRecord>> {
        let mut out = BTreeMap::new();
        for (&replica, refs) in &self.clients {
            let from = usize::try_from(since.get(replica)).unwrap_or(usize::MAX);
            if from >= refs.len() {
                continue;
            }
            let records = refs[from..].iter().map(|&r| self.record(r)).collect();
            out.insert(replica, records);
        }
        out
    }

    fn record(&self, r: ItemRef) -> ItemRecord {
        let item = &self.items[r.0];
        let parent = if item.origin.is_none() && item.right_origin.is_none() {
            let container = match &item.parent {
                Parent::Container(c) => self.containers[c.0].id.clone(),
                Parent::Detached(id) => id.clone(),
            };
            Some(ParentInfo {
                container,
                key: item.parent_sub.clone(),
            })
        } else {
            None
        };
        ItemRecord {
            id: item.id,
            origin: item.origin,
            right_origin: item.right_origin,
            parent,
            content: item.content.clone(),
            deleted: item.deleted,
        }
    }

    /// Create the arena entry for a container-valued item.
    fn instantiate_nested(&mut self, owner: ItemRef, id: Id, kind: ContainerKind) {
        let idx = ContainerIdx(self.containers.len());
        self.containers
            .push(Container::new(ContainerId::Nested(id), Some(kind), Some(owner)));
        self.nested.insert(id, idx);
    }
}

/// Walks a container chain left to right.
pub(crate) struct ChainIter<'a> {
    graph: &'a ItemGraph,
    next: Option<ItemRef>,
}

impl Iterator for ChainIter<'_> {
    type Item = ItemRef;

    fn next(&mut self) -> Option<ItemRef> {
        let current = self.next?;
        self.next = self.graph.items[current.0].right;
        Some(current)
    }
}
