//! The replicated document.
//!
//! A [`Document`] owns the local clock, the item graph and the pending
//! store. Local edits go through the typed views ([`Sequence`],
//! [`RegisterMap`]); remote changes arrive as encoded updates through
//! [`Document::apply_update`].
//!
//! # Example
//!
//! ```
//! use ydoc::Document;
//!
//! let mut a = Document::with_replica(1);
//! a.sequence("list").unwrap().push(["x", "y"]).unwrap();
//!
//! let mut b = Document::with_replica(2);
//! b.apply_update(&a.encode_update(None)).unwrap();
//! assert_eq!(b.to_json(), a.to_json());
//! ```

mod events;
mod local;
mod options;

pub use events::{SubscriptionId, UpdateEvent, UpdateOrigin};
pub use options::{generate_replica_id, DocOptions};

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::clock::{LogicalClock, StateVector};
use crate::codec::{self, Update};
use crate::delete_set::DeleteSet;
use crate::error::DocError;
use crate::store::{ItemGraph, ItemRecord};
use crate::types::{
    container_json, ContainerId, ContainerIdx, ContainerKind, ContainerRef, RegisterMap, Sequence,
};
use events::UpdateListener;

/// Outcome of one [`Document::apply_update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Items integrated by this call, including previously pending ones.
    pub integrated: usize,
    /// Incoming items skipped because they were already known.
    pub duplicates: usize,
    /// Items newly tombstoned by delete sets.
    pub deleted: usize,
    /// Items still waiting on a missing dependency.
    pub pending_items: usize,
    /// Delete ranges still waiting on items that have not arrived.
    pub pending_deletes: usize,
}

impl ApplyReport {
    /// Whether the call changed visible or structural state.
    pub fn changed(&self) -> bool {
        self.integrated > 0 || self.deleted > 0
    }
}

/// Size of the pending store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStats {
    pub items: usize,
    pub delete_ranges: usize,
}

impl PendingStats {
    pub fn is_empty(&self) -> bool {
        self.items == 0 && self.delete_ranges == 0
    }
}

/// Items and delete ranges that cannot be applied yet.
#[derive(Debug, Default)]
struct Pending {
    /// replica → clock → record.
    items: BTreeMap<u64, BTreeMap<u64, ItemRecord>>,
    delete_set: DeleteSet,
}

impl Pending {
    fn item_count(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }
}

pub struct Document {
    guid: String,
    pub(crate) clock: LogicalClock,
    pub(crate) graph: ItemGraph,
    pending: Pending,
    next_subscription: SubscriptionId,
    observers: BTreeMap<SubscriptionId, UpdateListener>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("guid", &self.guid)
            .field("replica_id", &self.clock.replica)
            .field("items", &self.graph.item_count())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with a random replica id.
    pub fn new() -> Self {
        Self::with_options(DocOptions::default())
    }

    pub fn with_replica(replica_id: u64) -> Self {
        Self::with_options(DocOptions::with_replica(replica_id))
    }

    pub fn with_options(options: DocOptions) -> Self {
        let replica = options.replica_id.unwrap_or_else(generate_replica_id);
        let guid = options.guid.unwrap_or_else(options::generate_guid);
        Self {
            guid,
            clock: LogicalClock::new(replica),
            graph: ItemGraph::new(),
            pending: Pending::default(),
            next_subscription: 1,
            observers: BTreeMap::new(),
        }
    }

    pub fn replica_id(&self) -> u64 {
        self.clock.replica
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    // ── Containers ───────────────────────────────────────────────────────

    /// Typed handle to root container `name`.
    ///
    /// The first typed access fixes the root's kind; a later access as the
    /// other kind fails with [`DocError::TypeMismatch`].
    pub fn get_container(
        &mut self,
        name: &str,
        kind: ContainerKind,
    ) -> Result<ContainerRef, DocError> {
        let idx = self.graph.root(name);
        self.check_kind(idx, kind)?;
        Ok(ContainerRef::new(ContainerId::Root(name.to_owned()), kind))
    }

    pub fn sequence(&mut self, name: &str) -> Result<Sequence<'_>, DocError> {
        let idx = self.graph.root(name);
        self.check_kind(idx, ContainerKind::Sequence)?;
        Ok(Sequence::new(self, idx))
    }

    pub fn map(&mut self, name: &str) -> Result<RegisterMap<'_>, DocError> {
        let idx = self.graph.root(name);
        self.check_kind(idx, ContainerKind::Map)?;
        Ok(RegisterMap::new(self, idx))
    }

    /// Sequence view of any container, root or nested.
    pub fn sequence_at(&mut self, target: &ContainerRef) -> Result<Sequence<'_>, DocError> {
        let idx = self.resolve(&target.id)?;
        self.check_kind(idx, ContainerKind::Sequence)?;
        Ok(Sequence::new(self, idx))
    }

    /// Map view of any container, root or nested.
    pub fn map_at(&mut self, target: &ContainerRef) -> Result<RegisterMap<'_>, DocError> {
        let idx = self.resolve(&target.id)?;
        self.check_kind(idx, ContainerKind::Map)?;
        Ok(RegisterMap::new(self, idx))
    }

    fn resolve(&mut self, id: &ContainerId) -> Result<ContainerIdx, DocError> {
        match id {
            ContainerId::Root(name) => Ok(self.graph.root(name)),
            ContainerId::Nested(_) => self
                .graph
                .lookup(id)
                .ok_or_else(|| DocError::UnknownContainer(id.clone())),
        }
    }

    fn check_kind(&mut self, idx: ContainerIdx, expected: ContainerKind) -> Result<(), DocError> {
        let container = self.graph.container_mut(idx);
        match container.kind {
            None => {
                container.kind = Some(expected);
                Ok(())
            }
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => {
                debug!(container = %container.id, %expected, %actual, "container type mismatch");
                Err(DocError::TypeMismatch {
                    container: container.id.clone(),
                    expected,
                    actual,
                })
            }
        }
    }

    // ── Sync ─────────────────────────────────────────────────────────────

    pub fn state_vector(&self) -> StateVector {
        self.graph.state_vector()
    }

    pub fn encode_state_vector(&self) -> Vec<u8> {
        codec::encode_state_vector(&self.state_vector())
    }

    /// Every deleted id known to this document.
    pub fn delete_set(&self) -> DeleteSet {
        self.graph.delete_set()
    }

    /// Integrated items not covered by `since` (all items when `None`),
    /// plus the full delete set. Pending items are not included.
    pub fn update_since(&self, since: Option<&StateVector>) -> Update {
        let empty = StateVector::new();
        Update {
            items: self.graph.records_since(since.unwrap_or(&empty)),
            // Deletions carry no clock of their own, so `since` cannot tell
            // which ones the peer has seen. Applying known ones is a no-op.
            delete_set: self.graph.delete_set(),
        }
    }

    pub fn encode_update(&self, since: Option<&StateVector>) -> Vec<u8> {
        self.update_since(since).encode()
    }

    /// Encode what a peer with the encoded state vector `remote` is missing.
    pub fn encode_diff(&self, remote: &[u8]) -> Result<Vec<u8>, DocError> {
        let sv = codec::decode_state_vector(remote)?;
        Ok(self.encode_update(Some(&sv)))
    }

    /// Decode and apply an update.
    ///
    /// Decoding completes before anything is touched, so a malformed buffer
    /// leaves the document unchanged. Items whose dependencies are missing
    /// and delete ranges for unknown ids stay pending and are retried by
    /// later calls.
    pub fn apply_update(&mut self, data: &[u8]) -> Result<ApplyReport, DocError> {
        match Update::decode(data) {
            Ok(update) => Ok(self.apply(update)),
            Err(err) => {
                debug!(guid = %self.guid, error = %err, "rejected malformed update");
                Err(err.into())
            }
        }
    }

    /// Apply an already decoded update.
    pub fn apply(&mut self, update: Update) -> ApplyReport {
        let before = self.graph.state_vector();
        let mut report = ApplyReport::default();

        for (replica, records) in update.items {
            let state = self.graph.state(replica);
            let queue = self.pending.items.entry(replica).or_default();
            for record in records {
                let clock = record.id.clock;
                if clock < state || queue.contains_key(&clock) {
                    report.duplicates += 1;
                } else {
                    queue.insert(clock, record);
                }
            }
        }
        report.integrated = self.integrate_pending();

        let mut deletes = self.pending.delete_set.take();
        deletes.merge(&update.delete_set);
        let (deleted, unapplied) = self.graph.apply_delete_set(&deletes);
        report.deleted = deleted;
        self.pending.delete_set = unapplied;

        report.pending_items = self.pending.item_count();
        report.pending_deletes = self.pending.delete_set.range_count();

        debug!(
            guid = %self.guid,
            replica = self.clock.replica,
            integrated = report.integrated,
            duplicates = report.duplicates,
            deleted = report.deleted,
            pending_items = report.pending_items,
            pending_deletes = report.pending_deletes,
            "applied update"
        );
        if report.pending_items > 0 || report.pending_deletes > 0 {
            warn!(
                guid = %self.guid,
                pending_items = report.pending_items,
                pending_deletes = report.pending_deletes,
                "update left operations waiting on missing dependencies"
            );
        }

        self.commit(&before, UpdateOrigin::Remote);
        report
    }

    /// Integrate every pending item whose predecessor and dependencies are
    /// present, until no more progress is possible.
    fn integrate_pending(&mut self) -> usize {
        let mut integrated = 0;
        loop {
            let mut progressed = false;
            let replicas: Vec<u64> = self.pending.items.keys().copied().collect();
            for replica in replicas {
                while let Some(record) = self.next_ready(replica) {
                    self.clock.observe(record.id);
                    self.graph.integrate_record(record);
                    integrated += 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        self.pending.items.retain(|_, queue| !queue.is_empty());
        integrated
    }

    /// Pop the next record of `replica` if it can be integrated now.
    fn next_ready(&mut self, replica: u64) -> Option<ItemRecord> {
        let state = self.graph.state(replica);
        let queue = self.pending.items.get_mut(&replica)?;
        while let Some(entry) = queue.first_entry() {
            if *entry.key() >= state {
                break;
            }
            entry.remove();
        }
        let entry = queue.first_entry()?;
        if *entry.key() != state {
            return None;
        }
        let graph = &self.graph;
        if !entry.get().dependencies().all(|dep| graph.contains(dep)) {
            return None;
        }
        Some(entry.remove())
    }

    /// Emit an [`UpdateEvent`] for everything integrated since `before` and
    /// every id deleted since the last commit.
    pub(crate) fn commit(&mut self, before: &StateVector, origin: UpdateOrigin) {
        let deleted = self.graph.take_recent_deletes();
        if self.observers.is_empty() {
            return;
        }
        let update = Update {
            items: self.graph.records_since(before),
            delete_set: deleted,
        };
        if update.is_empty() {
            return;
        }
        let event = UpdateEvent {
            update: update.encode(),
            origin,
        };
        for listener in self.observers.values_mut() {
            listener(event.clone());
        }
    }

    // ── Diagnostics ──────────────────────────────────────────────────────

    pub fn pending(&self) -> PendingStats {
        PendingStats {
            items: self.pending.item_count(),
            delete_ranges: self.pending.delete_set.range_count(),
        }
    }

    /// Fails with [`DocError::UnresolvableDependency`] while anything is
    /// still pending. Pending state is kept either way.
    pub fn ensure_resolved(&self) -> Result<(), DocError> {
        let stats = self.pending();
        if stats.is_empty() {
            Ok(())
        } else {
            Err(DocError::UnresolvableDependency {
                items: stats.items,
                ranges: stats.delete_ranges,
            })
        }
    }

    // ── Observers ────────────────────────────────────────────────────────

    pub fn observe_update<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(UpdateEvent) + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription = self.next_subscription.saturating_add(1);
        self.observers.insert(id, Box::new(listener));
        id
    }

    pub fn unobserve_update(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    // ── JSON ─────────────────────────────────────────────────────────────

    /// Every root container that holds items, by name.
    ///
    /// Roots that were only opened, never written, are left out: no update
    /// carries them, so peers would not see them either. Roots that were
    /// never accessed locally have no kind yet; they render as objects when
    /// they hold keys and as arrays otherwise.
    pub fn to_json(&self) -> Json {
        let mut names: Vec<&str> = self.graph.root_names().collect();
        names.sort_unstable();
        let mut out = Map::new();
        for name in names {
            let Some(idx) = self.graph.lookup(&ContainerId::Root(name.to_owned())) else {
                continue;
            };
            if self.graph.container(idx).has_items() {
                out.insert(name.to_owned(), container_json(&self.graph, idx));
            }
        }
        Json::Object(out)
    }
}
