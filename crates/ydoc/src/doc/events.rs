/// Handle returned by [`Document::observe_update`](super::Document::observe_update).
pub type SubscriptionId = u64;

/// Whether a transaction came from a local edit or from `apply_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    Local,
    Remote,
}

/// Emitted once per transaction that changed the document.
///
/// `update` is an encoded update holding exactly the items integrated and
/// the ids deleted by that transaction, so forwarding it to peers keeps
/// them in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub update: Vec<u8>,
    pub origin: UpdateOrigin,
}

pub(crate) type UpdateListener = Box<dyn FnMut(UpdateEvent) + Send>;
