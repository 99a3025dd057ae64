//! ydoc: a replicated document engine.
//!
//! Documents hold named root containers (ordered sequences and
//! register-maps, nestable to any depth) and converge across replicas by
//! exchanging compact binary updates. Concurrent inserts are ordered with
//! YATA, so every replica that integrated the same operations holds the
//! same chains regardless of delivery order.
//!
//! ```
//! use serde_json::json;
//! use ydoc::{apply_update, encode_state_vector, encode_update, open_document};
//!
//! let mut a = open_document(1);
//! a.sequence("list").unwrap().insert(0, ["from_a"]).unwrap();
//!
//! let mut b = open_document(2);
//! apply_update(&mut b, &encode_update(&a, None)).unwrap();
//! b.sequence("list").unwrap().push(["from_b"]).unwrap();
//!
//! let since = ydoc::codec::decode_state_vector(&encode_state_vector(&a)).unwrap();
//! apply_update(&mut a, &encode_update(&b, Some(&since))).unwrap();
//! assert_eq!(a.to_json(), json!({ "list": ["from_a", "from_b"] }));
//! assert_eq!(a.to_json(), b.to_json());
//! ```

pub mod clock;
pub mod codec;
pub mod content;
pub mod delete_set;
pub mod doc;
pub mod error;
mod store;
pub mod types;

pub use clock::{Id, LogicalClock, StateVector};
pub use codec::{merge_updates, DecodeError, Update};
pub use content::{Input, Out, Value};
pub use delete_set::{DeleteRange, DeleteSet};
pub use doc::{
    ApplyReport, DocOptions, Document, PendingStats, SubscriptionId, UpdateEvent, UpdateOrigin,
};
pub use error::DocError;
pub use store::{ItemRecord, ParentInfo};
pub use types::{ContainerId, ContainerKind, ContainerRef, RegisterMap, Sequence, SequenceIter};

/// Create an empty document whose local clock issues ids for `replica_id`.
pub fn open_document(replica_id: u64) -> Document {
    Document::with_replica(replica_id)
}

/// Encode the document's state vector.
pub fn encode_state_vector(doc: &Document) -> Vec<u8> {
    doc.encode_state_vector()
}

/// Encode every integrated item not covered by `since`, plus the delete set.
pub fn encode_update(doc: &Document, since: Option<&StateVector>) -> Vec<u8> {
    doc.encode_update(since)
}

/// Decode an update without applying it.
pub fn decode_update(data: &[u8]) -> Result<Update, DocError> {
    Ok(Update::decode(data)?)
}

/// Decode and integrate an update into `doc`.
pub fn apply_update(doc: &mut Document, data: &[u8]) -> Result<ApplyReport, DocError> {
    doc.apply_update(data)
}
