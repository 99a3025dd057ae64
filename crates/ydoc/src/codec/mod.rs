//! Binary codec for state vectors and updates.
//!
//! ```text
//! state vector := count, (replica, next_clock)*
//! update       := replica_count, (replica, item_count, item*)*, delete_set
//! item         := clock, origin?, right_origin?, [parent, key?], content, deleted
//! delete_set   := replica_count, (replica, range_count, (clock, len)*)*
//! ```
//!
//! `parent` is written only for items without origins. Decoding validates
//! the whole buffer before anything is handed to a document, so a rejected
//! update never partially applies.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;

use std::collections::BTreeMap;

use thiserror::Error;
use ydoc_buffers::BufferError;

use crate::clock::StateVector;
use crate::delete_set::DeleteSet;
use crate::store::ItemRecord;

/// Content tags.
pub(crate) mod tag {
    pub const NULL: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const INT: u8 = 2;
    pub const FLOAT: u8 = 3;
    pub const STRING: u8 = 4;
    pub const CONTAINER: u8 = 5;

    pub const PARENT_ROOT: u8 = 0;
    pub const PARENT_NESTED: u8 = 1;

    pub const KIND_SEQUENCE: u8 = 0;
    pub const KIND_MAP: u8 = 1;
}

/// Reasons a buffer is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("variable-length integer overflows 64 bits")]
    VarintOverflow,
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("unknown content tag: {0}")]
    UnknownContentTag(u8),
    #[error("unknown container kind: {0}")]
    UnknownContainerKind(u8),
    #[error("unknown parent tag: {0}")]
    UnknownParentTag(u8),
    #[error("invalid boolean byte: {0}")]
    InvalidBool(u8),
    #[error("clock {clock} of replica {replica} is not greater than the previous item")]
    NonMonotonicClock { replica: u64, clock: u64 },
    #[error("empty delete range at {replica}:{clock}")]
    EmptyDeleteRange { replica: u64, clock: u64 },
    #[error("delete range {replica}:{clock}+{len} runs past the largest clock")]
    DeleteRangeOverflow { replica: u64, clock: u64, len: u64 },
    #[error("{0} trailing bytes after update")]
    TrailingBytes(usize),
}

impl From<BufferError> for DecodeError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => DecodeError::UnexpectedEof,
            BufferError::InvalidUtf8 => DecodeError::InvalidUtf8,
            BufferError::VarintOverflow => DecodeError::VarintOverflow,
        }
    }
}

/// A decoded update: items grouped by replica in increasing clock order,
/// plus a delete set. Nothing is integrated yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub items: BTreeMap<u64, Vec<ItemRecord>>,
    pub delete_set: DeleteSet,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(data: &[u8]) -> Result<Update, DecodeError> {
        Decoder::new().decode_update(data)
    }

    pub fn encode(&self) -> Vec<u8> {
        Encoder::new().encode_update(self)
    }

    /// `true` when the update carries neither items nor deletions.
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0 && self.delete_set.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// The state a fresh document reaches by applying this update alone:
    /// for each replica, the end of the clock run that starts at `0`.
    pub fn state_vector(&self) -> StateVector {
        let mut sv = StateVector::new();
        for (&replica, records) in &self.items {
            let mut next = 0;
            for record in records {
                if record.id.clock != next {
                    break;
                }
                next += 1;
            }
            sv.set(replica, next);
        }
        sv
    }

    /// Drop every item already covered by `since`. The delete set is kept
    /// whole.
    pub fn diff(&self, since: &StateVector) -> Update {
        let items = self
            .items
            .iter()
            .filter_map(|(&replica, records)| {
                let from = since.get(replica);
                let kept: Vec<ItemRecord> = records
                    .iter()
                    .filter(|r| r.id.clock >= from)
                    .cloned()
                    .collect();
                (!kept.is_empty()).then_some((replica, kept))
            })
            .collect();
        Update {
            items,
            delete_set: self.delete_set.clone(),
        }
    }

    /// Fold `other` into `self`. Items already present keep their record but
    /// take on `other`'s tombstone flag if it is set.
    pub fn merge(&mut self, other: Update) {
        for (replica, records) in other.items {
            let entry = self.items.entry(replica).or_default();
            let mut by_clock: BTreeMap<u64, ItemRecord> =
                entry.drain(..).map(|r| (r.id.clock, r)).collect();
            for record in records {
                by_clock
                    .entry(record.id.clock)
                    .and_modify(|existing| existing.deleted |= record.deleted)
                    .or_insert(record);
            }
            entry.extend(by_clock.into_values());
        }
        self.delete_set.merge(&other.delete_set);
    }
}

/// Encode a state vector.
pub fn encode_state_vector(sv: &StateVector) -> Vec<u8> {
    Encoder::new().encode_state_vector(sv)
}

/// Decode a state vector.
pub fn decode_state_vector(data: &[u8]) -> Result<StateVector, DecodeError> {
    Decoder::new().decode_state_vector(data)
}

/// Union several encoded updates into one.
pub fn merge_updates(updates: &[&[u8]]) -> Result<Vec<u8>, DecodeError> {
    let mut merged = Update::new();
    for data in updates {
        merged.merge(Update::decode(data)?);
    }
    Ok(merged.encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::id;
    use crate::content::{Content, Value};
    use crate::store::ParentInfo;
    use crate::types::{ContainerId, ContainerKind};

    fn record(replica: u64, clock: u64, content: Content) -> ItemRecord {
        let origin = clock.checked_sub(1).map(|c| id(replica, c));
        ItemRecord {
            id: id(replica, clock),
            origin,
            right_origin: None,
            parent: origin.is_none().then(|| ParentInfo {
                container: ContainerId::Root("list".into()),
                key: None,
            }),
            content,
            deleted: false,
        }
    }

    fn sample() -> Update {
        let mut update = Update::new();
        update.items.insert(
            1,
            vec![
                record(1, 0, Content::Value(Value::from("a"))),
                record(1, 1, Content::Value(Value::from(-7))),
                record(1, 2, Content::Value(Value::from(2.5))),
                record(1, 3, Content::Container(ContainerKind::Map)),
            ],
        );
        update.items.insert(
            9,
            vec![ItemRecord {
                id: id(9, 0),
                origin: None,
                right_origin: None,
                parent: Some(ParentInfo {
                    container: ContainerId::Nested(id(1, 3)),
                    key: Some("k".into()),
                }),
                content: Content::Value(Value::Bool(true)),
                deleted: true,
            }],
        );
        update.delete_set.insert(id(1, 1), 1);
        update.delete_set.insert(id(9, 0), 1);
        update
    }

    #[test]
    fn update_survives_encoding() {
        let update = sample();
        let decoded = Update::decode(&update.encode()).unwrap();
        assert_eq!(decoded, update);
        assert_eq!(decoded.item_count(), 5);
    }

    #[test]
    fn empty_update_is_two_zero_bytes() {
        let bytes = Update::new().encode();
        assert_eq!(bytes, [0, 0]);
        assert!(Update::decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn state_vector_encoding() {
        let sv: StateVector = [(1, 3), (300, 1)].into_iter().collect();
        let bytes = encode_state_vector(&sv);
        assert_eq!(bytes, [2, 1, 3, 0xac, 0x02, 1]);
        assert_eq!(decode_state_vector(&bytes).unwrap(), sv);
    }

    #[test]
    fn implied_state_vector_stops_at_gaps() {
        let mut update = sample();
        update
            .items
            .insert(4, vec![record(4, 2, Content::Value(Value::Null))]);
        let sv = update.state_vector();
        assert_eq!(sv.get(1), 4);
        assert_eq!(sv.get(9), 1);
        assert_eq!(sv.get(4), 0);
    }

    #[test]
    fn diff_drops_known_items() {
        let update = sample();
        let since: StateVector = [(1, 2), (9, 1)].into_iter().collect();
        let diff = update.diff(&since);
        assert_eq!(diff.item_count(), 2);
        assert!(!diff.items.contains_key(&9));
        assert_eq!(diff.delete_set, update.delete_set);
    }

    #[test]
    fn merge_unions_items_and_deletes() {
        let full = sample();
        let first = full.diff(&[(1, 2), (9, 1)].into_iter().collect());
        let second = full.diff(&[(1, 4)].into_iter().collect());
        let merged = merge_updates(&[&first.encode(), &second.encode()]).unwrap();
        let merged = Update::decode(&merged).unwrap();
        assert_eq!(merged.item_count(), 3);
        assert_eq!(merged.delete_set, full.delete_set);
    }
}
