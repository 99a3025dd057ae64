//! Binary decoder for state vectors and updates.

use ydoc_buffers::Reader;

use super::{tag, DecodeError, Update};
use crate::clock::{Id, StateVector};
use crate::content::{Content, Value};
use crate::delete_set::DeleteSet;
use crate::store::{ItemRecord, ParentInfo};
use crate::types::{ContainerId, ContainerKind};

/// Binary decoder.
pub struct Decoder;

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode_state_vector(&self, data: &[u8]) -> Result<StateVector, DecodeError> {
        let mut r = Reader::new(data);
        let count = r.try_vu64()?;
        let mut sv = StateVector::new();
        for _ in 0..count {
            let replica = r.try_vu64()?;
            let clock = r.try_vu64()?;
            sv.set_max(replica, clock);
        }
        finish(&r)?;
        Ok(sv)
    }

    pub fn decode_update(&self, data: &[u8]) -> Result<Update, DecodeError> {
        let mut r = Reader::new(data);
        let mut update = Update::new();

        let replica_count = r.try_vu64()?;
        for _ in 0..replica_count {
            let replica = r.try_vu64()?;
            let item_count = r.try_vu64()?;
            let records = update.items.entry(replica).or_default();
            // Every item takes at least four bytes.
            records.reserve(capacity(item_count, r.size() / 4));
            for _ in 0..item_count {
                let record = self.decode_item(&mut r, replica)?;
                if let Some(prev) = records.last() {
                    if record.id.clock <= prev.id.clock {
                        return Err(DecodeError::NonMonotonicClock {
                            replica,
                            clock: record.id.clock,
                        });
                    }
                }
                records.push(record);
            }
        }
        update.items.retain(|_, records| !records.is_empty());
        update.delete_set = self.decode_delete_set(&mut r)?;
        finish(&r)?;
        Ok(update)
    }

    fn decode_item(&self, r: &mut Reader<'_>, replica: u64) -> Result<ItemRecord, DecodeError> {
        let clock = r.try_vu64()?;
        let origin = self.decode_opt_id(r)?;
        let right_origin = self.decode_opt_id(r)?;
        let parent = if origin.is_none() && right_origin.is_none() {
            let container = self.decode_container_id(r)?;
            let key = if read_bool(r)? {
                Some(r.try_utf8()?.to_owned())
            } else {
                None
            };
            Some(ParentInfo { container, key })
        } else {
            None
        };
        let content = self.decode_content(r)?;
        let deleted = read_bool(r)?;
        Ok(ItemRecord {
            id: Id::new(replica, clock),
            origin,
            right_origin,
            parent,
            content,
            deleted,
        })
    }

    fn decode_id(&self, r: &mut Reader<'_>) -> Result<Id, DecodeError> {
        let replica = r.try_vu64()?;
        let clock = r.try_vu64()?;
        Ok(Id::new(replica, clock))
    }

    fn decode_opt_id(&self, r: &mut Reader<'_>) -> Result<Option<Id>, DecodeError> {
        if read_bool(r)? {
            self.decode_id(r).map(Some)
        } else {
            Ok(None)
        }
    }

    fn decode_container_id(&self, r: &mut Reader<'_>) -> Result<ContainerId, DecodeError> {
        match r.try_u8()? {
            tag::PARENT_ROOT => Ok(ContainerId::Root(r.try_utf8()?.to_owned())),
            tag::PARENT_NESTED => self.decode_id(r).map(ContainerId::Nested),
            other => Err(DecodeError::UnknownParentTag(other)),
        }
    }

    fn decode_content(&self, r: &mut Reader<'_>) -> Result<Content, DecodeError> {
        let content = match r.try_u8()? {
            tag::NULL => Content::Value(Value::Null),
            tag::BOOL => Content::Value(Value::Bool(read_bool(r)?)),
            tag::INT => Content::Value(Value::Int(r.try_vi64()?)),
            tag::FLOAT => Content::Value(Value::Float(r.try_f64()?)),
            tag::STRING => Content::Value(Value::String(r.try_utf8()?.to_owned())),
            tag::CONTAINER => Content::Container(match r.try_u8()? {
                tag::KIND_SEQUENCE => ContainerKind::Sequence,
                tag::KIND_MAP => ContainerKind::Map,
                other => return Err(DecodeError::UnknownContainerKind(other)),
            }),
            other => return Err(DecodeError::UnknownContentTag(other)),
        };
        Ok(content)
    }

    fn decode_delete_set(&self, r: &mut Reader<'_>) -> Result<DeleteSet, DecodeError> {
        let mut ds = DeleteSet::new();
        let replica_count = r.try_vu64()?;
        for _ in 0..replica_count {
            let replica = r.try_vu64()?;
            let range_count = r.try_vu64()?;
            for _ in 0..range_count {
                let clock = r.try_vu64()?;
                let len = r.try_vu64()?;
                if len == 0 {
                    return Err(DecodeError::EmptyDeleteRange { replica, clock });
                }
                if clock.checked_add(len).is_none() {
                    return Err(DecodeError::DeleteRangeOverflow { replica, clock, len });
                }
                ds.insert(Id::new(replica, clock), len);
            }
        }
        Ok(ds)
    }
}

fn read_bool(r: &mut Reader<'_>) -> Result<bool, DecodeError> {
    match r.try_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DecodeError::InvalidBool(other)),
    }
}

fn finish(r: &Reader<'_>) -> Result<(), DecodeError> {
    match r.size() {
        0 => Ok(()),
        n => Err(DecodeError::TrailingBytes(n)),
    }
}

/// Preallocation bound: never trust a declared count beyond what the
/// remaining input could hold.
fn capacity(declared: u64, limit: usize) -> usize {
    usize::try_from(declared).map_or(limit, |n| n.min(limit))
}
