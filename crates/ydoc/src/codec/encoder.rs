//! Binary encoder for state vectors and updates.

use ydoc_buffers::Writer;

use super::{tag, Update};
use crate::clock::{Id, StateVector};
use crate::content::{Content, Value};
use crate::delete_set::DeleteSet;
use crate::store::ItemRecord;
use crate::types::{ContainerId, ContainerKind};

/// Binary encoder.
pub struct Encoder {
    pub writer: Writer,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            writer: Writer::with_alloc_size(1024),
        }
    }

    pub fn encode_state_vector(&mut self, sv: &StateVector) -> Vec<u8> {
        self.writer.vu64(sv.len() as u64);
        for (replica, clock) in sv.iter() {
            self.writer.vu64(replica);
            self.writer.vu64(clock);
        }
        self.writer.flush()
    }

    pub fn encode_update(&mut self, update: &Update) -> Vec<u8> {
        let replicas: Vec<_> = update
            .items
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .collect();
        self.writer.vu64(replicas.len() as u64);
        for (&replica, records) in replicas {
            self.writer.vu64(replica);
            self.writer.vu64(records.len() as u64);
            for record in records {
                self.encode_item(record);
            }
        }
        self.encode_delete_set(&update.delete_set);
        self.writer.flush()
    }

    fn encode_item(&mut self, record: &ItemRecord) {
        self.writer.vu64(record.id.clock);
        self.encode_opt_id(record.origin);
        self.encode_opt_id(record.right_origin);
        if record.origin.is_none() && record.right_origin.is_none() {
            // Records built by the graph always carry a parent here; fall
            // back to the unnamed root so the buffer stays decodable.
            match &record.parent {
                Some(info) => {
                    self.encode_container_id(&info.container);
                    match &info.key {
                        Some(key) => {
                            self.writer.u8(1);
                            self.writer.utf8(key);
                        }
                        None => self.writer.u8(0),
                    }
                }
                None => {
                    self.encode_container_id(&ContainerId::Root(String::new()));
                    self.writer.u8(0);
                }
            }
        }
        self.encode_content(&record.content);
        self.writer.bool(record.deleted);
    }

    fn encode_id(&mut self, id: Id) {
        self.writer.vu64(id.replica);
        self.writer.vu64(id.clock);
    }

    fn encode_opt_id(&mut self, id: Option<Id>) {
        match id {
            Some(id) => {
                self.writer.u8(1);
                self.encode_id(id);
            }
            None => self.writer.u8(0),
        }
    }

    fn encode_container_id(&mut self, id: &ContainerId) {
        match id {
            ContainerId::Root(name) => {
                self.writer.u8(tag::PARENT_ROOT);
                self.writer.utf8(name);
            }
            ContainerId::Nested(item) => {
                self.writer.u8(tag::PARENT_NESTED);
                self.encode_id(*item);
            }
        }
    }

    fn encode_content(&mut self, content: &Content) {
        let w = &mut self.writer;
        match content {
            Content::Value(Value::Null) => w.u8(tag::NULL),
            Content::Value(Value::Bool(b)) => {
                w.u8(tag::BOOL);
                w.bool(*b);
            }
            Content::Value(Value::Int(n)) => {
                w.u8(tag::INT);
                w.vi64(*n);
            }
            Content::Value(Value::Float(f)) => {
                w.u8(tag::FLOAT);
                w.f64(*f);
            }
            Content::Value(Value::String(s)) => {
                w.u8(tag::STRING);
                w.utf8(s);
            }
            Content::Container(kind) => {
                w.u8(tag::CONTAINER);
                w.u8(match kind {
                    ContainerKind::Sequence => tag::KIND_SEQUENCE,
                    ContainerKind::Map => tag::KIND_MAP,
                });
            }
        }
    }

    fn encode_delete_set(&mut self, ds: &DeleteSet) {
        self.writer.vu64(ds.replica_count() as u64);
        for (replica, ranges) in ds.iter() {
            self.writer.vu64(replica);
            self.writer.vu64(ranges.len() as u64);
            for range in ranges {
                self.writer.vu64(range.clock);
                self.writer.vu64(range.len);
            }
        }
    }
}
