//! Key/value view: each key resolves to the rightmost item of its chain.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use super::{container_json, item_out, ContainerId, ContainerIdx, ContainerKind, ContainerRef};
use crate::content::{Content, Input, Out};
use crate::doc::Document;
use crate::store::ItemRef;

/// A register-map container, borrowed from its [`Document`].
#[derive(Debug)]
pub struct RegisterMap<'a> {
    doc: &'a mut Document,
    idx: ContainerIdx,
}

impl<'a> RegisterMap<'a> {
    pub(crate) fn new(doc: &'a mut Document, idx: ContainerIdx) -> Self {
        Self { doc, idx }
    }

    fn current(&self, key: &str) -> Option<ItemRef> {
        let graph = &self.doc.graph;
        graph
            .container(self.idx)
            .map
            .get(key)
            .copied()
            .filter(|&r| !graph.item(r).deleted)
    }

    /// Assign `value` to `key`, superseding the previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Input>) {
        let content = Content::from(value.into());
        self.doc.local_set(self.idx, key, content);
    }

    /// Assign a new empty container to `key` and return a handle to it.
    pub fn set_container(&mut self, key: &str, kind: ContainerKind) -> ContainerRef {
        let id = self.doc.local_set(self.idx, key, Content::Container(kind));
        ContainerRef::new(ContainerId::Nested(id), kind)
    }

    pub fn get(&self, key: &str) -> Option<Out> {
        self.current(key).map(|r| item_out(&self.doc.graph, r))
    }

    /// Tombstone the value of `key`. Returns `false` if it had none.
    pub fn remove(&mut self, key: &str) -> bool {
        self.doc.local_remove(self.idx, key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.current(key).is_some()
    }

    pub fn len(&self) -> usize {
        let graph = &self.doc.graph;
        graph
            .container(self.idx)
            .map
            .values()
            .filter(|&&r| !graph.item(r).deleted)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with a live value, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_keys().collect()
    }

    /// Every live key and its value.
    pub fn entries(&self) -> BTreeMap<String, Out> {
        let graph = &self.doc.graph;
        graph
            .container(self.idx)
            .map
            .iter()
            .filter(|(_, &r)| !graph.item(r).deleted)
            .map(|(k, &r)| (k.clone(), item_out(graph, r)))
            .collect()
    }

    pub fn to_json(&self) -> Json {
        container_json(&self.doc.graph, self.idx)
    }

    /// A handle that addresses this container on any replica.
    pub fn container_ref(&self) -> ContainerRef {
        ContainerRef::new(
            self.doc.graph.container(self.idx).id.clone(),
            ContainerKind::Map,
        )
    }
}
