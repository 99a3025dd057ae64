//! Ordered-list view over a container chain.

use serde_json::Value as Json;

use super::{container_json, item_out, ContainerId, ContainerIdx, ContainerKind, ContainerRef};
use crate::content::{Content, Input, Out};
use crate::doc::Document;
use crate::error::DocError;
use crate::store::{ChainIter, ItemGraph};

/// A sequence container, borrowed from its [`Document`].
///
/// Indices count visible (non-deleted) elements only.
#[derive(Debug)]
pub struct Sequence<'a> {
    doc: &'a mut Document,
    idx: ContainerIdx,
}

impl<'a> Sequence<'a> {
    pub(crate) fn new(doc: &'a mut Document, idx: ContainerIdx) -> Self {
        Self { doc, idx }
    }

    pub fn len(&self) -> usize {
        self.doc.graph.container(self.idx).len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Out> {
        let graph = &self.doc.graph;
        graph
            .visible(self.idx)
            .nth(index)
            .map(|r| item_out(graph, r))
    }

    /// Insert `values` so the first lands at `index`.
    pub fn insert<I, V>(&mut self, index: usize, values: I) -> Result<(), DocError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Input>,
    {
        let contents: Vec<Content> = values
            .into_iter()
            .map(|v| Content::from(v.into()))
            .collect();
        self.doc.local_insert(self.idx, index, contents)
    }

    /// Append `values` at the end.
    pub fn push<I, V>(&mut self, values: I) -> Result<(), DocError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Input>,
    {
        let len = self.len();
        self.insert(len, values)
    }

    /// Insert a new empty container at `index` and return a handle to it.
    pub fn insert_container(
        &mut self,
        index: usize,
        kind: ContainerKind,
    ) -> Result<ContainerRef, DocError> {
        let id = self.doc.clock.peek();
        self.doc
            .local_insert(self.idx, index, vec![Content::Container(kind)])?;
        Ok(ContainerRef::new(ContainerId::Nested(id), kind))
    }

    pub fn push_container(&mut self, kind: ContainerKind) -> Result<ContainerRef, DocError> {
        let len = self.len();
        self.insert_container(len, kind)
    }

    /// Delete `count` elements starting at `index`.
    pub fn delete(&mut self, index: usize, count: usize) -> Result<(), DocError> {
        self.doc.local_delete(self.idx, index, count)
    }

    /// The visible elements, in order.
    pub fn to_sequence(&self) -> Vec<Out> {
        self.iter().collect()
    }

    pub fn iter(&self) -> SequenceIter<'_> {
        SequenceIter {
            graph: &self.doc.graph,
            chain: self.doc.graph.chain(self.idx),
        }
    }

    pub fn to_json(&self) -> Json {
        container_json(&self.doc.graph, self.idx)
    }

    /// A handle that addresses this container on any replica.
    pub fn container_ref(&self) -> ContainerRef {
        ContainerRef::new(
            self.doc.graph.container(self.idx).id.clone(),
            ContainerKind::Sequence,
        )
    }
}

/// Iterates the visible elements of a [`Sequence`]. Restartable: every call
/// to [`Sequence::iter`] walks the chain afresh.
pub struct SequenceIter<'a> {
    graph: &'a ItemGraph,
    chain: ChainIter<'a>,
}

impl Iterator for SequenceIter<'_> {
    type Item = Out;

    fn next(&mut self) -> Option<Out> {
        let graph = self.graph;
        self.chain
            .find(|&r| !graph.item(r).deleted)
            .map(|r| item_out(graph, r))
    }
}
