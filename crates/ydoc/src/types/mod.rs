//! Container identities and the typed views over them.
//!
//! A container is either a named root or a nested container created by an
//! item whose content is [`Content::Container`](crate::content::Content).
//! Nested containers are addressed by the id of their creating item, so a
//! [`ContainerRef`] taken on one replica addresses the same container on
//! every replica that has integrated that item.

pub mod map;
pub mod sequence;

pub use map::RegisterMap;
pub use sequence::{Sequence, SequenceIter};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::clock::Id;
use crate::content::{Content, Out};
use crate::store::{ItemGraph, ItemRef};

/// The view a container presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Sequence,
    Map,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Sequence => write!(f, "sequence"),
            ContainerKind::Map => write!(f, "map"),
        }
    }
}

/// Replica-independent identity of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerId {
    Root(String),
    Nested(Id),
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Root(name) => write!(f, "{name}"),
            ContainerId::Nested(id) => write!(f, "<{id}>"),
        }
    }
}

/// A typed handle to a container that can be passed between replicas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef {
    pub id: ContainerId,
    pub kind: ContainerKind,
}

impl ContainerRef {
    pub fn new(id: ContainerId, kind: ContainerKind) -> Self {
        Self { id, kind }
    }
}

/// Index of a container in the document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ContainerIdx(pub(crate) usize);

/// Arena entry for one container.
///
/// A container holds both an ordered chain (sequence items) and a key map
/// (register items); its `kind` decides which of the two the views expose.
/// Root containers learn their kind on first typed access.
#[derive(Debug, Clone)]
pub(crate) struct Container {
    pub id: ContainerId,
    pub kind: Option<ContainerKind>,
    /// First item of the chain, tombstones included.
    pub start: Option<ItemRef>,
    /// Key → rightmost item of that key's chain.
    pub map: HashMap<String, ItemRef>,
    /// Number of non-deleted chain items.
    pub len: usize,
    /// Creating item, for nested containers.
    pub item: Option<ItemRef>,
}

impl Container {
    pub fn new(id: ContainerId, kind: Option<ContainerKind>, item: Option<ItemRef>) -> Self {
        Self {
            id,
            kind,
            start: None,
            map: HashMap::new(),
            len: 0,
            item,
        }
    }

    /// Whether any item, live or tombstoned, was ever integrated here.
    pub fn has_items(&self) -> bool {
        self.start.is_some() || !self.map.is_empty()
    }
}

/// The element an item presents to a view.
pub(crate) fn item_out(graph: &ItemGraph, r: ItemRef) -> Out {
    let item = graph.item(r);
    match &item.content {
        Content::Value(v) => Out::Value(v.clone()),
        Content::Container(kind) => Out::Container(ContainerRef::new(
            ContainerId::Nested(item.id),
            *kind,
        )),
    }
}

/// Render an item as JSON, descending into nested containers.
pub(crate) fn item_json(graph: &ItemGraph, r: ItemRef) -> Json {
    let item = graph.item(r);
    match &item.content {
        Content::Value(v) => v.to_json(),
        Content::Container(_) => graph
            .lookup(&ContainerId::Nested(item.id))
            .map_or(Json::Null, |idx| container_json(graph, idx)),
    }
}

/// Render a container as a JSON array or object.
pub(crate) fn container_json(graph: &ItemGraph, idx: ContainerIdx) -> Json {
    let container = graph.container(idx);
    let kind = container.kind.unwrap_or(if container.map.is_empty() {
        ContainerKind::Sequence
    } else {
        ContainerKind::Map
    });
    match kind {
        ContainerKind::Sequence => {
            Json::Array(graph.visible(idx).map(|r| item_json(graph, r)).collect())
        }
        ContainerKind::Map => {
            let mut entries: Vec<(&String, ItemRef)> = container
                .map
                .iter()
                .map(|(k, &r)| (k, r))
                .filter(|&(_, r)| !graph.item(r).deleted)
                .collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, r) in entries {
                out.insert(key.clone(), item_json(graph, r));
            }
            Json::Object(out)
        }
    }
}
