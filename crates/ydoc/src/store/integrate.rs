//! YATA integration.
//!
//! An item is placed between its `left` (resolved origin) and `right`
//! (resolved right origin). When other items already sit between the two,
//! they were inserted concurrently and the scan below decides, the same way
//! on every replica, where the new item goes:
//!
//! - an item with the same origin and a lower replica id stays to the left;
//! - an item with the same origin and right origin and a higher replica id
//!   ends the scan (the new item goes before it);
//! - an item whose origin lies inside the scanned span stays to the left
//!   unless its origin is itself still in conflict;
//! - anything else ends the scan.
//!
//! Map keys use the same procedure on the key's chain; the rightmost item
//! of a chain is the key's current value.

use std::collections::HashSet;

use tracing::trace;

use super::{Item, ItemGraph, ItemRef, Parent};
use crate::content::Content;
use crate::types::ContainerIdx;

impl ItemGraph {
    /// Link `item` into its container and index it. `item.left`/`item.right`
    /// must hold the resolved origins.
    pub(crate) fn integrate(&mut self, mut item: Item) -> ItemRef {
        let this = ItemRef(self.items.len());
        debug_assert_eq!(self.state(item.id.replica), item.id.clock);

        let parent = match item.parent {
            Parent::Container(idx) => Some(idx),
            Parent::Detached(_) => None,
        };

        if let Some(parent) = parent {
            let left = self.resolve_conflicts(&item, parent);
            let right = match left {
                Some(l) => self.items[l.0].right,
                None => match &item.parent_sub {
                    Some(key) => self.containers[parent.0]
                        .map
                        .get(key)
                        .map(|&r| self.leftmost(r)),
                    None => self.containers[parent.0].start,
                },
            };
            item.left = left;
            item.right = right;
        } else {
            item.left = None;
            item.right = None;
        }

        let id = item.id;
        let left = item.left;
        let right = item.right;
        let parent_sub = item.parent_sub.clone();
        let nested_kind = match item.content {
            Content::Container(kind) => Some(kind),
            Content::Value(_) => None,
        };
        self.items.push(item);
        self.clients.entry(id.replica).or_default().push(this);
        if let Some(kind) = nested_kind {
            self.instantiate_nested(this, id, kind);
        }

        let Some(parent) = parent else {
            trace!(id = %id, "detached item integrated as tombstone");
            self.delete(this);
            return this;
        };

        match left {
            Some(l) => self.items[l.0].right = Some(this),
            None if parent_sub.is_none() => self.containers[parent.0].start = Some(this),
            None => {}
        }
        match (right, &parent_sub) {
            (Some(r), _) => self.items[r.0].left = Some(this),
            (None, Some(key)) => {
                self.containers[parent.0].map.insert(key.clone(), this);
                if let Some(l) = left {
                    self.delete(l);
                }
            }
            (None, None) => {}
        }
        if parent_sub.is_none() {
            self.containers[parent.0].len += 1;
        }

        let superseded = parent_sub.is_some() && right.is_some();
        if superseded || self.is_container_deleted(parent) {
            self.delete(this);
        }
        this
    }

    /// Run the YATA scan and return the item the new one goes after.
    fn resolve_conflicts(&self, item: &Item, parent: ContainerIdx) -> Option<ItemRef> {
        let mut left = item.left;
        let right = item.right;

        let has_gap = match left {
            Some(l) => self.items[l.0].right != right,
            None => right.map_or(true, |r| self.items[r.0].left.is_some()),
        };
        if !has_gap {
            return left;
        }

        let mut cursor = match left {
            Some(l) => self.items[l.0].right,
            None => match &item.parent_sub {
                Some(key) => self.containers[parent.0]
                    .map
                    .get(key)
                    .map(|&r| self.leftmost(r)),
                None => self.containers[parent.0].start,
            },
        };

        let mut conflicting: HashSet<ItemRef> = HashSet::new();
        let mut before_origin: HashSet<ItemRef> = HashSet::new();
        while let Some(o) = cursor {
            if Some(o) == right {
                break;
            }
            before_origin.insert(o);
            conflicting.insert(o);
            let other = &self.items[o.0];
            if other.origin == item.origin {
                if other.id.replica < item.id.replica {
                    left = Some(o);
                    conflicting.clear();
                } else if other.right_origin == item.right_origin {
                    break;
                }
            } else {
                match other.origin.and_then(|origin| self.find(origin)) {
                    Some(origin_ref) if before_origin.contains(&origin_ref) => {
                        if !conflicting.contains(&origin_ref) {
                            left = Some(o);
                            conflicting.clear();
                        }
                    }
                    _ => break,
                }
            }
            cursor = other.right;
        }

        trace!(
            id = %item.id,
            left = ?left.map(|l| self.items[l.0].id),
            "resolved concurrent insert"
        );
        left
    }
}
