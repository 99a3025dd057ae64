//! Local edits: build records from the local clock and integrate them the
//! same way remote records are integrated.

use tracing::trace;

use super::{Document, UpdateOrigin};
use crate::clock::{tick, Id};
use crate::content::Content;
use crate::error::DocError;
use crate::store::{ItemRecord, ParentInfo};
use crate::types::ContainerIdx;

impl Document {
    /// Insert `contents` at visible `index` of sequence `idx`. The first new
    /// item takes the clock's current id.
    pub(crate) fn local_insert(
        &mut self,
        idx: ContainerIdx,
        index: usize,
        contents: Vec<Content>,
    ) -> Result<(), DocError> {
        let len = self.graph.container(idx).len;
        if index > len {
            return Err(DocError::IndexOutOfRange { index, len });
        }
        if contents.is_empty() {
            return Ok(());
        }

        let before = self.graph.state_vector();
        let (left, right) = self.graph.position(idx, index);
        let mut origin = left.map(|l| self.graph.item(l).id);
        let right_origin = right.map(|r| self.graph.item(r).id);
        let container = self.graph.container(idx).id.clone();

        let start = self.clock.next_id(contents.len() as u64);
        trace!(id = %start, count = contents.len(), %container, index, "local insert");
        for (offset, content) in contents.into_iter().enumerate() {
            let id = tick(start, offset as u64);
            let parent = (origin.is_none() && right_origin.is_none()).then(|| ParentInfo {
                container: container.clone(),
                key: None,
            });
            self.graph.integrate_record(ItemRecord {
                id,
                origin,
                right_origin,
                parent,
                content,
                deleted: false,
            });
            origin = Some(id);
        }
        self.commit(&before, UpdateOrigin::Local);
        Ok(())
    }

    /// Tombstone `count` visible items of sequence `idx` starting at `index`.
    pub(crate) fn local_delete(
        &mut self,
        idx: ContainerIdx,
        index: usize,
        count: usize,
    ) -> Result<(), DocError> {
        let len = self.graph.container(idx).len;
        if index.checked_add(count).map_or(true, |end| end > len) {
            return Err(DocError::IndexOutOfRange { index, len });
        }
        if count == 0 {
            return Ok(());
        }
        let before = self.graph.state_vector();
        let targets: Vec<_> = self.graph.visible(idx).skip(index).take(count).collect();
        trace!(index, count, "local delete");
        for target in targets {
            self.graph.delete(target);
        }
        self.commit(&before, UpdateOrigin::Local);
        Ok(())
    }

    /// Assign `key` of map `idx`. The current item for the key becomes the
    /// new item's origin and is superseded by it.
    pub(crate) fn local_set(&mut self, idx: ContainerIdx, key: &str, content: Content) -> Id {
        let before = self.graph.state_vector();
        let current = self.graph.container(idx).map.get(key).copied();
        let origin = current.map(|r| self.graph.item(r).id);
        let parent = origin.is_none().then(|| ParentInfo {
            container: self.graph.container(idx).id.clone(),
            key: Some(key.to_owned()),
        });
        let id = self.clock.next_id(1);
        trace!(%id, key, "local set");
        self.graph.integrate_record(ItemRecord {
            id,
            origin,
            right_origin: None,
            parent,
            content,
            deleted: false,
        });
        self.commit(&before, UpdateOrigin::Local);
        id
    }

    /// Tombstone the current value of `key`. Returns `false` if the key has
    /// no live value.
    pub(crate) fn local_remove(&mut self, idx: ContainerIdx, key: &str) -> bool {
        let Some(current) = self.graph.container(idx).map.get(key).copied() else {
            return false;
        };
        let before = self.graph.state_vector();
        let removed = self.graph.delete(current);
        if removed {
            trace!(key, "local remove");
            self.commit(&before, UpdateOrigin::Local);
        }
        removed
    }
}
