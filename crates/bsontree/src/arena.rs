//! Slot arena that owns every node of a document.
//!
//! Containers store child [`NodeId`]s and children store an optional parent
//! id, so the container tree cannot form ownership cycles. Released slots go
//! on a free list and are reused by later allocations.

use crate::node::{Node, NodeKind};

/// Stable index of a node within one document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    /// Raw slot index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl Arena {
    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.slot()] = Some(node);
            return id;
        }
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        id
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.slot())?.as_ref()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.slot())?.as_mut()
    }

    #[inline]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Release `id` and its owned subtree, returning every released id.
    ///
    /// A reference owns only itself; its shared target stays live.
    pub(crate) fn release(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut released = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let Some(node) = self.slots.get_mut(next.slot()).and_then(Option::take) else {
                continue;
            };
            match node.kind() {
                NodeKind::Object(obj) => pending.extend(obj.iter().map(|(_, child)| child)),
                NodeKind::Array(arr) => pending.extend(arr.iter()),
                _ => {}
            }
            self.free.push(next);
            released.push(next);
        }
        released
    }
}
