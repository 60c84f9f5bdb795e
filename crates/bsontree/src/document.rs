//! The document: one root tree, one object store, one constructor registry
//! and one cursor.
//!
//! Documents share no state with each other. Create one empty with
//! [`Document::new`] or from bytes with [`crate::decode`].

use crate::arena::{Arena, NodeId};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::node::{ArrayNode, Node, NodeKind, ObjectNode};
use crate::store::{ConstructorRegistry, ObjectStore};

/// A mutable document tree with its object store and cursor.
#[derive(Debug)]
pub struct Document {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    pub(crate) store: ObjectStore,
    pub(crate) registry: ConstructorRegistry,
    pub(crate) cursor: Cursor,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document whose root is an empty object.
    #[must_use]
    pub fn new() -> Self {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::new(NodeKind::Object(ObjectNode::default()), None));
        Self {
            arena,
            root,
            store: ObjectStore::default(),
            registry: ConstructorRegistry::default(),
            cursor: Cursor::new(root),
        }
    }

    /// Get the root object's id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get the node the cursor stands on.
    #[must_use]
    pub fn current(&self) -> NodeId {
        self.cursor.current
    }

    /// Look up a live node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Follow a reference to its shared object; other ids map to themselves.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> NodeId {
        match self.arena.get(id).map(Node::kind) {
            Some(NodeKind::Reference(r)) => r.target(),
            _ => id,
        }
    }

    /// The container the cursor operates on, with references resolved.
    pub(crate) fn current_container(&self) -> NodeId {
        self.resolve(self.cursor.current)
    }

    fn current_object(&self) -> Option<&ObjectNode> {
        self.arena.get(self.current_container())?.as_object()
    }

    fn current_array(&self) -> Option<&ArrayNode> {
        self.arena.get(self.current_container())?.as_array()
    }

    /// Field `name` of the current object.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Node> {
        self.arena.get(self.current_object()?.get(name)?)
    }

    /// Element `index` of the current array.
    #[must_use]
    pub fn element(&self, index: usize) -> Option<&Node> {
        self.arena.get(self.current_array()?.get(index)?)
    }

    /// Strict form of [`Document::field`].
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` if the cursor is not on an object and
    /// `Error::KeyNotFound` if the field is absent.
    pub fn try_field(&self, name: &str) -> Result<&Node> {
        let container = self.current_container();
        let obj = match self.arena.get(container) {
            Some(node) => node.as_object().ok_or(Error::UnexpectedType {
                expected: "object",
                found: node.kind_name(),
            })?,
            None => return Err(Error::KeyNotFound(name.to_owned())),
        };
        obj.get(name)
            .and_then(|id| self.arena.get(id))
            .ok_or_else(|| Error::KeyNotFound(name.to_owned()))
    }

    /// Strict form of [`Document::element`].
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` if the cursor is not on an array and
    /// `Error::IndexOutOfBounds` past the end.
    pub fn try_element(&self, index: usize) -> Result<&Node> {
        let container = self.current_container();
        let arr = match self.arena.get(container) {
            Some(node) => node.as_array().ok_or(Error::UnexpectedType {
                expected: "array",
                found: node.kind_name(),
            })?,
            None => return Err(Error::IndexOutOfBounds { index, length: 0 }),
        };
        arr.get(index)
            .and_then(|id| self.arena.get(id))
            .ok_or(Error::IndexOutOfBounds {
                index,
                length: arr.len(),
            })
    }

    /// Number of live nodes, shared objects included.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.arena.live()
    }

    // --- Ownership primitives ---

    pub(crate) fn alloc_object(&mut self, parent: Option<NodeId>) -> NodeId {
        self.arena
            .alloc(Node::new(NodeKind::Object(ObjectNode::default()), parent))
    }

    /// Install a new child under `name` in `container`, releasing whatever
    /// the field held before. Returns `None` if `container` is not an object.
    pub(crate) fn insert_field(
        &mut self,
        container: NodeId,
        name: &str,
        kind: NodeKind,
    ) -> Option<NodeId> {
        self.arena.get(container)?.as_object()?;
        let child = self.arena.alloc(Node::new(kind, Some(container)));
        self.attach_field(container, name, child)?;
        Some(child)
    }

    /// Append a new child to `container`, returning its index and id.
    /// Returns `None` if `container` is not an array.
    pub(crate) fn push_element(
        &mut self,
        container: NodeId,
        kind: NodeKind,
    ) -> Option<(usize, NodeId)> {
        if !self.arena.get(container)?.is_array() {
            return None;
        }
        let child = self.arena.alloc(Node::new(kind, Some(container)));
        let index = self.attach_element(container, child)?;
        Some((index, child))
    }

    /// Make the allocated node `child` field `name` of `container`.
    pub(crate) fn attach_field(&mut self, container: NodeId, name: &str, child: NodeId) -> Option<()> {
        let previous = match self.arena.get_mut(container).map(Node::kind_mut) {
            Some(NodeKind::Object(obj)) => obj.insert(name.to_owned(), child),
            _ => return None,
        };
        if let Some(node) = self.arena.get_mut(child) {
            node.set_parent(Some(container));
        }
        if let Some(previous) = previous {
            self.release_subtree(previous, container);
        }
        Some(())
    }

    /// Append the allocated node `child` to `container`.
    pub(crate) fn attach_element(&mut self, container: NodeId, child: NodeId) -> Option<usize> {
        let index = match self.arena.get_mut(container).map(Node::kind_mut) {
            Some(NodeKind::Array(arr)) => arr.push(child),
            _ => return None,
        };
        if let Some(node) = self.arena.get_mut(child) {
            node.set_parent(Some(container));
        }
        Some(index)
    }

    fn release_subtree(&mut self, id: NodeId, container: NodeId) {
        let released = self.arena.release(id);
        self.cursor.forget(&released, container);
    }

    /// Put back a saved cursor, falling back to the root if its position
    /// no longer exists.
    pub(crate) fn restore_cursor(&mut self, saved: Cursor) {
        if self.arena.contains(saved.current) {
            self.cursor = saved;
        } else {
            self.cursor = Cursor::new(self.root);
        }
    }
}
