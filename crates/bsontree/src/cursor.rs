//! Cursor navigation and mutation.
//!
//! A document has a single current position that always stands on an
//! object, an array, or a reference to a shared object. Every read and
//! write below acts on that position, and navigation moves it one step at a
//! time. Descents with [`Document::set_to`] are meant to be paired with
//! [`Document::set_to_parent`]:
//!
//! ```
//! use bsontree::Document;
//!
//! let mut doc = Document::new();
//! doc.add_child("config");
//! assert!(doc.set_to("config"));
//! doc.set_value("volume", 0.8);
//! doc.set_to_parent();
//!
//! assert!(doc.set_to("config"));
//! assert_eq!(doc.get_double_value("volume"), 0.8);
//! assert!(!doc.set_to("missing"));
//! ```
//!
//! Reads of a missing field or of the wrong kind do not fail; they return a
//! sentinel (`NaN`, `i32::MIN`, `i64::MIN`, `false`, `""` or an empty slice).
//! Check the kind first with [`Document::field`] or use the strict
//! [`Document::try_field`] when the difference matters.

use std::collections::HashMap;
use std::fmt::Display;

use crate::arena::NodeId;
use crate::document::Document;
use crate::element::is_reserved_field;
use crate::node::{ArrayNode, Node, NodeKind, ObjectNode, ReferenceNode, Value};

#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    pub(crate) current: NodeId,
    /// Shared object -> reference it was last entered through.
    entry_points: HashMap<NodeId, NodeId>,
}

impl Cursor {
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            current: root,
            entry_points: HashMap::new(),
        }
    }

    /// Drop every trace of `released` nodes. If the cursor stood on one it
    /// moves to `fallback`, or to the reference `fallback` was entered
    /// through when that is still live.
    pub(crate) fn forget(&mut self, released: &[NodeId], fallback: NodeId) {
        self.entry_points
            .retain(|shared, via| !released.contains(shared) && !released.contains(via));
        if released.contains(&self.current) {
            self.current = self.entry_points.get(&fallback).copied().unwrap_or(fallback);
        }
    }
}

fn or_sentinel<T>(read: Option<T>, sentinel: T, key: impl Display) -> T {
    read.unwrap_or_else(|| {
        tracing::trace!(%key, "lenient read returned sentinel");
        sentinel
    })
}

impl Document {
    // --- Existence ---

    /// True if the current object has a field `name`.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// True if the current array has an element at `index`.
    #[must_use]
    pub fn exists_at(&self, index: usize) -> bool {
        self.element(index).is_some()
    }

    /// Element count of the current array; 0 if the cursor is not on one.
    #[must_use]
    pub fn get_size(&self) -> usize {
        self.node(self.current_container())
            .and_then(Node::as_array)
            .map_or(0, ArrayNode::len)
    }

    // --- Navigation ---

    fn enter(&mut self, child: Option<NodeId>) -> bool {
        let Some(child) = child else {
            return false;
        };
        match self.node(child).map(Node::kind) {
            Some(NodeKind::Object(_) | NodeKind::Array(_)) => {
                self.cursor.current = child;
                true
            }
            Some(NodeKind::Reference(r)) => {
                let target = r.target();
                // Re-entering an object through its own field keeps the outer entry.
                if self.current_container() != target {
                    self.cursor.entry_points.insert(target, child);
                }
                self.cursor.current = child;
                true
            }
            _ => false,
        }
    }

    /// Move to field `name` if it is an object, array or reference.
    /// Otherwise the cursor stays put and `false` is returned.
    pub fn set_to(&mut self, name: &str) -> bool {
        let child = self
            .node(self.current_container())
            .and_then(Node::as_object)
            .and_then(|obj| obj.get(name));
        self.enter(child)
    }

    /// Move to element `index` if it is an object, array or reference.
    pub fn set_to_index(&mut self, index: usize) -> bool {
        let child = self
            .node(self.current_container())
            .and_then(Node::as_array)
            .and_then(|arr| arr.get(index));
        self.enter(child)
    }

    /// Move to the container of the current node. A child of a shared object
    /// returns to the reference the object was entered through. No-op at
    /// the root.
    pub fn set_to_parent(&mut self) {
        let Some(parent) = self.node(self.cursor.current).and_then(Node::parent) else {
            return;
        };
        let target = self
            .cursor
            .entry_points
            .get(&parent)
            .copied()
            .unwrap_or(parent);
        if self.arena.contains(target) {
            self.cursor.current = target;
        }
    }

    /// Move back to the root object.
    pub fn set_to_root(&mut self) {
        self.cursor.current = self.root;
    }

    // --- Object writes ---
    //
    // `__guid` and `__type` are reserved: writes under those names are
    // ignored with a warning.

    fn write_field(&mut self, name: &str, kind: NodeKind) {
        if is_reserved_field(name) {
            tracing::warn!(name, "field name is reserved for shared-object markers; write ignored");
            return;
        }
        let container = self.current_container();
        if self.insert_field(container, name, kind).is_none() {
            tracing::warn!(name, "cursor is not on an object; write ignored");
        }
    }

    /// Create or replace field `name` with an empty object. The cursor does
    /// not move.
    pub fn add_child(&mut self, name: &str) {
        self.write_field(name, NodeKind::Object(ObjectNode::default()));
    }

    /// Create or replace field `name` with an empty array.
    pub fn add_array(&mut self, name: &str) {
        self.write_field(name, NodeKind::Array(ArrayNode::default()));
    }

    /// Create or replace field `name` with a scalar.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) {
        self.write_field(name, value.into().into());
    }

    pub fn set_null(&mut self, name: &str) {
        self.write_field(name, NodeKind::Null);
    }

    // --- Array writes ---

    fn push(&mut self, kind: NodeKind) -> Option<usize> {
        let container = self.current_container();
        let pushed = self.push_element(container, kind).map(|(index, _)| index);
        if pushed.is_none() {
            tracing::warn!("cursor is not on an array; push ignored");
        }
        pushed
    }

    /// Append a scalar to the current array, returning its index.
    pub fn push_value(&mut self, value: impl Into<Value>) -> Option<usize> {
        self.push(value.into().into())
    }

    pub fn push_null(&mut self) -> Option<usize> {
        self.push(NodeKind::Null)
    }

    /// Append an empty object to the current array, returning its index.
    pub fn push_object(&mut self) -> Option<usize> {
        self.push(NodeKind::Object(ObjectNode::default()))
    }

    /// Append an empty array to the current array, returning its index.
    pub fn push_array(&mut self) -> Option<usize> {
        self.push(NodeKind::Array(ArrayNode::default()))
    }

    // --- Shared objects ---

    fn reference_kind(&mut self, identifier: &str, type_tag: Option<&str>) -> (NodeKind, bool) {
        let (target, existed) = self.intern_object(identifier, type_tag, true);
        let tag = self
            .store
            .get(identifier)
            .and_then(|e| e.type_tag.clone());
        let kind = NodeKind::Reference(ReferenceNode::new(identifier.to_owned(), tag, target));
        (kind, existed)
    }

    /// Create or replace field `name` with a reference to the shared object
    /// `identifier`, creating that object if it is new.
    ///
    /// Returns `true` if the object already existed; its content is then
    /// already in the document and need not be written again. Writes through
    /// the reference land in the shared object. A reserved `name` is refused
    /// and nothing is created.
    pub fn set_reference_object(
        &mut self,
        name: &str,
        identifier: &str,
        type_tag: Option<&str>,
    ) -> bool {
        if is_reserved_field(name) {
            tracing::warn!(name, "field name is reserved for shared-object markers; reference ignored");
            return false;
        }
        let container = self.current_container();
        if self.node(container).and_then(Node::as_object).is_none() {
            tracing::warn!(name, "cursor is not on an object; reference ignored");
            return false;
        }
        let (kind, existed) = self.reference_kind(identifier, type_tag);
        self.insert_field(container, name, kind);
        existed
    }

    /// Array form of [`Document::set_reference_object`], returning the new
    /// index and whether the object already existed.
    pub fn push_reference_object(
        &mut self,
        identifier: &str,
        type_tag: Option<&str>,
    ) -> Option<(usize, bool)> {
        let container = self.current_container();
        if self.node(container).and_then(Node::as_array).is_none() {
            tracing::warn!(identifier, "cursor is not on an array; reference ignored");
            return None;
        }
        let (kind, existed) = self.reference_kind(identifier, type_tag);
        let (index, _) = self.push_element(container, kind)?;
        Some((index, existed))
    }

    // --- Typed reads by name ---

    #[must_use]
    pub fn get_int_value(&self, name: &str) -> i32 {
        or_sentinel(self.field(name).and_then(Node::as_i32), i32::MIN, name)
    }

    #[must_use]
    pub fn get_int64_value(&self, name: &str) -> i64 {
        or_sentinel(self.field(name).and_then(Node::as_i64), i64::MIN, name)
    }

    #[must_use]
    pub fn get_float_value(&self, name: &str) -> f32 {
        let read = self.field(name).and_then(Node::as_f64).map(|n| n as f32);
        or_sentinel(read, f32::NAN, name)
    }

    #[must_use]
    pub fn get_double_value(&self, name: &str) -> f64 {
        or_sentinel(self.field(name).and_then(Node::as_f64), f64::NAN, name)
    }

    #[must_use]
    pub fn get_bool_value(&self, name: &str) -> bool {
        or_sentinel(self.field(name).and_then(Node::as_bool), false, name)
    }

    /// String field `name`, or `""`.
    #[must_use]
    pub fn get_value(&self, name: &str) -> &str {
        or_sentinel(self.field(name).and_then(Node::as_str), "", name)
    }

    #[must_use]
    pub fn get_buffer(&self, name: &str) -> &[u8] {
        let empty: &[u8] = &[];
        or_sentinel(self.field(name).and_then(Node::as_buffer), empty, name)
    }

    /// Identifier of the reference in field `name`, or `""`.
    #[must_use]
    pub fn get_identifier(&self, name: &str) -> &str {
        let read = self
            .field(name)
            .and_then(Node::as_reference)
            .map(ReferenceNode::identifier);
        or_sentinel(read, "", name)
    }

    // --- Typed reads by index ---

    #[must_use]
    pub fn get_int_value_at(&self, index: usize) -> i32 {
        or_sentinel(self.element(index).and_then(Node::as_i32), i32::MIN, index)
    }

    #[must_use]
    pub fn get_int64_value_at(&self, index: usize) -> i64 {
        or_sentinel(self.element(index).and_then(Node::as_i64), i64::MIN, index)
    }

    #[must_use]
    pub fn get_float_value_at(&self, index: usize) -> f32 {
        let read = self.element(index).and_then(Node::as_f64).map(|n| n as f32);
        or_sentinel(read, f32::NAN, index)
    }

    #[must_use]
    pub fn get_double_value_at(&self, index: usize) -> f64 {
        or_sentinel(self.element(index).and_then(Node::as_f64), f64::NAN, index)
    }

    #[must_use]
    pub fn get_bool_value_at(&self, index: usize) -> bool {
        or_sentinel(self.element(index).and_then(Node::as_bool), false, index)
    }

    #[must_use]
    pub fn get_value_at(&self, index: usize) -> &str {
        or_sentinel(self.element(index).and_then(Node::as_str), "", index)
    }

    #[must_use]
    pub fn get_buffer_at(&self, index: usize) -> &[u8] {
        let empty: &[u8] = &[];
        or_sentinel(self.element(index).and_then(Node::as_buffer), empty, index)
    }

    #[must_use]
    pub fn get_identifier_at(&self, index: usize) -> &str {
        let read = self
            .element(index)
            .and_then(Node::as_reference)
            .map(ReferenceNode::identifier);
        or_sentinel(read, "", index)
    }
}
