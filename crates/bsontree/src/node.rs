//! Node variant model for the document tree.
//!
//! A [`Node`] is one tagged value plus an optional back-reference to the
//! container that owns it. Containers ([`ObjectNode`], [`ArrayNode`]) hold
//! [`NodeId`]s of the children they own; a [`ReferenceNode`] holds the id of
//! a canonical shared object owned by the document's object store.
//!
//! # Reading values
//!
//! The `as_*` accessors are lenient: they return `None` for the wrong kind
//! and callers pick a sentinel. The `try_*` accessors are strict and report
//! [`Error::UnexpectedType`]:
//!
//! ```
//! use bsontree::Document;
//!
//! let mut doc = Document::new();
//! doc.set_value("name", "widget");
//!
//! let node = doc.field("name").unwrap();
//! assert!(node.is_string());
//! assert_eq!(node.as_f64(), None);
//! assert!(node.try_f64().is_err());
//! ```

use std::collections::BTreeMap;

use crate::arena::NodeId;
use crate::error::{Error, Result};

/// A scalar value that can be written into the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Int32(i32),
    Int64(i64),
    String(String),
    Buffer(Vec<u8>),
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Buffer(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Buffer(b.to_vec())
    }
}

/// Owned mapping from field name to child node.
///
/// Field order is irrelevant to the model; iteration is by ascending name,
/// which is also the order the encoder writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectNode {
    fields: BTreeMap<String, NodeId>,
}

impl ObjectNode {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.fields.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate `(name, child)` pairs in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Install `child` under `name`, returning the displaced child.
    pub(crate) fn insert(&mut self, name: String, child: NodeId) -> Option<NodeId> {
        self.fields.insert(name, child)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<NodeId> {
        self.fields.remove(name)
    }

    pub(crate) fn into_fields(self) -> impl Iterator<Item = (String, NodeId)> {
        self.fields.into_iter()
    }
}

/// Owned ordered sequence of child nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayNode {
    items: Vec<NodeId>,
}

impl ArrayNode {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }

    /// Append `child`, returning its index.
    pub(crate) fn push(&mut self, child: NodeId) -> usize {
        self.items.push(child);
        self.items.len() - 1
    }
}

/// Stand-in for a shared object kept once in the object store.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceNode {
    identifier: String,
    type_tag: Option<String>,
    target: NodeId,
}

impl ReferenceNode {
    pub(crate) fn new(identifier: String, type_tag: Option<String>, target: NodeId) -> Self {
        Self {
            identifier,
            type_tag,
            target,
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// Canonical shared object this reference resolves to.
    #[must_use]
    pub fn target(&self) -> NodeId {
        self.target
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Null,
    Bool(bool),
    Number(f64),
    Int32(i32),
    Int64(i64),
    String(String),
    Buffer(Vec<u8>),
    Object(ObjectNode),
    Array(ArrayNode),
    Reference(ReferenceNode),
}

impl NodeKind {
    /// Get the kind name as a string (for error messages).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Bool(_) => "bool",
            NodeKind::Number(_) => "number",
            NodeKind::Int32(_) => "int32",
            NodeKind::Int64(_) => "int64",
            NodeKind::String(_) => "string",
            NodeKind::Buffer(_) => "buffer",
            NodeKind::Object(_) => "object",
            NodeKind::Array(_) => "array",
            NodeKind::Reference(_) => "reference",
        }
    }
}

impl From<Value> for NodeKind {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => NodeKind::Null,
            Value::Bool(b) => NodeKind::Bool(b),
            Value::Number(n) => NodeKind::Number(n),
            Value::Int32(n) => NodeKind::Int32(n),
            Value::Int64(n) => NodeKind::Int64(n),
            Value::String(s) => NodeKind::String(s),
            Value::Buffer(b) => NodeKind::Buffer(b),
        }
    }
}

/// One value in the tree plus its non-owning parent link.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self { kind, parent }
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Container that owns this node; `None` for the root and for canonical
    /// shared objects.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    // --- Kind predicates ---

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.kind, NodeKind::Null)
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.kind, NodeKind::Bool(_))
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self.kind, NodeKind::Number(_))
    }

    #[must_use]
    pub fn is_int32(&self) -> bool {
        matches!(self.kind, NodeKind::Int32(_))
    }

    #[must_use]
    pub fn is_int64(&self) -> bool {
        matches!(self.kind, NodeKind::Int64(_))
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.kind, NodeKind::String(_))
    }

    #[must_use]
    pub fn is_buffer(&self) -> bool {
        matches!(self.kind, NodeKind::Buffer(_))
    }

    /// True for objects and for references, which behave as objects.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object(_) | NodeKind::Reference(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, NodeKind::Array(_))
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, NodeKind::Reference(_))
    }

    /// True for nodes the cursor may stand on.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.is_object() || self.is_array()
    }

    // --- Lenient accessors ---

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            NodeKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Read any numeric kind as f64.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Number(n) => Some(n),
            NodeKind::Int32(n) => Some(f64::from(n)),
            NodeKind::Int64(n) => Some(n as f64),
            _ => None,
        }
    }

    /// Read any numeric kind as i32. Numbers truncate; an i64 that does not
    /// fit is `None`.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self.kind {
            NodeKind::Int32(n) => Some(n),
            NodeKind::Int64(n) => i32::try_from(n).ok(),
            NodeKind::Number(n) => Some(n as i32),
            _ => None,
        }
    }

    /// Read any numeric kind as i64. Numbers truncate.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            NodeKind::Int64(n) => Some(n),
            NodeKind::Int32(n) => Some(i64::from(n)),
            NodeKind::Number(n) => Some(n as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_buffer(&self) -> Option<&[u8]> {
        match &self.kind {
            NodeKind::Buffer(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayNode> {
        match &self.kind {
            NodeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<&ReferenceNode> {
        match &self.kind {
            NodeKind::Reference(r) => Some(r),
            _ => None,
        }
    }

    // --- Strict accessors ---

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::UnexpectedType {
            expected,
            found: self.kind_name(),
        }
    }

    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` unless this is a bool node.
    pub fn try_bool(&self) -> Result<bool> {
        self.as_bool().ok_or_else(|| self.mismatch("bool"))
    }

    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` unless this is a numeric node.
    pub fn try_f64(&self) -> Result<f64> {
        self.as_f64().ok_or_else(|| self.mismatch("number"))
    }

    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` unless this is an int32 node.
    pub fn try_i32(&self) -> Result<i32> {
        match self.kind {
            NodeKind::Int32(n) => Ok(n),
            _ => Err(self.mismatch("int32")),
        }
    }

    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` unless this is an int32 or int64 node.
    pub fn try_i64(&self) -> Result<i64> {
        match self.kind {
            NodeKind::Int64(n) => Ok(n),
            NodeKind::Int32(n) => Ok(i64::from(n)),
            _ => Err(self.mismatch("int64")),
        }
    }

    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` unless this is a string node.
    pub fn try_str(&self) -> Result<&str> {
        self.as_str().ok_or_else(|| self.mismatch("string"))
    }

    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` unless this is a buffer node.
    pub fn try_buffer(&self) -> Result<&[u8]> {
        self.as_buffer().ok_or_else(|| self.mismatch("buffer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind) -> Node {
        Node::new(kind, None)
    }

    #[test]
    fn test_exactly_one_predicate_per_kind() {
        let nodes = [
            leaf(NodeKind::Null),
            leaf(NodeKind::Bool(true)),
            leaf(NodeKind::Number(1.5)),
            leaf(NodeKind::Int32(1)),
            leaf(NodeKind::Int64(1)),
            leaf(NodeKind::String("s".into())),
            leaf(NodeKind::Buffer(vec![1])),
            leaf(NodeKind::Object(ObjectNode::default())),
            leaf(NodeKind::Array(ArrayNode::default())),
        ];
        for node in &nodes {
            let hits = [
                node.is_null(),
                node.is_bool(),
                node.is_number(),
                node.is_int32(),
                node.is_int64(),
                node.is_string(),
                node.is_buffer(),
                node.is_object(),
                node.is_array(),
            ]
            .into_iter()
            .filter(|b| *b)
            .count();
            assert_eq!(hits, 1, "{}", node.kind_name());
        }
    }

    #[test]
    fn test_reference_reports_as_object() {
        let target = NodeId::from_raw(7);
        let node = leaf(NodeKind::Reference(ReferenceNode::new(
            "guid-1".into(),
            Some("Widget".into()),
            target,
        )));
        assert!(node.is_object());
        assert!(node.is_reference());
        assert!(node.is_container());
        let r = node.as_reference().unwrap();
        assert_eq!(r.identifier(), "guid-1");
        assert_eq!(r.type_tag(), Some("Widget"));
        assert_eq!(r.target(), target);
    }

    #[test]
    fn test_lenient_numeric_reads() {
        assert_eq!(leaf(NodeKind::Int32(-4)).as_f64(), Some(-4.0));
        assert_eq!(leaf(NodeKind::Number(2.9)).as_i32(), Some(2));
        assert_eq!(leaf(NodeKind::Int64(i64::MAX)).as_i32(), None);
        assert_eq!(leaf(NodeKind::Int64(i64::MAX)).as_i64(), Some(i64::MAX));
        assert_eq!(leaf(NodeKind::String("1".into())).as_f64(), None);
        assert_eq!(leaf(NodeKind::Null).as_bool(), None);
    }

    #[test]
    fn test_strict_reads_report_kinds() {
        let node = leaf(NodeKind::String("x".into()));
        assert_eq!(
            node.try_f64(),
            Err(Error::UnexpectedType {
                expected: "number",
                found: "string"
            })
        );
        assert_eq!(node.try_str(), Ok("x"));
        assert!(leaf(NodeKind::Number(1.0)).try_i32().is_err());
        assert_eq!(leaf(NodeKind::Int32(3)).try_i64(), Ok(3));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(1), Value::Int32(1));
        assert_eq!(Value::from(1i64), Value::Int64(1));
        assert_eq!(Value::from(0.5f32), Value::Number(0.5));
        assert_eq!(Value::from("a"), Value::String("a".into()));
        assert_eq!(Value::from(&[1u8, 2][..]), Value::Buffer(vec![1, 2]));
        assert_eq!(NodeKind::from(Value::Null), NodeKind::Null);
    }

    #[test]
    fn test_object_node_replace_returns_previous() {
        let mut obj = ObjectNode::default();
        assert_eq!(obj.insert("a".into(), NodeId::from_raw(1)), None);
        assert_eq!(
            obj.insert("a".into(), NodeId::from_raw(2)),
            Some(NodeId::from_raw(1))
        );
        assert_eq!(obj.get("a"), Some(NodeId::from_raw(2)));
        assert_eq!(obj.len(), 1);
    }
}
