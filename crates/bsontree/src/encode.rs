//! Encoding a [`Document`] into the binary wire format.
//!
//! | Node kind | Element |
//! |-----------|---------|
//! | null      | `0x0A`  |
//! | bool      | `0x08`  |
//! | number    | `0x01` double |
//! | int32     | `0x10`  |
//! | int64     | `0x12`  |
//! | string    | `0x02`  |
//! | buffer    | `0x05` binary, subtype `0x00` |
//! | object    | `0x03`  |
//! | array     | `0x04`, fields named `"0"`, `"1"`, ... |
//! | reference | see below |
//!
//! The first occurrence of each shared object in encode order (fields in
//! ascending name order, arrays by index, depth first) is written as an
//! embedded document whose first fields are the [`MARKER_FIELD`] identifier
//! and, if the object has one, the [`TYPE_FIELD`] tag. Every later
//! occurrence is a bare identifier binary. An object counts as written
//! before its content is, so cycles through references terminate.

use std::collections::HashSet;

use crate::arena::NodeId;
use crate::document::Document;
use crate::element::{
    ElementType, MARKER_FIELD, SUBTYPE_GENERIC, TYPE_FIELD, identifier_payload, is_reserved_field,
};
use crate::error::{Error, Result};
use crate::node::{ArrayNode, NodeKind, ObjectNode, ReferenceNode};

/// Encode `doc` from its root, independent of the cursor.
///
/// # Errors
///
/// Returns `Error::InvalidFieldName` if a field name contains a NUL byte or
/// an object holds a field named [`MARKER_FIELD`] or [`TYPE_FIELD`], and
/// `Error::DocumentTooLarge` if a document exceeds the i32 length
/// prefix.
///
/// # Example
///
/// ```
/// use bsontree::Document;
///
/// let mut doc = Document::new();
/// doc.set_value("a", 1);
/// let bytes = bsontree::encode(&doc).unwrap();
/// assert_eq!(bytes, [0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]);
/// ```
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    let mut encoder = Encoder {
        doc,
        out: Vec::new(),
        emitted: HashSet::new(),
    };
    match doc.node(doc.root()).and_then(|n| n.as_object()) {
        Some(root) => encoder.write_object(root)?,
        None => encoder.write_object(&ObjectNode::default())?,
    }
    tracing::debug!(
        bytes = encoder.out.len(),
        shared = encoder.emitted.len(),
        "encoded document"
    );
    Ok(encoder.out)
}

struct Encoder<'a> {
    doc: &'a Document,
    out: Vec<u8>,
    /// Shared objects whose owning definition has been written.
    emitted: HashSet<NodeId>,
}

impl Encoder<'_> {
    /// Reserve the length prefix, returning where it starts.
    fn begin_document(&mut self) -> usize {
        let start = self.out.len();
        self.out.extend_from_slice(&[0; 4]);
        start
    }

    fn end_document(&mut self, start: usize) -> Result<()> {
        self.out.push(0);
        let len = self.out.len() - start;
        let len32 = i32::try_from(len).map_err(|_| Error::DocumentTooLarge(len))?;
        self.out[start..start + 4].copy_from_slice(&len32.to_le_bytes());
        Ok(())
    }

    fn write_object(&mut self, obj: &ObjectNode) -> Result<()> {
        let start = self.begin_document();
        self.write_fields(obj)?;
        self.end_document(start)
    }

    fn write_fields(&mut self, obj: &ObjectNode) -> Result<()> {
        for (name, child) in obj.iter() {
            if is_reserved_field(name) {
                return Err(Error::InvalidFieldName(name.to_owned()));
            }
            self.append_field(name, child)?;
        }
        Ok(())
    }

    fn write_array(&mut self, arr: &ArrayNode) -> Result<()> {
        let start = self.begin_document();
        for (index, child) in arr.iter().enumerate() {
            self.append_field(&index.to_string(), child)?;
        }
        self.end_document(start)
    }

    /// Write the shared object behind `r` as its owning definition.
    fn write_definition(&mut self, r: &ReferenceNode) -> Result<()> {
        let doc = self.doc;
        let start = self.begin_document();
        self.append_identifier(MARKER_FIELD, r.identifier())?;
        let type_tag = doc.object_type(r.identifier()).or(r.type_tag());
        if let Some(tag) = type_tag {
            self.header(ElementType::String, TYPE_FIELD)?;
            self.append_string(tag);
        }
        if let Some(content) = doc.node(r.target()).and_then(|n| n.as_object()) {
            self.write_fields(content)?;
        }
        self.end_document(start)
    }

    /// Append one element for `child` under `name`. Objects and arrays
    /// both go through here.
    fn append_field(&mut self, name: &str, child: NodeId) -> Result<()> {
        let doc = self.doc;
        let Some(node) = doc.node(child) else {
            return Ok(());
        };
        match node.kind() {
            NodeKind::Null => self.header(ElementType::Null, name)?,
            NodeKind::Bool(b) => {
                self.header(ElementType::Bool, name)?;
                self.out.push(u8::from(*b));
            }
            NodeKind::Number(n) => {
                self.header(ElementType::Double, name)?;
                self.out.extend_from_slice(&n.to_le_bytes());
            }
            NodeKind::Int32(n) => {
                self.header(ElementType::Int32, name)?;
                self.out.extend_from_slice(&n.to_le_bytes());
            }
            NodeKind::Int64(n) => {
                self.header(ElementType::Int64, name)?;
                self.out.extend_from_slice(&n.to_le_bytes());
            }
            NodeKind::String(s) => {
                self.header(ElementType::String, name)?;
                self.append_string(s);
            }
            NodeKind::Buffer(b) => {
                self.header(ElementType::Binary, name)?;
                self.append_binary(SUBTYPE_GENERIC, b)?;
            }
            NodeKind::Object(obj) => {
                self.header(ElementType::Document, name)?;
                self.write_object(obj)?;
            }
            NodeKind::Array(arr) => {
                self.header(ElementType::Array, name)?;
                self.write_array(arr)?;
            }
            NodeKind::Reference(r) => {
                if self.emitted.insert(r.target()) {
                    self.header(ElementType::Document, name)?;
                    self.write_definition(r)?;
                } else {
                    self.append_identifier(name, r.identifier())?;
                }
            }
        }
        Ok(())
    }

    fn header(&mut self, etype: ElementType, name: &str) -> Result<()> {
        if name.as_bytes().contains(&0) {
            return Err(Error::InvalidFieldName(name.to_owned()));
        }
        self.out.push(etype.raw());
        self.out.extend_from_slice(name.as_bytes());
        self.out.push(0);
        Ok(())
    }

    fn append_string(&mut self, s: &str) {
        let len = (s.len() + 1) as i32;
        self.out.extend_from_slice(&len.to_le_bytes());
        self.out.extend_from_slice(s.as_bytes());
        self.out.push(0);
    }

    fn append_binary(&mut self, subtype: u8, bytes: &[u8]) -> Result<()> {
        let len = i32::try_from(bytes.len()).map_err(|_| Error::DocumentTooLarge(bytes.len()))?;
        self.out.extend_from_slice(&len.to_le_bytes());
        self.out.push(subtype);
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    fn append_identifier(&mut self, name: &str, identifier: &str) -> Result<()> {
        let (subtype, payload) = identifier_payload(identifier);
        self.header(ElementType::Binary, name)?;
        self.append_binary(subtype, &payload)
    }
}

impl Document {
    /// Encode this document; see [`encode`].
    ///
    /// # Errors
    ///
    /// See [`encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode a document; see [`crate::decode`].
    ///
    /// # Errors
    ///
    /// See [`crate::decode`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        crate::decode::decode(bytes)
    }
}
