//! Decoding the binary wire format into a [`Document`].
//!
//! Every element type of the format is accepted. Types the tree has no
//! node kind for are kept as strings (see [`decode`] for the renderings) so
//! nothing in the input is silently dropped.
//!
//! A nested document carrying a [`MARKER_FIELD`] binary identifier defines
//! a shared object: its other fields become the canonical object in the
//! store and the occurrence becomes a reference. A bare identifier binary
//! anywhere else is a reference to that object, defined earlier or later in
//! the input. The marker fields appear nowhere else: a [`TYPE_FIELD`]
//! without a [`MARKER_FIELD`], or either at the root, is malformed.

use crate::arena::NodeId;
use crate::document::Document;
use crate::element::{
    ElementType, MARKER_FIELD, MIN_DOCUMENT_LEN, TYPE_FIELD, identifier_from_payload,
    is_reserved_field, read_f64_le, read_i32_le, read_i64_le, read_u64_le,
};
use crate::error::{Error, Result};
use crate::node::{ArrayNode, Node, NodeKind, ReferenceNode};

/// Default limit on document/array nesting.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Options for [`decode_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting of documents and arrays below the root.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Decode `bytes` into a fresh document with default options.
///
/// Element types without a node kind of their own decode to strings:
///
/// | Element | Rendering |
/// |---------|-----------|
/// | ObjectId | 24 lowercase hex digits |
/// | datetime | `DateTime(<millis>)` |
/// | regex | `/<pattern>/<options>` |
/// | timestamp | `Timestamp(<t>, <i>)` |
/// | decimal128 | `Decimal128(<hex>)` |
/// | DBPointer | `DBPointer(<ns>, <hex>)` |
/// | JavaScript, symbol, code with scope | the source text |
/// | undefined, min key, max key | `undefined`, `MinKey`, `MaxKey` |
///
/// # Errors
///
/// Returns an error if the input is truncated, a length prefix is
/// inconsistent, an element type is unknown, text is not UTF-8, nesting is
/// too deep, a marker field is malformed, or bytes trail the root document.
///
/// # Example
///
/// ```
/// let bytes = [0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];
/// let doc = bsontree::decode(&bytes).unwrap();
/// assert_eq!(doc.get_int_value("a"), 1);
/// ```
pub fn decode(bytes: &[u8]) -> Result<Document> {
    decode_with_options(bytes, &DecodeOptions::default())
}

/// Decode `bytes` into a fresh document.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_with_options(bytes: &[u8], options: &DecodeOptions) -> Result<Document> {
    let mut decoder = Decoder {
        data: bytes,
        options,
        doc: Document::new(),
    };
    let root = decoder.doc.root();
    let end = decoder.read_document(0, bytes.len(), 0, root)?;
    if end != bytes.len() {
        return Err(Error::TrailingBytes(bytes.len() - end));
    }
    decoder.reject_stray_marker(root, "root")?;

    let doc = decoder.doc;
    doc.report_undefined_objects();
    tracing::debug!(
        bytes = bytes.len(),
        nodes = doc.live_nodes(),
        objects = doc.object_count(),
        "decoded document"
    );
    Ok(doc)
}

struct Decoder<'a> {
    data: &'a [u8],
    options: &'a DecodeOptions,
    doc: Document,
}

impl<'a> Decoder<'a> {
    /// Validate the framing of the document at `offset`, returning its end.
    fn document_end(&self, offset: usize, limit: usize) -> Result<usize> {
        let declared = read_i32_le(self.data, offset).ok_or(Error::Truncated { offset })?;
        let available = limit.saturating_sub(offset);
        let declared = usize::try_from(declared).unwrap_or(0);
        if declared < MIN_DOCUMENT_LEN || declared > available {
            return Err(Error::LengthMismatch {
                offset,
                declared,
                available,
            });
        }
        let end = offset + declared;
        if self.data[end - 1] != 0 {
            return Err(Error::MissingTerminator { offset: end - 1 });
        }
        Ok(end)
    }

    /// Decode the elements of the document at `offset` into `container`,
    /// which must be an object or an array. Returns the document's end.
    fn read_document(
        &mut self,
        offset: usize,
        limit: usize,
        depth: usize,
        container: NodeId,
    ) -> Result<usize> {
        if depth > self.options.max_depth {
            return Err(Error::NestingTooDeep(self.options.max_depth));
        }
        let end = self.document_end(offset, limit)?;
        let body_end = end - 1;

        let mut pos = offset + 4;
        while pos < body_end {
            let type_byte = self.data[pos];
            if type_byte == 0 {
                return Err(Error::LengthMismatch {
                    offset,
                    declared: end - offset,
                    available: pos + 1 - offset,
                });
            }
            let etype = ElementType::from_byte(type_byte).ok_or(Error::UnknownElementType(type_byte))?;
            let (name, value_pos) = self.read_cstring(pos + 1, body_end)?;
            pos = self.read_element(etype, name, value_pos, body_end, depth, container)?;
        }
        if pos != body_end {
            return Err(Error::LengthMismatch {
                offset,
                declared: end - offset,
                available: pos + 1 - offset,
            });
        }
        Ok(end)
    }

    /// Decode one element value at `pos` and attach it to `container`.
    /// Returns the position after the value.
    fn read_element(
        &mut self,
        etype: ElementType,
        name: &'a str,
        pos: usize,
        limit: usize,
        depth: usize,
        container: NodeId,
    ) -> Result<usize> {
        let (kind, next) = match etype {
            ElementType::Double => {
                let n = self.fixed(pos, 8, limit, read_f64_le)?;
                (NodeKind::Number(n), pos + 8)
            }
            ElementType::String | ElementType::JavaScript | ElementType::Symbol => {
                let (s, next) = self.read_string(pos, limit)?;
                (NodeKind::String(s.to_owned()), next)
            }
            ElementType::Document => return self.read_nested_object(name, pos, limit, depth, container),
            ElementType::Array => {
                let child = self.doc.arena.alloc(Node::new(
                    NodeKind::Array(ArrayNode::default()),
                    Some(container),
                ));
                let next = self.read_nested(pos, limit, depth, child)?;
                self.attach(container, name, child)?;
                return Ok(next);
            }
            ElementType::Binary => self.read_binary(pos, limit)?,
            ElementType::Undefined => (NodeKind::String("undefined".to_owned()), pos),
            ElementType::ObjectId => {
                let bytes = self.slice(pos, 12, limit)?;
                (NodeKind::String(hex::encode(bytes)), pos + 12)
            }
            ElementType::Bool => {
                let byte = self.slice(pos, 1, limit)?[0];
                (NodeKind::Bool(byte != 0), pos + 1)
            }
            ElementType::DateTime => {
                let millis = self.fixed(pos, 8, limit, read_i64_le)?;
                (NodeKind::String(format!("DateTime({millis})")), pos + 8)
            }
            ElementType::Null => (NodeKind::Null, pos),
            ElementType::Regex => {
                let (pattern, after) = self.read_cstring(pos, limit)?;
                let (flags, next) = self.read_cstring(after, limit)?;
                (NodeKind::String(format!("/{pattern}/{flags}")), next)
            }
            ElementType::DbPointer => {
                let (ns, after) = self.read_string(pos, limit)?;
                let oid = self.slice(after, 12, limit)?;
                let rendered = format!("DBPointer({ns}, {})", hex::encode(oid));
                (NodeKind::String(rendered), after + 12)
            }
            ElementType::JavaScriptWithScope => {
                let total = self.fixed(pos, 4, limit, read_i32_le)?;
                let total = usize::try_from(total).unwrap_or(0);
                if total < 4 || pos + total > limit {
                    return Err(Error::LengthMismatch {
                        offset: pos,
                        declared: total,
                        available: limit.saturating_sub(pos),
                    });
                }
                let scoped_end = pos + total;
                let (code, after) = self.read_string(pos + 4, scoped_end)?;
                self.document_end(after, scoped_end)?;
                (NodeKind::String(code.to_owned()), scoped_end)
            }
            ElementType::Int32 => {
                let n = self.fixed(pos, 4, limit, read_i32_le)?;
                (NodeKind::Int32(n), pos + 4)
            }
            ElementType::Timestamp => {
                let raw = self.fixed(pos, 8, limit, read_u64_le)?;
                let (t, i) = (raw >> 32, raw & 0xFFFF_FFFF);
                (NodeKind::String(format!("Timestamp({t}, {i})")), pos + 8)
            }
            ElementType::Int64 => {
                let n = self.fixed(pos, 8, limit, read_i64_le)?;
                (NodeKind::Int64(n), pos + 8)
            }
            ElementType::Decimal128 => {
                let bytes = self.slice(pos, 16, limit)?;
                (NodeKind::String(format!("Decimal128({})", hex::encode(bytes))), pos + 16)
            }
            ElementType::MinKey => (NodeKind::String("MinKey".to_owned()), pos),
            ElementType::MaxKey => (NodeKind::String("MaxKey".to_owned()), pos),
        };
        let child = self.doc.arena.alloc(Node::new(kind, Some(container)));
        self.attach(container, name, child)?;
        Ok(next)
    }

    fn read_nested(&mut self, pos: usize, limit: usize, depth: usize, child: NodeId) -> Result<usize> {
        if pos >= limit {
            return Err(Error::Truncated { offset: pos });
        }
        self.read_document(pos, limit, depth + 1, child)
    }

    /// Decode an embedded document, turning shared-object definitions into
    /// references.
    fn read_nested_object(
        &mut self,
        name: &str,
        pos: usize,
        limit: usize,
        depth: usize,
        container: NodeId,
    ) -> Result<usize> {
        let child = self.doc.alloc_object(Some(container));
        let next = self.read_nested(pos, limit, depth, child)?;
        let is_definition = self
            .doc
            .arena
            .get(child)
            .and_then(Node::as_object)
            .is_some_and(|obj| obj.contains(MARKER_FIELD));
        let attached = if is_definition {
            self.define_shared(child, container)?
        } else {
            self.reject_stray_marker(child, "plain object")?;
            child
        };
        self.attach(container, name, attached)?;
        Ok(next)
    }

    /// Move the content of a freshly decoded definition into the canonical
    /// object and return a reference node standing in for it.
    fn define_shared(&mut self, fresh: NodeId, container: NodeId) -> Result<NodeId> {
        let taken = self
            .doc
            .arena
            .get_mut(fresh)
            .map(|node| std::mem::replace(node.kind_mut(), NodeKind::Null));
        let Some(NodeKind::Object(mut fields)) = taken else {
            return Err(Error::MalformedMarker("definition is not an object".into()));
        };
        // Only the emptied shell goes; the children move below.
        self.doc.arena.release(fresh);

        let marker = fields.remove(MARKER_FIELD);
        let identifier = match marker.and_then(|id| self.doc.arena.get(id)).map(Node::kind) {
            Some(NodeKind::Reference(r)) => r.identifier().to_owned(),
            Some(other) => {
                return Err(Error::MalformedMarker(format!(
                    "{MARKER_FIELD} holds a {}",
                    other.name()
                )));
            }
            None => return Err(Error::MalformedMarker(format!("{MARKER_FIELD} missing"))),
        };
        let type_tag = match fields.remove(TYPE_FIELD) {
            Some(id) => {
                let tag = match self.doc.arena.get(id).map(Node::kind) {
                    Some(NodeKind::String(s)) => s.clone(),
                    Some(other) => {
                        return Err(Error::MalformedMarker(format!(
                            "{TYPE_FIELD} holds a {}",
                            other.name()
                        )));
                    }
                    None => return Err(Error::MalformedMarker(format!("{TYPE_FIELD} missing"))),
                };
                self.doc.arena.release(id);
                Some(tag)
            }
            None => None,
        };
        if let Some(id) = marker {
            self.doc.arena.release(id);
        }

        let already_defined = self.doc.is_defined(&identifier);
        let (canonical, _) = self.doc.intern_object(&identifier, type_tag.as_deref(), true);
        if already_defined {
            tracing::debug!(identifier = %identifier, "ignoring duplicate shared-object definition");
            for (_, child) in fields.into_fields() {
                self.doc.arena.release(child);
            }
        } else {
            for (field, child) in fields.into_fields() {
                self.doc.attach_field(canonical, &field, child);
            }
            self.doc.mark_defined(&identifier);
        }

        let tag = self.doc.object_type(&identifier).map(str::to_owned);
        let reference = NodeKind::Reference(ReferenceNode::new(identifier, tag, canonical));
        Ok(self.doc.arena.alloc(Node::new(reference, Some(container))))
    }

    fn reject_stray_marker(&self, object: NodeId, what: &str) -> Result<()> {
        let Some(obj) = self.doc.arena.get(object).and_then(Node::as_object) else {
            return Ok(());
        };
        match obj.iter().find(|(name, _)| is_reserved_field(name)) {
            Some((name, _)) => Err(Error::MalformedMarker(format!("{name} in a {what}"))),
            None => Ok(()),
        }
    }

    fn read_binary(&mut self, pos: usize, limit: usize) -> Result<(NodeKind, usize)> {
        let len = self.fixed(pos, 4, limit, read_i32_le)?;
        let len = usize::try_from(len).map_err(|_| Error::LengthMismatch {
            offset: pos,
            declared: 0,
            available: limit.saturating_sub(pos),
        })?;
        let subtype = self.slice(pos + 4, 1, limit)?[0];
        let payload = self.slice(pos + 5, len, limit)?;
        let next = pos + 5 + len;

        let kind = match identifier_from_payload(subtype, payload) {
            Some(Ok(identifier)) => {
                let (target, _) = self.doc.intern_object(&identifier, None, false);
                let tag = self.doc.object_type(&identifier).map(str::to_owned);
                NodeKind::Reference(ReferenceNode::new(identifier, tag, target))
            }
            Some(Err(_)) => return Err(Error::InvalidUtf8 { offset: pos + 5 }),
            None => NodeKind::Buffer(payload.to_vec()),
        };
        Ok((kind, next))
    }

    fn attach(&mut self, container: NodeId, name: &str, child: NodeId) -> Result<()> {
        let attached = match self.doc.arena.get(container).map(Node::kind) {
            Some(NodeKind::Object(_)) => self.doc.attach_field(container, name, child).is_some(),
            Some(NodeKind::Array(_)) => self.doc.attach_element(container, child).is_some(),
            _ => false,
        };
        if attached {
            Ok(())
        } else {
            Err(Error::UnexpectedType {
                expected: "container",
                found: self.doc.arena.get(container).map_or("released", Node::kind_name),
            })
        }
    }

    fn slice(&self, pos: usize, len: usize, limit: usize) -> Result<&'a [u8]> {
        let end = pos.checked_add(len).ok_or(Error::Truncated { offset: pos })?;
        if end > limit {
            return Err(Error::Truncated { offset: pos });
        }
        Ok(&self.data[pos..end])
    }

    fn fixed<T>(
        &self,
        pos: usize,
        len: usize,
        limit: usize,
        read: fn(&[u8], usize) -> Option<T>,
    ) -> Result<T> {
        let bytes = self.slice(pos, len, limit)?;
        read(bytes, 0).ok_or(Error::Truncated { offset: pos })
    }

    /// Read a NUL-terminated string, returning it and the position after
    /// the terminator.
    fn read_cstring(&self, pos: usize, limit: usize) -> Result<(&'a str, usize)> {
        let data: &'a [u8] = self.data;
        let window = data.get(pos..limit).ok_or(Error::Truncated { offset: pos })?;
        let nul = window
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::Truncated { offset: pos })?;
        let s = std::str::from_utf8(&window[..nul]).map_err(|_| Error::InvalidUtf8 { offset: pos })?;
        Ok((s, pos + nul + 1))
    }

    /// Read a length-prefixed string (length counts the trailing NUL).
    fn read_string(&self, pos: usize, limit: usize) -> Result<(&'a str, usize)> {
        let declared = self.fixed(pos, 4, limit, read_i32_le)?;
        let len = usize::try_from(declared)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or(Error::LengthMismatch {
                offset: pos,
                declared: 0,
                available: limit.saturating_sub(pos + 4),
            })?;
        let bytes = self.slice(pos + 4, len, limit)?;
        if bytes[len - 1] != 0 {
            return Err(Error::MissingTerminator {
                offset: pos + 4 + len - 1,
            });
        }
        let s = std::str::from_utf8(&bytes[..len - 1])
            .map_err(|_| Error::InvalidUtf8 { offset: pos + 4 })?;
        Ok((s, pos + 4 + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build one document from pre-encoded elements.
    fn doc_bytes(elements: &[u8]) -> Vec<u8> {
        let len = (elements.len() + 5) as i32;
        let mut out = len.to_le_bytes().to_vec();
        out.extend_from_slice(elements);
        out.push(0);
        out
    }

    fn element(etype: u8, name: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![etype];
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(payload);
        out
    }

    fn string_payload(s: &str) -> Vec<u8> {
        let mut out = ((s.len() + 1) as i32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out.push(0);
        out
    }

    fn binary_payload(subtype: u8, bytes: &[u8]) -> Vec<u8> {
        let mut out = (bytes.len() as i32).to_le_bytes().to_vec();
        out.push(subtype);
        out.extend_from_slice(bytes);
        out
    }

    #[test]
    fn test_decode_empty_document() {
        let doc = decode(&[5, 0, 0, 0, 0]).unwrap();
        assert_eq!(doc.get_size(), 0);
        assert_eq!(doc.current(), doc.root());
    }

    #[test]
    fn test_decode_scalars() {
        let mut elements = element(0x01, "d", &1.5f64.to_le_bytes());
        elements.extend(element(0x02, "s", &string_payload("hi")));
        elements.extend(element(0x08, "b", &[1]));
        elements.extend(element(0x0A, "n", &[]));
        elements.extend(element(0x10, "i", &(-7i32).to_le_bytes()));
        elements.extend(element(0x12, "l", &5_000_000_000i64.to_le_bytes()));
        elements.extend(element(0x05, "buf", &binary_payload(0x00, &[0xAA, 0xBB])));
        let doc = decode(&doc_bytes(&elements)).unwrap();

        assert_eq!(doc.get_double_value("d"), 1.5);
        assert_eq!(doc.get_value("s"), "hi");
        assert!(doc.get_bool_value("b"));
        assert!(doc.field("n").unwrap().is_null());
        assert_eq!(doc.get_int_value("i"), -7);
        assert_eq!(doc.get_int64_value("l"), 5_000_000_000);
        assert_eq!(doc.get_buffer("buf"), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_array_in_order() {
        let mut inner = element(0x10, "0", &1i32.to_le_bytes());
        inner.extend(element(0x02, "1", &string_payload("two")));
        let elements = element(0x04, "arr", &doc_bytes(&inner));
        let mut doc = decode(&doc_bytes(&elements)).unwrap();

        assert!(doc.set_to("arr"));
        assert_eq!(doc.get_size(), 2);
        assert_eq!(doc.get_int_value_at(0), 1);
        assert_eq!(doc.get_value_at(1), "two");
    }

    #[test]
    fn test_decode_fallback_renderings() {
        let mut elements = element(0x07, "oid", &[0xAB; 12]);
        elements.extend(element(0x09, "when", &1_700_000_000_000i64.to_le_bytes()));
        elements.extend(element(0x0B, "re", b"^a.*\0i\0"));
        elements.extend(element(0x11, "ts", &((5u64 << 32) | 9).to_le_bytes()));
        elements.extend(element(0x06, "u", &[]));
        elements.extend(element(0xFF, "lo", &[]));
        elements.extend(element(0x7F, "hi", &[]));
        elements.extend(element(0x0E, "sym", &string_payload("tag")));
        let doc = decode(&doc_bytes(&elements)).unwrap();

        assert_eq!(doc.get_value("oid"), "ab".repeat(12));
        assert_eq!(doc.get_value("when"), "DateTime(1700000000000)");
        assert_eq!(doc.get_value("re"), "/^a.*/i");
        assert_eq!(doc.get_value("ts"), "Timestamp(5, 9)");
        assert_eq!(doc.get_value("u"), "undefined");
        assert_eq!(doc.get_value("lo"), "MinKey");
        assert_eq!(doc.get_value("hi"), "MaxKey");
        assert_eq!(doc.get_value("sym"), "tag");
    }

    #[test]
    fn test_decode_code_with_scope_keeps_code() {
        let code = string_payload("f()");
        let scope = doc_bytes(&element(0x10, "x", &1i32.to_le_bytes()));
        let total = (4 + code.len() + scope.len()) as i32;
        let mut payload = total.to_le_bytes().to_vec();
        payload.extend(code);
        payload.extend(scope);
        let doc = decode(&doc_bytes(&element(0x0F, "js", &payload))).unwrap();
        assert_eq!(doc.get_value("js"), "f()");
    }

    #[test]
    fn test_decode_definition_then_reference() {
        let mut def = element(0x05, MARKER_FIELD, &binary_payload(0x80, b"guid-1"));
        def.extend(element(0x02, TYPE_FIELD, &string_payload("Widget")));
        def.extend(element(0x10, "x", &1i32.to_le_bytes()));
        let mut elements = element(0x03, "a", &doc_bytes(&def));
        elements.extend(element(0x05, "b", &binary_payload(0x80, b"guid-1")));
        let mut doc = decode(&doc_bytes(&elements)).unwrap();

        assert_eq!(doc.object_count(), 1);
        assert_eq!(doc.object_type("guid-1"), Some("Widget"));
        assert_eq!(doc.get_identifier("a"), "guid-1");
        assert_eq!(doc.get_identifier("b"), "guid-1");
        let a = doc.resolve(doc.root_field("a"));
        let b = doc.resolve(doc.root_field("b"));
        assert_eq!(a, b);

        assert!(doc.set_to("b"));
        assert_eq!(doc.get_int_value("x"), 1);
        assert!(!doc.exists(MARKER_FIELD));
        assert!(!doc.exists(TYPE_FIELD));
    }

    #[test]
    fn test_decode_reference_before_definition() {
        let mut def = element(0x05, MARKER_FIELD, &binary_payload(0x80, b"late"));
        def.extend(element(0x10, "x", &2i32.to_le_bytes()));
        let mut elements = element(0x05, "first", &binary_payload(0x80, b"late"));
        elements.extend(element(0x03, "second", &doc_bytes(&def)));
        let mut doc = decode(&doc_bytes(&elements)).unwrap();

        assert_eq!(doc.object_count(), 1);
        assert!(doc.set_to("first"));
        assert_eq!(doc.get_int_value("x"), 2);
    }

    #[test]
    fn test_decode_duplicate_definition_ignored() {
        let mut one = element(0x05, MARKER_FIELD, &binary_payload(0x80, b"g"));
        one.extend(element(0x10, "x", &1i32.to_le_bytes()));
        let mut two = element(0x05, MARKER_FIELD, &binary_payload(0x80, b"g"));
        two.extend(element(0x10, "x", &2i32.to_le_bytes()));
        let mut elements = element(0x03, "a", &doc_bytes(&one));
        elements.extend(element(0x03, "b", &doc_bytes(&two)));
        let mut doc = decode(&doc_bytes(&elements)).unwrap();

        assert!(doc.set_to("b"));
        assert_eq!(doc.get_int_value("x"), 1);
    }

    #[test]
    fn test_decode_uuid_identifier() {
        let uuid = uuid::Uuid::new_v4();
        let elements = element(0x05, "r", &binary_payload(0x04, uuid.as_bytes()));
        let doc = decode(&doc_bytes(&elements)).unwrap();
        assert_eq!(doc.get_identifier("r"), uuid.hyphenated().to_string());
    }

    #[test]
    fn test_decode_malformed_marker() {
        let def = element(0x10, MARKER_FIELD, &1i32.to_le_bytes());
        let elements = element(0x03, "a", &doc_bytes(&def));
        assert!(matches!(
            decode(&doc_bytes(&elements)),
            Err(Error::MalformedMarker(_))
        ));
    }

    #[test]
    fn test_decode_rejects_stray_markers() {
        let type_only = element(0x02, TYPE_FIELD, &string_payload("Widget"));
        let nested = element(0x03, "a", &doc_bytes(&type_only));
        assert!(matches!(
            decode(&doc_bytes(&nested)),
            Err(Error::MalformedMarker(_))
        ));

        let marker_at_root = element(0x05, MARKER_FIELD, &binary_payload(0x80, b"g"));
        assert!(matches!(
            decode(&doc_bytes(&marker_at_root)),
            Err(Error::MalformedMarker(_))
        ));
        assert!(matches!(
            decode(&doc_bytes(&type_only)),
            Err(Error::MalformedMarker(_))
        ));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(&[]).unwrap_err(), Error::Truncated { offset: 0 });
        assert!(matches!(
            decode(&[4, 0, 0, 0, 0]),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(matches!(
            decode(&[9, 0, 0, 0, 0]),
            Err(Error::LengthMismatch { .. })
        ));
        assert_eq!(
            decode(&[5, 0, 0, 0, 1]).unwrap_err(),
            Error::MissingTerminator { offset: 4 }
        );
        assert_eq!(
            decode(&[5, 0, 0, 0, 0, 0xFF]).unwrap_err(),
            Error::TrailingBytes(1)
        );
        assert_eq!(
            decode(&doc_bytes(&element(0x42, "x", &[]))).unwrap_err(),
            Error::UnknownElementType(0x42)
        );
        // int32 payload cut short by the terminator
        assert!(matches!(
            decode(&doc_bytes(&element(0x10, "x", &[1, 0]))),
            Err(Error::Truncated { .. })
        ));
        assert!(matches!(
            decode(&doc_bytes(&element(0x02, "s", &[2, 0, 0, 0, 0xFF, 0]))),
            Err(Error::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_decode_nesting_limit() {
        let mut bytes = doc_bytes(&[]);
        for _ in 0..4 {
            bytes = doc_bytes(&element(0x03, "n", &bytes));
        }
        let shallow = DecodeOptions { max_depth: 3 };
        assert_eq!(
            decode_with_options(&bytes, &shallow).unwrap_err(),
            Error::NestingTooDeep(3)
        );
        assert!(decode_with_options(&bytes, &DecodeOptions { max_depth: 4 }).is_ok());
    }

    impl Document {
        fn root_field(&self, name: &str) -> NodeId {
            self.node(self.root())
                .and_then(Node::as_object)
                .and_then(|o| o.get(name))
                .unwrap()
        }
    }
}
