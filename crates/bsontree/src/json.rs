//! JSON conversion for inspecting and authoring documents.
//!
//! # Example
//!
//! ```
//! use bsontree::{from_json, to_json};
//!
//! let doc = from_json(r#"{"name": "alice", "age": 30}"#).unwrap();
//! assert_eq!(doc.get_int_value("age"), 30);
//!
//! let json = to_json(&doc).unwrap();
//! ```
//!
//! # Mapping
//!
//! | Node kind      | JSON                                      |
//! |----------------|-------------------------------------------|
//! | null           | null                                      |
//! | bool           | true/false                                |
//! | int32, int64   | integer (int32 if it fits)                |
//! | number         | other number                              |
//! | buffer         | string with `b64:` prefix (valid base64)  |
//! | string         | other string                              |
//! | array          | array                                     |
//! | object         | object                                    |
//! | reference      | `{"$guid": id, "$type": tag, ...}` at the first occurrence, `{"$ref": id}` after |
//!
//! Occurrence order is the encoder's: fields by ascending name, arrays by
//! index, depth first.

use std::collections::HashSet;

use base64::Engine;
use serde_json::Value as JsonValue;

use crate::arena::NodeId;
use crate::document::Document;
use crate::element::is_reserved_field;
use crate::error::{Error, Result};
use crate::node::{ArrayNode, Node, NodeKind, ObjectNode, ReferenceNode};

const GUID_KEY: &str = "$guid";
const TYPE_KEY: &str = "$type";
const REF_KEY: &str = "$ref";

fn is_marker_key(name: &str) -> bool {
    name == GUID_KEY || name == TYPE_KEY || name == REF_KEY
}

/// Parse a JSON object into a fresh document.
///
/// # Errors
///
/// Returns `Error::JsonParse` if the JSON is invalid,
/// `Error::UnexpectedType` if the top level is not an object,
/// `Error::InvalidFieldName` for a key named `__guid` or `__type`, and
/// `Error::MalformedMarker` if a `$guid`, `$type` or `$ref` key does not hold
/// a string, `$ref` has sibling keys, or `$type` appears without `$guid`.
pub fn from_json(json: &str) -> Result<Document> {
    let value: JsonValue = serde_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))?;
    let JsonValue::Object(fields) = &value else {
        return Err(Error::UnexpectedType {
            expected: "object",
            found: json_kind(&value),
        });
    };

    let mut doc = Document::new();
    let root = doc.root();
    let mut builder = Builder { doc: &mut doc };
    for (name, item) in fields {
        builder.build(root, Some(name), item)?;
    }
    doc.report_undefined_objects();
    Ok(doc)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn marker_str<'v>(value: &'v JsonValue, key: &str) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::MalformedMarker(format!("{key} holds a {}", json_kind(value))))
}

struct Builder<'d> {
    doc: &'d mut Document,
}

impl Builder<'_> {
    /// Build `value` as field `name` of `container`, or as the next
    /// element when `name` is `None`.
    fn build(&mut self, container: NodeId, name: Option<&str>, value: &JsonValue) -> Result<()> {
        match value {
            JsonValue::Null => self.place(container, name, NodeKind::Null).map(drop),
            JsonValue::Bool(b) => self.place(container, name, NodeKind::Bool(*b)).map(drop),
            JsonValue::Number(n) => {
                let kind = if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(NodeKind::Int64(i), NodeKind::Int32)
                } else {
                    NodeKind::Number(n.as_f64().unwrap_or(0.0))
                };
                self.place(container, name, kind).map(drop)
            }
            JsonValue::String(s) => {
                if let Some(b64_payload) = s.strip_prefix("b64:")
                    && let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(b64_payload)
                {
                    return self.place(container, name, NodeKind::Buffer(bytes)).map(drop);
                }
                self.place(container, name, NodeKind::String(s.clone())).map(drop)
            }
            JsonValue::Array(items) => {
                let child = self.place(container, name, NodeKind::Array(ArrayNode::default()))?;
                for item in items {
                    self.build(child, None, item)?;
                }
                Ok(())
            }
            JsonValue::Object(fields) => {
                if let Some(id) = fields.get(REF_KEY) {
                    if fields.len() > 1 {
                        return Err(Error::MalformedMarker(format!("{REF_KEY} has sibling keys")));
                    }
                    let identifier = marker_str(id, REF_KEY)?;
                    let (kind, _) = self.reference(identifier, None, false);
                    return self.place(container, name, kind).map(drop);
                }
                if let Some(id) = fields.get(GUID_KEY) {
                    let identifier = marker_str(id, GUID_KEY)?;
                    let type_tag = fields.get(TYPE_KEY).map(|t| marker_str(t, TYPE_KEY)).transpose()?;
                    let already_defined = self.doc.is_defined(identifier);
                    let (kind, target) = self.reference(identifier, type_tag, true);
                    self.place(container, name, kind)?;
                    if already_defined {
                        tracing::debug!(identifier, "ignoring duplicate shared-object definition");
                        return Ok(());
                    }
                    self.doc.mark_defined(identifier);
                    for (field, item) in fields {
                        if field != GUID_KEY && field != TYPE_KEY {
                            self.build(target, Some(field), item)?;
                        }
                    }
                    return Ok(());
                }
                if fields.contains_key(TYPE_KEY) {
                    return Err(Error::MalformedMarker(format!("{TYPE_KEY} without {GUID_KEY}")));
                }
                let child = self.place(container, name, NodeKind::Object(Default::default()))?;
                for (field, item) in fields {
                    self.build(child, Some(field), item)?;
                }
                Ok(())
            }
        }
    }

    /// Reference kind for `identifier` plus the canonical object it targets.
    fn reference(
        &mut self,
        identifier: &str,
        type_tag: Option<&str>,
        defined: bool,
    ) -> (NodeKind, NodeId) {
        let (target, _) = self.doc.intern_object(identifier, type_tag, defined);
        let tag = self.doc.object_type(identifier).map(str::to_owned);
        let kind = NodeKind::Reference(ReferenceNode::new(identifier.to_owned(), tag, target));
        (kind, target)
    }

    fn place(&mut self, container: NodeId, name: Option<&str>, kind: NodeKind) -> Result<NodeId> {
        if let Some(name) = name
            && is_reserved_field(name)
        {
            return Err(Error::InvalidFieldName(name.to_owned()));
        }
        let placed = match name {
            Some(name) => self.doc.insert_field(container, name, kind),
            None => self.doc.push_element(container, kind).map(|(_, id)| id),
        };
        placed.ok_or_else(|| Error::UnexpectedType {
            expected: if name.is_some() { "object" } else { "array" },
            found: self.doc.node(container).map_or("released", Node::kind_name),
        })
    }
}

/// Convert a document to a JSON string, starting at the root.
///
/// # Errors
///
/// Returns `Error::NonFiniteFloat` if a number is NaN or infinite,
/// `Error::InvalidFieldName` if an object has a field named `$guid`, `$type`
/// or `$ref`, and `Error::JsonSerialize` if serialization fails.
pub fn to_json(doc: &Document) -> Result<String> {
    let mut emitted = HashSet::new();
    let json_value = node_to_json(doc, doc.root(), &mut emitted)?;
    serde_json::to_string(&json_value).map_err(|e| Error::JsonSerialize(e.to_string()))
}

// --- to_json helpers ---

fn node_to_json(doc: &Document, id: NodeId, emitted: &mut HashSet<NodeId>) -> Result<JsonValue> {
    let Some(node) = doc.node(id) else {
        return Ok(JsonValue::Null);
    };
    match node.kind() {
        NodeKind::Null => Ok(JsonValue::Null),

        NodeKind::Bool(b) => Ok(JsonValue::Bool(*b)),

        NodeKind::Int32(n) => Ok(JsonValue::Number((*n).into())),

        NodeKind::Int64(n) => Ok(JsonValue::Number((*n).into())),

        NodeKind::Number(f) => {
            let num = serde_json::Number::from_f64(*f).ok_or(Error::NonFiniteFloat(*f))?;
            Ok(JsonValue::Number(num))
        }

        NodeKind::String(s) => Ok(JsonValue::String(s.clone())),

        NodeKind::Buffer(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            Ok(JsonValue::String(format!("b64:{encoded}")))
        }

        NodeKind::Array(arr) => {
            let items = arr
                .iter()
                .map(|child| node_to_json(doc, child, emitted))
                .collect::<Result<Vec<_>>>()?;
            Ok(JsonValue::Array(items))
        }

        NodeKind::Object(obj) => {
            let mut map = serde_json::Map::new();
            fields_to_json(doc, obj, &mut map, emitted)?;
            Ok(JsonValue::Object(map))
        }

        NodeKind::Reference(r) => reference_to_json(doc, r, emitted),
    }
}

fn reference_to_json(
    doc: &Document,
    r: &ReferenceNode,
    emitted: &mut HashSet<NodeId>,
) -> Result<JsonValue> {
    let mut map = serde_json::Map::new();
    if !emitted.insert(r.target()) {
        map.insert(REF_KEY.to_owned(), JsonValue::String(r.identifier().to_owned()));
        return Ok(JsonValue::Object(map));
    }
    map.insert(GUID_KEY.to_owned(), JsonValue::String(r.identifier().to_owned()));
    if let Some(tag) = doc.object_type(r.identifier()).or(r.type_tag()) {
        map.insert(TYPE_KEY.to_owned(), JsonValue::String(tag.to_owned()));
    }
    if let Some(content) = doc.node(r.target()).and_then(Node::as_object) {
        fields_to_json(doc, content, &mut map, emitted)?;
    }
    Ok(JsonValue::Object(map))
}

fn fields_to_json(
    doc: &Document,
    obj: &ObjectNode,
    map: &mut serde_json::Map<String, JsonValue>,
    emitted: &mut HashSet<NodeId>,
) -> Result<()> {
    for (name, child) in obj.iter() {
        if is_marker_key(name) {
            return Err(Error::InvalidFieldName(name.to_owned()));
        }
        map.insert(name.to_owned(), node_to_json(doc, child, emitted)?);
    }
    Ok(())
}
