//! In-memory document trees with shared-object references, a single
//! cursor, and a binary wire codec.
//!
//! A [`Document`] owns a tree of nodes rooted at an object. Sub-objects that
//! appear in several places are kept once in the document's object store
//! under a string identifier and referenced from each place; the encoder
//! writes such an object in full at its first occurrence and as a bare
//! identifier everywhere else.
//!
//! ```
//! use bsontree::{Document, decode, encode};
//!
//! let mut doc = Document::new();
//! doc.set_reference_object("left", "guid-1", Some("Widget"));
//! doc.set_to("left");
//! doc.set_value("x", 1);
//! doc.set_to_parent();
//! doc.set_reference_object("right", "guid-1", None);
//!
//! let mut back = decode(&encode(&doc).unwrap()).unwrap();
//! assert_eq!(back.object_count(), 1);
//! assert!(back.set_to("right"));
//! assert_eq!(back.get_int_value("x"), 1);
//! ```

mod arena;
mod cursor;
pub mod decode;
mod document;
pub mod element;
pub mod encode;
pub mod error;
pub mod json;
mod node;
mod store;

pub use arena::NodeId;
pub use decode::{DecodeOptions, decode, decode_with_options};
pub use document::Document;
pub use element::new_identifier;
pub use encode::encode;
pub use error::{Error, Result};
pub use json::{from_json, to_json};
pub use node::{ArrayNode, Node, NodeKind, ObjectNode, ReferenceNode, Value};
pub use store::Constructed;
