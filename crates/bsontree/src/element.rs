//! Element type bytes and fixed wire constants.
//!
//! Every element in a document starts with a 1-byte type, followed by a
//! NUL-terminated field name and the type-specific payload. Documents are
//! framed by a little-endian i32 total length and a trailing `0x00`.

use uuid::Uuid;

/// Marker field that turns a nested document into a shared-object definition.
pub const MARKER_FIELD: &str = "__guid";

/// Optional string field next to [`MARKER_FIELD`] carrying the type tag.
pub const TYPE_FIELD: &str = "__type";

/// True for [`MARKER_FIELD`] and [`TYPE_FIELD`]. Neither can be an ordinary
/// field of any object.
#[must_use]
pub fn is_reserved_field(name: &str) -> bool {
    name == MARKER_FIELD || name == TYPE_FIELD
}

/// Binary subtype for opaque buffers.
pub const SUBTYPE_GENERIC: u8 = 0x00;

/// Binary subtype for 128-bit UUID identifiers.
pub const SUBTYPE_UUID: u8 = 0x04;

/// Binary subtype for textual identifiers (user-defined range).
pub const SUBTYPE_TEXT_ID: u8 = 0x80;

/// Smallest well-formed document: length prefix plus terminator.
pub const MIN_DOCUMENT_LEN: usize = 5;

/// Element type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Bool = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Regex = 0x0B,
    DbPointer = 0x0C,
    JavaScript = 0x0D,
    Symbol = 0x0E,
    JavaScriptWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl ElementType {
    /// Parse an element type byte.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => ElementType::Double,
            0x02 => ElementType::String,
            0x03 => ElementType::Document,
            0x04 => ElementType::Array,
            0x05 => ElementType::Binary,
            0x06 => ElementType::Undefined,
            0x07 => ElementType::ObjectId,
            0x08 => ElementType::Bool,
            0x09 => ElementType::DateTime,
            0x0A => ElementType::Null,
            0x0B => ElementType::Regex,
            0x0C => ElementType::DbPointer,
            0x0D => ElementType::JavaScript,
            0x0E => ElementType::Symbol,
            0x0F => ElementType::JavaScriptWithScope,
            0x10 => ElementType::Int32,
            0x11 => ElementType::Timestamp,
            0x12 => ElementType::Int64,
            0x13 => ElementType::Decimal128,
            0x7F => ElementType::MaxKey,
            0xFF => ElementType::MinKey,
            _ => return None,
        })
    }

    /// Get the raw type byte.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Get the type name as a string (for logs and error messages).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::Document => "document",
            ElementType::Array => "array",
            ElementType::Binary => "binary",
            ElementType::Undefined => "undefined",
            ElementType::ObjectId => "objectid",
            ElementType::Bool => "bool",
            ElementType::DateTime => "datetime",
            ElementType::Null => "null",
            ElementType::Regex => "regex",
            ElementType::DbPointer => "dbpointer",
            ElementType::JavaScript => "javascript",
            ElementType::Symbol => "symbol",
            ElementType::JavaScriptWithScope => "javascript_with_scope",
            ElementType::Int32 => "int32",
            ElementType::Timestamp => "timestamp",
            ElementType::Int64 => "int64",
            ElementType::Decimal128 => "decimal128",
            ElementType::MaxKey => "maxkey",
            ElementType::MinKey => "minkey",
        }
    }
}

/// Generate a fresh random identifier for a shared object.
#[must_use]
pub fn new_identifier() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Split an identifier into its binary subtype and payload bytes.
///
/// Canonical hyphenated lowercase UUIDs pack into 16 bytes under
/// [`SUBTYPE_UUID`]; anything else is carried verbatim under
/// [`SUBTYPE_TEXT_ID`].
#[must_use]
pub fn identifier_payload(identifier: &str) -> (u8, Vec<u8>) {
    if let Ok(uuid) = Uuid::try_parse(identifier)
        && uuid.hyphenated().to_string() == identifier
    {
        return (SUBTYPE_UUID, uuid.as_bytes().to_vec());
    }
    (SUBTYPE_TEXT_ID, identifier.as_bytes().to_vec())
}

/// Recover an identifier from a binary payload.
///
/// Returns `None` when the subtype is not an identifier subtype (or a UUID
/// payload has the wrong width) so the caller can treat it as a buffer.
/// Returns `Some(Err(_))` for a textual identifier that is not UTF-8.
#[must_use]
pub fn identifier_from_payload(
    subtype: u8,
    bytes: &[u8],
) -> Option<Result<String, std::str::Utf8Error>> {
    match subtype {
        SUBTYPE_UUID => {
            let uuid = Uuid::from_slice(bytes).ok()?;
            Some(Ok(uuid.hyphenated().to_string()))
        }
        SUBTYPE_TEXT_ID => Some(std::str::from_utf8(bytes).map(str::to_owned)),
        _ => None,
    }
}

/// Read a little-endian i32 at `offset`.
#[inline]
#[must_use]
pub fn read_i32_le(data: &[u8], offset: usize) -> Option<i32> {
    let bytes: [u8; 4] = data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}

/// Read a little-endian i64 at `offset`.
#[inline]
#[must_use]
pub fn read_i64_le(data: &[u8], offset: usize) -> Option<i64> {
    let bytes: [u8; 8] = data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
    Some(i64::from_le_bytes(bytes))
}

/// Read a little-endian u64 at `offset`.
#[inline]
#[must_use]
pub fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// Read a little-endian f64 at `offset`.
#[inline]
#[must_use]
pub fn read_f64_le(data: &[u8], offset: usize) -> Option<f64> {
    let bytes: [u8; 8] = data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
    Some(f64::from_le_bytes(bytes))
}
