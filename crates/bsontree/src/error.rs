//! Error types for document decoding, encoding and strict reads.

/// Error type for bsontree operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    // Wire errors
    /// Input ended before a complete element could be read.
    #[error("truncated input at offset {offset}")]
    Truncated { offset: usize },
    /// A document's length prefix disagrees with its actual extent.
    #[error("document at offset {offset} declares length {declared}, available {available}")]
    LengthMismatch {
        offset: usize,
        declared: usize,
        available: usize,
    },
    /// A document did not end with the 0x00 terminator.
    #[error("missing document terminator at offset {offset}")]
    MissingTerminator { offset: usize },
    /// Bytes remain after the root document.
    #[error("{0} trailing bytes after root document")]
    TrailingBytes(usize),
    /// A field name or string value contains invalid UTF-8.
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
    /// Element type byte is not part of the wire format.
    #[error("unknown element type {0:#04x}")]
    UnknownElementType(u8),
    /// Nesting exceeded the configured maximum depth.
    #[error("nesting too deep: max {0}")]
    NestingTooDeep(usize),
    /// A shared-object marker field did not carry an identifier payload.
    #[error("malformed shared-object marker: {0}")]
    MalformedMarker(String),

    // Encode errors
    /// Field name has an interior NUL byte or is reserved for shared-object
    /// markers.
    #[error("invalid field name {0:?}")]
    InvalidFieldName(String),
    /// Encoded document exceeds the i32 length prefix.
    #[error("document too large: {0} bytes")]
    DocumentTooLarge(usize),

    // Strict read errors
    /// Field not present in the current object.
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// Array index out of bounds.
    #[error("index {index} out of bounds (length={length})")]
    IndexOutOfBounds { index: usize, length: usize },
    /// Expected one node kind but found another.
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    // JSON errors
    /// Failed to parse JSON input.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
    /// Failed to serialize to JSON.
    #[error("JSON serialize error: {0}")]
    JsonSerialize(String),
    /// f64 is NaN or Infinity (not representable in JSON).
    #[error("cannot encode non-finite float {0} as JSON")]
    NonFiniteFloat(f64),
}

/// Result type alias for bsontree operations.
pub type Result<T> = std::result::Result<T, Error>;
