use thiserror::Error;

/// Errors surfaced while navigating an encoded buffer.
///
/// Every failure is recoverable: readers never panic and never read out of
/// bounds, they return one of these variants instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("parsing error at byte offset {byte_offset}: {message}")]
    ParsingError { byte_offset: usize, message: String },

    #[error("missing required field \"{field_name}\"")]
    MissingField { field_name: String },

    #[error("utf8 decoding error: {message}")]
    Utf8DecodingError { message: String, byte: Option<u8> },

    #[error("vector index out of bounds: length is {length}, index is {index}")]
    VectorIndexOutOfBounds { length: u32, index: u32 },

    #[error("unknown value {value} for enum \"{name}\"")]
    EnumUnknown { name: String, value: i128 },

    #[error("unknown type tag {tag} for union \"{name}\"")]
    UnionUnknown { name: String, tag: u8 },
}

impl ReadError {
    pub(crate) fn parsing(byte_offset: usize, message: impl Into<String>) -> ReadError {
        ReadError::ParsingError {
            byte_offset,
            message: message.into(),
        }
    }
}
