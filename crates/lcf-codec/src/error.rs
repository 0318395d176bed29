//! Error types for LCF decoding and saving.

use thiserror::Error;

/// Errors that can occur when reading or writing LCF data.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (truncation, BER overflow, encoding).
    #[error("{0}")]
    Common(#[from] lcf_common::Error),

    /// No schema document with this signature or name.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// An embedded schema document is malformed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Accessor requested for a type other than the declared one.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Indices in an Array1d/Array2d are out of order.
    #[error("corrupt ordering at offset {offset}: index {index} follows {previous}")]
    CorruptOrdering { offset: usize, previous: u32, index: u32 },

    /// A chunk's declared length disagrees with what its type consumed.
    #[error("chunk at offset {offset} declares {expected} bytes but {consumed} were consumed")]
    ChunkLength {
        offset: usize,
        expected: usize,
        consumed: usize,
    },

    /// Strict field access found neither data nor a default.
    #[error("missing field: {0}")]
    MissingField(String),

    /// An absent element has no default to fall back on.
    #[error("no value or default for {0}")]
    MissingValue(String),

    /// A value tree entry does not name a schema field.
    #[error("unknown field '{field}' in {schema}")]
    UnknownField { schema: String, field: String },

    /// A value tree entry has the wrong kind for its schema type.
    #[error("invalid value for {field}: expected {expected}, found {actual}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A numeric value does not fit the on-disk width.
    #[error("value {value} out of range for {field}")]
    ValueOutOfRange { field: String, value: i64 },

    /// The size pass and the write pass disagree.
    #[error("size mismatch for {field}: calculated {expected} bytes, wrote {actual}")]
    SizeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Root slot type that cannot be measured by read-ahead.
    #[error("unsupported root type: {0}")]
    UnsupportedRoot(String),
}

/// Result type for LCF operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
