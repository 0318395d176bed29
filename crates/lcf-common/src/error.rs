//! Error types for lcf-common.

use thiserror::Error;

/// Common error type for LCF operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("truncated stream: needed {needed} bytes but only {available} available")]
    TruncatedStream { needed: usize, available: usize },

    /// A BER varint grew past 32 bits.
    #[error("BER integer at offset {offset} does not fit in 32 bits")]
    BerOverflow { offset: usize },

    /// Bytes could not be decoded, or text could not be encoded, in the current codepage.
    #[error("{encoding}: {message}")]
    Encoding {
        encoding: &'static str,
        message: String,
    },

    /// The requested codepage label is not known.
    #[error("unknown codepage: {0}")]
    UnknownCodepage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
