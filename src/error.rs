//! Error types for map encoding and decoding.
//!
//! Lookups never fail: absence is reported through `Option` or `bool`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Payload is not a valid mapping of the expected key/value shapes.
    #[error("format error: {0}")]
    Format(String),

    /// The codec cannot represent the map's entries.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Result type for map codec operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error came from decoding a malformed payload.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }
}
