//! Error types for header operations.
//!
//! Malformed header *content* never surfaces here: undecodable values degrade
//! to their literal text. These variants cover caller contract violations and
//! the strict transfer-codec helpers.

/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Header engine error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header record was supplied under a name other than its own.
    #[error("Header name mismatch: expected {expected}, got {actual}")]
    NameMismatch {
        /// Name the caller asked to replace.
        expected: String,
        /// Name carried by the supplied record.
        actual: String,
    },

    /// Synthesized header with an unusable field name.
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// Invalid transfer encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Charset label not recognized.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),
}
