//! Error types for zonenotes-core

use thiserror::Error;

/// Result type alias using zonenotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a refresh. The previous snapshot is kept when one occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// Network, HTTP, or response envelope failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The change feed kept reporting `moreComing` past the page ceiling
    #[error("Change feed did not finish within {pages} pages")]
    PaginationLimitExceeded { pages: usize },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Refresh was cancelled before it completed
    #[error("Refresh cancelled")]
    Cancelled,
}

/// Failures talking to the remote record store.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response envelope: {0}")]
    Envelope(String),
}

impl TransportError {
    pub fn envelope(message: impl Into<String>) -> Self {
        Self::Envelope(message.into())
    }
}

/// Per-record decoding failures. The offending note is dropped from the
/// snapshot; the refresh itself still succeeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Field '{field}' could not be decoded: {reason}")]
    Field { field: String, reason: String },

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Malformed versioned document: {0}")]
    MalformedDocument(String),

    #[error("Versioned document has no versions")]
    EmptyVersion,

    #[error("Malformed note text: {0}")]
    MalformedText(String),

    /// The lookup answered this record with a server error instead of a record
    #[error("Lookup failed with {code}: {reason}")]
    Lookup { code: String, reason: String },

    /// A lookup entry that does not have the shape of a record
    #[error("Malformed lookup entry: {0}")]
    MalformedRecord(String),
}

impl DecodeError {
    pub fn field(field: &str, reason: impl Into<String>) -> Self {
        Self::Field {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
