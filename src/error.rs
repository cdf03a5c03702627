//! Error types for the flattener and its primitives.

use std::io;
use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error, including decoding failures surfaced by the transfer-encoding readers
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed content type
    #[error("Media type error: {0}")]
    MediaType(String),

    /// A multipart content type without a boundary parameter
    #[error("Multipart content type has no boundary parameter")]
    MissingBoundary,

    /// Malformed multipart framing or part header
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// Nesting deeper than the configured bound
    #[error("Multipart nesting exceeds depth limit of {0}")]
    DepthLimitExceeded(usize),

    /// Message too large
    #[error("Message too large")]
    MessageTooLarge,
}

/// Specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error indicating an invalid media parameter (used in media type parsing).
#[derive(Error, Debug)]
#[error("Invalid media parameter")]
pub struct InvalidMediaParameter;

impl From<InvalidMediaParameter> for Error {
    fn from(_: InvalidMediaParameter) -> Self {
        Error::MediaType("invalid media parameter".to_string())
    }
}
