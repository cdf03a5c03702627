//! Async MIME tree flattening.
//!
//! Decodes a MIME entity (RFC 2045, RFC 2046) into the ordered list of its
//! leaf parts, each with its own header fields and transfer-decoded body.
//!
//! The crate provides:
//! - the flattener itself ([`Flattener`], [`flatten`])
//! - media type parsing and formatting (RFC 2045, RFC 2231)
//! - a multipart reader (RFC 2046)
//! - quoted-printable and base64 decoding readers
//!
//! All I/O operations are async-first using tokio.

pub mod base64;
pub mod error;
pub mod flattener;
pub mod grammar;
pub mod header;
pub mod media_type;
pub mod multipart;
pub mod quotedprintable;

// Re-export commonly used types
pub use error::{Error, Result};
pub use flattener::{flatten, Flattener, LeafPart, DEFAULT_CONTENT_TYPE};
pub use header::Header;
pub use media_type::{format_media_type, parse_media_type};
