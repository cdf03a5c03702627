//! Multipart MIME parsing.

pub mod reader;

pub use reader::{Part, Reader};
