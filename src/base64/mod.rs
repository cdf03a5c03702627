//! Base64 transfer-encoding decoding (RFC 2045 section 6.8).

pub mod reader;

pub use reader::Reader;
