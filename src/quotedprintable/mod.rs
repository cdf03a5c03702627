//! Quoted-printable decoding (RFC 2045 section 6.7).

pub mod reader;

pub use reader::Reader;
