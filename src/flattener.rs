//! Flattening of a MIME entity tree into its leaf parts.
//!
//! A multipart entity is replaced by its sub-entities, in document order, until
//! only leaves remain. Each leaf has its transfer encoding removed and its body
//! buffered in memory.

use crate::base64;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::media_type::parse_media_type;
use crate::multipart::{self, reader::read_mime_header};
use crate::quotedprintable;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::debug;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
pub const MULTIPART: &str = "multipart/";
pub const BOUNDARY: &str = "boundary";
pub const QUOTED_PRINTABLE: &str = "quoted-printable";
pub const BASE_64: &str = "base64";

/// Content type assumed for an entity without a `Content-Type` field.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=us-ascii";

type BoxReader<'a> = Box<dyn AsyncRead + Send + Unpin + 'a>;

/// A non-multipart entity with its decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPart {
    /// The entity's own header fields, with `Content-Type` always present.
    pub header: Header,
    /// The body with its transfer encoding removed.
    pub body: Bytes,
}

/// Flattens MIME entities into [`LeafPart`]s.
///
/// # Examples
///
/// ```
/// use tokio_mime_flatten::{Flattener, Header};
///
/// let mut header = Header::new();
/// header.set("Content-Type", "multipart/mixed; boundary=X");
/// let body = b"--X\r\n\r\nhello\r\n\
///     --X\r\nContent-Transfer-Encoding: base64\r\n\r\nd29ybGQ=\r\n\
///     --X--\r\n";
///
/// let parts = Flattener::new().flatten_blocking(&header, &body[..]).unwrap();
/// assert_eq!(parts.len(), 2);
/// assert_eq!(parts[0].body, "hello");
/// assert_eq!(parts[1].body, "world");
/// ```
#[derive(Debug, Clone)]
pub struct Flattener {
    max_depth: Option<usize>,
    max_part_size: Option<usize>,
    default_content_type: String,
}

impl Default for Flattener {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_part_size: None,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl Flattener {
    /// Creates a flattener with unbounded nesting depth and part size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds how many multipart levels may be nested below the top-level
    /// entity. Deeper input fails with [`Error::DepthLimitExceeded`].
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Bounds the size of a buffered multipart sub-entity. Larger
    /// sub-entities fail with [`Error::MessageTooLarge`].
    pub fn max_part_size(mut self, size: usize) -> Self {
        self.max_part_size = Some(size);
        self
    }

    /// Overrides the content type assumed when an entity has none.
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    /// Flattens the entity made of `header` and `body` into its leaf parts, in
    /// document order.
    ///
    /// `header` is not modified; leaves carry their own copy, with the default
    /// content type filled in when missing. Any failure at any depth fails the
    /// whole call.
    pub async fn flatten<'a, R>(&self, header: &Header, body: R) -> Result<Vec<LeafPart>>
    where
        R: AsyncRead + Send + Unpin + 'a,
    {
        let (header, media_type, params) = self.content_type(header.clone())?;
        if !is_multipart(&media_type) {
            return Ok(vec![self.leaf(header, &media_type, Box::new(body)).await?]);
        }

        let mut parts = Vec::new();
        let mut stack: Vec<multipart::Reader<BoxReader<'a>>> =
            vec![self.open(Box::new(body), &params)?];
        debug!(%media_type, "descending into multipart entity");

        while let Some(reader) = stack.last_mut() {
            let next = reader.next_part().await?;
            let Some(mut part) = next else {
                stack.pop();
                continue;
            };

            let (header, media_type, params) =
                self.content_type(std::mem::take(&mut part.header))?;
            if is_multipart(&media_type) {
                if let Some(max) = self.max_depth {
                    if stack.len() > max {
                        return Err(Error::DepthLimitExceeded(max));
                    }
                }
                debug!(%media_type, depth = stack.len(), "descending into multipart entity");
                let nested = self.open(Box::new(part), &params)?;
                stack.push(nested);
            } else {
                parts.push(self.leaf(header, &media_type, Box::new(part)).await?);
            }
        }

        Ok(parts)
    }

    /// Reads the entity's header block from `message` and flattens the rest.
    pub async fn flatten_message<R>(&self, message: R) -> Result<Vec<LeafPart>>
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut reader = BufReader::new(message);
        let header = read_mime_header(&mut reader).await?;
        self.flatten(&header, reader).await
    }

    /// Runs [`Flattener::flatten`] to completion on a private current-thread
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async runtime.
    pub fn flatten_blocking<R>(&self, header: &Header, body: R) -> Result<Vec<LeafPart>>
    where
        R: AsyncRead + Send + Unpin,
    {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(self.flatten(header, body))
    }

    /// Fills in the default content type and parses it.
    fn content_type(
        &self,
        mut header: Header,
    ) -> Result<(Header, String, HashMap<String, String>)> {
        if !header.contains(CONTENT_TYPE) {
            header.set(CONTENT_TYPE, self.default_content_type.as_str());
        }
        let value = header.get(CONTENT_TYPE).unwrap_or_default();
        let (media_type, params) = parse_media_type(value)?;
        Ok((header, media_type, params))
    }

    fn open<'a>(
        &self,
        body: BoxReader<'a>,
        params: &HashMap<String, String>,
    ) -> Result<multipart::Reader<BoxReader<'a>>> {
        let boundary = params.get(BOUNDARY).ok_or(Error::MissingBoundary)?;
        let mut reader = multipart::Reader::new(body, boundary);
        if let Some(max) = self.max_part_size {
            reader.set_max_part_size(max);
        }
        Ok(reader)
    }

    async fn leaf(
        &self,
        header: Header,
        media_type: &str,
        body: BoxReader<'_>,
    ) -> Result<LeafPart> {
        let mut decoded = Vec::new();
        transfer_decoder(&header, body).read_to_end(&mut decoded).await?;
        debug!(
            media_type,
            encoding = header.get(CONTENT_TRANSFER_ENCODING).unwrap_or("7bit"),
            size = decoded.len(),
            "decoded leaf part"
        );
        Ok(LeafPart {
            header,
            body: Bytes::from(decoded),
        })
    }
}

/// Flattens an entity with the default [`Flattener`].
pub async fn flatten<R>(header: &Header, body: R) -> Result<Vec<LeafPart>>
where
    R: AsyncRead + Send + Unpin,
{
    Flattener::default().flatten(header, body).await
}

fn is_multipart(media_type: &str) -> bool {
    media_type.starts_with(MULTIPART)
}

/// Wraps `body` in the decoder named by the entity's transfer encoding.
///
/// Matching is exact; unknown or absent encodings pass through unchanged.
fn transfer_decoder<'a>(header: &Header, body: BoxReader<'a>) -> BoxReader<'a> {
    match header.get(CONTENT_TRANSFER_ENCODING) {
        Some(QUOTED_PRINTABLE) => Box::new(quotedprintable::Reader::new(body)),
        Some(BASE_64) => Box::new(base64::Reader::new(body)),
        _ => body,
    }
}
