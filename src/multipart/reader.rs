//! Multipart MIME reader.
//!
//! Implements RFC 2046 multipart parsing with async I/O.

use crate::error::{Error, Result};
use crate::grammar::{is_token, skip_lwsp};
use crate::header::Header;
use pin_project::pin_project;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, ReadBuf};
use tracing::trace;

const PEEK_BUFFER_SIZE: usize = 4096;
const MAX_MIME_HEADER_SIZE: usize = 10 << 20; // 10 MB
const MAX_MIME_HEADERS: usize = 10000;

/// A multipart MIME reader.
///
/// Each call to [`Reader::next_part`] buffers the whole sub-entity, so a
/// returned [`Part`] does not borrow the reader.
pub struct Reader<R> {
    buf_reader: BufReader<R>,
    nl: Vec<u8>,                 // "\r\n" or "\n"
    dash_boundary_dash: Vec<u8>, // "--boundary--"
    dash_boundary: Vec<u8>,      // "--boundary"
    /// Delimiter line consumed while scanning the previous part body.
    peeked: Option<Vec<u8>>,
    parts_read: usize,
    max_part_size: Option<usize>,
    done: bool,
}

impl<R: AsyncRead + Unpin> Reader<R> {
    /// Creates a new multipart reader with the given boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio_mime_flatten::multipart::Reader;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> tokio_mime_flatten::Result<()> {
    /// let data = b"--b\r\nContent-Type: text/plain\r\n\r\nhi\r\n--b--\r\n";
    /// let mut reader = Reader::new(&data[..], "b");
    /// let part = reader.next_part().await?.unwrap();
    /// assert_eq!(part.header.get("content-type"), Some("text/plain"));
    /// assert_eq!(part.body(), b"hi");
    /// assert!(reader.next_part().await?.is_none());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(r: R, boundary: &str) -> Self {
        let b = format!("--{}--", boundary).into_bytes();
        let dash_boundary = b[..b.len() - 2].to_vec();

        Self {
            buf_reader: BufReader::with_capacity(PEEK_BUFFER_SIZE, r),
            nl: b"\r\n".to_vec(),
            dash_boundary_dash: b,
            dash_boundary,
            peeked: None,
            parts_read: 0,
            max_part_size: None,
            done: false,
        }
    }

    /// Bounds the part body the reader will buffer. Bodies are unbounded
    /// unless set; a larger body fails with [`Error::MessageTooLarge`].
    pub fn set_max_part_size(&mut self, max: usize) {
        self.max_part_size = Some(max);
    }

    /// Returns the next part in the multipart body.
    ///
    /// Returns `None` once the close delimiter has been read. Reaching the end
    /// of the input before the close delimiter is an `UnexpectedEof` error.
    pub async fn next_part(&mut self) -> Result<Option<Part>> {
        if self.dash_boundary.len() == 2 {
            return Err(Error::Multipart("boundary is empty".to_string()));
        }
        if self.done {
            return Ok(None);
        }

        let mut expect_new_part = false;

        loop {
            let line = match self.peeked.take() {
                Some(line) => line,
                None => {
                    let mut line = Vec::new();
                    self.buf_reader.read_until(b'\n', &mut line).await?;
                    line
                }
            };

            if line.is_empty() {
                return Err(unexpected_eof("multipart: EOF before close delimiter"));
            }

            if self.is_boundary_delimiter_line(&line) {
                self.parts_read += 1;
                let header = read_mime_header(&mut self.buf_reader).await?;
                let body = self.read_part_data().await?;
                trace!(part = self.parts_read, size = body.len(), "read multipart part");
                return Ok(Some(Part::new(header, body)));
            }

            if self.is_final_boundary(&line) {
                self.done = true;
                return Ok(None);
            }

            if expect_new_part {
                return Err(Error::Multipart(format!(
                    "expecting a new Part; got line {:?}",
                    String::from_utf8_lossy(&line)
                )));
            }

            if self.parts_read == 0 {
                trace!(len = line.len(), "skipping multipart preamble line");
                continue;
            }

            if line == self.nl {
                expect_new_part = true;
                continue;
            }

            return Err(Error::Multipart(format!(
                "unexpected line in next_part: {:?}",
                String::from_utf8_lossy(&line)
            )));
        }
    }

    fn is_final_boundary(&self, line: &[u8]) -> bool {
        if !line.starts_with(&self.dash_boundary_dash) {
            return false;
        }
        let rest = skip_lwsp(&line[self.dash_boundary_dash.len()..]);
        rest.is_empty() || rest == self.nl
    }

    fn is_boundary_delimiter_line(&mut self, line: &[u8]) -> bool {
        if !line.starts_with(&self.dash_boundary) {
            return false;
        }
        let rest = skip_lwsp(&line[self.dash_boundary.len()..]);

        // On the first part, check if lines end in \n instead of \r\n
        if self.parts_read == 0 && rest == b"\n" {
            self.nl = b"\n".to_vec();
        }

        rest == self.nl
    }

    /// Reports whether a line inside a part body starts the next delimiter.
    fn is_delimiter(&self, line: &[u8]) -> bool {
        let Some(rest) = line.strip_prefix(self.dash_boundary.as_slice()) else {
            return false;
        };
        let rest = rest.strip_prefix(b"--").unwrap_or(rest);
        let rest = skip_lwsp(rest);
        rest.is_empty() || rest == b"\n" || rest == b"\r\n"
    }

    /// Reads the part body up to the next delimiter line.
    ///
    /// The line break before the delimiter belongs to the delimiter and is not
    /// part of the body. The delimiter line itself is kept for `next_part`.
    async fn read_part_data(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();

        loop {
            let mut line = Vec::new();
            if self.buf_reader.read_until(b'\n', &mut line).await? == 0 {
                return Err(unexpected_eof("multipart: EOF inside part body"));
            }

            if self.is_delimiter(&line) {
                if data.ends_with(&self.nl) {
                    data.truncate(data.len() - self.nl.len());
                }
                self.peeked = Some(line);
                return Ok(data);
            }

            data.extend_from_slice(&line);
            if self.max_part_size.is_some_and(|max| data.len() > max) {
                return Err(Error::MessageTooLarge);
            }
        }
    }
}

fn unexpected_eof(msg: &str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, msg.to_string()))
}

/// A single part in a multipart body.
#[pin_project]
pub struct Part {
    /// The MIME headers of this part.
    pub header: Header,

    #[pin]
    body: Cursor<Vec<u8>>,
}

impl Part {
    fn new(header: Header, body: Vec<u8>) -> Self {
        Self {
            header,
            body: Cursor::new(body),
        }
    }

    /// The raw (still transfer-encoded) body of this part.
    pub fn body(&self) -> &[u8] {
        self.body.get_ref()
    }
}

impl AsyncRead for Part {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().body.poll_read(cx, buf)
    }
}

/// Reads a MIME header block, up to and including the blank line ending it.
///
/// Folded lines are joined to the previous field with a single space. End of
/// input also ends the block.
///
/// Header values are stored as `String`, so bytes that are not valid UTF-8
/// (raw Latin-1 filenames, for instance) are replaced with U+FFFD. Part
/// bodies are never altered.
pub(crate) async fn read_mime_header<R>(reader: &mut R) -> Result<Header>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Header::new();
    let mut last_key: Option<String> = None;
    let mut total_size = 0;
    let mut header_count = 0;

    loop {
        let mut raw = Vec::new();
        total_size += reader.read_until(b'\n', &mut raw).await?;
        if total_size > MAX_MIME_HEADER_SIZE {
            return Err(Error::MessageTooLarge);
        }

        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            match &last_key {
                Some(key) => {
                    header.append_to_last(key, line.trim());
                }
                None => {
                    return Err(Error::Multipart(format!(
                        "malformed MIME header initial line: {:?}",
                        line
                    )))
                }
            }
            continue;
        }

        header_count += 1;
        if header_count > MAX_MIME_HEADERS {
            return Err(Error::MessageTooLarge);
        }

        let (key, value) = parse_header_line(line).ok_or_else(|| {
            Error::Multipart(format!("malformed MIME header line: {:?}", line))
        })?;
        header.add(key, value);
        last_key = Some(key.to_string());
    }

    Ok(header)
}

/// Splits a header line into name and trimmed value.
fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if !is_token(key) {
        return None;
    }
    Some((key, value.trim()))
}
