//! Quoted-printable reader.
//!
//! Implements RFC 2045 quoted-printable decoding with async I/O.

use pin_project::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncBufRead, AsyncRead, BufReader, ReadBuf};

/// A quoted-printable decoder.
///
/// Implements `AsyncRead` to decode quoted-printable data line by line as it
/// is requested.
#[pin_project]
pub struct Reader<R> {
    #[pin]
    inner: BufReader<R>,
    /// Raw bytes of the line being assembled; survives `Pending`.
    raw: Vec<u8>,
    decoded: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<R: AsyncRead> Reader<R> {
    /// Creates a new quoted-printable reader.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio_mime_flatten::quotedprintable::Reader;
    /// use tokio::io::AsyncReadExt;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> std::io::Result<()> {
    /// let mut reader = Reader::new(&b"Hello=20World"[..]);
    /// let mut output = String::new();
    /// reader.read_to_string(&mut output).await?;
    /// assert_eq!(output, "Hello World");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            raw: Vec::new(),
            decoded: Vec::new(),
            pos: 0,
            eof: false,
        }
    }
}

impl<R: AsyncRead> AsyncRead for Reader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut this = self.project();

        loop {
            if *this.pos < this.decoded.len() {
                let n = (this.decoded.len() - *this.pos).min(buf.remaining());
                buf.put_slice(&this.decoded[*this.pos..*this.pos + n]);
                *this.pos += n;
                return Poll::Ready(Ok(()));
            }
            if *this.eof {
                return Poll::Ready(Ok(()));
            }

            // Assemble the next raw line.
            loop {
                let chunk = ready!(this.inner.as_mut().poll_fill_buf(cx))?;
                if chunk.is_empty() {
                    *this.eof = true;
                    break;
                }
                if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
                    this.raw.extend_from_slice(&chunk[..=pos]);
                    this.inner.as_mut().consume(pos + 1);
                    break;
                }
                let len = chunk.len();
                this.raw.extend_from_slice(chunk);
                this.inner.as_mut().consume(len);
            }

            this.decoded.clear();
            *this.pos = 0;
            if !this.raw.is_empty() {
                *this.decoded = decode_line(this.raw)?;
                this.raw.clear();
            }
        }
    }
}

/// Decodes a single line of quoted-printable data.
fn decode_line(line: &[u8]) -> io::Result<Vec<u8>> {
    let mut result = Vec::with_capacity(line.len());

    let has_lf = line.ends_with(b"\n");
    let has_crlf = line.ends_with(b"\r\n");

    // Trailing whitespace is transport padding.
    let mut trimmed = line;
    while let [rest @ .., b'\n' | b'\r' | b' ' | b'\t'] = trimmed {
        trimmed = rest;
    }

    // Soft line break
    let is_soft_break = trimmed.ends_with(b"=");
    if is_soft_break {
        trimmed = &trimmed[..trimmed.len() - 1];
    }

    let mut i = 0;
    while i < trimmed.len() {
        match trimmed[i] {
            b'=' => {
                // Malformed escapes are kept literally.
                match trimmed
                    .get(i + 1..i + 3)
                    .and_then(|hex| decode_hex_byte(hex[0], hex[1]))
                {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b if b < b' ' && b != b'\t' && b != b'\r' => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("quoted-printable: invalid unescaped byte 0x{b:02x}"),
                ));
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }

    if !is_soft_break && has_lf {
        if has_crlf {
            result.extend_from_slice(b"\r\n");
        } else {
            result.push(b'\n');
        }
    }

    Ok(result)
}

/// Decodes two hex digits into a byte.
fn decode_hex_byte(high: u8, low: u8) -> Option<u8> {
    let h = decode_hex_digit(high)?;
    let l = decode_hex_digit(low)?;
    Some((h << 4) | l)
}

fn decode_hex_digit(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
