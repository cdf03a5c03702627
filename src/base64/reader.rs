//! Base64 reader.
//!
//! Decodes the standard, padded alphabet with async I/O. Line breaks are
//! ignored; any other byte outside the alphabet is an error.

use ::base64::alphabet;
use ::base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use ::base64::Engine;
use pin_project::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

const CHUNK_SIZE: usize = 4096;

/// Standard alphabet with required padding. Non-zero bits left over in the
/// final quantum are ignored (`YR==` decodes to `a`), as many encoders emit them.
const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A base64 decoder.
///
/// Implements `AsyncRead`, decoding each complete 4-byte quantum as soon as it
/// has been read from the inner reader.
#[pin_project]
pub struct Reader<R> {
    #[pin]
    inner: R,
    /// Encoded bytes not yet forming a whole quantum.
    pending: Vec<u8>,
    decoded: Vec<u8>,
    pos: usize,
    padded: bool,
    eof: bool,
}

impl<R: AsyncRead> Reader<R> {
    /// Creates a new base64 reader.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio_mime_flatten::base64::Reader;
    /// use tokio::io::AsyncReadExt;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> std::io::Result<()> {
    /// let mut reader = Reader::new(&b"d29y\r\nbGQ="[..]);
    /// let mut output = String::new();
    /// reader.read_to_string(&mut output).await?;
    /// assert_eq!(output, "world");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            decoded: Vec::new(),
            pos: 0,
            padded: false,
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

            let mut raw = [0u8; CHUNK_SIZE];
            let mut raw_buf = ReadBuf::new(&mut raw);
            ready!(this.inner.as_mut().poll_read(cx, &mut raw_buf))?;
            let filled = raw_buf.filled();
            if filled.is_empty() {
                *this.eof = true;
            } else {
                this.pending
                    .extend(filled.iter().copied().filter(|&b| b != b'\r' && b != b'\n'));
            }

            // At EOF the remainder must itself be a whole quantum.
            let take = if *this.eof {
                this.pending.len()
            } else {
                this.pending.len() / 4 * 4
            };
            if take == 0 {
                continue;
            }
            if *this.padded {
                return Poll::Ready(Err(invalid_data("base64: data after padding")));
            }

            let quanta: Vec<u8> = this.pending.drain(..take).collect();
            this.decoded.clear();
            *this.pos = 0;
            ENGINE
                .decode_vec(&quanta, this.decoded)
                .map_err(|e| invalid_data(format!("base64: {e}")))?;
            *this.padded = quanta.last() == Some(&b'=');
        }
    }
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}
