//! Incremental reader splitting a byte stream into whole JSON documents.

use std::io;

use bytes::{Bytes, BytesMut};
use serde::de::IgnoredAny;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::TransportError;

/// Bytes requested from the inner reader per refill.
const READ_CHUNK: usize = 4096;

/// Reads consecutive JSON documents from an `AsyncRead`.
///
/// Documents may be split across reads or packed several per read; whitespace
/// between them is skipped. A top-level number at the very end of the
/// buffered bytes is taken as complete.
///
/// Objects, arrays and strings are framed by a resumable byte scan, so each
/// buffered byte is looked at once no matter how many refills a document
/// takes. Only the framed document is then validated by `serde_json`.
pub struct JsonDocumentReader<R> {
    inner: R,
    buf: BytesMut,
    eof: bool,
    framer: Framer,
}

#[derive(Debug)]
enum Scan {
    /// A complete document ends at this offset.
    Complete(usize),
    /// Only whitespace is buffered.
    Blank,
    /// A document has started but is not complete yet.
    Partial,
}

/// Scan position inside the current document.
#[derive(Debug, Default)]
struct Framer {
    /// Next unscanned byte.
    pos: usize,
    /// Whether a container or string document has started.
    started: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

enum Step {
    Blank,
    Partial,
    End(usize),
    Scalar,
}

impl Framer {
    fn advance(&mut self, buf: &[u8]) -> Step {
        while let Some(&b) = buf.get(self.pos) {
            self.pos += 1;
            if !self.started {
                match b {
                    b if b.is_ascii_whitespace() => {}
                    b'{' | b'[' => {
                        self.started = true;
                        self.depth = 1;
                    }
                    b'"' => {
                        self.started = true;
                        self.in_string = true;
                    }
                    _ => return Step::Scalar,
                }
                continue;
            }
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return Step::End(self.pos);
                    }
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Step::End(self.pos);
                    }
                }
                _ => {}
            }
        }
        if self.started { Step::Partial } else { Step::Blank }
    }
}

impl<R: AsyncRead + Unpin> JsonDocumentReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
            framer: Framer::default(),
        }
    }

    /// Next complete document, without surrounding whitespace.
    ///
    /// Returns `Ok(None)` on a clean end of stream between documents. End of
    /// stream inside a document is an `UnexpectedEof` I/O error, and invalid
    /// JSON is [`TransportError::Decode`].
    pub async fn next_document(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.scan()? {
                Scan::Complete(end) => {
                    let doc = self.buf.split_to(end).freeze();
                    let start = doc
                        .iter()
                        .position(|b| !b.is_ascii_whitespace())
                        .unwrap_or(doc.len());
                    return Ok(Some(doc.slice(start..)));
                }
                Scan::Blank => {
                    self.buf.clear();
                    self.framer = Framer::default();
                }
                Scan::Partial => {}
            }

            if self.eof {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(self.truncated())
                };
            }

            self.buf.reserve(READ_CHUNK);
            if self.inner.read_buf(&mut self.buf).await? == 0 {
                self.eof = true;
            }
        }
    }

    fn scan(&mut self) -> Result<Scan, TransportError> {
        match self.framer.advance(&self.buf) {
            Step::Blank => Ok(Scan::Blank),
            Step::Partial => Ok(Scan::Partial),
            Step::End(end) => {
                self.framer = Framer::default();
                let _: IgnoredAny = serde_json::from_slice(&self.buf[..end])?;
                Ok(Scan::Complete(end))
            }
            // Top-level numbers and literals are short; let serde find their end.
            Step::Scalar => {
                self.framer = Framer::default();
                parse_leading(&self.buf)
            }
        }
    }

    /// Error for a stream that ended inside a document.
    fn truncated(&self) -> TransportError {
        match parse_leading(&self.buf) {
            Err(err) => err,
            Ok(_) => TransportError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside a JSON document",
            )),
        }
    }
}

fn parse_leading(buf: &[u8]) -> Result<Scan, TransportError> {
    let mut stream = serde_json::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
    match stream.next() {
        None => Ok(Scan::Blank),
        Some(Ok(_)) => Ok(Scan::Complete(stream.byte_offset())),
        Some(Err(e)) if e.is_eof() => Ok(Scan::Partial),
        Some(Err(e)) => Err(TransportError::Decode(e)),
    }
}
