use std::io::{self, Read, Write};

use crate::byte_stream::ByteStream;
use crate::error::Error;

/// upper bound on bytes buffered while scanning for a delimiter
const MAX_BUFFER: usize = 4096;

/// Buffered, peekable wrapper of a client connection.
///
/// Reads are served from the internal buffer before the underlying stream,
/// which allows looking ahead without consuming. Writes always go straight to
/// the connection so replies are never delayed behind buffering.
#[derive(Debug)]
pub struct PeekStream<T> {
    inner: T,
    buffer: Vec<u8>,
    pos: usize,
}

impl<T> PeekStream<T>
where
    T: ByteStream,
{
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            pos: 0,
        }
    }

    /// buffered bytes not yet consumed
    fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// pull up to `want` more bytes from the connection into the buffer;
    /// a single read, so a short message never blocks waiting for the rest
    fn fill(&mut self, want: usize) -> Result<usize, Error> {
        if self.pos == self.buffer.len() {
            self.buffer.clear();
            self.pos = 0;
        }
        let old_len = self.buffer.len();
        self.buffer.resize(old_len + want, 0);
        let read = loop {
            match self.inner.read(&mut self.buffer[old_len..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buffer.truncate(old_len);
                    return Err(err.into());
                }
            }
        };
        self.buffer.truncate(old_len + read);
        Ok(read)
    }

    /// Returns the next `n` bytes without consuming them.
    pub fn peek(&mut self, n: usize) -> Result<&[u8], Error> {
        while self.buffered().len() < n {
            let more = n - self.buffered().len();
            if self.fill(more)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("peek {} bytes", n),
                )
                .into());
            }
        }
        Ok(&self.buffered()[..n])
    }

    /// Consumes and returns bytes up to and including `delim`.
    pub fn read_slice(&mut self, delim: u8) -> Result<Vec<u8>, Error> {
        let mut scanned = 0;
        loop {
            if let Some(at) = self.buffered()[scanned..].iter().position(|b| *b == delim) {
                let end = scanned + at + 1;
                let slice = self.buffered()[..end].to_vec();
                self.pos += end;
                return Ok(slice);
            }
            scanned = self.buffered().len();
            if scanned >= MAX_BUFFER {
                return Err(Error::message_fmt(format_args!(
                    "delimiter {:#04x} not found in {} bytes",
                    delim, scanned
                )));
            }
            if self.fill(32)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("read_slice({:#04x})", delim),
                )
                .into());
            }
        }
    }
}

impl<T: ByteStream> Read for PeekStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let buffered = self.buffered();
        if !buffered.is_empty() {
            let len = buffered.len().min(buf.len());
            buf[..len].copy_from_slice(&buffered[..len]);
            self.pos += len;
            return Ok(len);
        }
        self.inner.read(buf)
    }
}

impl<T: ByteStream> Write for PeekStream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<T: ByteStream> ByteStream for PeekStream<T> {
    #[allow(clippy::type_complexity)]
    fn split(&self) -> Result<(Box<dyn Read + Send>, Box<dyn Write + Send>), Error> {
        let (rd, wr) = self.inner.split()?;
        // bytes already pulled off the wire belong to the read half
        let buffered = io::Cursor::new(self.buffered().to_vec());
        Ok((Box::new(buffered.chain(rd)), wr))
    }

    fn shutdown(&self) -> io::Result<()> {
        self.inner.shutdown()
    }
}
