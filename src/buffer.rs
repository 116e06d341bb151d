//! Buffering of the trace byte stream, and the sources it may be
//! pulled from.

use std::io::{self, Read};

/// What a [`ByteSource`] produced when asked for more bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pulled {
    /// New bytes from the stream.
    Data(Vec<u8>),

    /// Nothing is available right now; more may be later.
    Pending,

    /// The stream has ended and will not produce more bytes.
    Exhausted,
}

/// A pull-style producer of trace bytes.
///
/// Whether [`pull`](Self::pull) blocks is up to the implementor: the
/// decoder calls it at most once per decode step and never retries on
/// [`Pulled::Pending`].
///
/// Any `FnMut() -> io::Result<Pulled>` closure is a `ByteSource`:
/// ```
/// use itm_swo::{Decoder, DecoderOptions, Pulled, TracePacket};
/// use std::io;
///
/// let mut chunks = vec![vec![0x70], vec![0x01, b'a']].into_iter();
/// let mut decoder = Decoder::with_source(
///     move || -> io::Result<Pulled> {
///         Ok(chunks.next().map_or(Pulled::Exhausted, Pulled::Data))
///     },
///     DecoderOptions::default(),
/// );
///
/// assert_eq!(decoder.pull().unwrap(), Some(TracePacket::Overflow));
/// ```
pub trait ByteSource {
    /// Produces the next batch of bytes.
    fn pull(&mut self) -> io::Result<Pulled>;
}

impl<F> ByteSource for F
where
    F: FnMut() -> io::Result<Pulled>,
{
    fn pull(&mut self) -> io::Result<Pulled> {
        self()
    }
}

/// A [`ByteSource`] reading from any [`Read`] instance; a file, a named
/// pipe, a socket, or anything else.
pub struct ReadSource<R>
where
    R: Read,
{
    reader: R,
    ignore_eof: bool,
}

impl<R> ReadSource<R>
where
    R: Read,
{
    /// Wraps `reader`. If `ignore_eof` is set, an EOF condition is
    /// taken to be temporary (as when following a file that is still
    /// being written) and reported as [`Pulled::Pending`] instead of
    /// [`Pulled::Exhausted`].
    pub fn new(reader: R, ignore_eof: bool) -> Self {
        Self { reader, ignore_eof }
    }

    /// Returns a reference to the underlying [`Read`](Read).
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Returns a mutable reference to the underlying [`Read`](Read).
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Unwraps the underlying [`Read`](Read).
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> ByteSource for ReadSource<R>
where
    R: Read,
{
    fn pull(&mut self) -> io::Result<Pulled> {
        let mut buffer = [0; 256];
        loop {
            match self.reader.read(&mut buffer) {
                Ok(0) if self.ignore_eof => return Ok(Pulled::Pending),
                Ok(0) => return Ok(Pulled::Exhausted),
                Ok(n) => return Ok(Pulled::Data(buffer[..n].to_vec())),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Pulled::Pending),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Intermediate buffer that stores the not yet decoded part of the
/// trace byte stream.
pub(crate) struct Buffer {
    bytes: Vec<u8>,

    /// Index of the first pending byte in `bytes`. Bytes before it have
    /// been consumed and are dropped once they make up half of `bytes`.
    head: usize,

    source: Option<Box<dyn ByteSource>>,
    exhausted: bool,

    /// Number of bytes consumed since construction.
    consumed: u64,
}

impl Buffer {
    pub fn new(source: Option<Box<dyn ByteSource>>) -> Self {
        Self {
            bytes: Vec::new(),
            head: 0,
            source,
            exhausted: false,
            consumed: 0,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[self.head..]
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Removes the first `cnt` bytes and returns them.
    pub fn consume(&mut self, cnt: usize) -> Vec<u8> {
        let cnt = cnt.min(self.bytes.len() - self.head);
        let consumed = self.bytes[self.head..self.head + cnt].to_vec();
        self.head += cnt;
        self.consumed += cnt as u64;

        if self.head > self.bytes.len() / 2 {
            self.bytes.drain(..self.head);
            self.head = 0;
        }

        consumed
    }

    /// Asks the byte source, if any, for more bytes once. Returns
    /// whether any bytes were appended.
    pub fn fill(&mut self) -> io::Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return Ok(false),
        };

        match source.pull() {
            Ok(Pulled::Data(data)) => {
                tracing::trace!("pulled {} bytes from source", data.len());
                let appended = !data.is_empty();
                self.bytes.extend(data);
                Ok(appended)
            }
            Ok(Pulled::Pending) => Ok(false),
            Ok(Pulled::Exhausted) => {
                tracing::debug!(
                    "byte source exhausted after {} bytes",
                    self.consumed + self.bytes().len() as u64
                );
                self.exhausted = true;
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("byte source failed: {}", e);
                Err(e)
            }
        }
    }
}
