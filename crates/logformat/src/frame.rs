//! Decoder for the log-block sub-stream of a container record.
//!
//! ```text
//! [name: utf][declared_length: utf, decimal][payload: declared_length bytes]
//! ... repeated until the stream ends ...
//! ```
//!
//! There is no block count and no terminator. The stream is finished when it
//! ends exactly where the next name would start.

use std::io::{self, Read};

#[cfg(any(test, feature = "testing"))]
use std::io::Write;

use thiserror::Error;

use crate::bounded::BoundedReader;
use crate::utf::{read_utf, try_read_utf};

#[cfg(any(test, feature = "testing"))]
use crate::utf::write_utf;

/// Errors raised while splitting a container record into log blocks.
#[derive(Debug, Error)]
pub enum FrameError {
    /// An underlying I/O error other than end of input.
    #[error("io error: {0}")]
    Io(io::Error),

    /// The stream ended inside a block header.
    #[error("stream ended inside the {field}")]
    Truncated { field: &'static str },

    /// The declared length is not an unsigned decimal integer.
    #[error("block {name:?} has invalid declared length {raw:?}")]
    InvalidLength { name: String, raw: String },

    /// The stream ended before the block's declared length was reached.
    #[error("block {name:?} declared {declared} bytes but only {actual} were present")]
    TruncatedPayload {
        name: String,
        declared: u64,
        actual: u64,
    },

    /// A header string is not valid modified UTF-8.
    #[error("malformed text in the {field}")]
    MalformedText { field: &'static str },

    /// The sink failed to store a block.
    #[error("sink error: {0}")]
    Sink(io::Error),
}

impl FrameError {
    fn from_header(e: io::Error, field: &'static str) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => FrameError::Truncated { field },
            io::ErrorKind::InvalidData => FrameError::MalformedText { field },
            _ => FrameError::Io(e),
        }
    }
}

/// Receives the decoded blocks of one stream.
pub trait BlockSink {
    /// Stores one block. `payload` yields at most `declared_length` bytes;
    /// anything left unread is discarded after the call. Returns the number
    /// of bytes stored.
    fn write_block(
        &mut self,
        name: &str,
        declared_length: u64,
        payload: &mut dyn Read,
    ) -> io::Result<u64>;
}

impl<F> BlockSink for F
where
    F: FnMut(&str, u64, &mut dyn Read) -> io::Result<u64>,
{
    fn write_block(
        &mut self,
        name: &str,
        declared_length: u64,
        payload: &mut dyn Read,
    ) -> io::Result<u64> {
        self(name, declared_length, payload)
    }
}

/// One decoded block. The payload borrows the decoder, so the block must be
/// released before the next one is read.
pub struct LogBlock<'a, R: Read> {
    pub name: String,
    pub declared_length: u64,
    pub payload: BoundedReader<'a, R>,
}

impl<R: Read> LogBlock<'_, R> {
    /// Skips the unread payload and checks the stream held every declared
    /// byte. Returns the payload length.
    pub fn finish(self) -> Result<u64, FrameError> {
        let actual = self.payload.finish().map_err(FrameError::Io)?;
        if actual < self.declared_length {
            return Err(FrameError::TruncatedPayload {
                name: self.name,
                declared: self.declared_length,
                actual,
            });
        }
        Ok(actual)
    }
}

/// Splits a byte stream into [`LogBlock`]s.
pub struct FrameDecoder<R: Read> {
    inner: R,
}

impl<R: Read> FrameDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next block header.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly before a new block.
    pub fn next_block(&mut self) -> Result<Option<LogBlock<'_, R>>, FrameError> {
        let name = match try_read_utf(&mut self.inner)
            .map_err(|e| FrameError::from_header(e, "block name"))?
        {
            Some(name) => name,
            None => return Ok(None),
        };

        let raw = read_utf(&mut self.inner)
            .map_err(|e| FrameError::from_header(e, "declared length"))?;
        let declared_length = match raw.parse::<u64>() {
            Ok(len) => len,
            Err(_) => return Err(FrameError::InvalidLength { name, raw }),
        };

        Ok(Some(LogBlock {
            name,
            declared_length,
            payload: BoundedReader::new(&mut self.inner, declared_length),
        }))
    }

    /// Feeds every remaining block to `sink`. Returns the number of blocks.
    pub fn decode_frames<S: BlockSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize, FrameError> {
        let mut blocks = 0;
        while let Some(mut block) = self.next_block()? {
            sink.write_block(&block.name, block.declared_length, &mut block.payload)
                .map_err(FrameError::Sink)?;
            block.finish()?;
            blocks += 1;
        }
        Ok(blocks)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Appends one block to `w`.
#[cfg(any(test, feature = "testing"))]
pub fn write_log_block<W: Write + ?Sized>(w: &mut W, name: &str, payload: &[u8]) -> io::Result<()> {
    write_utf(w, name)?;
    write_utf(w, &payload.len().to_string())?;
    w.write_all(payload)
}

/// Encodes a whole container record value.
#[cfg(any(test, feature = "testing"))]
pub fn encode_log_blocks<'a, I>(blocks: I) -> io::Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut out = Vec::new();
    for (name, payload) in blocks {
        write_log_block(&mut out, name, payload)?;
    }
    Ok(out)
}
