//! Sequential record scanner.
//!
//! The scanner walks data blocks in order and decodes one record at a time.
//! Only the current record is reachable: [`Scanner::entry`] borrows the
//! scanner, so the entry (and its value stream) must be dropped before
//! [`Scanner::advance`] moves on. Advancing discards whatever part of the
//! value the caller did not read, which keeps the block cursor on a record
//! boundary.

use std::io::{self, Read, Seek, SeekFrom};

use crate::compression::{BlockReader, Compression};
use crate::format::MAX_KEY_BYTES;
use crate::meta::BlockRegion;
use crate::vint::read_vint;
use crate::TFileError;

enum Position<S: Read> {
    /// Between blocks, or past the last one.
    Idle(S),
    /// Inside a data block.
    Block(BlockReader<S>),
    /// Lost after a failed seek; every later call fails.
    Detached,
}

/// Chunk decoding state of the current value.
#[derive(Debug, Default, Clone, Copy)]
struct ChunkState {
    /// Bytes left in the current chunk.
    remain: u64,
    /// The current chunk is the final one.
    last: bool,
}

impl ChunkState {
    fn read_length<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        let len = read_vint(r)?;
        Ok(if len >= 0 {
            Self {
                remain: len as u64,
                last: true,
            }
        } else {
            Self {
                remain: (len as i64).unsigned_abs(),
                last: false,
            }
        })
    }
}

/// Cursor over the records of a TFile, in file order.
pub struct Scanner<S: Read + Seek> {
    position: Position<S>,
    blocks: Vec<BlockRegion>,
    block_records: Vec<u64>,
    compression: Compression,
    /// Index of the current block; `blocks.len()` once exhausted.
    block: usize,
    /// Index of the current record within the block.
    record: u64,
    key: Vec<u8>,
    chunk: ChunkState,
    value_len: Option<u64>,
    /// Key and first chunk header of the current record have been read.
    loaded: bool,
}

impl<S: Read + Seek> Scanner<S> {
    pub(crate) fn new(
        source: S,
        blocks: Vec<BlockRegion>,
        block_records: Vec<u64>,
        compression: Compression,
    ) -> Result<Self, TFileError> {
        if blocks.len() != block_records.len() {
            return Err(TFileError::Corrupt(format!(
                "{} data blocks but {} index entries",
                blocks.len(),
                block_records.len()
            )));
        }

        let mut scanner = Self {
            position: Position::Idle(source),
            blocks,
            block_records,
            compression,
            block: 0,
            record: 0,
            key: Vec::new(),
            chunk: ChunkState::default(),
            value_len: None,
            loaded: false,
        };
        scanner.enter_block(0)?;
        Ok(scanner)
    }

    /// Returns `true` once every record has been passed.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.block >= self.blocks.len()
    }

    /// Returns the current record.
    ///
    /// Calling this twice without advancing yields the same key; the value
    /// stream resumes where the previous one stopped.
    ///
    /// # Errors
    ///
    /// [`TFileError::AtEnd`] past the last record, or an I/O error if the
    /// record header cannot be read.
    pub fn entry(&mut self) -> Result<Entry<'_, S>, TFileError> {
        if self.at_end() {
            return Err(TFileError::AtEnd);
        }
        self.load()?;

        let block = match &mut self.position {
            Position::Block(block) => block,
            _ => return Err(TFileError::AtEnd),
        };
        Ok(Entry {
            key: &self.key,
            value_len: self.value_len,
            value: ValueStream {
                block,
                chunk: &mut self.chunk,
            },
        })
    }

    /// Moves to the next record, discarding the unread part of the current
    /// value. Returns `false` if the scanner was already at the end.
    pub fn advance(&mut self) -> Result<bool, TFileError> {
        if self.at_end() {
            return Ok(false);
        }
        self.load()?;
        self.skip_value()?;

        self.loaded = false;
        self.record += 1;
        if self.record >= self.block_records[self.block] {
            self.enter_block(self.block + 1)?;
        }
        Ok(true)
    }

    /// Reads the key and the first chunk header of the current record.
    fn load(&mut self) -> Result<(), TFileError> {
        if self.loaded {
            return Ok(());
        }
        let block = match &mut self.position {
            Position::Block(block) => block,
            _ => return Err(TFileError::AtEnd),
        };

        let key_len = read_vint(block)?;
        let key_len = usize::try_from(key_len).map_err(|_| {
            TFileError::Corrupt(format!(
                "negative key length {} in block {} record {}",
                key_len, self.block, self.record
            ))
        })?;
        if key_len > MAX_KEY_BYTES {
            return Err(TFileError::Corrupt(format!(
                "key_len {} exceeds maximum {} in block {} record {}",
                key_len, MAX_KEY_BYTES, self.block, self.record
            )));
        }
        self.key.resize(key_len, 0);
        block.read_exact(&mut self.key)?;

        self.chunk = ChunkState::read_length(block)?;
        self.value_len = self.chunk.last.then_some(self.chunk.remain);
        self.loaded = true;
        Ok(())
    }

    fn skip_value(&mut self) -> Result<u64, TFileError> {
        let block = match &mut self.position {
            Position::Block(block) => block,
            _ => return Err(TFileError::AtEnd),
        };
        let mut rest = ValueStream {
            block,
            chunk: &mut self.chunk,
        };
        Ok(io::copy(&mut rest, &mut io::sink())?)
    }

    /// Positions the scanner on the first non-empty block at or after `block`.
    fn enter_block(&mut self, mut block: usize) -> Result<(), TFileError> {
        while block < self.blocks.len() && self.block_records[block] == 0 {
            block += 1;
        }

        let mut source = match std::mem::replace(&mut self.position, Position::Detached) {
            Position::Idle(source) => source,
            Position::Block(reader) => reader.into_source(),
            Position::Detached => {
                return Err(TFileError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "scanner source lost after an earlier failure",
                )))
            }
        };

        self.block = block;
        self.record = 0;
        self.loaded = false;

        if block >= self.blocks.len() {
            self.position = Position::Idle(source);
            return Ok(());
        }

        let region = self.blocks[block];
        if let Err(e) = source.seek(SeekFrom::Start(region.offset)) {
            self.position = Position::Idle(source);
            return Err(e.into());
        }
        self.position = Position::Block(
            self.compression
                .block_reader(source.take(region.compressed_size)),
        );
        Ok(())
    }
}

/// The current record of a [`Scanner`].
pub struct Entry<'s, S: Read> {
    key: &'s [u8],
    value_len: Option<u64>,
    value: ValueStream<'s, S>,
}

impl<'s, S: Read> Entry<'s, S> {
    /// Raw key bytes.
    #[must_use]
    pub fn key(&self) -> &'s [u8] {
        self.key
    }

    /// The key as a byte stream.
    #[must_use]
    pub fn key_stream(&self) -> &'s [u8] {
        self.key
    }

    /// Length of the value, when it was written as a single chunk.
    #[must_use]
    pub fn value_len(&self) -> Option<u64> {
        self.value_len
    }

    /// The value as a byte stream. Ends at the end of this record's value.
    pub fn value_stream(&mut self) -> &mut ValueStream<'s, S> {
        &mut self.value
    }
}

/// Reader over one record's value, decoding the chunk framing.
pub struct ValueStream<'s, S: Read> {
    block: &'s mut BlockReader<S>,
    chunk: &'s mut ChunkState,
}

impl<S: Read> Read for ValueStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.chunk.remain > 0 {
                let want = (buf.len() as u64).min(self.chunk.remain) as usize;
                let n = self.block.read(&mut buf[..want])?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "data block ended inside a value chunk",
                    ));
                }
                self.chunk.remain -= n as u64;
                return Ok(n);
            }
            if self.chunk.last {
                return Ok(0);
            }
            *self.chunk = ChunkState::read_length(&mut *self.block)?;
        }
    }
}
