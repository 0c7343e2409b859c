//! Archive builder for tests and benchmarks.
//!
//! Produces files [`TFileReader`](crate::TFileReader) and Hadoop's own
//! reader both accept. Records are buffered per data block; the block is
//! compressed and written once it reaches the minimum block size.

use std::io::{self, Write};

use crate::compression::compress;
use crate::format::{
    write_trailer, DATA_INDEX_BLOCK, MAX_KEY_BYTES, TFILE_INDEX_BLOCK, TFILE_META_BLOCK, TFILE_VERSION,
};
use crate::meta::{BlockRegion, DataIndex, MetaIndex, MetaIndexEntry, TFileIndex, TFileIndexEntry, TFileMeta};
use crate::vint::write_vint;
use crate::Compression;

/// Minimum raw data block size YARN's log writer uses (256 KiB).
pub const DEFAULT_MIN_BLOCK_SIZE: usize = 256 * 1024;

/// Writes records into a new TFile.
pub struct TFileWriter<W: Write> {
    out: W,
    /// Bytes written to `out` so far.
    pos: u64,
    compression: Compression,
    min_block_size: usize,
    /// Raw bytes of the block being filled.
    block: Vec<u8>,
    block_records: u64,
    first_key: Option<Vec<u8>>,
    last_key: Vec<u8>,
    regions: Vec<BlockRegion>,
    index: Vec<TFileIndexEntry>,
    record_count: u64,
}

impl<W: Write> TFileWriter<W> {
    pub fn new(out: W, compression: Compression) -> Self {
        Self {
            out,
            pos: 0,
            compression,
            min_block_size: DEFAULT_MIN_BLOCK_SIZE,
            block: Vec::new(),
            block_records: 0,
            first_key: None,
            last_key: Vec::new(),
            regions: Vec::new(),
            index: Vec::new(),
            record_count: 0,
        }
    }

    /// Closes a data block as soon as its raw size reaches `size` bytes.
    /// Small values force one block per record.
    #[must_use]
    pub fn with_min_block_size(mut self, size: usize) -> Self {
        self.min_block_size = size;
        self
    }

    /// Appends a record whose value is written as one chunk (known length).
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> io::Result<()> {
        self.append_key(key)?;
        write_vint(&mut self.block, len_i32(value.len())?)?;
        self.block.extend_from_slice(value);
        self.end_record()
    }

    /// Appends a record whose value is split into chunks of `chunk_size`
    /// bytes, the way a value of unknown length is streamed. The final chunk
    /// holds the remainder and is empty when the value divides evenly.
    pub fn append_chunked(&mut self, key: &[u8], value: &[u8], chunk_size: usize) -> io::Result<()> {
        if chunk_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "chunk size must be positive",
            ));
        }
        self.append_key(key)?;

        let full = value.len() / chunk_size;
        for chunk in value.chunks(chunk_size).take(full) {
            write_vint(&mut self.block, -len_i32(chunk.len())?)?;
            self.block.extend_from_slice(chunk);
        }
        let tail = &value[full * chunk_size..];
        write_vint(&mut self.block, len_i32(tail.len())?)?;
        self.block.extend_from_slice(tail);

        self.end_record()
    }

    /// Flushes the last block, writes the indexes and the trailer, and
    /// returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.finish_block()?;

        let mut meta_index = MetaIndex::default();
        let mut raw = Vec::new();

        TFileMeta {
            version: TFILE_VERSION,
            record_count: self.record_count,
            comparator: String::new(),
        }
        .write_to(&mut raw)?;
        let region = self.write_region(&raw, Compression::None)?;
        meta_index.entries.push(MetaIndexEntry {
            name: TFILE_META_BLOCK.to_string(),
            compression: Compression::None,
            region,
        });

        raw.clear();
        TFileIndex {
            first_key: self.first_key.clone(),
            entries: self.index.clone(),
        }
        .write_to(&mut raw)?;
        let region = self.write_region(&raw, self.compression)?;
        meta_index.entries.push(MetaIndexEntry {
            name: TFILE_INDEX_BLOCK.to_string(),
            compression: self.compression,
            region,
        });

        raw.clear();
        DataIndex {
            default_compression: self.compression,
            regions: self.regions.clone(),
        }
        .write_to(&mut raw)?;
        let region = self.write_region(&raw, self.compression)?;
        meta_index.entries.push(MetaIndexEntry {
            name: DATA_INDEX_BLOCK.to_string(),
            compression: self.compression,
            region,
        });

        let meta_index_offset = self.pos;
        meta_index.write_to(&mut self.out)?;
        write_trailer(&mut self.out, meta_index_offset)?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn append_key(&mut self, key: &[u8]) -> io::Result<()> {
        if key.len() > MAX_KEY_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key of {} bytes exceeds maximum {}", key.len(), MAX_KEY_BYTES),
            ));
        }
        write_vint(&mut self.block, len_i32(key.len())?)?;
        self.block.extend_from_slice(key);
        if self.first_key.is_none() {
            self.first_key = Some(key.to_vec());
        }
        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        Ok(())
    }

    fn end_record(&mut self) -> io::Result<()> {
        self.block_records += 1;
        self.record_count += 1;
        if self.block.len() >= self.min_block_size {
            self.finish_block()?;
        }
        Ok(())
    }

    fn finish_block(&mut self) -> io::Result<()> {
        if self.block_records == 0 {
            return Ok(());
        }
        let raw = std::mem::take(&mut self.block);
        let region = self.write_region(&raw, self.compression)?;
        self.regions.push(region);
        self.index.push(TFileIndexEntry {
            key: self.last_key.clone(),
            record_count: self.block_records,
        });
        self.block_records = 0;
        Ok(())
    }

    fn write_region(&mut self, raw: &[u8], compression: Compression) -> io::Result<BlockRegion> {
        let compressed = compress(compression, raw)?;
        let region = BlockRegion {
            offset: self.pos,
            compressed_size: compressed.len() as u64,
            raw_size: raw.len() as u64,
        };
        self.out.write_all(&compressed)?;
        self.pos += compressed.len() as u64;
        Ok(region)
    }
}

fn len_i32(len: usize) -> io::Result<i32> {
    i32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("length {} exceeds the vint range", len),
        )
    })
}
