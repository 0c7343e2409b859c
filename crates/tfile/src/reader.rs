use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::format::{
    read_trailer, Version, DATA_INDEX_BLOCK, TFILE_INDEX_BLOCK, TFILE_META_BLOCK, TFILE_VERSION,
    TRAILER_BYTES,
};
use crate::meta::{DataIndex, MetaIndex, MetaIndexEntry, TFileIndex, TFileMeta};
use crate::scanner::Scanner;
use crate::{Compression, TFileError};

/// Upper bound on the up-front allocation for a meta block. Larger blocks
/// still load, the vector just grows as it reads.
const MAX_META_PREALLOC: u64 = 1024 * 1024;

/// Opened TFile with its indexes loaded.
///
/// [`open`](TFileReader::open) reads the trailer and the three meta blocks
/// (`BCFile.index`, `TFile.meta`, `TFile.index`); the data blocks are only
/// touched by a [`Scanner`].
pub struct TFileReader<R: Read + Seek> {
    source: R,
    content_length: u64,
    version: Version,
    data_index: DataIndex,
    meta: TFileMeta,
    index: TFileIndex,
}

impl TFileReader<BufReader<File>> {
    /// Opens the TFile at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, does not end with a
    /// BCFile trailer, or any of its indexes is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TFileError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> TFileReader<R> {
    /// Loads the indexes from any seekable source.
    pub fn from_reader(mut source: R) -> Result<Self, TFileError> {
        let (trailer, filesize) = read_trailer(&mut source)?;
        let meta_end = filesize - TRAILER_BYTES;

        source.seek(SeekFrom::Start(trailer.meta_index_offset))?;
        let meta_index = {
            let mut limited = (&mut source).take(meta_end - trailer.meta_index_offset);
            MetaIndex::read_from(&mut limited)?
        };

        let raw = read_meta_block(&mut source, meta_index.get(DATA_INDEX_BLOCK)?, meta_end)?;
        let data_index = DataIndex::read_from(&mut raw.as_slice())?;
        for (i, region) in data_index.regions.iter().enumerate() {
            if region.end() > trailer.meta_index_offset {
                return Err(TFileError::Corrupt(format!(
                    "data block {} ends at {}, past the meta index at {}",
                    i,
                    region.end(),
                    trailer.meta_index_offset
                )));
            }
        }

        let raw = read_meta_block(&mut source, meta_index.get(TFILE_META_BLOCK)?, meta_end)?;
        let meta = TFileMeta::read_from(&mut raw.as_slice())?;
        if !meta.version.compatible_with(&TFILE_VERSION) {
            return Err(TFileError::UnsupportedVersion {
                major: meta.version.major,
                minor: meta.version.minor,
            });
        }

        let raw = read_meta_block(&mut source, meta_index.get(TFILE_INDEX_BLOCK)?, meta_end)?;
        let index = TFileIndex::read_from(&mut raw.as_slice(), data_index.regions.len())?;

        Ok(Self {
            source,
            content_length: filesize,
            version: trailer.version,
            data_index,
            meta,
            index,
        })
    }

    /// Starts a scan over every record, in file order, borrowing the reader.
    pub fn scanner(&mut self) -> Result<Scanner<&mut R>, TFileError> {
        Scanner::new(
            &mut self.source,
            self.data_index.regions.clone(),
            self.index.entries.iter().map(|e| e.record_count).collect(),
            self.data_index.default_compression,
        )
    }

    /// Starts a scan over every record, consuming the reader.
    pub fn into_scanner(self) -> Result<Scanner<R>, TFileError> {
        let block_records = self.index.entries.iter().map(|e| e.record_count).collect();
        Scanner::new(
            self.source,
            self.data_index.regions,
            block_records,
            self.data_index.default_compression,
        )
    }

    /// Total size of the file in bytes.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Number of records according to `TFile.meta`.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.meta.record_count
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.data_index.regions.len()
    }

    /// Key comparator name; empty when the keys are unsorted.
    #[must_use]
    pub fn comparator(&self) -> &str {
        &self.meta.comparator
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.data_index.default_compression
    }

    /// BCFile version from the trailer.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// First key in the file, if it holds any records.
    #[must_use]
    pub fn first_key(&self) -> Option<&[u8]> {
        self.index.first_key.as_deref()
    }

    /// Returns `true` if the file holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meta.record_count == 0
    }
}

/// Reads and decompresses one meta block. `limit` is the first byte past the
/// area meta blocks may occupy.
fn read_meta_block<R: Read + Seek>(
    source: &mut R,
    entry: &MetaIndexEntry,
    limit: u64,
) -> Result<Vec<u8>, TFileError> {
    let region = entry.region;
    if region.end() > limit {
        return Err(TFileError::Corrupt(format!(
            "meta block {} ends at {}, past {}",
            entry.name,
            region.end(),
            limit
        )));
    }

    source.seek(SeekFrom::Start(region.offset))?;
    let mut out = Vec::with_capacity(region.raw_size.min(MAX_META_PREALLOC) as usize);
    entry
        .compression
        .block_reader(source.take(region.compressed_size))
        .read_to_end(&mut out)?;
    Ok(out)
}
