//! Index structures stored in the BCFile meta blocks.
//!
//! ```text
//! meta index     vint count | count x (string "data:"+name | string codec | region)
//! region         vlong offset | vlong compressed_size | vlong raw_size
//! BCFile.index   string default_codec | vint count | count x region
//! TFile.meta     i16 major | i16 minor | vlong record_count | string comparator
//! TFile.index    vint first_key_entry_len | first key entry
//!                | per data block: vint entry_len | vint key_len | key | vlong records
//! ```

use std::io::Read;

#[cfg(any(test, feature = "testing"))]
use std::io::Write;

use crate::compression::Compression;
use crate::format::{Version, MAX_KEY_BYTES, META_NAME_PREFIX};
use crate::vint::{read_string, read_vint, read_vlong};
use crate::TFileError;

#[cfg(any(test, feature = "testing"))]
use crate::vint::{write_string, write_vint, write_vlong};

/// Position of a block inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRegion {
    pub offset: u64,
    pub compressed_size: u64,
    pub raw_size: u64,
}

fn read_non_negative<R: Read + ?Sized>(r: &mut R, what: &str) -> Result<u64, TFileError> {
    let v = read_vlong(r)?;
    u64::try_from(v).map_err(|_| TFileError::Corrupt(format!("negative {}: {}", what, v)))
}

fn read_count<R: Read + ?Sized>(r: &mut R, what: &str) -> Result<usize, TFileError> {
    let v = read_vint(r)?;
    usize::try_from(v).map_err(|_| TFileError::Corrupt(format!("negative {} count: {}", what, v)))
}

/// Longest serialized index entry: a key plus its vint length and a vlong
/// record count.
const MAX_INDEX_ENTRY_BYTES: usize = MAX_KEY_BYTES + 5 + 9;

/// Reads a length that must not exceed `max` before anything is allocated
/// for it.
fn read_bounded_len<R: Read + ?Sized>(r: &mut R, what: &str, max: usize) -> Result<usize, TFileError> {
    let len = read_count(r, what)?;
    if len > max {
        return Err(TFileError::Corrupt(format!(
            "{} length {} exceeds maximum {}",
            what, len, max
        )));
    }
    Ok(len)
}

fn read_required_string<R: Read + ?Sized>(r: &mut R, what: &str) -> Result<String, TFileError> {
    read_string(r)?.ok_or_else(|| TFileError::Corrupt(format!("null {}", what)))
}

impl BlockRegion {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, TFileError> {
        Ok(Self {
            offset: read_non_negative(r, "block offset")?,
            compressed_size: read_non_negative(r, "compressed size")?,
            raw_size: read_non_negative(r, "raw size")?,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        write_vlong(w, self.offset as i64)?;
        write_vlong(w, self.compressed_size as i64)?;
        write_vlong(w, self.raw_size as i64)
    }

    /// Byte offset one past the end of the block.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.compressed_size)
    }
}

/// One named meta block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaIndexEntry {
    /// Name without the `data:` prefix.
    pub name: String,
    pub compression: Compression,
    pub region: BlockRegion,
}

impl MetaIndexEntry {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, TFileError> {
        let full_name = read_required_string(r, "meta block name")?;
        let name = full_name
            .strip_prefix(META_NAME_PREFIX)
            .ok_or_else(|| {
                TFileError::Corrupt(format!("meta block name {:?} lacks data: prefix", full_name))
            })?
            .to_string();
        let codec = read_required_string(r, "meta block codec")?;
        let compression = Compression::from_name(&codec)?;
        let region = BlockRegion::read_from(r)?;
        Ok(Self {
            name,
            compression,
            region,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        write_string(w, &format!("{}{}", META_NAME_PREFIX, self.name))?;
        write_string(w, self.compression.name())?;
        self.region.write_to(w)
    }
}

/// Directory of meta blocks, read from the offset stored in the trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaIndex {
    pub entries: Vec<MetaIndexEntry>,
}

impl MetaIndex {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, TFileError> {
        let count = read_count(r, "meta index")?;
        let mut entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            entries.push(MetaIndexEntry::read_from(r)?);
        }
        Ok(Self { entries })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        write_vint(w, self.entries.len() as i32)?;
        for entry in &self.entries {
            entry.write_to(w)?;
        }
        Ok(())
    }

    /// Looks up a meta block by name (without the `data:` prefix).
    pub fn get(&self, name: &'static str) -> Result<&MetaIndexEntry, TFileError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or(TFileError::MissingMetaBlock(name))
    }
}

/// Contents of the `BCFile.index` meta block: where the data blocks live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIndex {
    pub default_compression: Compression,
    pub regions: Vec<BlockRegion>,
}

impl DataIndex {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, TFileError> {
        let codec = read_required_string(r, "default codec")?;
        let default_compression = Compression::from_name(&codec)?;
        let count = read_count(r, "data block")?;
        let mut regions = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            regions.push(BlockRegion::read_from(r)?);
        }
        Ok(Self {
            default_compression,
            regions,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        write_string(w, self.default_compression.name())?;
        write_vint(w, self.regions.len() as i32)?;
        for region in &self.regions {
            region.write_to(w)?;
        }
        Ok(())
    }
}

/// Contents of the `TFile.meta` meta block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TFileMeta {
    pub version: Version,
    pub record_count: u64,
    /// Key comparator name; empty for unsorted files such as aggregated logs.
    pub comparator: String,
}

impl TFileMeta {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, TFileError> {
        let version = Version::read_from(r)?;
        let record_count = read_non_negative(r, "record count")?;
        let comparator = read_string(r)?.unwrap_or_default();
        Ok(Self {
            version,
            record_count,
            comparator,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        self.version.write_to(w)?;
        write_vlong(w, self.record_count as i64)?;
        write_string(w, &self.comparator)
    }
}

/// Per-data-block entry of the `TFile.index` meta block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TFileIndexEntry {
    /// Last key stored in the block.
    #[allow(dead_code)]
    pub key: Vec<u8>,
    /// Number of records in the block.
    pub record_count: u64,
}

impl TFileIndexEntry {
    fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, TFileError> {
        let key = read_length_prefixed(r, "index key")?;
        let record_count = read_non_negative(r, "block record count")?;
        Ok(Self { key, record_count })
    }

    #[cfg(any(test, feature = "testing"))]
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        write_vint(w, self.key.len() as i32)?;
        w.write_all(&self.key)?;
        write_vlong(w, self.record_count as i64)
    }
}

/// Contents of the `TFile.index` meta block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TFileIndex {
    pub first_key: Option<Vec<u8>>,
    pub entries: Vec<TFileIndexEntry>,
}

impl TFileIndex {
    /// Reads the index. `block_count` comes from the data index; an empty
    /// file has no first key and no blocks.
    pub fn read_from<R: Read + ?Sized>(r: &mut R, block_count: usize) -> Result<Self, TFileError> {
        let first_len = read_bounded_len(r, "first key entry", MAX_INDEX_ENTRY_BYTES)?;
        if first_len == 0 {
            if block_count != 0 {
                return Err(TFileError::Corrupt(format!(
                    "index is empty but file has {} data blocks",
                    block_count
                )));
            }
            return Ok(Self::default());
        }

        let mut first_entry = vec![0u8; first_len];
        r.read_exact(&mut first_entry)?;
        let first_key = read_length_prefixed(&mut first_entry.as_slice(), "first key")?;

        let mut entries = Vec::with_capacity(block_count.min(4096));
        let mut buf = Vec::new();
        for _ in 0..block_count {
            let len = read_bounded_len(r, "index entry", MAX_INDEX_ENTRY_BYTES)?;
            buf.resize(len, 0);
            r.read_exact(&mut buf)?;
            entries.push(TFileIndexEntry::read_from(&mut buf.as_slice())?);
        }

        Ok(Self {
            first_key: Some(first_key),
            entries,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        let first_key = match &self.first_key {
            Some(k) => k,
            None => return write_vint(w, 0),
        };

        let mut scratch = Vec::new();
        write_vint(&mut scratch, first_key.len() as i32)?;
        scratch.extend_from_slice(first_key);
        write_vint(w, scratch.len() as i32)?;
        w.write_all(&scratch)?;

        for entry in &self.entries {
            scratch.clear();
            entry.write_to(&mut scratch)?;
            write_vint(w, scratch.len() as i32)?;
            w.write_all(&scratch)?;
        }
        Ok(())
    }
}

fn read_length_prefixed<R: Read + ?Sized>(r: &mut R, what: &str) -> Result<Vec<u8>, TFileError> {
    let len = read_bounded_len(r, what, MAX_KEY_BYTES)?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
