//! BCFile trailer and format constants.
//!
//! ## Trailer (last 28 bytes)
//!
//! ```text
//! [meta_index_offset: i64 BE][major: i16 BE][minor: i16 BE][magic: 16 bytes]
//! ```
//!
//! The reader seeks to `filesize - 28`, checks the magic, then seeks to
//! `meta_index_offset` to load the meta index.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

#[cfg(any(test, feature = "testing"))]
use byteorder::WriteBytesExt;
#[cfg(any(test, feature = "testing"))]
use std::io::Write;

use crate::TFileError;

/// Magic bytes closing every BCFile.
pub const BCFILE_MAGIC: [u8; 16] = [
    0xd1, 0x11, 0xd3, 0x68, 0x91, 0xb5, 0xd7, 0xb6, 0x39, 0xdf, 0x41, 0x40, 0x92, 0xba, 0xe1, 0x50,
];

/// BCFile format version written by this crate. Readers accept any minor
/// version of the same major.
pub const BCFILE_VERSION: Version = Version { major: 1, minor: 0 };

/// TFile format version stored in the `TFile.meta` block.
pub const TFILE_VERSION: Version = Version { major: 1, minor: 0 };

/// Size of the trailer: 8 (`meta_index_offset`) + 4 (version) + 16 (magic).
pub const TRAILER_BYTES: u64 = 8 + 4 + 16;

/// Maximum key size we'll allocate during reads (64 KiB). TFile writers
/// refuse longer keys, so anything bigger is a corrupt length.
pub const MAX_KEY_BYTES: usize = 64 * 1024;

/// Meta block holding the data block regions.
pub const DATA_INDEX_BLOCK: &str = "BCFile.index";
/// Meta block holding the record count and comparator.
pub const TFILE_META_BLOCK: &str = "TFile.meta";
/// Meta block holding per-data-block record counts and last keys.
pub const TFILE_INDEX_BLOCK: &str = "TFile.index";

/// Prefix the meta index puts in front of every meta block name.
pub const META_NAME_PREFIX: &str = "data:";

/// `major.minor` pair, serialized as two big-endian `i16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: i16,
    pub minor: i16,
}

impl Version {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> std::io::Result<Self> {
        let major = r.read_i16::<BigEndian>()?;
        let minor = r.read_i16::<BigEndian>()?;
        Ok(Self { major, minor })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_i16::<BigEndian>(self.major)?;
        w.write_i16::<BigEndian>(self.minor)
    }

    #[must_use]
    pub fn compatible_with(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

/// Parsed BCFile trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub meta_index_offset: u64,
    pub version: Version,
}

/// Reads and validates the trailer, returning it along with the file size.
pub fn read_trailer<R: Read + Seek>(r: &mut R) -> Result<(Trailer, u64), TFileError> {
    let filesize = r.seek(SeekFrom::End(0))?;
    if filesize < TRAILER_BYTES {
        return Err(TFileError::NotTFile(format!(
            "file is {} bytes, smaller than the {} byte trailer",
            filesize, TRAILER_BYTES
        )));
    }

    r.seek(SeekFrom::Start(filesize - TRAILER_BYTES))?;
    let offset = r.read_i64::<BigEndian>()?;
    let version = Version::read_from(r)?;
    let mut magic = [0u8; 16];
    r.read_exact(&mut magic)?;

    if magic != BCFILE_MAGIC {
        return Err(TFileError::NotTFile("bad BCFile magic".to_string()));
    }
    if !version.compatible_with(&BCFILE_VERSION) {
        return Err(TFileError::UnsupportedVersion {
            major: version.major,
            minor: version.minor,
        });
    }
    if offset < 0 || offset as u64 >= filesize - TRAILER_BYTES {
        return Err(TFileError::Corrupt(format!(
            "meta index offset {} outside file of {} bytes",
            offset, filesize
        )));
    }

    Ok((
        Trailer {
            meta_index_offset: offset as u64,
            version,
        },
        filesize,
    ))
}

/// Writes the trailer that closes a BCFile.
#[cfg(any(test, feature = "testing"))]
pub fn write_trailer<W: Write + ?Sized>(w: &mut W, meta_index_offset: u64) -> std::io::Result<()> {
    w.write_i64::<BigEndian>(meta_index_offset as i64)?;
    BCFILE_VERSION.write_to(w)?;
    w.write_all(&BCFILE_MAGIC)
}
