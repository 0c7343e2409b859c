//! # TFile - Hadoop TFile reader
//!
//! Sequential, read-only access to the Hadoop TFile container format, the
//! on-disk format YARN uses for aggregated application logs.
//!
//! A TFile is a BCFile (block-compressed file) whose data blocks hold
//! key/value records and whose meta blocks hold the indexes:
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA BLOCKS (compressed with the file's default codec)        │
//! │                                                               │
//! │ vint key_len | key | value chunks                             │
//! │ value chunk: vint len | bytes   (len < 0: more chunks follow,  │
//! │                                  len >= 0: final chunk)        │
//! │ ... repeated for each record ...                               │
//! ├───────────────────────────────────────────────────────────────┤
//! │ META BLOCK "TFile.meta"   version | record_count | comparator  │
//! │ META BLOCK "TFile.index"  first key | per block: last key,     │
//! │                           record count                         │
//! │ META BLOCK "BCFile.index" default codec | data block regions   │
//! ├───────────────────────────────────────────────────────────────┤
//! │ META INDEX  name, codec and region of every meta block         │
//! ├───────────────────────────────────────────────────────────────┤
//! │ TRAILER (last 28 bytes)                                        │
//! │ meta_index_offset (i64) | version (2 x i16) | magic (16 bytes) │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fixed-width integers are big-endian; everything else uses the TFile
//! variable-length integer encoding in [`vint`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Read;
//! use tfile::TFileReader;
//!
//! let mut reader = TFileReader::open("application.log").unwrap();
//! let mut scanner = reader.scanner().unwrap();
//! while !scanner.at_end() {
//!     let mut entry = scanner.entry().unwrap();
//!     let mut value = Vec::new();
//!     entry.value_stream().read_to_end(&mut value).unwrap();
//!     println!("{} key bytes, {} value bytes", entry.key().len(), value.len());
//!     scanner.advance().unwrap();
//! }
//! ```

mod compression;
mod format;
mod meta;
mod reader;
mod scanner;
pub mod vint;
#[cfg(any(test, feature = "testing"))]
mod writer;

use std::io;
use thiserror::Error;

pub use compression::Compression;
pub use format::{
    Version, BCFILE_MAGIC, BCFILE_VERSION, MAX_KEY_BYTES, TFILE_VERSION, TRAILER_BYTES,
};
pub use meta::BlockRegion;
pub use reader::TFileReader;
pub use scanner::{Entry, Scanner, ValueStream};
#[cfg(any(test, feature = "testing"))]
pub use writer::{TFileWriter, DEFAULT_MIN_BLOCK_SIZE};

/// Errors raised while opening or scanning a TFile.
#[derive(Debug, Error)]
pub enum TFileError {
    /// An underlying I/O error, including unexpected end of file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file does not end with a BCFile trailer.
    #[error("not a TFile: {0}")]
    NotTFile(String),

    /// The BCFile or TFile major version is not 1.
    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: i16, minor: i16 },

    /// A block uses a codec this crate cannot decode.
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// A required meta block is absent from the meta index.
    #[error("missing meta block {0}")]
    MissingMetaBlock(&'static str),

    /// The indexes or a record are structurally invalid.
    #[error("corrupt TFile: {0}")]
    Corrupt(String),

    /// An entry was requested after the scanner passed the last record.
    #[error("scanner is at end")]
    AtEnd,
}

#[cfg(test)]
mod tests;
