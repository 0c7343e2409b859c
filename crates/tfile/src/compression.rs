//! Block compression codecs named in the BCFile indexes.

use flate2::read::ZlibDecoder;
use std::fmt;
use std::io::{self, Read, Take};

use crate::TFileError;

/// Compression algorithm of a BCFile block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Stored as-is (`"none"`).
    None,
    /// zlib stream (`"gz"`, Hadoop's `DefaultCodec`).
    Gz,
}

impl Compression {
    /// Resolves a codec name as written in the meta and data indexes.
    ///
    /// `"lzo"` is a valid TFile codec but has no decoder here.
    pub fn from_name(name: &str) -> Result<Self, TFileError> {
        match name {
            "none" => Ok(Compression::None),
            "gz" => Ok(Compression::Gz),
            other => Err(TFileError::UnsupportedCompression(other.to_string())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gz => "gz",
        }
    }

    /// Wraps the compressed byte range of one block in a decoder.
    pub(crate) fn block_reader<S: Read>(&self, region: Take<S>) -> BlockReader<S> {
        match self {
            Compression::None => BlockReader::Raw(region),
            Compression::Gz => BlockReader::Zlib(ZlibDecoder::new(region)),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decompressed view of a single block. Owns the source so it can be handed
/// back once the block is done.
pub(crate) enum BlockReader<S: Read> {
    Raw(Take<S>),
    Zlib(ZlibDecoder<Take<S>>),
}

impl<S: Read> BlockReader<S> {
    /// Returns the underlying source. Its position is unspecified; callers
    /// seek before the next use.
    pub(crate) fn into_source(self) -> S {
        match self {
            BlockReader::Raw(take) => take.into_inner(),
            BlockReader::Zlib(dec) => dec.into_inner().into_inner(),
        }
    }
}

impl<S: Read> Read for BlockReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BlockReader::Raw(take) => take.read(buf),
            BlockReader::Zlib(dec) => dec.read(buf),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub(crate) fn compress(compression: Compression, raw: &[u8]) -> io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    match compression {
        Compression::None => Ok(raw.to_vec()),
        Compression::Gz => {
            let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(raw)?;
            enc.finish()
        }
    }
}
