//! Filesystem seams of the extractor.
//!
//! The walker only needs a handful of operations from each side, so the
//! archive source and the output tree are traits. [`LocalFs`] implements both
//! on the local disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use config::ExtractorConfig;

/// Where archives are read from.
pub trait InputFs {
    type Reader: Read + Seek;

    fn open(&self, path: &Path) -> io::Result<Self::Reader>;

    /// Size of the file at `path` in bytes.
    fn content_length(&self, path: &Path) -> io::Result<u64>;

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

/// Where extracted files are written.
pub trait OutputFs {
    type Writer: Write;

    /// Creates `path` and any missing parents. Succeeds if it already exists.
    fn mkdirs(&self, path: &Path) -> io::Result<()>;

    /// Creates a file for writing. With `overwrite`, an existing file is
    /// truncated; without it, an existing file is an error.
    fn create(&self, path: &Path, overwrite: bool) -> io::Result<Self::Writer>;

    fn describe(&self) -> String;
}

/// The local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFs {
    write_buffer_bytes: usize,
}

impl LocalFs {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            write_buffer_bytes: config.write_buffer_bytes,
        }
    }
}

impl Default for LocalFs {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

impl InputFs for LocalFs {
    type Reader = BufReader<File>;

    fn open(&self, path: &Path) -> io::Result<Self::Reader> {
        Ok(BufReader::new(File::open(path)?))
    }

    fn content_length(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn describe(&self) -> String {
        "file:///".to_string()
    }
}

impl OutputFs for LocalFs {
    type Writer = BufWriter<File>;

    fn mkdirs(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create(&self, path: &Path, overwrite: bool) -> io::Result<Self::Writer> {
        let mut opts = OpenOptions::new();
        opts.write(true);
        if overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }
        let file = opts.open(path)?;
        Ok(BufWriter::with_capacity(self.write_buffer_bytes, file))
    }

    fn describe(&self) -> String {
        "file:///".to_string()
    }
}

/// Returns `true` if `name` can be used as one path component without
/// leaving its parent directory.
#[must_use]
pub fn is_safe_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}
