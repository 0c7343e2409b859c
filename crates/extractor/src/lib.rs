//! # Extractor - aggregated log archive walker
//!
//! Turns a YARN aggregated log archive into a directory tree:
//!
//! ```text
//! archive (TFile)                       output_directory/
//! ┌──────────────────────────────┐
//! │ VERSION            = int 1   │ ──►  logged only
//! │ APPLICATION_ACL    = "..."   │ ──►  logged only
//! │ container_..._01   = blocks  │ ──►  container_..._01/stdout
//! │                              │      container_..._01/stderr
//! │ container_..._02   = blocks  │ ──►  container_..._02/syslog
//! └──────────────────────────────┘
//! ```
//!
//! Every record key is a length-prefixed string. Records whose key starts
//! with the configured container prefix hold a stream of log blocks (see
//! [`logformat`]); each block becomes one file. Every other record holds a
//! single string value, which is reported and kept in the
//! [`ExtractSummary`] but never written to disk.
//!
//! ## Module Responsibilities
//!
//! | Module   | Purpose                                              |
//! |----------|------------------------------------------------------|
//! | `lib.rs` | `LogExtractor`, summary types, `ExtractError`        |
//! | `walk`   | `extract()`: the record loop                         |
//! | `sink`   | writes the blocks of one container to files          |
//! | [`fs`]   | `InputFs` / `OutputFs` seams and `LocalFs`           |
//!
//! Extraction is a single sequential pass. Any error aborts it; files
//! written before the error stay where they are.

pub mod fs;
mod sink;
mod walk;

use std::io;
use std::path::PathBuf;

use config::ExtractorConfig;
use logformat::FrameError;
use tfile::TFileError;
use thiserror::Error;

pub use fs::{is_safe_segment, InputFs, LocalFs, OutputFs};

/// Errors that abort an extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading the archive or a record failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The archive is not a readable TFile.
    #[error("archive error: {0}")]
    Archive(#[from] TFileError),

    /// A container record's log blocks are malformed.
    #[error("container {key}: {source}")]
    Framing {
        key: String,
        #[source]
        source: FrameError,
    },

    /// A record key cannot be used as a directory name.
    #[error("unsafe record key {0:?}")]
    UnsafePath(String),

    /// Creating a directory or writing a file failed.
    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A non-container record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub key: String,
    pub value: String,
}

/// One file written for a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub name: String,
    pub bytes: u64,
}

/// Files written for one container record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub key: String,
    pub files: Vec<ExtractedFile>,
}

/// What a successful extraction found, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub metadata: Vec<MetadataRecord>,
    pub containers: Vec<ContainerSummary>,
}

impl ExtractSummary {
    /// Number of files written across all containers.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.containers.iter().map(|c| c.files.len()).sum()
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.containers
            .iter()
            .flat_map(|c| c.files.iter())
            .map(|f| f.bytes)
            .sum()
    }

    /// Value of the metadata record `key`, if the archive had one.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.key == key)
            .map(|m| m.value.as_str())
    }
}

/// Extracts aggregated log archives from `I` into `O`.
pub struct LogExtractor<I: InputFs, O: OutputFs> {
    pub(crate) config: ExtractorConfig,
    pub(crate) input: I,
    pub(crate) output: O,
}

impl<I: InputFs, O: OutputFs> LogExtractor<I, O> {
    pub fn new(config: ExtractorConfig, input: I, output: O) -> Self {
        Self {
            config,
            input,
            output,
        }
    }
}

impl LogExtractor<LocalFs, LocalFs> {
    /// An extractor reading and writing the local disk.
    pub fn local(config: ExtractorConfig) -> Self {
        let fs = LocalFs::new(&config);
        Self::new(config, fs.clone(), fs)
    }
}

impl<I: InputFs, O: OutputFs> std::fmt::Debug for LogExtractor<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogExtractor")
            .field("config", &self.config)
            .field("input", &self.input.describe())
            .field("output", &self.output.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests;
