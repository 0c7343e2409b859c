//! The record loop: extract().
//!
//! Records are visited once, in file order. The key decides how the value
//! is read; whatever a handler leaves unread is skipped by the scanner when
//! it advances.

use std::io::Read;
use std::path::Path;

use logformat::{read_utf, FrameDecoder, FrameError};
use tfile::TFileReader;
use tracing::info;

use crate::fs::{is_safe_segment, InputFs, OutputFs};
use crate::sink::{ContainerSink, SinkFailure};
use crate::{
    ContainerSummary, ExtractError, ExtractSummary, ExtractedFile, LogExtractor, MetadataRecord,
};

impl<I: InputFs, O: OutputFs> LogExtractor<I, O> {
    /// Extracts every container record of `archive` into
    /// `output_directory/<key>/<log file>`.
    ///
    /// Existing files are overwritten. Metadata records are logged and
    /// returned in the summary.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable record, malformed log block stream,
    /// unsafe key or block name, or output write error.
    pub fn extract(
        &self,
        archive: &Path,
        output_directory: &Path,
    ) -> Result<ExtractSummary, ExtractError> {
        info!("Using input filesystem at {}", self.input.describe());
        info!("Using output filesystem at {}", self.output.describe());

        let size = self.input.content_length(archive)?;
        info!("Extracting from {}: size is {} bytes", archive.display(), size);

        let mut reader = TFileReader::from_reader(self.input.open(archive)?)?;
        let mut scanner = reader.scanner()?;
        let mut summary = ExtractSummary::default();

        while !scanner.at_end() {
            {
                let mut entry = scanner.entry()?;
                let key = read_utf(&mut entry.key_stream())?;

                if self.config.is_container_key(&key) {
                    let files = self.extract_container(&key, entry.value_stream(), output_directory)?;
                    summary.containers.push(ContainerSummary { key, files });
                } else {
                    let value = read_utf(entry.value_stream())?;
                    info!("{}: {}={}", archive.display(), key, value);
                    summary.metadata.push(MetadataRecord { key, value });
                }
            }
            scanner.advance()?;
        }

        info!(
            containers = summary.containers.len(),
            files = summary.file_count(),
            bytes = summary.bytes_written(),
            "extraction finished"
        );
        Ok(summary)
    }

    /// Writes the log blocks in `value` under `output_directory/key`.
    fn extract_container<R: Read>(
        &self,
        key: &str,
        value: R,
        output_directory: &Path,
    ) -> Result<Vec<ExtractedFile>, ExtractError> {
        if !is_safe_segment(key) {
            return Err(ExtractError::UnsafePath(key.to_string()));
        }

        let dir = output_directory.join(key);
        self.output
            .mkdirs(&dir)
            .map_err(|source| ExtractError::Output {
                path: dir.clone(),
                source,
            })?;
        info!("Extracting log files under {}", dir.display());

        let mut sink = ContainerSink::new(&self.output, &dir);
        let result = FrameDecoder::new(value).decode_frames(&mut sink);
        match result {
            Ok(_) => Ok(sink.files),
            Err(FrameError::Sink(source)) => match sink.failed.take() {
                Some(SinkFailure::Read) => Err(ExtractError::Framing {
                    key: key.to_string(),
                    source: FrameError::Io(source),
                }),
                Some(SinkFailure::Write(path)) => Err(ExtractError::Output { path, source }),
                None => Err(ExtractError::Output { path: dir.clone(), source }),
            },
            Err(source) => Err(ExtractError::Framing {
                key: key.to_string(),
                source,
            }),
        }
    }
}
