use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use logformat::BlockSink;
use tracing::debug;

use crate::fs::{is_safe_segment, OutputFs};
use crate::ExtractedFile;

/// Which side of a block copy failed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SinkFailure {
    /// The payload could not be read from the archive.
    Read,
    /// The output file at this path could not be created or written.
    Write(PathBuf),
}

/// Writes each log block of one container to `dir/<block name>`.
pub(crate) struct ContainerSink<'a, O: OutputFs> {
    output: &'a O,
    dir: &'a Path,
    pub(crate) files: Vec<ExtractedFile>,
    /// Cause of the last error returned from `write_block`.
    pub(crate) failed: Option<SinkFailure>,
}

/// Payload reader that remembers whether it returned an error, so a failed
/// copy can be blamed on the archive rather than the output.
struct PayloadReader<'p> {
    inner: &'p mut dyn Read,
    failed: bool,
}

impl Read for PayloadReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| {
            if e.kind() != io::ErrorKind::Interrupted {
                self.failed = true;
            }
            e
        })
    }
}

impl<'a, O: OutputFs> ContainerSink<'a, O> {
    pub(crate) fn new(output: &'a O, dir: &'a Path) -> Self {
        Self {
            output,
            dir,
            files: Vec::new(),
            failed: None,
        }
    }

    fn store(&self, path: &Path, payload: &mut PayloadReader<'_>) -> io::Result<u64> {
        let mut out = self.output.create(path, true)?;
        let bytes = io::copy(payload, &mut out)?;
        out.flush()?;
        Ok(bytes)
    }
}

impl<O: OutputFs> BlockSink for ContainerSink<'_, O> {
    fn write_block(
        &mut self,
        name: &str,
        declared_length: u64,
        payload: &mut dyn Read,
    ) -> io::Result<u64> {
        if !is_safe_segment(name) {
            self.failed = Some(SinkFailure::Write(self.dir.to_path_buf()));
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsafe log file name {:?}", name),
            ));
        }

        let path = self.dir.join(name);
        let mut payload = PayloadReader {
            inner: payload,
            failed: false,
        };
        let bytes = match self.store(&path, &mut payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.failed = Some(if payload.failed {
                    SinkFailure::Read
                } else {
                    SinkFailure::Write(path)
                });
                return Err(e);
            }
        };
        debug!(
            path = %path.display(),
            declared = declared_length,
            bytes,
            "extracted log file"
        );

        self.files.push(ExtractedFile {
            name: name.to_string(),
            bytes,
        });
        Ok(bytes)
    }
}
