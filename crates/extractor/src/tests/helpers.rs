use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use config::ExtractorConfig;
use logformat::{encode_log_blocks, write_utf};
use tfile::{Compression, TFileWriter, DEFAULT_MIN_BLOCK_SIZE};

use crate::*;

/// One archive record, as the YARN log writer would store it.
pub enum Rec<'a> {
    Meta(&'a str, &'a str),
    Logs(&'a str, Vec<(&'a str, &'a [u8])>),
    /// Key plus a value written verbatim.
    Raw(&'a str, Vec<u8>),
}

/// The VERSION record as YARN writes it: a bare big-endian int 1, which a
/// string read sees as an empty string followed by two stray bytes.
pub fn version_record<'a>() -> Rec<'a> {
    Rec::Raw("VERSION", 1i32.to_be_bytes().to_vec())
}

pub fn utf(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    write_utf(&mut out, s).unwrap();
    out
}

pub fn archive_with(records: &[Rec<'_>], compression: Compression, min_block: usize) -> Vec<u8> {
    let mut w = TFileWriter::new(Vec::new(), compression).with_min_block_size(min_block);
    for rec in records {
        let (key, value) = match rec {
            Rec::Meta(k, v) => (utf(k), utf(v)),
            Rec::Logs(k, blocks) => (utf(k), encode_log_blocks(blocks.iter().copied()).unwrap()),
            Rec::Raw(k, v) => (utf(k), v.clone()),
        };
        w.append_chunked(&key, &value, 64).unwrap();
    }
    w.finish().unwrap()
}

pub fn archive(records: &[Rec<'_>]) -> Vec<u8> {
    archive_with(records, Compression::Gz, DEFAULT_MIN_BLOCK_SIZE)
}

pub fn write_archive(dir: &Path, bytes: &[u8]) -> PathBuf {
    let path = dir.join("application_1700000000000_0001.tfile");
    fs::write(&path, bytes).unwrap();
    path
}

pub fn local() -> LogExtractor<LocalFs, LocalFs> {
    LogExtractor::local(ExtractorConfig::default())
}

/// Every file under `root`, keyed by its `/`-separated relative path.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.insert(key, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    if root.exists() {
        walk(root, root, &mut out);
    }
    out
}

pub fn tree(entries: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
}

/// Archive source held in memory.
pub struct MemInput(pub Vec<u8>);

impl InputFs for MemInput {
    type Reader = Cursor<Vec<u8>>;

    fn open(&self, _: &Path) -> io::Result<Self::Reader> {
        Ok(Cursor::new(self.0.clone()))
    }

    fn content_length(&self, _: &Path) -> io::Result<u64> {
        Ok(self.0.len() as u64)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// In-memory archive whose device fails any read covering byte `fail_at`.
pub struct FailingInput {
    pub bytes: Vec<u8>,
    pub fail_at: u64,
}

pub struct FailingReader {
    inner: Cursor<Vec<u8>>,
    fail_at: u64,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.position();
        if pos <= self.fail_at && self.fail_at < pos + buf.len() as u64 {
            return Err(io::Error::new(io::ErrorKind::Other, "device read error"));
        }
        self.inner.read(buf)
    }
}

impl Seek for FailingReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl InputFs for FailingInput {
    type Reader = FailingReader;

    fn open(&self, _: &Path) -> io::Result<Self::Reader> {
        Ok(FailingReader {
            inner: Cursor::new(self.bytes.clone()),
            fail_at: self.fail_at,
        })
    }

    fn content_length(&self, _: &Path) -> io::Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Output filesystem that accepts directories but refuses files.
pub struct ReadOnlyFs;

impl OutputFs for ReadOnlyFs {
    type Writer = io::Sink;

    fn mkdirs(&self, _: &Path) -> io::Result<()> {
        Ok(())
    }

    fn create(&self, _: &Path, _: bool) -> io::Result<Self::Writer> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn describe(&self) -> String {
        "read-only".to_string()
    }
}
