use std::io::{Cursor, Read};

use crate::{Compression, Scanner, TFileReader, TFileWriter};

pub type Record = (Vec<u8>, Vec<u8>);

pub fn record(k: &str, v: &str) -> Record {
    (k.as_bytes().to_vec(), v.as_bytes().to_vec())
}

/// Builds an in-memory archive holding `records`, one chunk per value.
pub fn build(records: &[(&str, &str)], compression: Compression, min_block: usize) -> Vec<u8> {
    let mut w = TFileWriter::new(Vec::new(), compression).with_min_block_size(min_block);
    for (k, v) in records {
        w.append(k.as_bytes(), v.as_bytes()).unwrap();
    }
    w.finish().unwrap()
}

pub fn open(bytes: Vec<u8>) -> TFileReader<Cursor<Vec<u8>>> {
    TFileReader::from_reader(Cursor::new(bytes)).unwrap()
}

/// Reads every record through the scanner, values in full.
pub fn collect<S: Read + std::io::Seek>(scanner: &mut Scanner<S>) -> Vec<Record> {
    let mut out = Vec::new();
    while !scanner.at_end() {
        let mut entry = scanner.entry().unwrap();
        let key = entry.key().to_vec();
        let mut value = Vec::new();
        entry.value_stream().read_to_end(&mut value).unwrap();
        out.push((key, value));
        scanner.advance().unwrap();
    }
    out
}
