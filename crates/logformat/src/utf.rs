//! Length-prefixed strings in Java's modified UTF-8.
//!
//! ```text
//! [byte_len: u16 BE][modified UTF-8 bytes]
//! ```
//!
//! Modified UTF-8 encodes UTF-16 code units rather than scalar values: `NUL`
//! takes two bytes (`C0 80`) and a supplementary character is a surrogate
//! pair, three bytes per half. Lone surrogates decode to U+FFFD.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

#[cfg(any(test, feature = "testing"))]
use byteorder::WriteBytesExt;
#[cfg(any(test, feature = "testing"))]
use std::io::Write;

/// Reads one length-prefixed string. End of input anywhere is
/// [`io::ErrorKind::UnexpectedEof`]; malformed bytes are
/// [`io::ErrorKind::InvalidData`].
pub fn read_utf<R: Read + ?Sized>(r: &mut R) -> io::Result<String> {
    let len = r.read_u16::<BigEndian>()?;
    read_body(r, len)
}

/// Like [`read_utf`], but returns `Ok(None)` when the input is exhausted
/// before the first byte of the length prefix.
///
/// Once one byte has been consumed the string must be complete; running out
/// later is still an `UnexpectedEof` error.
pub fn try_read_utf<R: Read + ?Sized>(r: &mut R) -> io::Result<Option<String>> {
    let mut first = [0u8; 1];
    loop {
        match r.read(&mut first) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let second = r.read_u8()?;
    let len = u16::from_be_bytes([first[0], second]);
    read_body(r, len).map(Some)
}

fn read_body<R: Read + ?Sized>(r: &mut R, len: u16) -> io::Result<String> {
    let mut bytes = vec![0u8; usize::from(len)];
    r.read_exact(&mut bytes)?;
    decode(&bytes)
}

fn malformed(at: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("malformed modified UTF-8 at byte {}", at),
    )
}

fn continuation(bytes: &[u8], at: usize) -> io::Result<u16> {
    match bytes.get(at) {
        Some(&b) if b & 0xc0 == 0x80 => Ok(u16::from(b & 0x3f)),
        _ => Err(malformed(at)),
    }
}

/// Decodes modified UTF-8 into a `String`.
pub fn decode(bytes: &[u8]) -> io::Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b >> 4 {
            0x0..=0x7 => {
                units.push(u16::from(b));
                i += 1;
            }
            0xc | 0xd => {
                let c1 = continuation(bytes, i + 1)?;
                units.push((u16::from(b & 0x1f) << 6) | c1);
                i += 2;
            }
            0xe => {
                let c1 = continuation(bytes, i + 1)?;
                let c2 = continuation(bytes, i + 2)?;
                units.push((u16::from(b & 0x0f) << 12) | (c1 << 6) | c2);
                i += 3;
            }
            _ => return Err(malformed(i)),
        }
    }
    Ok(String::from_utf16_lossy(&units))
}

/// Writes `s` the way `DataOutput.writeUTF` does.
///
/// Fails with [`io::ErrorKind::InvalidInput`] when the encoding exceeds
/// 65535 bytes.
#[cfg(any(test, feature = "testing"))]
pub fn write_utf<W: Write + ?Sized>(w: &mut W, s: &str) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007f => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                bytes.push(0xc0 | (unit >> 6) as u8);
                bytes.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                bytes.push(0xe0 | (unit >> 12) as u8);
                bytes.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                bytes.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    let len = u16::try_from(bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("encoded string is {} bytes, over 65535", bytes.len()),
        )
    })?;
    w.write_u16::<BigEndian>(len)?;
    w.write_all(&bytes)
}
