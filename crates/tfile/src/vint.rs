//! Hadoop TFile variable-length integers.
//!
//! The first byte decides the width:
//!
//! ```text
//! first byte (signed)   total bytes   value
//! [-32, 127]            1             the byte itself
//! [-72, -33]            2             (fb + 52) << 8  | u8
//! [-104, -73]           3             (fb + 88) << 16 | u16
//! [-120, -105]          4             (fb + 112) << 24 | u16 << 8 | u8
//! [-128, -121]          fb + 129 + 1  big-endian tail of 4..=8 bytes
//! ```
//!
//! This is not the `WritableUtils` zero-compressed encoding; TFile has its
//! own scheme.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

#[cfg(any(test, feature = "testing"))]
use byteorder::WriteBytesExt;
#[cfg(any(test, feature = "testing"))]
use std::io::Write;

/// Maximum string size we'll allocate during reads (64 KiB). Meta block
/// names and codec names are far shorter.
pub const MAX_STRING_BYTES: usize = 64 * 1024;

/// Reads a variable-length signed 64-bit integer.
pub fn read_vlong<R: Read + ?Sized>(r: &mut R) -> io::Result<i64> {
    let first = r.read_i8()? as i64;
    if first >= -32 {
        return Ok(first);
    }

    match (first + 128) / 8 {
        7..=11 => Ok(((first + 52) << 8) | r.read_u8()? as i64),
        3..=6 => Ok(((first + 88) << 16) | r.read_u16::<BigEndian>()? as i64),
        1 | 2 => {
            let hi = r.read_u16::<BigEndian>()? as i64;
            let lo = r.read_u8()? as i64;
            Ok(((first + 112) << 24) | (hi << 8) | lo)
        }
        _ => {
            let len = first + 129;
            match len {
                4 => Ok(r.read_i32::<BigEndian>()? as i64),
                5 => {
                    let hi = r.read_i32::<BigEndian>()? as i64;
                    Ok((hi << 8) | r.read_u8()? as i64)
                }
                6 => {
                    let hi = r.read_i32::<BigEndian>()? as i64;
                    Ok((hi << 16) | r.read_u16::<BigEndian>()? as i64)
                }
                7 => {
                    let hi = r.read_i32::<BigEndian>()? as i64;
                    let mid = r.read_u16::<BigEndian>()? as i64;
                    let lo = r.read_u8()? as i64;
                    Ok((hi << 24) | (mid << 8) | lo)
                }
                8 => r.read_i64::<BigEndian>(),
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("corrupted vlong encoding: length byte {}", len),
                )),
            }
        }
    }
}

/// Reads a variable-length integer that must fit in an `i32`.
pub fn read_vint<R: Read + ?Sized>(r: &mut R) -> io::Result<i32> {
    let v = read_vlong(r)?;
    i32::try_from(v).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("vint {} does not fit in 32 bits", v),
        )
    })
}

/// Reads a TFile string: `vint length` then UTF-8 bytes. A length of `-1`
/// encodes null and is returned as `None`.
pub fn read_string<R: Read + ?Sized>(r: &mut R) -> io::Result<Option<String>> {
    let len = read_vint(r)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative string length {}", len),
        ));
    }
    let len = len as usize;
    if len > MAX_STRING_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("string length {} exceeds maximum {}", len, MAX_STRING_BYTES),
        ));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writes `n` in the variable-length format understood by [`read_vlong`].
#[cfg(any(test, feature = "testing"))]
pub fn write_vlong<W: Write + ?Sized>(w: &mut W, n: i64) -> io::Result<()> {
    if (-32..128).contains(&n) {
        return w.write_i8(n as i8);
    }

    let un = if n < 0 { !n } else { n };
    // Bytes needed to hold the magnitude plus a sign bit.
    let len = (64 - un.leading_zeros()) / 8 + 1;
    let mut first = n >> ((len - 1) * 8);

    if len <= 2 {
        if len == 1 {
            first >>= 8;
        }
        if (-20..20).contains(&first) {
            w.write_i8((first - 52) as i8)?;
            return w.write_u8(n as u8);
        }
        first >>= 8;
    }
    if len <= 3 {
        if (-16..16).contains(&first) {
            w.write_i8((first - 88) as i8)?;
            return w.write_i16::<BigEndian>(n as i16);
        }
        first >>= 8;
    }
    if len <= 4 && (-8..8).contains(&first) {
        w.write_i8((first - 112) as i8)?;
        w.write_i16::<BigEndian>((n >> 8) as i16)?;
        return w.write_u8(n as u8);
    }

    let len = len.max(4);
    w.write_i8((len as i64 - 129) as i8)?;
    match len {
        4 => w.write_i32::<BigEndian>(n as i32),
        5 => {
            w.write_i32::<BigEndian>((n >> 8) as i32)?;
            w.write_u8(n as u8)
        }
        6 => {
            w.write_i32::<BigEndian>((n >> 16) as i32)?;
            w.write_i16::<BigEndian>(n as i16)
        }
        7 => {
            w.write_i32::<BigEndian>((n >> 24) as i32)?;
            w.write_i16::<BigEndian>((n >> 8) as i16)?;
            w.write_u8(n as u8)
        }
        _ => w.write_i64::<BigEndian>(n),
    }
}

#[cfg(any(test, feature = "testing"))]
pub fn write_vint<W: Write + ?Sized>(w: &mut W, n: i32) -> io::Result<()> {
    write_vlong(w, n as i64)
}

#[cfg(any(test, feature = "testing"))]
pub fn write_string<W: Write + ?Sized>(w: &mut W, s: &str) -> io::Result<()> {
    write_vint(w, s.len() as i32)?;
    w.write_all(s.as_bytes())
}
