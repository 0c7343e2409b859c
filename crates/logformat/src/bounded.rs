use std::io::{self, Read};

/// A view of at most `limit` bytes of an underlying reader.
///
/// The view never reads past its limit. Releasing it, through
/// [`finish`](BoundedReader::finish) or by dropping it, consumes whatever the
/// holder left unread, so the underlying reader ends up exactly `limit` bytes
/// further on (or at its end, if it was shorter).
pub struct BoundedReader<'a, R: Read + ?Sized> {
    inner: &'a mut R,
    limit: u64,
    remaining: u64,
    released: bool,
}

impl<'a, R: Read + ?Sized> BoundedReader<'a, R> {
    pub fn new(inner: &'a mut R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            remaining: limit,
            released: false,
        }
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Bytes not yet consumed from the view.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Drains the unread part and returns how many bytes the view actually
    /// covered. Less than [`limit`](BoundedReader::limit) means the
    /// underlying reader ended early.
    pub fn finish(mut self) -> io::Result<u64> {
        self.released = true;
        self.drain()?;
        Ok(self.limit - self.remaining)
    }

    fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }
}

impl<R: Read + ?Sized> Read for BoundedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.inner.read(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl<R: Read + ?Sized> Drop for BoundedReader<'_, R> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.drain();
        }
    }
}
