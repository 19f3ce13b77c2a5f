#![forbid(unsafe_code)]

use std::io::{self, Read};

/// Reader adapter with mark/reset semantics.
///
/// After [`MarkableReader::mark`], every byte pulled from the inner reader is
/// retained (up to `read_limit`) so [`MarkableReader::reset`] can replay it
/// without touching the inner reader again. A reset may be repeated any number
/// of times while the mark stays valid.
pub struct MarkableReader<R> {
    inner: R,
    buffer: Vec<u8>,
    replay_pos: usize,
    read_limit: usize,
    marked: bool,
}

impl<R: Read> MarkableReader<R> {
    /// Wraps `inner` with no mark set.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            replay_pos: 0,
            read_limit: 0,
            marked: false,
        }
    }

    /// Marks the current position. The mark is dropped once more than
    /// `read_limit` bytes are read past it.
    pub fn mark(&mut self, read_limit: usize) {
        // Bytes still pending replay are ahead of the new mark; keep them.
        self.buffer.drain(..self.replay_pos);
        self.replay_pos = 0;
        self.read_limit = read_limit;
        self.marked = self.buffer.len() <= read_limit;
    }

    /// Rewinds to the last mark.
    pub fn reset(&mut self) -> io::Result<()> {
        if !self.marked {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reset without a valid mark",
            ));
        }
        self.replay_pos = 0;
        Ok(())
    }

    /// Returns `true` while a mark is active.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Returns a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: Read> Read for MarkableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.replay_pos < self.buffer.len() {
            let pending = &self.buffer[self.replay_pos..];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            self.replay_pos += n;
            if !self.marked && self.replay_pos == self.buffer.len() {
                self.buffer.clear();
                self.replay_pos = 0;
            }
            return Ok(n);
        }
        let n = self.inner.read(buf)?;
        if self.marked && n > 0 {
            if self.buffer.len() + n > self.read_limit {
                self.marked = false;
                self.buffer.clear();
                self.replay_pos = 0;
            } else {
                self.buffer.extend_from_slice(&buf[..n]);
                self.replay_pos = self.buffer.len();
            }
        }
        Ok(n)
    }
}
