//! Growable read buffer with rollback.
//!
//! Bytes are appended at the tail as they arrive from the transport. Reads
//! advance a tentative cursor; `flush` commits it. A read that runs past the
//! buffered bytes rewinds the cursor to the committed offset and fails with
//! [`Error::Incomplete`], so a decoder retried after more data arrives starts
//! from exactly the same byte.

use mysqlwire_core::{Error, Result};

/// Committed bytes are dropped from storage once this many have accumulated.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 1024 * 1024;

/// Append-only byte accumulator with a committed offset and a read cursor.
///
/// Invariant: `committed <= cursor <= data.len()`.
#[derive(Debug, Clone)]
pub struct ReadBuffer {
    data: Vec<u8>,
    committed: usize,
    cursor: usize,
    compaction_threshold: usize,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuffer {
    /// Create an empty buffer with the default compaction threshold.
    pub fn new() -> Self {
        Self::with_compaction_threshold(DEFAULT_COMPACTION_THRESHOLD)
    }

    /// Create an empty buffer that compacts after `threshold` committed bytes.
    pub fn with_compaction_threshold(threshold: usize) -> Self {
        Self {
            data: Vec::new(),
            committed: 0,
            cursor: 0,
            compaction_threshold: threshold.max(1),
        }
    }

    /// Append bytes at the tail.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Bytes held past the committed offset.
    pub fn len(&self) -> usize {
        self.data.len() - self.committed
    }

    /// Check if no uncommitted bytes are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held past the read cursor.
    pub fn unread_len(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Check if `n` more bytes can be read from the cursor.
    pub fn is_readable(&self, n: usize) -> bool {
        self.unread_len() >= n
    }

    /// Read `n` bytes at the cursor.
    ///
    /// Fails with `Incomplete` and rewinds the cursor to the committed offset
    /// when fewer than `n` bytes are buffered.
    pub fn read(&mut self, n: usize) -> Result<&[u8]> {
        if !self.is_readable(n) {
            self.cursor = self.committed;
            return Err(Error::Incomplete);
        }
        let start = self.cursor;
        self.cursor += n;
        Ok(&self.data[start..self.cursor])
    }

    /// Advance the cursor by `n` bytes without returning them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }

    /// Distance to the next `byte` from the cursor, counting the byte itself.
    ///
    /// `None` only means the byte is not buffered yet.
    pub fn scan(&self, byte: u8) -> Option<usize> {
        self.data[self.cursor..]
            .iter()
            .position(|&b| b == byte)
            .map(|offset| offset + 1)
    }

    /// Bytes read since the last flush.
    pub fn current_position(&self) -> usize {
        self.cursor - self.committed
    }

    /// Rewind the cursor to the committed offset.
    pub fn rollback(&mut self) {
        self.cursor = self.committed;
    }

    /// Commit the cursor, returning the number of newly committed bytes.
    pub fn flush(&mut self) -> usize {
        let consumed = self.cursor - self.committed;
        self.committed = self.cursor;

        if self.committed >= self.compaction_threshold {
            tracing::debug!(
                dropped = self.committed,
                retained = self.data.len() - self.committed,
                "Compacting read buffer"
            );
            self.data.drain(..self.committed);
            self.committed = 0;
            self.cursor = 0;
        }

        consumed
    }
}
