//! Per-thread barrier log

use crate::error::{PrepError, Result};
use crate::runtime::ThreadId;
use serde::Serialize;

/// Address of a recently modified field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LogEntry(pub usize);

/// A flushed log, owned by the global list once enqueued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    source: ThreadId,
    entries: Vec<LogEntry>,
}

impl LogBuffer {
    /// Create a buffer from entries produced by `source`
    pub fn new(source: ThreadId, entries: Vec<LogEntry>) -> Self {
        Self { source, entries }
    }

    /// Thread that produced the entries
    pub fn source(&self) -> ThreadId {
        self.source
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Take the entries out of the buffer
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// BarrierLog - append-only log of one thread
#[derive(Debug)]
pub struct BarrierLog {
    owner: ThreadId,
    entries: Vec<LogEntry>,
}

impl BarrierLog {
    /// Create an empty log for `owner`
    pub fn new(owner: ThreadId) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Record a field update
    #[inline]
    pub fn record(&mut self, address: usize) {
        self.entries.push(LogEntry(address));
    }

    /// Thread owner
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Detach the pending entries as a buffer for thread `flusher`
    ///
    /// Returns None for an empty log. The log is empty afterwards.
    ///
    /// # Errors
    /// `InconsistentLog` if the log does not belong to `flusher`.
    pub fn take_buffer(&mut self, flusher: ThreadId) -> Result<Option<LogBuffer>> {
        if self.owner != flusher {
            return Err(PrepError::InconsistentLog {
                thread: flusher,
                reason: format!("log is owned by thread {}", self.owner),
            });
        }

        if self.entries.is_empty() {
            return Ok(None);
        }

        Ok(Some(LogBuffer::new(
            self.owner,
            std::mem::take(&mut self.entries),
        )))
    }
}
