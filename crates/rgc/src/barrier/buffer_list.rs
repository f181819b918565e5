//! Global Log Buffer List
//!
//! Lock-free multi-producer list of flushed barrier logs. Producers are the
//! pre-evacuation workers (and mutators whose logs overflow outside a pause);
//! the single consumer is remembered-set refinement.
//!
//! The pending entry count is kept next to the queue so readers never walk
//! the buffers. It is updated before the buffer becomes visible, so the
//! count never trails the contents a consumer can pop.

use crate::barrier::log::LogBuffer;
use crossbeam::queue::SegQueue;
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// GlobalLogBufferList - shared list of flushed logs
pub struct GlobalLogBufferList {
    buffers: SegQueue<LogBuffer>,
    num_entries: CachePadded<AtomicUsize>,
    num_buffers: AtomicUsize,
}

impl GlobalLogBufferList {
    pub fn new() -> Self {
        Self {
            buffers: SegQueue::new(),
            num_entries: CachePadded::new(AtomicUsize::new(0)),
            num_buffers: AtomicUsize::new(0),
        }
    }

    /// Append a flushed buffer
    ///
    /// Contends only with other appends. Empty buffers are dropped.
    pub fn enqueue(&self, buffer: LogBuffer) {
        if buffer.is_empty() {
            return;
        }

        self.num_entries.fetch_add(buffer.len(), Ordering::AcqRel);
        self.num_buffers.fetch_add(1, Ordering::Relaxed);
        self.buffers.push(buffer);
    }

    /// Pending entries across all buffers
    pub fn num_entries(&self) -> usize {
        self.num_entries.load(Ordering::Acquire)
    }

    /// Pending buffers
    pub fn num_buffers(&self) -> usize {
        self.num_buffers.load(Ordering::Relaxed)
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Pop one buffer (consumer side)
    pub fn pop(&self) -> Option<LogBuffer> {
        let buffer = self.buffers.pop()?;
        self.num_buffers.fetch_sub(1, Ordering::Relaxed);
        self.num_entries.fetch_sub(buffer.len(), Ordering::AcqRel);
        Some(buffer)
    }

    /// Remove all pending buffers (consumer side)
    pub fn drain(&self) -> Vec<LogBuffer> {
        std::iter::from_fn(|| self.pop()).collect()
    }
}

impl Default for GlobalLogBufferList {
    fn default() -> Self {
        Self::new()
    }
}

/// Log flush statistics for one subtask
///
/// Feeds refinement throttling together with the pending-entry delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    /// Threads whose log was flushed
    pub threads_flushed: usize,
    /// Non-empty buffers appended to the global list
    pub buffers_flushed: usize,
    /// Entries appended to the global list
    pub entries_flushed: usize,
}

impl FlushStats {
    /// Account one flushed thread and its buffer, if any
    pub fn record(&mut self, buffer: Option<&LogBuffer>) {
        self.threads_flushed += 1;
        if let Some(buffer) = buffer {
            self.buffers_flushed += 1;
            self.entries_flushed += buffer.len();
        }
    }

    /// Merge another worker's statistics
    pub fn merge(&mut self, other: &FlushStats) {
        self.threads_flushed += other.threads_flushed;
        self.buffers_flushed += other.buffers_flushed;
        self.entries_flushed += other.entries_flushed;
    }
}
