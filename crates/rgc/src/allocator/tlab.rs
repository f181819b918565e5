//! TLAB - Thread-Local Allocation Buffer
//!
//! Each mutator thread bumps a private pointer through a chunk of one
//! region. The buffer is only touched by its owner, or by the single GC
//! worker that claimed the owner during a pause, so it needs no atomics.
//!
//! ## Lifecycle
//!
//! 1. Thread refills the buffer with a chunk carved from a region
//! 2. Thread allocates from `[top, end)` by bumping `top`
//! 3. Pause retires the buffer: `[top, end)` goes back to the region
//! 4. Thread must refill before the next allocation

use crate::error::{PrepError, Result};
use crate::heap::RegionIndex;
use crate::runtime::ThreadId;
use serde::Serialize;

/// Active chunk of an allocation buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chunk {
    region: RegionIndex,
    start: usize,
    top: usize,
    end: usize,
}

/// AllocBuffer - per-thread bump allocation buffer
#[derive(Debug)]
pub struct AllocBuffer {
    /// Thread ID that owns this buffer
    owner: ThreadId,

    /// Alignment of every allocation
    alignment: usize,

    /// Current chunk, None while retired
    chunk: Option<Chunk>,

    /// Refills since the last retirement
    refills: usize,

    /// Bytes allocated since the last retirement
    allocated_bytes: usize,
}

/// Outcome of retiring an active buffer
///
/// The chunk's tail is `[end - tail_bytes, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetiredBuffer {
    /// Region the buffer was carved from
    pub region: RegionIndex,
    /// Start of the final chunk
    pub start: usize,
    /// End of the final chunk (exclusive)
    pub end: usize,
    /// Bytes used in the final chunk
    pub used_bytes: usize,
    /// Unused tail handed back to the region
    pub tail_bytes: usize,
    /// Refills since the previous retirement
    pub refills: usize,
    /// Bytes allocated since the previous retirement
    pub allocated_bytes: usize,
}

impl AllocBuffer {
    /// Create a retired (empty) buffer for a thread
    ///
    /// # Validation
    /// - `owner` must be non-zero
    /// - `alignment` must be a power of two
    pub fn new(owner: ThreadId, alignment: usize) -> Result<Self> {
        if owner == 0 {
            return Err(PrepError::InvalidArgument(
                "thread_id must be non-zero".to_string(),
            ));
        }

        if !alignment.is_power_of_two() {
            return Err(PrepError::InvalidArgument(format!(
                "alignment ({}) must be a power of two",
                alignment
            )));
        }

        Ok(Self {
            owner,
            alignment,
            chunk: None,
            refills: 0,
            allocated_bytes: 0,
        })
    }

    /// Install a fresh chunk `[start, end)` from `region`
    ///
    /// Refilling an active buffer is rejected; the old chunk must be retired
    /// first so its tail is accounted.
    pub fn refill(&mut self, region: RegionIndex, start: usize, end: usize) -> Result<()> {
        if self.chunk.is_some() {
            return Err(PrepError::InvalidArgument(format!(
                "buffer of thread {} is still active",
                self.owner
            )));
        }

        if start >= end {
            return Err(PrepError::InvalidArgument(format!(
                "start ({:#x}) must be less than end ({:#x})",
                start, end
            )));
        }

        if start % self.alignment != 0 {
            return Err(PrepError::InvalidArgument(format!(
                "start ({:#x}) is not aligned to {} bytes",
                start, self.alignment
            )));
        }

        self.chunk = Some(Chunk {
            region,
            start,
            top: start,
            end,
        });
        self.refills += 1;
        Ok(())
    }

    /// Allocate `size` bytes from the buffer
    ///
    /// Returns None if the buffer is retired or the chunk is exhausted.
    pub fn allocate(&mut self, size: usize) -> Option<usize> {
        let aligned = size.checked_add(self.alignment - 1)? & !(self.alignment - 1);
        let chunk = self.chunk.as_mut()?;

        let new_top = chunk.top.checked_add(aligned)?;
        if new_top > chunk.end {
            return None;
        }

        let addr = chunk.top;
        chunk.top = new_top;
        self.allocated_bytes += aligned;
        Some(addr)
    }

    /// Retire the buffer
    ///
    /// Returns the retirement record for an active buffer, or None if the
    /// thread has not refilled since the last retirement. The buffer is
    /// inactive afterwards either way.
    ///
    /// # Errors
    /// `InconsistentBuffer` if the chunk bounds are corrupt.
    pub fn retire(&mut self) -> Result<Option<RetiredBuffer>> {
        let chunk = match self.chunk.take() {
            Some(chunk) => chunk,
            None => return Ok(None),
        };

        if chunk.top < chunk.start || chunk.top > chunk.end {
            return Err(PrepError::InconsistentBuffer {
                thread: self.owner,
                reason: format!(
                    "top {:#x} outside [{:#x}, {:#x}]",
                    chunk.top, chunk.start, chunk.end
                ),
            });
        }

        let retired = RetiredBuffer {
            region: chunk.region,
            start: chunk.start,
            end: chunk.end,
            used_bytes: chunk.top - chunk.start,
            tail_bytes: chunk.end - chunk.top,
            refills: self.refills,
            allocated_bytes: self.allocated_bytes,
        };

        self.refills = 0;
        self.allocated_bytes = 0;
        Ok(Some(retired))
    }

    /// Check if the buffer has an active chunk
    pub fn is_active(&self) -> bool {
        self.chunk.is_some()
    }

    /// Thread owner
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Region of the active chunk
    pub fn region(&self) -> Option<RegionIndex> {
        self.chunk.map(|c| c.region)
    }

    /// Bytes used in the active chunk
    pub fn used(&self) -> usize {
        self.chunk.map_or(0, |c| c.top - c.start)
    }

    /// Bytes left in the active chunk
    pub fn remaining(&self) -> usize {
        self.chunk.map_or(0, |c| c.end - c.top)
    }

    /// Refills since the last retirement
    pub fn refills(&self) -> usize {
        self.refills
    }
}

/// Aggregate allocation-buffer statistics for one pause
///
/// Workers fill a local copy and merge it once into the shared one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllocBufferStats {
    /// Threads that had an active buffer
    pub allocating_threads: usize,
    /// Buffers retired
    pub buffers_retired: usize,
    /// Refills summed over all threads
    pub total_refills: usize,
    /// Largest refill count of a single thread
    pub max_refills: usize,
    /// Bytes allocated through buffers since the previous pause
    pub allocated_bytes: usize,
    /// Unused tail bytes handed back to regions
    pub waste_bytes: usize,
}

impl AllocBufferStats {
    /// Account one retired buffer
    pub fn record(&mut self, retired: &RetiredBuffer) {
        self.allocating_threads += 1;
        self.buffers_retired += 1;
        self.total_refills += retired.refills;
        self.max_refills = self.max_refills.max(retired.refills);
        self.allocated_bytes += retired.allocated_bytes;
        self.waste_bytes += retired.tail_bytes;
    }

    /// Merge another worker's statistics
    pub fn merge(&mut self, other: &AllocBufferStats) {
        self.allocating_threads += other.allocating_threads;
        self.buffers_retired += other.buffers_retired;
        self.total_refills += other.total_refills;
        self.max_refills = self.max_refills.max(other.max_refills);
        self.allocated_bytes += other.allocated_bytes;
        self.waste_bytes += other.waste_bytes;
    }

    /// Fraction of buffered space returned as waste
    pub fn waste_ratio(&self) -> f64 {
        let total = self.allocated_bytes + self.waste_bytes;
        if total == 0 {
            0.0
        } else {
            self.waste_bytes as f64 / total as f64
        }
    }
}
