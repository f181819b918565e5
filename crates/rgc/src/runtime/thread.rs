//! Thread records seen by the pause
//!
//! The runtime hands these records to the pause at safepoint time and gets
//! them back when the pause ends. Between the two points they are only
//! reachable through a [`ThreadSnapshot`](crate::runtime::ThreadSnapshot).

use crate::allocator::AllocBuffer;
use crate::barrier::BarrierLog;
use crate::error::{PrepError, Result};
use std::fmt;

/// Thread ID type
pub type ThreadId = u64;

/// Execution state of a thread as recorded by the safepoint mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Executing application code
    Running,
    /// Stopped at the safepoint
    Safepoint,
    /// Thread has terminated
    Exited,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadState::Running => write!(f, "running"),
            ThreadState::Safepoint => write!(f, "safepoint"),
            ThreadState::Exited => write!(f, "exited"),
        }
    }
}

/// Per-thread cache of pinned objects
///
/// Pinning only touches this counter; the pause merges it into the shared
/// pinned-object counter.
#[derive(Debug, Default)]
pub struct PinCountCache {
    count: usize,
}

impl PinCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one pinned object
    pub fn pin(&mut self) {
        self.count += 1;
    }

    /// Cached pin count
    pub fn count(&self) -> usize {
        self.count
    }

    /// Take the cached count, leaving zero behind
    pub fn flush(&mut self) -> usize {
        std::mem::take(&mut self.count)
    }
}

/// MutatorThread - application thread state touched by the pause
#[derive(Debug)]
pub struct MutatorThread {
    id: ThreadId,
    state: ThreadState,
    alloc_buffer: AllocBuffer,
    barrier_log: BarrierLog,
    pin_cache: PinCountCache,
}

impl MutatorThread {
    /// Create a running mutator with an empty buffer and log
    pub fn new(id: ThreadId, alignment: usize) -> Result<Self> {
        Ok(Self {
            id,
            state: ThreadState::Running,
            alloc_buffer: AllocBuffer::new(id, alignment)?,
            barrier_log: BarrierLog::new(id),
            pin_cache: PinCountCache::new(),
        })
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    pub fn alloc_buffer(&self) -> &AllocBuffer {
        &self.alloc_buffer
    }

    pub fn alloc_buffer_mut(&mut self) -> &mut AllocBuffer {
        &mut self.alloc_buffer
    }

    pub fn barrier_log(&self) -> &BarrierLog {
        &self.barrier_log
    }

    pub fn barrier_log_mut(&mut self) -> &mut BarrierLog {
        &mut self.barrier_log
    }

    pub fn pin_cache(&self) -> &PinCountCache {
        &self.pin_cache
    }

    pub fn pin_cache_mut(&mut self) -> &mut PinCountCache {
        &mut self.pin_cache
    }

    /// Fail unless the thread is stopped at the safepoint
    pub fn ensure_stopped(&self) -> Result<()> {
        match self.state {
            ThreadState::Safepoint => Ok(()),
            ThreadState::Exited => Err(PrepError::MissingThread { thread: self.id }),
            ThreadState::Running => Err(PrepError::ThreadNotAtSafepoint {
                thread: self.id,
                state: self.state.to_string(),
            }),
        }
    }
}

/// InternalThread - non-mutator thread with a barrier log
///
/// GC workers and service threads run during the pause, so only an exited
/// internal thread is a violation.
#[derive(Debug)]
pub struct InternalThread {
    id: ThreadId,
    name: String,
    state: ThreadState,
    barrier_log: BarrierLog,
}

impl InternalThread {
    pub fn new(id: ThreadId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: ThreadState::Running,
            barrier_log: BarrierLog::new(id),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    pub fn barrier_log(&self) -> &BarrierLog {
        &self.barrier_log
    }

    pub fn barrier_log_mut(&mut self) -> &mut BarrierLog {
        &mut self.barrier_log
    }

    /// Fail if the thread has exited
    pub fn ensure_present(&self) -> Result<()> {
        if self.state == ThreadState::Exited {
            return Err(PrepError::MissingThread { thread: self.id });
        }
        Ok(())
    }
}
