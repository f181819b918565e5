//! Pause Context - state scoped to one collector pause
//!
//! Created when every mutator has reached the safepoint and discarded when
//! the pause ends. The pinned-object counter and the published statistics
//! start from zero in every pause; the global log buffer list and the region
//! table outlive the pause and are shared with the rest of the collector.

use crate::allocator::AllocBufferStats;
use crate::barrier::{FlushStats, GlobalLogBufferList};
use crate::heap::RegionTable;
use crate::runtime::snapshot::ThreadSnapshot;
use crate::runtime::thread::{InternalThread, MutatorThread};
use crate::stats::PhaseTimes;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// PauseContext - pause-scoped view of threads and shared counters
pub struct PauseContext {
    /// Pause sequence number
    pause_id: u64,

    /// Mutator threads stopped at the safepoint
    mutators: ThreadSnapshot<MutatorThread>,

    /// Internal (non-mutator) threads
    internals: ThreadSnapshot<InternalThread>,

    /// Destination of flushed barrier logs
    log_buffers: Arc<GlobalLogBufferList>,

    /// Receiver of retired buffer tails
    regions: Arc<RegionTable>,

    /// Pinned objects merged from mutator caches
    pinned_objects: CachePadded<AtomicUsize>,

    /// Published allocation-buffer statistics
    alloc_stats: Mutex<AllocBufferStats>,

    /// Published log flush statistics
    flush_stats: Mutex<FlushStats>,

    /// Phase times of this pause
    phase_times: Mutex<PhaseTimes>,
}

/// Thread records handed back when a pause ends
pub struct PauseThreads {
    pub mutators: Vec<MutatorThread>,
    pub internals: Vec<InternalThread>,
}

impl PauseContext {
    /// Begin a pause over the given thread records
    pub fn begin(
        pause_id: u64,
        mutators: Vec<MutatorThread>,
        internals: Vec<InternalThread>,
        log_buffers: Arc<GlobalLogBufferList>,
        regions: Arc<RegionTable>,
    ) -> Self {
        log::debug!(
            "Pause {}: context with {} mutator and {} internal threads",
            pause_id,
            mutators.len(),
            internals.len()
        );

        Self {
            pause_id,
            mutators: ThreadSnapshot::new(mutators),
            internals: ThreadSnapshot::new(internals),
            log_buffers,
            regions,
            pinned_objects: CachePadded::new(AtomicUsize::new(0)),
            alloc_stats: Mutex::new(AllocBufferStats::default()),
            flush_stats: Mutex::new(FlushStats::default()),
            phase_times: Mutex::new(PhaseTimes::new()),
        }
    }

    /// End the pause and return the thread records to the runtime
    pub fn end(self) -> PauseThreads {
        PauseThreads {
            mutators: self.mutators.into_inner(),
            internals: self.internals.into_inner(),
        }
    }

    pub fn pause_id(&self) -> u64 {
        self.pause_id
    }

    pub fn mutators(&self) -> &ThreadSnapshot<MutatorThread> {
        &self.mutators
    }

    pub fn internals(&self) -> &ThreadSnapshot<InternalThread> {
        &self.internals
    }

    pub fn log_buffers(&self) -> &GlobalLogBufferList {
        &self.log_buffers
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Merge a thread's pinned count
    #[inline]
    pub fn add_pinned(&self, count: usize) {
        self.pinned_objects.fetch_add(count, Ordering::AcqRel);
    }

    /// Pinned objects merged so far in this pause
    pub fn pinned_objects(&self) -> usize {
        self.pinned_objects.load(Ordering::Acquire)
    }

    pub fn publish_alloc_stats(&self, stats: &AllocBufferStats) {
        self.alloc_stats.lock().merge(stats);
    }

    pub fn alloc_stats(&self) -> AllocBufferStats {
        *self.alloc_stats.lock()
    }

    pub fn publish_flush_stats(&self, stats: &FlushStats) {
        self.flush_stats.lock().merge(stats);
    }

    pub fn flush_stats(&self) -> FlushStats {
        *self.flush_stats.lock()
    }

    pub fn record_phase_time(&self, phase: &'static str, elapsed: std::time::Duration) {
        self.phase_times.lock().record(phase, elapsed);
    }

    pub fn phase_times(&self) -> PhaseTimes {
        self.phase_times.lock().clone()
    }
}
