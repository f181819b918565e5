//! Retire allocation buffers and flush logs of mutator threads (parallel)
//!
//! Workers claim mutator threads through a shared index into the pause
//! snapshot until the index runs past the end. Per claimed thread:
//!
//! 1. retire the allocation buffer, returning its tail to the region;
//! 2. move the barrier log into the global buffer list;
//! 3. merge the pin count cache into the pause's pinned-object counter.
//!
//! The claimed thread's state is exclusively owned by the claiming worker.
//! The only shared writes are the list append, the pin counter add and one
//! statistics merge per `do_work` call.

use crate::allocator::AllocBufferStats;
use crate::barrier::FlushStats;
use crate::dispatch::{Subtask, SubtaskKind};
use crate::error::Result;
use crate::runtime::{MutatorThread, PauseContext};
use crate::stats::phase_times::RETIRE_BUFFERS_AND_FLUSH_LOGS;
use crate::stats::GcTimer;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Statistics of a completed mutator sweep
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MutatorFlushStats {
    /// Threads processed
    pub threads_processed: usize,
    /// Sum of pin counts taken from the caches, before merging
    pub pinned_delta: usize,
    /// Buffer retirement statistics
    pub alloc: AllocBufferStats,
    /// Log flush statistics
    pub flush: FlushStats,
    /// Longest time any worker spent in the sweep
    pub elapsed: Duration,
}

pub(crate) struct MutatorFlushTask<'a> {
    ctx: &'a PauseContext,
    threads_per_worker: usize,
    claimer: CachePadded<AtomicUsize>,
    threads_processed: AtomicUsize,
    pinned_delta: AtomicUsize,
    alloc_stats: Mutex<AllocBufferStats>,
    flush_stats: Mutex<FlushStats>,
    elapsed_ns: AtomicU64,
}

impl<'a> MutatorFlushTask<'a> {
    pub(crate) fn new(ctx: &'a PauseContext, threads_per_worker: usize) -> Self {
        Self {
            ctx,
            threads_per_worker: threads_per_worker.max(1),
            claimer: CachePadded::new(AtomicUsize::new(0)),
            threads_processed: AtomicUsize::new(0),
            pinned_delta: AtomicUsize::new(0),
            alloc_stats: Mutex::new(AllocBufferStats::default()),
            flush_stats: Mutex::new(FlushStats::default()),
            elapsed_ns: AtomicU64::new(0),
        }
    }

    pub(crate) fn stats(&self) -> MutatorFlushStats {
        MutatorFlushStats {
            threads_processed: self.threads_processed.load(Ordering::Acquire),
            pinned_delta: self.pinned_delta.load(Ordering::Acquire),
            alloc: *self.alloc_stats.lock(),
            flush: *self.flush_stats.lock(),
            elapsed: Duration::from_nanos(self.elapsed_ns.load(Ordering::Acquire)),
        }
    }

    fn process(&self, thread: &mut MutatorThread, work: &mut WorkerLocal) -> Result<()> {
        thread.ensure_stopped()?;
        let id = thread.id();

        if let Some(retired) = thread.alloc_buffer_mut().retire()? {
            self.ctx.regions().return_tail(id, &retired)?;
            work.alloc.record(&retired);
        }

        let buffer = thread.barrier_log_mut().take_buffer(id)?;
        work.flush.record(buffer.as_ref());
        if let Some(buffer) = buffer {
            self.ctx.log_buffers().enqueue(buffer);
        }

        let pins = thread.pin_cache_mut().flush();
        if pins > 0 {
            self.ctx.add_pinned(pins);
        }
        work.pins += pins;
        work.threads += 1;
        Ok(())
    }
}

#[derive(Default)]
struct WorkerLocal {
    threads: usize,
    pins: usize,
    alloc: AllocBufferStats,
    flush: FlushStats,
}

impl Subtask for MutatorFlushTask<'_> {
    fn name(&self) -> &'static str {
        RETIRE_BUFFERS_AND_FLUSH_LOGS
    }

    fn kind(&self) -> SubtaskKind {
        SubtaskKind::Parallel
    }

    fn worker_cost(&self) -> f64 {
        self.ctx.mutators().len() as f64 / self.threads_per_worker as f64
    }

    fn do_work(&self, worker_id: usize) -> Result<()> {
        let timer = GcTimer::new();
        let snapshot = self.ctx.mutators();
        let mut work = WorkerLocal::default();

        loop {
            let index = self.claimer.fetch_add(1, Ordering::Relaxed);
            if index >= snapshot.len() {
                break;
            }
            let mut thread = snapshot.claim(index)?;
            self.process(&mut thread, &mut work)?;
        }

        self.threads_processed.fetch_add(work.threads, Ordering::AcqRel);
        self.pinned_delta.fetch_add(work.pins, Ordering::AcqRel);
        self.alloc_stats.lock().merge(&work.alloc);
        self.flush_stats.lock().merge(&work.flush);
        self.elapsed_ns.fetch_max(timer.elapsed_ns(), Ordering::AcqRel);

        log::trace!(
            "[GC Worker {}] {}: {} threads, {} entries",
            worker_id,
            RETIRE_BUFFERS_AND_FLUSH_LOGS,
            work.threads,
            work.flush.entries_flushed
        );
        Ok(())
    }
}
