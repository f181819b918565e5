//! Flush logs of internal threads (serial)
//!
//! Internal threads neither allocate through mutator buffers nor record
//! pins, so only their barrier logs are moved to the global list.

use crate::barrier::FlushStats;
use crate::dispatch::{Subtask, SubtaskKind};
use crate::error::Result;
use crate::runtime::PauseContext;
use crate::stats::phase_times::INTERNAL_FLUSH_LOGS;
use crate::stats::GcTimer;
use parking_lot::Mutex;
use std::time::Duration;

/// Statistics of a completed internal-thread sweep
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InternalFlushStats {
    /// Log flush statistics
    pub flush: FlushStats,
    /// Time spent in the sweep
    pub elapsed: Duration,
}

pub(crate) struct InternalFlushTask<'a> {
    ctx: &'a PauseContext,
    stats: Mutex<InternalFlushStats>,
}

impl<'a> InternalFlushTask<'a> {
    pub(crate) fn new(ctx: &'a PauseContext) -> Self {
        Self {
            ctx,
            stats: Mutex::new(InternalFlushStats::default()),
        }
    }

    pub(crate) fn stats(&self) -> InternalFlushStats {
        *self.stats.lock()
    }
}

impl Subtask for InternalFlushTask<'_> {
    fn name(&self) -> &'static str {
        INTERNAL_FLUSH_LOGS
    }

    fn kind(&self) -> SubtaskKind {
        SubtaskKind::Serial
    }

    fn worker_cost(&self) -> f64 {
        1.0
    }

    fn do_work(&self, _worker_id: usize) -> Result<()> {
        let timer = GcTimer::new();
        let snapshot = self.ctx.internals();
        let mut flush = FlushStats::default();

        for index in 0..snapshot.len() {
            let mut thread = snapshot.claim(index)?;
            thread.ensure_present()?;

            let id = thread.id();
            let buffer = thread.barrier_log_mut().take_buffer(id)?;
            flush.record(buffer.as_ref());
            if let Some(buffer) = buffer {
                self.ctx.log_buffers().enqueue(buffer);
            }
        }

        let mut stats = self.stats.lock();
        stats.flush.merge(&flush);
        stats.elapsed += timer.elapsed();
        Ok(())
    }
}
