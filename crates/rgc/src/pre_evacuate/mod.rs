//! Pre-Evacuate Module - Flush Per-Thread State Before Evacuation
//!
//! Before live objects are copied out of the collection set, every thread's
//! transient state has to be made globally visible:
//!
//! ```text
//! construct ──► baseline captured ──► run
//!                                      │
//!             ┌────────────────────────┘
//!             ▼
//!   RetireBuffersAndFlushLogs (parallel, all active workers)
//!             │
//!          barrier
//!             ▼
//!   InternalThreadFlushLogs (serial, one worker)
//!             │
//!             ▼
//!   PreEvacuateOutcome (deltas, statistics, phase times)
//! ```
//!
//! The two subtasks touch disjoint thread sets. They run in sequence because
//! the internal-thread set is small and a parallel sweep over it would cost
//! more in synchronization than it saves.

pub mod internal_flush;
pub mod mutator_flush;
mod verify;

pub use internal_flush::InternalFlushStats;
pub use mutator_flush::MutatorFlushStats;

use crate::allocator::AllocBufferStats;
use crate::barrier::FlushStats;
use crate::config::PrepConfig;
use crate::dispatch::Dispatcher;
use crate::error::{PrepError, Result};
use crate::logging::{self, PauseEvent};
use crate::runtime::PauseContext;
use crate::stats::phase_times::{INTERNAL_FLUSH_LOGS, PRE_EVACUATE, RETIRE_BUFFERS_AND_FLUSH_LOGS};
use crate::stats::{GcTimer, PhaseTimes};
use internal_flush::InternalFlushTask;
use mutator_flush::MutatorFlushTask;
use serde::Serialize;
use std::time::Duration;

/// PreEvacuateBatchTask - orchestrates the pre-evacuation flush
///
/// Owns the two subtasks for its whole lifetime. Construction reads the
/// pending-entries baseline; [`run`](Self::run) consumes the task, so a
/// pause can only be prepared once per task.
///
/// # Examples
///
/// ```rust
/// use rgc::{GlobalLogBufferList, PauseContext, PreEvacuateBatchTask, PrepConfig, RegionTable, WorkerGang};
/// use std::sync::Arc;
///
/// let ctx = PauseContext::begin(
///     1,
///     Vec::new(),
///     Vec::new(),
///     Arc::new(GlobalLogBufferList::new()),
///     Arc::new(RegionTable::new(1, 4096).unwrap()),
/// );
/// let config = PrepConfig::default();
/// let gang = WorkerGang::from_config(&config).unwrap();
///
/// let outcome = PreEvacuateBatchTask::new(&ctx, &config).run(&gang).unwrap();
/// assert_eq!(outcome.new_pending_entries(), 0);
/// assert_eq!(outcome.pinned_delta(), 0);
/// ```
pub struct PreEvacuateBatchTask<'a> {
    ctx: &'a PauseContext,
    verify: bool,
    verbose: bool,
    old_pending_entries: usize,
    mutator_task: MutatorFlushTask<'a>,
    internal_task: InternalFlushTask<'a>,
}

impl<'a> PreEvacuateBatchTask<'a> {
    /// Capture the pending-entries baseline and create both subtasks
    pub fn new(ctx: &'a PauseContext, config: &PrepConfig) -> Self {
        let old_pending_entries = ctx.log_buffers().num_entries();

        Self {
            ctx,
            verify: config.verify_after_flush,
            verbose: config.verbose,
            old_pending_entries,
            mutator_task: MutatorFlushTask::new(ctx, config.threads_per_worker),
            internal_task: InternalFlushTask::new(ctx),
        }
    }

    /// Pending entries in the global list when the task was created
    pub fn old_pending_entries(&self) -> usize {
        self.old_pending_entries
    }

    /// Run both subtasks on `dispatcher` and block until they complete
    pub fn run(self, dispatcher: &dyn Dispatcher) -> Result<PreEvacuateOutcome> {
        let pause = self.ctx.pause_id();
        let timer = GcTimer::new();

        if self.verbose {
            log::info!(
                "Pause {}: {} ({} mutator, {} internal threads, {} workers available)",
                pause,
                PRE_EVACUATE,
                self.ctx.mutators().len(),
                self.ctx.internals().len(),
                dispatcher.total_workers()
            );
        }
        emit(
            self.verbose,
            PauseEvent::PhaseStart {
                phase: PRE_EVACUATE.to_string(),
                pause,
            },
        );

        match self.execute(dispatcher, &timer) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                log::error!("Pause {}: {} failed: {}", pause, PRE_EVACUATE, err);
                logging::log_event(PauseEvent::InvariantViolation {
                    pause,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn execute(self, dispatcher: &dyn Dispatcher, timer: &GcTimer) -> Result<PreEvacuateOutcome> {
        let ctx = self.ctx;
        let report = dispatcher.run_batch(&[&self.mutator_task, &self.internal_task])?;

        let current = ctx.log_buffers().num_entries();
        if current < self.old_pending_entries {
            return Err(PrepError::PendingCountRegressed {
                baseline: self.old_pending_entries,
                current,
            });
        }

        let mutator = self.mutator_task.stats();
        let internal = self.internal_task.stats();

        if self.verify {
            verify::verify_flushed(ctx, mutator.threads_processed)?;

            let flushed = mutator.flush.entries_flushed + internal.flush.entries_flushed;
            if current - self.old_pending_entries != flushed {
                return Err(PrepError::Internal(format!(
                    "pending entries grew by {}, subtasks flushed {}",
                    current - self.old_pending_entries,
                    flushed
                )));
            }
        }

        ctx.publish_alloc_stats(&mutator.alloc);
        ctx.publish_flush_stats(&mutator.flush);
        ctx.publish_flush_stats(&internal.flush);
        for &(phase, elapsed) in &report.subtask_times {
            ctx.record_phase_time(phase, elapsed);
        }
        ctx.record_phase_time(PRE_EVACUATE, timer.elapsed());

        let outcome = PreEvacuateOutcome {
            pause_id: ctx.pause_id(),
            active_workers: report.active_workers,
            old_pending_entries: self.old_pending_entries,
            new_pending_entries: current - self.old_pending_entries,
            mutator,
            internal,
            phase_times: ctx.phase_times(),
        };
        outcome.log_events(self.verbose);

        Ok(outcome)
    }
}

/// Elapsed wall time of each subtask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtaskTimes {
    pub mutator: Duration,
    pub internal: Duration,
}

/// PreEvacuateOutcome - statistics of a completed pre-evacuation
#[derive(Debug, Clone)]
pub struct PreEvacuateOutcome {
    pause_id: u64,
    active_workers: usize,
    old_pending_entries: usize,
    new_pending_entries: usize,
    mutator: MutatorFlushStats,
    internal: InternalFlushStats,
    phase_times: PhaseTimes,
}

impl PreEvacuateOutcome {
    /// Entries added to the global list by this phase
    pub fn new_pending_entries(&self) -> usize {
        self.new_pending_entries
    }

    /// Sum of pin counts taken from mutator caches
    pub fn pinned_delta(&self) -> usize {
        self.mutator.pinned_delta
    }

    pub fn per_subtask_elapsed_time(&self) -> SubtaskTimes {
        SubtaskTimes {
            mutator: self.mutator.elapsed,
            internal: self.internal.elapsed,
        }
    }

    pub fn old_pending_entries(&self) -> usize {
        self.old_pending_entries
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers
    }

    pub fn mutator_stats(&self) -> &MutatorFlushStats {
        &self.mutator
    }

    pub fn internal_stats(&self) -> &InternalFlushStats {
        &self.internal
    }

    pub fn phase_times(&self) -> &PhaseTimes {
        &self.phase_times
    }

    /// Serializable summary of the phase
    pub fn summary(&self) -> PreEvacuateSummary {
        PreEvacuateSummary {
            pause_id: self.pause_id,
            active_workers: self.active_workers,
            old_pending_entries: self.old_pending_entries,
            new_pending_entries: self.new_pending_entries,
            mutator_threads: self.mutator.threads_processed,
            pinned_delta: self.mutator.pinned_delta,
            alloc_buffers: self.mutator.alloc,
            mutator_flush: self.mutator.flush,
            internal_flush: self.internal.flush,
            phase_times: self.phase_times.clone(),
        }
    }

    /// Summary as a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.summary())
            .map_err(|e| PrepError::Internal(format!("summary serialization failed: {}", e)))
    }

    fn log_events(&self, verbose: bool) {
        let pause = self.pause_id;
        let alloc = &self.mutator.alloc;
        let report = |event| emit(verbose, event);

        report(PauseEvent::BufferRetirement {
            pause,
            buffers_retired: alloc.buffers_retired,
            total_refills: alloc.total_refills,
            waste_bytes: alloc.waste_bytes,
        });
        report(PauseEvent::LogFlush {
            phase: RETIRE_BUFFERS_AND_FLUSH_LOGS.to_string(),
            pause,
            buffers: self.mutator.flush.buffers_flushed,
            entries: self.mutator.flush.entries_flushed,
        });
        report(PauseEvent::LogFlush {
            phase: INTERNAL_FLUSH_LOGS.to_string(),
            pause,
            buffers: self.internal.flush.buffers_flushed,
            entries: self.internal.flush.entries_flushed,
        });
        report(PauseEvent::PinMerge {
            pause,
            pinned: self.mutator.pinned_delta,
        });
        report(PauseEvent::PendingEntries {
            pause,
            baseline: self.old_pending_entries,
            new_entries: self.new_pending_entries,
        });
        report(PauseEvent::PhaseEnd {
            phase: PRE_EVACUATE.to_string(),
            pause,
            duration_ms: self
                .phase_times
                .get(PRE_EVACUATE)
                .map(|d| d.as_secs_f64() * 1000.0)
                .unwrap_or(0.0),
        });

        log::debug!("Pause {}: {:?}", pause, self.summary());
    }
}

/// Verbose pauses report Debug and Trace events as well
fn emit(verbose: bool, event: PauseEvent) {
    if verbose {
        logging::log_verbose_event(event);
    } else {
        logging::log_event(event);
    }
}

/// PreEvacuateSummary - pause statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct PreEvacuateSummary {
    pub pause_id: u64,
    pub active_workers: usize,
    pub old_pending_entries: usize,
    pub new_pending_entries: usize,
    pub mutator_threads: usize,
    pub pinned_delta: usize,
    pub alloc_buffers: AllocBufferStats,
    pub mutator_flush: FlushStats,
    pub internal_flush: FlushStats,
    pub phase_times: PhaseTimes,
}
