//! Post-flush verification
//!
//! Run after the batch when `verify_after_flush` is set. Every snapshotted
//! thread must have been processed exactly once and left with no transient
//! state behind.

use crate::ensure;
use crate::error::{PrepError, Result};
use crate::runtime::PauseContext;
use crate::stats::phase_times::{INTERNAL_FLUSH_LOGS, RETIRE_BUFFERS_AND_FLUSH_LOGS};

/// Check that the pause left no unflushed thread state
pub(crate) fn verify_flushed(ctx: &PauseContext, mutators_processed: usize) -> Result<()> {
    let mutators = ctx.mutators();
    ensure!(
        mutators_processed == mutators.len(),
        PrepError::Internal(format!(
            "{} mutator threads processed, snapshot holds {}",
            mutators_processed,
            mutators.len()
        ))
    );

    for index in 0..mutators.len() {
        let thread = mutators.get(index).ok_or(PrepError::UnprocessedThread {
            phase: RETIRE_BUFFERS_AND_FLUSH_LOGS,
            index,
        })?;

        ensure!(
            !thread.alloc_buffer().is_active(),
            PrepError::InconsistentBuffer {
                thread: thread.id(),
                reason: "buffer still active after retirement".to_string(),
            }
        );
        ensure!(
            thread.barrier_log().is_empty(),
            PrepError::InconsistentLog {
                thread: thread.id(),
                reason: format!("{} entries left after flush", thread.barrier_log().len()),
            }
        );
        ensure!(
            thread.pin_cache().count() == 0,
            PrepError::UnmergedPins {
                thread: thread.id(),
                count: thread.pin_cache().count(),
            }
        );
    }

    let internals = ctx.internals();
    for index in 0..internals.len() {
        let thread = internals.get(index).ok_or(PrepError::UnprocessedThread {
            phase: INTERNAL_FLUSH_LOGS,
            index,
        })?;

        ensure!(
            thread.barrier_log().is_empty(),
            PrepError::InconsistentLog {
                thread: thread.id(),
                reason: format!("{} entries left after flush", thread.barrier_log().len()),
            }
        );
    }

    Ok(())
}
