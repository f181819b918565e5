//! # RGC - Pre-Evacuation Preparation for Young Pauses
//!
//! RGC implements the phase of a region-based, parallel collector's young
//! pause that runs right before evacuation. With every mutator stopped at a
//! safepoint, it flushes each thread's transient state to a consistent,
//! globally visible form so the copy phase never races with stale
//! per-thread buffers or miscounts barrier work.
//!
//! ## Overview
//!
//! - **Allocation Buffers**: Every mutator buffer is retired; the unused
//!   tail goes back to its region's free-space accounting
//! - **Barrier Logs**: Every thread's write-barrier log moves to the global
//!   log buffer list consumed by remembered-set refinement
//! - **Pin Counts**: Per-thread pinned-object caches merge into one
//!   pause-wide counter
//! - **Exactly-Once Processing**: Workers claim threads through an atomic
//!   index over a claim-once snapshot
//!
//! ## Quick Start
//!
//! ```rust
//! use rgc::{GlobalLogBufferList, MutatorThread, PauseContext, PrepConfig, RegionTable, ThreadState};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), rgc::PrepError> {
//!     let mut thread = MutatorThread::new(1, 8)?;
//!     thread.barrier_log_mut().record(0x1000_0040);
//!     thread.pin_cache_mut().pin();
//!     thread.set_state(ThreadState::Safepoint);
//!
//!     let ctx = PauseContext::begin(
//!         1,
//!         vec![thread],
//!         Vec::new(),
//!         Arc::new(GlobalLogBufferList::new()),
//!         Arc::new(RegionTable::new(4, 64 * 1024)?),
//!     );
//!
//!     let outcome = rgc::prepare(&ctx, &PrepConfig::default())?;
//!     assert_eq!(outcome.new_pending_entries(), 1);
//!     assert_eq!(outcome.pinned_delta(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Mutator Threads (at safepoint)              │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐              │
//! │  │ buffer   │  │ buffer   │  │ buffer   │              │
//! │  │ log/pins │  │ log/pins │  │ log/pins │              │
//! │  └────┬─────┘  └────┬─────┘  └────┬─────┘              │
//! └───────┼─────────────┼─────────────┼─────────────────────┘
//!         │   claim-once snapshot     │
//! ┌───────┼─────────────┼─────────────┼─────────────────────┐
//! │       ▼             ▼             ▼     Worker Gang      │
//! │  RetireBuffersAndFlushLogs (parallel)                    │
//! │       │                                                  │
//! │    barrier                                               │
//! │       ▼                                                  │
//! │  InternalThreadFlushLogs (serial)                        │
//! └───────┬──────────────────────────┬──────────────────────┘
//!         ▼                          ▼
//!  GlobalLogBufferList        RegionTable / pin counter
//! ```
//!
//! ## Modules
//!
//! - [`allocator`]: Per-thread allocation buffers and retirement statistics
//! - [`barrier`]: Barrier logs and the global log buffer list
//! - [`config`]: Phase configuration and validation
//! - [`dispatch`]: Subtask and dispatcher contract, scoped worker gang
//! - [`error`]: Error types for all operations
//! - [`heap`]: Region free-space accounting
//! - [`logging`]: Structured pause events
//! - [`pre_evacuate`]: The batched pre-evacuation task
//! - [`runtime`]: Thread records, claim-once snapshots, pause context
//! - [`stats`]: Timers and phase times

// Core modules
pub mod config;
pub mod error;
pub mod pre_evacuate;

// Thread-local state and its destinations
pub mod allocator;
pub mod barrier;
pub mod heap;
pub mod runtime;

// Scheduling
pub mod dispatch;

// Monitoring
pub mod logging;
pub mod stats;

// Re-export main types for convenience
pub use config::{ConfigError, PrepConfig};
pub use error::{PrepError, Result};
pub use barrier::{GlobalLogBufferList, LogBuffer, LogEntry};
pub use dispatch::{Dispatcher, Subtask, SubtaskKind, WorkerGang};
pub use heap::RegionTable;
pub use pre_evacuate::{PreEvacuateBatchTask, PreEvacuateOutcome, PreEvacuateSummary, SubtaskTimes};
pub use runtime::{InternalThread, MutatorThread, PauseContext, ThreadState};

/// RGC version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prepare a pause for evacuation on a gang sized by `config`
///
/// Builds a [`WorkerGang`] from the configuration and runs a
/// [`PreEvacuateBatchTask`] over `ctx`. Coordinators that keep a gang across
/// pauses should construct the task themselves and reuse their gang.
///
/// # Returns
///
/// - `Ok(PreEvacuateOutcome)` - Every thread flushed exactly once
/// - `Err(PrepError)` - Invalid configuration or an invariant violation
pub fn prepare(ctx: &PauseContext, config: &PrepConfig) -> Result<PreEvacuateOutcome> {
    let gang = WorkerGang::from_config(config)?;
    PreEvacuateBatchTask::new(ctx, config).run(&gang)
}
