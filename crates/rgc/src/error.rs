//! Error Module - Pre-Evacuation Error Types
//!
//! Defines all error types raised while preparing a young pause for
//! evacuation.
//!
//! # Error Categories
//!
//! ## Invariant Violations (fatal)
//! - `MissingThread` - A snapshotted thread vanished mid-pause
//! - `ThreadNotAtSafepoint` - A snapshotted mutator is still running
//! - `DoubleClaim` - A snapshot slot was handed to two workers
//! - `UnprocessedThread` - A snapshot slot was never claimed
//! - `InconsistentBuffer` / `InconsistentLog` - Per-thread state is corrupt
//! - `PendingCountRegressed` - Global pending entries fell below the baseline
//! - `WorkerPanicked` - A worker died inside a subtask
//!
//! ## Setup Errors
//! - `Configuration` - Invalid configuration
//! - `InvalidArgument` - Invalid function argument
//!
//! None of the invariant violations are retried: reprocessing already
//! flushed state would break exactly-once processing. The pause aborts and
//! the error is the diagnostic report.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for all pre-evacuation operations
///
/// # Examples
///
/// ```rust
/// use rgc::PrepError;
///
/// fn report(err: &PrepError) {
///     if err.is_fatal() {
///         eprintln!("pause aborted: {}", err);
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum PrepError {
    /// A thread captured in the pause snapshot has exited
    ///
    /// **When returned:** Claimed snapshot slot holds an exited thread
    ///
    /// **Recovery strategy:** None - thread bookkeeping is corrupt
    #[error("Snapshotted thread {thread} is no longer present")]
    MissingThread { thread: u64 },

    /// A mutator thread is not stopped at the safepoint
    ///
    /// **When returned:** Claimed mutator reports a non-safepoint state
    ///
    /// **Recovery strategy:** None - the safepoint protocol was violated
    #[error("Thread {thread} is not stopped at the safepoint (state: {state})")]
    ThreadNotAtSafepoint { thread: u64, state: String },

    /// A snapshot slot was claimed more than once
    #[error("Snapshot slot {index} claimed twice")]
    DoubleClaim { index: usize },

    /// A snapshot slot was never claimed by any worker
    #[error("Snapshot slot {index} of {phase} was never processed")]
    UnprocessedThread { phase: &'static str, index: usize },

    /// Snapshot index outside the snapshot
    #[error("Bounds check failed: index {index} out of bounds for length {length}")]
    BoundsCheckFailed { index: usize, length: usize },

    /// Allocation buffer state is inconsistent
    ///
    /// **Example scenarios:**
    /// - Buffer owned by a different thread
    /// - Top pointer outside `[start, end]`
    /// - Chunk not inside the region it was recorded against
    /// - Buffer still active after retirement
    #[error("Inconsistent allocation buffer for thread {thread}: {reason}")]
    InconsistentBuffer { thread: u64, reason: String },

    /// Barrier log state is inconsistent
    ///
    /// **Example scenarios:**
    /// - Log owned by a different thread
    /// - Entries left behind after a flush
    #[error("Inconsistent barrier log for thread {thread}: {reason}")]
    InconsistentLog { thread: u64, reason: String },

    /// Pin cache still holds a count after the merge
    #[error("Pin count cache for thread {thread} still holds {count} pins")]
    UnmergedPins { thread: u64, count: usize },

    /// Global pending entries dropped below the captured baseline
    #[error("Pending entry count {current} fell below baseline {baseline}")]
    PendingCountRegressed { baseline: usize, current: usize },

    /// Retired tail reported against a region that does not exist
    #[error("Unknown region {region} (table has {regions} regions)")]
    UnknownRegion { region: usize, regions: usize },

    /// A worker panicked inside a subtask
    #[error("Worker {worker} panicked during {subtask}: {message}")]
    WorkerPanicked {
        worker: usize,
        subtask: &'static str,
        message: String,
    },

    /// Worker thread could not be spawned
    #[error("Failed to spawn worker {worker}: {reason}")]
    WorkerSpawn { worker: usize, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error - indicates a bug
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    /// Check if this error must abort the pause
    ///
    /// Everything raised once a pause is under way is fatal; only setup
    /// errors happen before any thread state is touched.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PrepError::Configuration(_) | PrepError::InvalidArgument(_)
        )
    }

    /// Check if this error indicates heap or thread bookkeeping corruption
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            PrepError::DoubleClaim { .. }
                | PrepError::UnprocessedThread { .. }
                | PrepError::BoundsCheckFailed { .. }
                | PrepError::InconsistentBuffer { .. }
                | PrepError::InconsistentLog { .. }
                | PrepError::UnmergedPins { .. }
                | PrepError::PendingCountRegressed { .. }
                | PrepError::Internal(_)
        )
    }
}

/// Result type alias for pre-evacuation operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_violations_are_fatal() {
        let err = PrepError::DoubleClaim { index: 3 };
        assert!(err.is_fatal());
        assert!(err.is_bug());

        let err = PrepError::MissingThread { thread: 7 };
        assert!(err.is_fatal());
        assert!(!err.is_bug());
    }

    #[test]
    fn test_setup_errors_are_not_fatal() {
        let err = PrepError::InvalidArgument("bad".to_string());
        assert!(!err.is_fatal());

        let err: PrepError = ConfigError::InvalidWorkerThreads("0".to_string()).into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = PrepError::PendingCountRegressed {
            baseline: 100,
            current: 90,
        };
        assert_eq!(
            err.to_string(),
            "Pending entry count 90 fell below baseline 100"
        );
    }
}
