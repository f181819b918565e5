//! Dispatch Module - Batched Subtasks on a Worker Gang
//!
//! A pause phase is expressed as an ordered list of subtasks. The
//! dispatcher runs them one after another across a gang of workers:
//!
//! - a **parallel** subtask is entered by every active worker, each worker
//!   calling [`Subtask::do_work`] and returning once no work is left;
//! - a **serial** subtask is entered by exactly one worker;
//! - every worker leaves subtask N before any worker enters subtask N+1.
//!
//! Any scheduler honouring that contract can implement [`Dispatcher`];
//! [`WorkerGang`] is the scoped-thread implementation used by the collector.

pub mod gang;

pub use gang::WorkerGang;

use crate::error::Result;
use std::time::Duration;

/// How a subtask is spread over the gang
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskKind {
    /// Entered concurrently by every active worker
    Parallel,
    /// Entered by a single worker
    Serial,
}

/// Unit of work registered with a dispatcher
///
/// `do_work` must be re-entrant: for a parallel subtask every active worker
/// calls it concurrently and each call claims work until none is left.
pub trait Subtask: Sync {
    /// Phase name used in logs and phase times
    fn name(&self) -> &'static str;

    /// Parallel or serial
    fn kind(&self) -> SubtaskKind;

    /// Estimated number of workers this subtask can keep busy
    fn worker_cost(&self) -> f64;

    /// Per-worker entry point
    fn do_work(&self, worker_id: usize) -> Result<()>;
}

/// Capability to run ordered subtasks across a worker pool
pub trait Dispatcher {
    /// Size of the worker pool
    fn total_workers(&self) -> usize;

    /// Run `subtasks` in order with a full barrier between consecutive ones
    ///
    /// Blocks until the last subtask has completed. The first error stops
    /// later subtasks from starting and is returned unchanged.
    fn run_batch(&self, subtasks: &[&dyn Subtask]) -> Result<BatchReport>;
}

/// Outcome of a completed batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Workers activated for parallel subtasks
    pub active_workers: usize,
    /// Wall time of each subtask, in run order
    pub subtask_times: Vec<(&'static str, Duration)>,
}

/// Number of workers to activate for a batch
///
/// The largest worker cost of any parallel subtask, rounded up and clamped
/// to `1..=max_workers`.
pub fn estimate_workers(subtasks: &[&dyn Subtask], max_workers: usize) -> usize {
    let cost = subtasks
        .iter()
        .filter(|subtask| subtask.kind() == SubtaskKind::Parallel)
        .map(|subtask| subtask.worker_cost())
        .fold(0.0_f64, f64::max);

    let wanted = if cost.is_finite() { cost.ceil() as usize } else { 1 };
    wanted.clamp(1, max_workers.max(1))
}
