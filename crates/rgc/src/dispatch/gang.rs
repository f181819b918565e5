//! Worker Gang - scoped GC worker threads
//!
//! Each subtask runs inside its own thread scope: the scope join is the
//! barrier between subtasks, so no worker can still be inside subtask N
//! when subtask N+1 starts.
//!
//! A panic inside a subtask is caught on the worker and reported as
//! `WorkerPanicked`; the pause cannot continue past it.

use crate::config::PrepConfig;
use crate::dispatch::{estimate_workers, BatchReport, Dispatcher, Subtask, SubtaskKind};
use crate::error::{PrepError, Result};
use crate::stats::GcTimer;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// WorkerGang - fixed-size pool of GC workers
pub struct WorkerGang {
    /// Thread name prefix
    name: String,
    /// Pool size
    total_workers: usize,
}

impl WorkerGang {
    /// Create a gang of `total_workers` workers
    pub fn new(total_workers: usize) -> Result<Self> {
        Self::with_name("gc-worker", total_workers)
    }

    /// Create a gang whose threads are named `{name}-{worker_id}`
    pub fn with_name(name: impl Into<String>, total_workers: usize) -> Result<Self> {
        if total_workers == 0 {
            return Err(PrepError::InvalidArgument(
                "worker gang needs at least one worker".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            total_workers,
        })
    }

    /// Create a gang sized by configuration
    pub fn from_config(config: &PrepConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.effective_worker_threads())
    }

    fn run_subtask(&self, subtask: &dyn Subtask, workers: usize) -> Result<()> {
        let failure: Mutex<Option<PrepError>> = Mutex::new(None);
        let record = |err: PrepError| {
            let mut slot = failure.lock();
            if slot.is_none() {
                *slot = Some(err);
            }
        };

        let scope_result = crossbeam::thread::scope(|scope| {
            for worker_id in 0..workers {
                let record = &record;
                let spawned = scope
                    .builder()
                    .name(format!("{}-{}", self.name, worker_id))
                    .spawn(move |_| {
                        if let Err(err) = run_guarded(subtask, worker_id) {
                            log::error!(
                                "[GC Worker {}] {} failed: {}",
                                worker_id,
                                subtask.name(),
                                err
                            );
                            record(err);
                        }
                    });

                if let Err(e) = spawned {
                    record(PrepError::WorkerSpawn {
                        worker: worker_id,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        });

        if scope_result.is_err() {
            return Err(PrepError::Internal(format!(
                "worker scope for {} panicked outside a subtask",
                subtask.name()
            )));
        }

        match failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Dispatcher for WorkerGang {
    fn total_workers(&self) -> usize {
        self.total_workers
    }

    fn run_batch(&self, subtasks: &[&dyn Subtask]) -> Result<BatchReport> {
        let active_workers = estimate_workers(subtasks, self.total_workers);
        let mut report = BatchReport {
            active_workers,
            subtask_times: Vec::with_capacity(subtasks.len()),
        };

        for &subtask in subtasks {
            let workers = match subtask.kind() {
                SubtaskKind::Parallel => active_workers,
                SubtaskKind::Serial => 1,
            };

            let timer = GcTimer::new();
            self.run_subtask(subtask, workers)?;
            let elapsed = timer.elapsed();

            log::trace!(
                "{} finished on {} worker(s) in {:?}",
                subtask.name(),
                workers,
                elapsed
            );
            report.subtask_times.push((subtask.name(), elapsed));
        }

        Ok(report)
    }
}

fn run_guarded(subtask: &dyn Subtask, worker_id: usize) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| subtask.do_work(worker_id))) {
        Ok(result) => result,
        Err(payload) => Err(PrepError::WorkerPanicked {
            worker: worker_id,
            subtask: subtask.name(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Parallel subtask that hands out `items` work items one at a time
    struct Counting {
        items: usize,
        next: AtomicUsize,
        done: AtomicUsize,
        workers_seen: Mutex<HashSet<usize>>,
        cost: f64,
    }

    impl Counting {
        fn new(items: usize, cost: f64) -> Self {
            Self {
                items,
                next: AtomicUsize::new(0),
                done: AtomicUsize::new(0),
                workers_seen: Mutex::new(HashSet::new()),
                cost,
            }
        }
    }

    impl Subtask for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn kind(&self) -> SubtaskKind {
            SubtaskKind::Parallel
        }

        fn worker_cost(&self) -> f64 {
            self.cost
        }

        fn do_work(&self, worker_id: usize) -> Result<()> {
            self.workers_seen.lock().insert(worker_id);
            while self.next.fetch_add(1, Ordering::Relaxed) < self.items {
                self.done.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    /// Serial subtask that checks the parallel one has fully finished
    struct AfterBarrier<'a> {
        before: &'a Counting,
        entries: AtomicUsize,
        saw_complete: AtomicBool,
    }

    impl Subtask for AfterBarrier<'_> {
        fn name(&self) -> &'static str {
            "after-barrier"
        }

        fn kind(&self) -> SubtaskKind {
            SubtaskKind::Serial
        }

        fn worker_cost(&self) -> f64 {
            1.0
        }

        fn do_work(&self, _worker_id: usize) -> Result<()> {
            self.entries.fetch_add(1, Ordering::Relaxed);
            let complete = self.before.done.load(Ordering::Relaxed) == self.before.items;
            self.saw_complete.store(complete, Ordering::Relaxed);
            Ok(())
        }
    }

    struct Failing;

    impl Subtask for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn kind(&self) -> SubtaskKind {
            SubtaskKind::Parallel
        }

        fn worker_cost(&self) -> f64 {
            2.0
        }

        fn do_work(&self, worker_id: usize) -> Result<()> {
            Err(PrepError::MissingThread {
                thread: worker_id as u64,
            })
        }
    }

    struct Panicking;

    impl Subtask for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn kind(&self) -> SubtaskKind {
            SubtaskKind::Serial
        }

        fn worker_cost(&self) -> f64 {
            1.0
        }

        fn do_work(&self, _worker_id: usize) -> Result<()> {
            panic!("boom");
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerGang::new(0).is_err());
    }

    #[test]
    fn test_parallel_then_serial_with_barrier() {
        let gang = WorkerGang::new(4).unwrap();
        let parallel = Counting::new(10_000, 4.0);
        let serial = AfterBarrier {
            before: &parallel,
            entries: AtomicUsize::new(0),
            saw_complete: AtomicBool::new(false),
        };

        let report = gang.run_batch(&[&parallel, &serial]).unwrap();

        assert_eq!(report.active_workers, 4);
        assert_eq!(parallel.done.load(Ordering::Relaxed), 10_000);
        assert_eq!(parallel.workers_seen.lock().len(), 4);
        assert_eq!(serial.entries.load(Ordering::Relaxed), 1);
        assert!(serial.saw_complete.load(Ordering::Relaxed));
        assert_eq!(report.subtask_times.len(), 2);
        assert_eq!(report.subtask_times[0].0, "counting");
    }

    #[test]
    fn test_worker_cost_limits_active_workers() {
        let gang = WorkerGang::new(8).unwrap();
        let parallel = Counting::new(100, 1.5);
        let report = gang.run_batch(&[&parallel]).unwrap();
        assert_eq!(report.active_workers, 2);
        assert_eq!(parallel.workers_seen.lock().len(), 2);
    }

    #[test]
    fn test_error_stops_later_subtasks() {
        let gang = WorkerGang::new(2).unwrap();
        let counting = Counting::new(10, 1.0);
        let err = gang.run_batch(&[&Failing, &counting]).unwrap_err();

        assert!(matches!(err, PrepError::MissingThread { .. }));
        assert!(counting.workers_seen.lock().is_empty());
    }

    #[test]
    fn test_panic_reported_as_error() {
        let gang = WorkerGang::new(2).unwrap();
        let err = gang.run_batch(&[&Panicking]).unwrap_err();
        match err {
            PrepError::WorkerPanicked {
                worker,
                subtask,
                message,
            } => {
                assert_eq!(worker, 0);
                assert_eq!(subtask, "panicking");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
