//! Test Utilities for the Pre-Evacuation Test Suite
//!
//! This module provides pause fixtures and STRICT assertion helpers.
//! NO tolerances: every entry, pin and tail byte is accounted exactly.
//!
//! ============================================================================
//! CRITICAL: These utilities are designed to FIND BUGS, not to have passing tests.
//! ============================================================================

#![allow(dead_code)]

use rgc::allocator::DEFAULT_ALIGNMENT;
use rgc::{
    GlobalLogBufferList, InternalThread, LogBuffer, LogEntry, MutatorThread, PauseContext,
    PrepConfig, RegionTable, ThreadState,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Regions in every fixture heap
pub const REGION_COUNT: usize = 64;

/// Region size for fixture heaps (64KB)
pub const REGION_SIZE: usize = 64 * 1024;

/// First id handed to internal threads
pub const INTERNAL_ID_BASE: u64 = 10_000;

/// Source id of pre-existing (baseline) buffers
pub const BASELINE_SOURCE: u64 = 99_999;

/// ============================================================================
/// PAUSE FIXTURE
/// ============================================================================

/// Pre-pause state of one mutator thread
#[derive(Debug, Clone, Copy, Default)]
pub struct MutatorSpec {
    pub log_entries: usize,
    pub pins: usize,
    /// `(chunk_size, used_bytes)` of an active allocation buffer
    pub buffer: Option<(usize, usize)>,
}

/// Builder for a pause context with known contents
///
/// Every entry address is unique across the whole fixture, so the drained
/// global list can be compared as a set.
#[derive(Debug, Clone, Default)]
pub struct PauseFixture {
    mutators: Vec<MutatorSpec>,
    internals: Vec<usize>,
    baseline: usize,
}

/// A begun pause plus everything the fixture knows about it
pub struct BuiltPause {
    pub ctx: PauseContext,
    pub log_buffers: Arc<GlobalLogBufferList>,
    pub regions: Arc<RegionTable>,
    /// Entries held by threads just before the flush
    pub thread_entries: BTreeSet<LogEntry>,
    /// Entries already in the global list
    pub baseline_entries: BTreeSet<LogEntry>,
    /// Sum of mutator pin counts
    pub expected_pins: usize,
    /// Sum of unused tails of active buffers
    pub expected_tail_bytes: usize,
}

impl PauseFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mutator thread with `log_entries` logged updates and `pins` pins
    pub fn mutator(mut self, log_entries: usize, pins: usize) -> Self {
        self.mutators.push(MutatorSpec {
            log_entries,
            pins,
            buffer: None,
        });
        self
    }

    /// Add a mutator thread holding an active allocation buffer
    pub fn mutator_with_buffer(
        mut self,
        log_entries: usize,
        pins: usize,
        chunk_size: usize,
        used_bytes: usize,
    ) -> Self {
        self.mutators.push(MutatorSpec {
            log_entries,
            pins,
            buffer: Some((chunk_size, used_bytes)),
        });
        self
    }

    /// Add a mutator thread from a prepared spec
    pub fn mutator_spec(mut self, spec: MutatorSpec) -> Self {
        self.mutators.push(spec);
        self
    }

    /// Add an internal thread with `log_entries` logged updates
    pub fn internal(mut self, log_entries: usize) -> Self {
        self.internals.push(log_entries);
        self
    }

    /// Pre-fill the global list with `entries` pending entries
    pub fn baseline(mut self, entries: usize) -> Self {
        self.baseline = entries;
        self
    }

    /// Begin the pause with every mutator stopped at the safepoint
    ///
    /// **Bug this finds:** Fixture setup failures in thread or region APIs
    pub fn build(&self) -> BuiltPause {
        let regions = Arc::new(
            RegionTable::new(REGION_COUNT, REGION_SIZE).expect("fixture region table is valid"),
        );
        let log_buffers = Arc::new(GlobalLogBufferList::new());

        let mut thread_entries = BTreeSet::new();
        let mut expected_pins = 0;
        let mut expected_tail_bytes = 0;

        let baseline: Vec<LogEntry> = (0..self.baseline)
            .map(|i| LogEntry(0x0800_0000 + i * 8))
            .collect();
        let baseline_entries: BTreeSet<LogEntry> = baseline.iter().copied().collect();
        log_buffers.enqueue(LogBuffer::new(BASELINE_SOURCE, baseline));

        let mut mutators = Vec::with_capacity(self.mutators.len());
        for (i, spec) in self.mutators.iter().enumerate() {
            let id = i as u64 + 1;
            let mut thread =
                MutatorThread::new(id, DEFAULT_ALIGNMENT).expect("fixture thread id is valid");

            for j in 0..spec.log_entries {
                let entry = LogEntry(mutator_address(id, j));
                thread.barrier_log_mut().record(entry.0);
                thread_entries.insert(entry);
            }

            for _ in 0..spec.pins {
                thread.pin_cache_mut().pin();
            }
            expected_pins += spec.pins;

            if let Some((chunk_size, used)) = spec.buffer {
                let (region, start, end) = carve_any(&regions, chunk_size);
                let buffer = thread.alloc_buffer_mut();
                buffer
                    .refill(region, start, end)
                    .expect("fixture buffer refill succeeds");
                if used > 0 {
                    buffer
                        .allocate(used)
                        .expect("fixture allocation fits the chunk");
                }
                expected_tail_bytes += buffer.remaining();
            }

            thread.set_state(ThreadState::Safepoint);
            mutators.push(thread);
        }

        let mut internals = Vec::with_capacity(self.internals.len());
        for (i, &entries) in self.internals.iter().enumerate() {
            let id = INTERNAL_ID_BASE + i as u64;
            let mut thread = InternalThread::new(id, format!("gc-service-{}", i));
            for j in 0..entries {
                let entry = LogEntry(internal_address(id, j));
                thread.barrier_log_mut().record(entry.0);
                thread_entries.insert(entry);
            }
            internals.push(thread);
        }

        let ctx = PauseContext::begin(
            1,
            mutators,
            internals,
            Arc::clone(&log_buffers),
            Arc::clone(&regions),
        );

        BuiltPause {
            ctx,
            log_buffers,
            regions,
            thread_entries,
            baseline_entries,
            expected_pins,
            expected_tail_bytes,
        }
    }
}

impl BuiltPause {
    /// Entries held by threads before the flush
    pub fn expected_new_entries(&self) -> usize {
        self.thread_entries.len()
    }

    /// Drain the global list into a set
    pub fn drain_entries(&self) -> BTreeSet<LogEntry> {
        self.log_buffers
            .drain()
            .into_iter()
            .flat_map(LogBuffer::into_entries)
            .collect()
    }
}

/// Verifying configuration on a gang of `workers`
pub fn config_with_workers(workers: usize) -> PrepConfig {
    PrepConfig {
        worker_threads: Some(workers),
        threads_per_worker: 1,
        verify_after_flush: true,
        verbose: false,
    }
}

fn mutator_address(id: u64, index: usize) -> usize {
    0x2000_0000 + (id as usize) * 0x10_0000 + index * 8
}

fn internal_address(id: u64, index: usize) -> usize {
    0x6000_0000 + ((id - INTERNAL_ID_BASE) as usize) * 0x10_0000 + index * 8
}

fn carve_any(regions: &RegionTable, size: usize) -> (usize, usize, usize) {
    regions
        .iter()
        .find_map(|region| region.carve(size).map(|(s, e)| (region.index(), s, e)))
        .unwrap_or_else(|| panic!("fixture heap exhausted carving {} bytes", size))
}

/// ============================================================================
/// STRICT ASSERTION HELPERS
/// ============================================================================

/// Assert that every snapshot slot was processed
///
/// **Bug this finds:** Claim loop exiting early, lost claims
/// **Tolerance:** ZERO - an unprocessed thread keeps stale state into evacuation
#[track_caller]
pub fn assert_all_processed(ctx: &PauseContext, context: &str) {
    assert_eq!(
        ctx.mutators().processed_count(),
        ctx.mutators().len(),
        "{}: {} of {} mutator threads processed",
        context,
        ctx.mutators().processed_count(),
        ctx.mutators().len()
    );
    assert_eq!(
        ctx.internals().processed_count(),
        ctx.internals().len(),
        "{}: {} of {} internal threads processed",
        context,
        ctx.internals().processed_count(),
        ctx.internals().len()
    );
}

/// Assert that no thread kept any transient state
///
/// **Bug this finds:** Entries left behind, buffers not retired, pins not reset
/// **Tolerance:** ZERO - every entry must be in exactly one place
#[track_caller]
pub fn assert_threads_flushed(ctx: &PauseContext, context: &str) {
    for index in 0..ctx.mutators().len() {
        let thread = ctx
            .mutators()
            .get(index)
            .unwrap_or_else(|| panic!("{}: mutator slot {} not released", context, index));
        assert!(
            !thread.alloc_buffer().is_active(),
            "{}: thread {} still has an active buffer",
            context,
            thread.id()
        );
        assert!(
            thread.barrier_log().is_empty(),
            "{}: thread {} kept {} log entries",
            context,
            thread.id(),
            thread.barrier_log().len()
        );
        assert_eq!(
            thread.pin_cache().count(),
            0,
            "{}: thread {} pin cache not reset",
            context,
            thread.id()
        );
    }

    for index in 0..ctx.internals().len() {
        let thread = ctx
            .internals()
            .get(index)
            .unwrap_or_else(|| panic!("{}: internal slot {} not released", context, index));
        assert!(
            thread.barrier_log().is_empty(),
            "{}: internal thread {} kept {} log entries",
            context,
            thread.id(),
            thread.barrier_log().len()
        );
    }
}

/// Assert that two entry sets are identical
///
/// **Bug this finds:** Lost or duplicated entries, worker-count dependent results
/// **Tolerance:** ZERO
#[track_caller]
pub fn assert_entry_sets_equal(actual: &BTreeSet<LogEntry>, expected: &BTreeSet<LogEntry>, context: &str) {
    let missing: Vec<_> = expected.difference(actual).take(5).collect();
    let extra: Vec<_> = actual.difference(expected).take(5).collect();
    assert!(
        missing.is_empty() && extra.is_empty(),
        "{}: entry sets differ (actual {}, expected {}); missing {:?}, extra {:?}",
        context,
        actual.len(),
        expected.len(),
        missing,
        extra
    );
}
