//! Heap Module - Region Free-Space Accounting
//!
//! The pre-evacuation phase does not select or copy regions. It only hands
//! the unused tails of retired allocation buffers back to the region that
//! owns them, so the heap view here is limited to per-region free-space
//! bookkeeping.

pub mod region;

pub use region::{Region, RegionIndex, RegionTable};

/// Base address of the first region
pub const HEAP_BASE: usize = 0x1000_0000;
