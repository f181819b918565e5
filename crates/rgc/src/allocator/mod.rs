//! Allocator Module - Thread-Local Allocation Buffers
//!
//! Mutator threads allocate from private buffers carved out of regions.
//! The pre-evacuation phase retires every buffer so that evacuation sees a
//! parsable heap and the unused tails are accounted as free region space.

pub mod tlab;

pub use tlab::{AllocBuffer, AllocBufferStats, RetiredBuffer};

/// Default alignment for buffer allocations: 8 bytes
pub const DEFAULT_ALIGNMENT: usize = 8;
