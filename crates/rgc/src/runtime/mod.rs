//! Runtime Module - Thread Records and Pause Scope
//!
//! The runtime owns mutator and internal thread records. At a safepoint it
//! lends them to a [`PauseContext`], which exposes them to GC workers
//! through claim-once snapshots, and takes them back when the pause ends.

pub mod pause;
pub mod snapshot;
pub mod thread;

pub use pause::{PauseContext, PauseThreads};
pub use snapshot::{Claimed, ThreadSnapshot};
pub use thread::{InternalThread, MutatorThread, PinCountCache, ThreadId, ThreadState};
