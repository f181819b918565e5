//! Barrier Module - Write-Barrier Logs
//!
//! Post-write barriers record the address of every modified field in a
//! thread-local log. Before evacuation each log is flushed into the global
//! buffer list, where remembered-set refinement picks it up later.
//!
//! An entry lives in exactly one place at a time: a thread-local log or the
//! global list. Flushing moves the entry vector, it never copies it.

pub mod buffer_list;
pub mod log;

pub use buffer_list::{FlushStats, GlobalLogBufferList};
pub use log::{BarrierLog, LogBuffer, LogEntry};
