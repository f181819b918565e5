//! Stats Module - Pause Phase Monitoring
//!
//! Collects the timing data later phases and monitoring read:
//! - Elapsed time per pre-evacuation subtask
//! - Phase times of the current pause

pub mod phase_times;
pub mod timer;

pub use phase_times::PhaseTimes;
pub use timer::GcTimer;
