//! Phase times of one pause
//!
//! Phases keep their recording order so reports list them the way the
//! pause ran them.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

/// Phase name of the parallel mutator sweep
pub const RETIRE_BUFFERS_AND_FLUSH_LOGS: &str = "RetireBuffersAndFlushLogs";
/// Phase name of the serial internal-thread sweep
pub const INTERNAL_FLUSH_LOGS: &str = "InternalThreadFlushLogs";
/// Phase name of the whole pre-evacuation batch
pub const PRE_EVACUATE: &str = "PreEvacuateCollectionSet";

/// PhaseTimes - elapsed time per named phase
#[derive(Debug, Clone, Default)]
pub struct PhaseTimes {
    phases: IndexMap<&'static str, Duration>,
}

impl PhaseTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a phase, adding to any earlier record under the same name
    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        *self.phases.entry(phase).or_default() += elapsed;
    }

    /// Elapsed time of a phase
    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.phases.get(phase).copied()
    }

    /// Iterate phases in recording order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.phases.iter().map(|(name, elapsed)| (*name, *elapsed))
    }

    /// Number of recorded phases
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl Serialize for PhaseTimes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.phases.len()))?;
        for (name, elapsed) in &self.phases {
            map.serialize_entry(name, &(elapsed.as_secs_f64() * 1000.0))?;
        }
        map.end()
    }
}
