//! Pause Logging
//!
//! Structured events for the pre-evacuation phase, useful for:
//! - Performance analysis
//! - Debugging
//! - Production monitoring
//!
//! Events are forwarded to the `log` facade at their level. Capture keeps
//! the most recent events in memory for inspection; it is off by default
//! and bounded by `max_events`.
//!
//! Log Levels:
//! - ERROR: Invariant violations
//! - INFO: Phase summaries
//! - DEBUG: Phase boundaries
//! - TRACE: Per-subtask statistics

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for pause events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Pause event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PauseEvent {
    /// Phase started
    PhaseStart { phase: String, pause: u64 },

    /// Phase completed
    PhaseEnd {
        phase: String,
        pause: u64,
        duration_ms: f64,
    },

    /// Allocation buffers retired
    BufferRetirement {
        pause: u64,
        buffers_retired: usize,
        total_refills: usize,
        waste_bytes: usize,
    },

    /// Barrier logs flushed
    LogFlush {
        phase: String,
        pause: u64,
        buffers: usize,
        entries: usize,
    },

    /// Pin caches merged
    PinMerge { pause: u64, pinned: usize },

    /// Pending entries produced by the phase
    PendingEntries {
        pause: u64,
        baseline: usize,
        new_entries: usize,
    },

    /// Fatal invariant violation
    InvariantViolation { pause: u64, message: String },
}

impl PauseEvent {
    /// Level the event is reported at
    pub fn level(&self) -> LogLevel {
        match self {
            PauseEvent::InvariantViolation { .. } => LogLevel::Error,
            PauseEvent::PendingEntries { .. } => LogLevel::Info,
            PauseEvent::PhaseStart { .. } | PauseEvent::PhaseEnd { .. } => LogLevel::Debug,
            PauseEvent::BufferRetirement { .. }
            | PauseEvent::LogFlush { .. }
            | PauseEvent::PinMerge { .. } => LogLevel::Trace,
        }
    }

    /// Human-readable rendering
    pub fn to_human(&self) -> String {
        match self {
            PauseEvent::PhaseStart { phase, pause } => {
                format!("[GC] Pause {}: {} started", pause, phase)
            }
            PauseEvent::PhaseEnd {
                phase,
                pause,
                duration_ms,
            } => format!(
                "[GC] Pause {}: {} completed ({:.3}ms)",
                pause, phase, duration_ms
            ),
            PauseEvent::BufferRetirement {
                pause,
                buffers_retired,
                total_refills,
                waste_bytes,
            } => format!(
                "[GC] Pause {}: retired {} buffers ({} refills, {} bytes waste)",
                pause, buffers_retired, total_refills, waste_bytes
            ),
            PauseEvent::LogFlush {
                phase,
                pause,
                buffers,
                entries,
            } => format!(
                "[GC] Pause {}: {} flushed {} buffers ({} entries)",
                pause, phase, buffers, entries
            ),
            PauseEvent::PinMerge { pause, pinned } => {
                format!("[GC] Pause {}: merged {} pinned objects", pause, pinned)
            }
            PauseEvent::PendingEntries {
                pause,
                baseline,
                new_entries,
            } => format!(
                "[GC] Pause {}: {} new pending entries (baseline {})",
                pause, new_entries, baseline
            ),
            PauseEvent::InvariantViolation { pause, message } => {
                format!("[GC] Pause {}: invariant violation: {}", pause, message)
            }
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// Pause logger configuration
#[derive(Debug, Clone)]
pub struct PauseLoggerConfig {
    /// Most detailed level that is reported
    pub level: LogLevel,

    /// Render events as JSON
    pub json: bool,

    /// Prefix rendered events with a wall-clock timestamp
    pub timestamps: bool,

    /// Keep events in memory
    pub capture: bool,

    /// Captured events kept before the oldest is dropped
    pub max_events: usize,
}

impl Default for PauseLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            timestamps: true,
            capture: false,
            max_events: 1024,
        }
    }
}

/// PauseLogger - centralized logging for pause events
pub struct PauseLogger {
    config: PauseLoggerConfig,
    events: Mutex<VecDeque<(Instant, PauseEvent)>>,
    enabled: AtomicBool,
}

impl PauseLogger {
    pub fn new(config: PauseLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(VecDeque::new()),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a pause event at or below the configured level
    pub fn log(&self, event: PauseEvent) {
        self.log_up_to(event, self.config.level);
    }

    /// Log a pause event of any level
    ///
    /// Used by verbose pauses; `log`'s own max level still applies.
    pub fn log_verbose(&self, event: PauseEvent) {
        self.log_up_to(event, LogLevel::Trace);
    }

    fn log_up_to(&self, event: PauseEvent, max_level: LogLevel) {
        if !self.is_enabled() {
            return;
        }

        let level = event.level();
        if level > max_level {
            return;
        }

        log::log!(target: "rgc::pause", log::Level::from(level), "{}", self.render(&event));

        if self.config.capture && self.config.max_events > 0 {
            let mut events = self.events.lock();
            if events.len() == self.config.max_events {
                events.pop_front();
            }
            events.push_back((Instant::now(), event));
        }
    }

    /// Render an event according to configuration
    pub fn render(&self, event: &PauseEvent) -> String {
        let body = if self.config.json {
            event.to_json()
        } else {
            event.to_human()
        };

        if self.config.timestamps {
            let now = chrono::Local::now();
            format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), body)
        } else {
            body
        }
    }

    /// Get all captured events
    pub fn events(&self) -> Vec<PauseEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Clear all captured events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Captured event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for PauseLogger {
    fn default() -> Self {
        Self::new(PauseLoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<PauseLogger> = Mutex::new(PauseLogger::default());
}

/// Log a pause event to the global logger
pub fn log_event(event: PauseEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Log a pause event of any level to the global logger
pub fn log_verbose_event(event: PauseEvent) {
    GLOBAL_LOGGER.lock().log_verbose(event);
}

/// Replace the global logger configuration
pub fn configure_logger(config: PauseLoggerConfig) {
    *GLOBAL_LOGGER.lock() = PauseLogger::new(config);
}

/// Global logger event count
pub fn event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}

/// Events captured by the global logger
pub fn events() -> Vec<PauseEvent> {
    GLOBAL_LOGGER.lock().events()
}
