//! Configuration Module - Pause Preparation Tuning
//!
//! Manages the parameters that shape how the pre-evacuation phase is
//! spread over the worker gang.

/// Default number of mutator threads one worker is expected to handle
///
/// The mutator sweep asks for `threads / THREADS_PER_WORKER` workers, so
/// small thread counts run on a single worker.
pub const DEFAULT_THREADS_PER_WORKER: usize = 250;

/// Configuration for the pre-evacuation phase
///
/// # Examples
///
/// ```rust
/// use rgc::PrepConfig;
///
/// let config = PrepConfig {
///     worker_threads: Some(8),
///     threads_per_worker: 32,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PrepConfig {
    /// Number of threads in the worker gang
    ///
    /// If None, auto-detects based on CPU cores: min(4, num_cpus / 2)
    ///
    /// Default: Auto-detect
    pub worker_threads: Option<usize>,

    /// Mutator threads handled per active worker
    ///
    /// Drives the worker cost estimate of the parallel sweep.
    /// Default: 250
    pub threads_per_worker: usize,

    /// Verify thread state after the flush
    ///
    /// Checks every buffer retired, every log empty and every pin cache
    /// merged before the pause proceeds to evacuation.
    ///
    /// Default: true in debug builds
    pub verify_after_flush: bool,

    /// Enable verbose phase logging
    ///
    /// Reports Debug and Trace pause events (phase boundaries, buffer
    /// retirement, log flush and pin merge) regardless of the pause
    /// logger's level.
    ///
    /// Default: false
    pub verbose: bool,
}

impl Default for PrepConfig {
    fn default() -> Self {
        PrepConfig {
            worker_threads: Some(default_worker_threads()),
            threads_per_worker: DEFAULT_THREADS_PER_WORKER,
            verify_after_flush: cfg!(debug_assertions),
            verbose: false,
        }
    }
}

impl PrepConfig {
    /// Validate configuration
    ///
    /// ```rust
    /// use rgc::PrepConfig;
    ///
    /// let config = PrepConfig {
    ///     threads_per_worker: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threads) = self.worker_threads {
            if threads == 0 {
                return Err(ConfigError::InvalidWorkerThreads(
                    "worker_threads must be > 0".to_string(),
                ));
            }
        }

        if self.threads_per_worker == 0 {
            return Err(ConfigError::InvalidThreadsPerWorker(
                "threads_per_worker must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Worker gang size after auto-detection
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(default_worker_threads)
            .max(1)
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - RGC_WORKER_THREADS
    /// - RGC_THREADS_PER_WORKER
    /// - RGC_VERIFY
    /// - RGC_VERBOSE
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RGC_WORKER_THREADS") {
            if let Ok(threads) = val.parse::<usize>() {
                config.worker_threads = Some(threads);
            }
        }

        if let Ok(val) = std::env::var("RGC_THREADS_PER_WORKER") {
            if let Ok(threads) = val.parse::<usize>() {
                config.threads_per_worker = threads;
            }
        }

        if let Ok(val) = std::env::var("RGC_VERIFY") {
            config.verify_after_flush = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("RGC_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid worker threads: {0}")]
    InvalidWorkerThreads(String),

    #[error("Invalid threads per worker: {0}")]
    InvalidThreadsPerWorker(String),
}

fn default_worker_threads() -> usize {
    (num_cpus::get() / 2).max(1).min(4)
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}
