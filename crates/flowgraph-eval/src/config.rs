//! Evaluation queue configuration.
//!
//! Standalone, constructed in code (no file I/O involved), builder-style.

/// Tunables for [`crate::queue::EvaluationQueue`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of priority levels the queue maintains (levels `0..num_priorities`).
    pub num_priorities: u32,
    /// Hard cap on evaluations performed within one `run_queue` time
    /// slice, regardless of deadline.
    pub max_evaluations_per_slice: usize,
    /// How many times a single node may re-schedule a predecessor step
    /// (triggering a rewind) within one `run_queue` call before a warning
    /// is logged. Surfaced as a `tracing::warn!`, never a blocking
    /// prompt. `None` disables the check.
    pub queue_reset_warning_threshold: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_priorities: 4,
            max_evaluations_per_slice: 10_000,
            queue_reset_warning_threshold: None,
        }
    }
}

impl Config {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of priority levels.
    #[must_use]
    pub fn with_num_priorities(mut self, n: u32) -> Self {
        self.num_priorities = n;
        self
    }

    /// Sets the per-slice evaluation cap.
    #[must_use]
    pub fn with_max_evaluations_per_slice(mut self, n: usize) -> Self {
        self.max_evaluations_per_slice = n;
        self
    }

    /// Enables the advisory rewind-count warning.
    #[must_use]
    pub fn with_queue_reset_warning_threshold(mut self, n: u32) -> Self {
        self.queue_reset_warning_threshold = Some(n);
        self
    }
}
