//! Event queue configuration.
//!
//! Standalone, constructed in code (no file I/O involved), builder-style —
//! matching `flowgraph_eval::Config`.

use std::time::Duration;

/// Which continuous-event types coalesce with one another on enqueue. Two
/// queued events coalesce when their kinds map to the same family and no
/// event of that family has yet left `waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoalesceFamily {
    MouseMove,
    PointerMove,
    TouchMove,
    Wheel,
}

/// Tunables for [`crate::queue::EventQueue`].
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a queued-but-undispatched event may wait before a
    /// timeout discards it (protected events survive regardless).
    pub event_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_timeout: Duration::from_millis(5_000),
        }
    }
}

impl Config {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout after which an unprotected queued event is
    /// discarded.
    #[must_use]
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }
}
