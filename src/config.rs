//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for the [`Runtime`](crate::Runtime).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `grace = 0s` → shutdown does not wait for in-flight tasks

use std::time::Duration;

/// Global configuration for the task runtime.
///
/// Defines:
/// - **Shutdown behavior**: grace period for in-flight tasks
/// - **Concurrency limits**: max simultaneously running background phases
/// - **Event system**: bus capacity for event delivery
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time [`Runtime::shutdown`](crate::Runtime::shutdown) waits for
    /// in-flight tasks before cancelling them.
    pub grace: Duration,

    /// Maximum number of background phases running at the same time.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `1` = serial execution, one background phase at a time
    /// - `n > 1` = at most `n` tasks perform simultaneously
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent background phases
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Shorthand for a configuration that runs background phases one at a time.
    ///
    /// # Example
    /// ```
    /// use fluentask::Config;
    ///
    /// let cfg = Config::serial();
    /// assert_eq!(cfg.concurrency_limit(), Some(1));
    /// ```
    pub fn serial() -> Self {
        Self {
            max_concurrent: 1,
            ..Self::default()
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            max_concurrent: 0,
            bus_capacity: 1024,
        }
    }
}
