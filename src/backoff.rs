//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff for polling loops.
//! The sequence grows more slowly than exponential backoff, which suits
//! waiting on a remote resource that usually settles within a few polls.
//!
//! Sequence for `new(1s, 8s)`: 1s, 1s, 2s, 3s, 5s, 8s, 8s (max), ...
//!
//! ## Usage
//!
//! ```rust
//! use keyvault_recovery::backoff::FibonacciBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(8));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(3));
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max`.
/// Calculations are performed in milliseconds.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value in milliseconds
    prev_ms: u64,
    /// Current backoff value in milliseconds
    current_ms: u64,
    /// Maximum backoff value in milliseconds
    max_ms: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given minimum and maximum intervals
    ///
    /// A `max` below `min` is raised to `min`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_ms = duration_to_millis(min).max(1);
        let max_ms = duration_to_millis(max).max(min_ms);
        Self {
            prev_ms: 0,
            current_ms: min_ms,
            max_ms,
        }
    }

    /// Get the next backoff duration in milliseconds and advance the sequence
    pub fn next_backoff_millis(&mut self) -> u64 {
        let result = self.current_ms;

        let next = self.prev_ms.saturating_add(self.current_ms);
        self.prev_ms = self.current_ms;
        self.current_ms = std::cmp::min(next, self.max_ms);

        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_millis())
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
