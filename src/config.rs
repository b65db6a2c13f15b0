//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the orchestrator and suite.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::builder(config)`
//! 2. **Suite creation**: `Suite::builder(config)` (forwards it to its orchestrator)
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `default_timeout = 0s` → no timeout for stories that never set one

use std::time::Duration;

/// How a boot phase timeout is enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeoutMode {
    /// Arm a timer and drop the in-flight boot phase when it fires.
    ///
    /// Work that blocks the thread without yielding cannot be interrupted;
    /// it is still reported once it returns.
    #[default]
    Preemptive,
    /// Run the boot phase to completion and compare the elapsed time afterwards.
    Measured,
}

/// Global configuration for the story runtime.
///
/// ## Field semantics
/// - `max_concurrent`: Leaf stories run at once by a suite (`0` = unlimited, `1` = sequential)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `timeout_mode`: Preemptive timer or post-hoc measurement
/// - `timer_resolution`: Smallest timer unit; limits are rounded up to it
/// - `default_timeout`: Applied to stories whose lineage never sets a timeout (`0s` = none)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of leaf stories a suite runs concurrently.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `1` = strictly sequential (default)
    /// - `n > 1` = at most `n` stories at a time
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Enforcement strategy for boot phase timeouts.
    pub timeout_mode: TimeoutMode,

    /// Granularity of the timeout timer.
    ///
    /// A limit is rounded **up** to a whole number of units, and a limit
    /// shorter than one unit becomes exactly one unit.
    pub timer_resolution: Duration,

    /// Timeout for stories whose lineage never mentions one.
    ///
    /// An explicit `no_timeout()` anywhere in the lineage still wins over this.
    pub default_timeout: Duration,
}

impl Config {
    /// Returns the suite concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent stories
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the fallback timeout as an `Option`.
    #[inline]
    pub fn fallback_timeout(&self) -> Option<Duration> {
        if self.default_timeout == Duration::ZERO {
            None
        } else {
            Some(self.default_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_concurrent = 1` (stories run one after another)
    /// - `bus_capacity = 1024`
    /// - `timeout_mode = Preemptive`
    /// - `timer_resolution = 1ms` (tokio timer granularity)
    /// - `default_timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            bus_capacity: 1024,
            timeout_mode: TimeoutMode::default(),
            timer_resolution: Duration::from_millis(1),
            default_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none() {
        let cfg = Config {
            max_concurrent: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.concurrency_limit(), None);
        assert_eq!(cfg.fallback_timeout(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn defaults_are_sequential() {
        let cfg = Config::default();
        assert_eq!(cfg.concurrency_limit(), Some(1));
        assert_eq!(cfg.timeout_mode, TimeoutMode::Preemptive);
    }
}
