//! # Boot phase timeout supervision.
//!
//! [`TimeoutSupervisor`] bounds the wall-clock time of a boot phase.
//!
//! ```text
//! Preemptive:
//!   arm timer(round_up(limit)) ─┬─► work finished first ─► elapsed <= armed ? Ok : TimedOut
//!                               └─► timer fired first   ─► cancel token, drop work ─► TimedOut
//!
//! Measured:
//!   run work to completion ─► elapsed > round_up(limit) ? TimedOut : Ok
//! ```
//!
//! ## Rules
//! - Limits are rounded **up** to the timer resolution; a non-zero limit below
//!   one unit is armed as exactly one unit
//! - In preemptive mode the in-flight work is dropped at its next `.await`
//!   and the cancellation token is cancelled so cooperative work can stop
//! - Work that blocks without yielding cannot be interrupted; it is still
//!   reported as timed out once it returns
//! - Elapsed time uses [`tokio::time::Instant`], so paused test clocks apply

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, TimeoutMode};
use crate::error::TimedOut;

/// Runs work under a time limit.
#[derive(Clone, Copy, Debug)]
pub struct TimeoutSupervisor {
    mode: TimeoutMode,
    resolution: Duration,
}

impl TimeoutSupervisor {
    /// Creates a supervisor; a zero resolution means nanosecond precision.
    pub fn new(mode: TimeoutMode, resolution: Duration) -> Self {
        Self { mode, resolution }
    }

    /// Creates a supervisor from the runtime configuration.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.timeout_mode, cfg.timer_resolution)
    }

    /// Enforcement mode.
    pub fn mode(&self) -> TimeoutMode {
        self.mode
    }

    /// The limit actually armed for `limit`.
    pub fn round_up(&self, limit: Duration) -> Duration {
        let unit = self.resolution.as_nanos().max(1);
        let units = limit.as_nanos().div_ceil(unit).max(1);
        let nanos = units.saturating_mul(unit);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Runs `work` under `limit`.
    ///
    /// On a preemptive timeout `cancel` is cancelled before returning.
    pub async fn run<F>(
        &self,
        limit: Duration,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<F::Output, TimedOut>
    where
        F: Future,
    {
        let armed = self.round_up(limit);
        let started = Instant::now();

        let out = match self.mode {
            TimeoutMode::Preemptive => match time::timeout(armed, work).await {
                Ok(out) => out,
                Err(_elapsed) => {
                    cancel.cancel();
                    return Err(TimedOut {
                        configured: limit,
                        elapsed: started.elapsed(),
                    });
                }
            },
            TimeoutMode::Measured => work.await,
        };

        let elapsed = started.elapsed();
        if elapsed > armed {
            return Err(TimedOut {
                configured: limit,
                elapsed,
            });
        }
        Ok(out)
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
