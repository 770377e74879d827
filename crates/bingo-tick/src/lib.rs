//! Fixed-interval clock for calling numbers.
//!
//! A room calls one number every interval while its game is active, stops
//! calling while a claim is under review, and never calls again once the
//! game ends. [`TickScheduler`] models exactly that:
//!
//! ```text
//!            start()              pause()
//! Stopped ───────────→ Running ←──────────→ Paused
//!    ↑                    │       resume()     │
//!    └────── stop() ──────┴────────────────────┘
//! ```
//!
//! The scheduler does not own a task. The room actor awaits
//! [`TickScheduler::wait_for_tick`] inside its `tokio::select!` loop next to
//! its command channel; while stopped or paused that future never resolves,
//! so the select only wakes for commands. Dropping the actor drops the clock.
//!
//! Missed ticks are never replayed: if the actor was busy past a deadline the
//! next tick is scheduled one interval after the late one fired.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickConfig {
    /// Time between ticks.
    pub interval: Duration,
}

impl TickConfig {
    /// Shortest accepted interval. Anything lower is clamped.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(50);

    pub fn every(interval: Duration) -> Self {
        Self { interval }
    }

    /// Clamps the interval to [`MIN_INTERVAL`](Self::MIN_INTERVAL).
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "tick interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::every(Duration::from_secs(3))
    }
}

/// Information about a tick that just fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// 1-based count of ticks since the scheduler was created.
    pub tick: u64,
    /// How far past its deadline the tick fired.
    pub late_by: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Stopped,
    Running { next: Instant },
    Paused,
}

// ---------------------------------------------------------------------------
// TickScheduler
// ---------------------------------------------------------------------------

/// Pausable fixed-interval clock.
pub struct TickScheduler {
    interval: Duration,
    state: ClockState,
    tick_count: u64,
}

impl TickScheduler {
    /// Creates a stopped scheduler. Call [`start`](Self::start) to arm it.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis() as u64,
            "tick scheduler created"
        );
        Self {
            interval: config.interval,
            state: ClockState::Stopped,
            tick_count: 0,
        }
    }

    /// Arms the clock; the first tick fires one interval from now.
    ///
    /// Restarting a running or paused clock resets its deadline.
    pub fn start(&mut self) {
        self.state = ClockState::Running {
            next: Instant::now() + self.interval,
        };
        debug!(tick = self.tick_count, "tick scheduler started");
    }

    /// Stops ticking until [`resume`](Self::resume). No-op unless running.
    pub fn pause(&mut self) {
        if matches!(self.state, ClockState::Running { .. }) {
            self.state = ClockState::Paused;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Continues a paused clock with a full interval before the next tick.
    /// No-op unless paused.
    pub fn resume(&mut self) {
        if self.state == ClockState::Paused {
            self.state = ClockState::Running {
                next: Instant::now() + self.interval,
            };
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    /// Disarms the clock. Only [`start`](Self::start) re-arms it.
    pub fn stop(&mut self) {
        if self.state != ClockState::Stopped {
            self.state = ClockState::Stopped;
            debug!(tick = self.tick_count, "tick scheduler stopped");
        }
    }

    /// Waits for the next tick.
    ///
    /// Never resolves while stopped or paused. Cancel-safe: dropping the
    /// future before it resolves leaves the schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = match self.state {
            ClockState::Running { next } => next,
            ClockState::Stopped | ClockState::Paused => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        if late_by > self.interval {
            warn!(
                tick = self.tick_count + 1,
                late_ms = late_by.as_millis() as u64,
                "tick fired more than one interval late"
            );
        }

        self.tick_count += 1;
        self.state = ClockState::Running {
            next: now + self.interval,
        };
        trace!(tick = self.tick_count, "tick fired");

        TickInfo {
            tick: self.tick_count,
            late_by,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
