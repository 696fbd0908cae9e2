//! Timers of the validation loop.
//!
//! One scheduler owns every deadline the loop can wait on: the settle
//! delay, the periodic check, the connectivity countdown, and the retry
//! after it. [`CheckScheduler::next_due`] sleeps until the earliest armed
//! deadline, and pends forever when none is armed, so it can sit in a
//! `tokio::select!` next to the session channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         _ = session_rx.changed() => { scheduler.clear(); /* ... */ }
//!         due = scheduler.next_due() => { /* settle / tick / countdown / retry */ }
//!     }
//! }
//! ```
//!
//! `next_due` only mutates the scheduler after its sleep completes, so
//! dropping it mid-wait loses nothing.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::MonitorConfig;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Which deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    /// The settle delay elapsed.
    Settled,
    /// A periodic check is due. Carries the tick number (starts at 1).
    Tick(u64),
    /// The countdown went down by one; carries the seconds left. At 0 the
    /// retry has been armed.
    Countdown(u32),
    /// The retry after the countdown is due.
    Retry,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    remaining: u32,
    next: Instant,
}

#[derive(Debug)]
pub struct CheckScheduler {
    config: MonitorConfig,
    settle_at: Option<Instant>,
    next_check: Option<Instant>,
    paused: bool,
    countdown: Option<Countdown>,
    retry_at: Option<Instant>,
    ticks: u64,
}

impl CheckScheduler {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config: config.validated(),
            settle_at: None,
            next_check: None,
            paused: false,
            countdown: None,
            retry_at: None,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Disarms every deadline.
    pub fn clear(&mut self) {
        self.settle_at = None;
        self.next_check = None;
        self.paused = false;
        self.countdown = None;
        self.retry_at = None;
    }

    /// Clears everything and arms the settle delay.
    pub fn arm_settle(&mut self) {
        self.clear();
        self.settle_at = Some(Instant::now() + self.config.settle_delay);
    }

    /// Starts periodic checks, the first one `check_interval` from now.
    pub fn start_periodic(&mut self) {
        self.paused = false;
        self.next_check = Some(Instant::now() + self.config.check_interval);
        debug!(interval_ms = self.config.check_interval.as_millis() as u64, "periodic checks started");
    }

    /// Suspends periodic checks. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.ticks, "periodic checks paused");
        }
    }

    /// Resumes periodic checks one full interval from now, so time spent
    /// paused produces no burst of ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if self.next_check.is_some() {
                self.next_check = Some(Instant::now() + self.config.check_interval);
            }
            debug!(tick = self.ticks, "periodic checks resumed");
        }
    }

    /// Pauses periodic checks and starts the countdown from
    /// `countdown_secs`.
    pub fn start_countdown(&mut self) {
        self.pause();
        self.retry_at = None;
        self.countdown = Some(Countdown {
            remaining: self.config.countdown_secs,
            next: Instant::now() + COUNTDOWN_STEP,
        });
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn in_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    /// Seconds left on the countdown, if one is running.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.map(|c| c.remaining)
    }

    /// Periodic ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    fn earliest(&self) -> Option<(Instant, Due)> {
        // A paused periodic deadline stays stored so `resume` knows checks
        // were running; it just isn't a candidate.
        let periodic = self.next_check.filter(|_| !self.paused);
        // `flatten` drops the unarmed (`None`) entries, `min_by_key` picks
        // the soonest. Ties go to the earlier entry, settle first.
        [
            self.settle_at.map(|at| (at, Due::Settled)),
            self.countdown.map(|c| (c.next, Due::Countdown(c.remaining.saturating_sub(1)))),
            self.retry_at.map(|at| (at, Due::Retry)),
            periodic.map(|at| (at, Due::Tick(self.ticks + 1))),
        ]
        .into_iter()
        .flatten()
        .min_by_key(|(at, _)| *at)
    }

    /// Waits for the earliest armed deadline and returns which one fired.
    ///
    /// Pends forever when nothing is armed.
    pub async fn next_due(&mut self) -> Due {
        let Some((at, due)) = self.earliest() else {
            // `pending` never resolves, so in a `select!` the other branches
            // always win.
            return std::future::pending().await;
        };

        time::sleep_until(at).await;
        let now = Instant::now();

        match due {
            Due::Settled => self.settle_at = None,
            Due::Tick(n) => {
                self.ticks = n;
                // Skip ahead from now rather than replaying missed ticks.
                self.next_check = Some(now + self.config.check_interval);
                trace!(tick = n, "check tick");
            }
            Due::Countdown(0) => {
                self.countdown = None;
                self.retry_at = Some(now + self.config.retry_delay);
            }
            Due::Countdown(remaining) => {
                // Step from the deadline, not from `now`, so a late wakeup
                // doesn't stretch the countdown.
                self.countdown = Some(Countdown {
                    remaining,
                    next: at + COUNTDOWN_STEP,
                });
            }
            Due::Retry => self.retry_at = None,
        }
        due
    }
}
