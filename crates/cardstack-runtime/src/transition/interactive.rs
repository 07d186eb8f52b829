#![forbid(unsafe_code)]

//! Percent-driven interactive transition.
//!
//! ```text
//! start ──▶ Tracking ──finish──▶ Finishing ──p = 1──▶ Finished
//!              │  ▲
//!        update(p)┘ └──cancel──▶ Cancelling ──p = 0──▶ Cancelled
//! ```
//!
//! While tracking, progress follows [`update`](PercentDrivenTransition::update)
//! exactly. After release it plays toward the end at
//! `completion_speed / duration` per second.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Tracking,
    Finishing,
    Cancelling,
    Done(InteractiveResult),
}

/// How an interactive transition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveResult {
    Finished,
    Cancelled,
}

/// Progress controller scrubbed by a gesture.
#[derive(Debug, Clone)]
pub struct PercentDrivenTransition {
    percent: f64,
    duration: Duration,
    completion_speed: f64,
    phase: Phase,
    idle: Duration,
}

impl PercentDrivenTransition {
    /// Start tracking at 0%.
    #[must_use]
    pub fn start(duration: Duration, completion_speed: f64) -> Self {
        Self {
            percent: 0.0,
            duration: duration.max(Duration::from_millis(1)),
            completion_speed: completion_speed.max(f64::EPSILON),
            phase: Phase::Tracking,
            idle: Duration::ZERO,
        }
    }

    #[inline]
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Whether input still drives progress.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.phase == Phase::Tracking
    }

    /// Time since the last [`update`](Self::update) while tracking.
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.idle
    }

    /// Scrub to `percent`, clamped to [0, 1]. Ignored after release.
    pub fn update(&mut self, percent: f64) {
        if self.is_tracking() {
            self.percent = percent.clamp(0.0, 1.0);
            self.idle = Duration::ZERO;
        }
    }

    /// Play to 100%.
    pub fn finish(&mut self) {
        if self.is_tracking() {
            self.phase = Phase::Finishing;
        }
    }

    /// Play back to 0%.
    pub fn cancel(&mut self) {
        if self.is_tracking() {
            self.phase = Phase::Cancelling;
        }
    }

    /// Advance by `dt`. Returns the result on the tick that reaches the end.
    pub fn tick(&mut self, dt: Duration) -> Option<InteractiveResult> {
        let step = dt.as_secs_f64() / self.duration.as_secs_f64() * self.completion_speed;
        match self.phase {
            Phase::Tracking => {
                self.idle = self.idle.saturating_add(dt);
                None
            }
            Phase::Finishing => {
                self.percent = (self.percent + step).min(1.0);
                (self.percent >= 1.0).then(|| self.end(InteractiveResult::Finished))
            }
            Phase::Cancelling => {
                self.percent = (self.percent - step).max(0.0);
                (self.percent <= 0.0).then(|| self.end(InteractiveResult::Cancelled))
            }
            Phase::Done(_) => None,
        }
    }

    fn end(&mut self, result: InteractiveResult) -> InteractiveResult {
        self.phase = Phase::Done(result);
        result
    }

    /// Final result, once reached.
    #[must_use]
    pub fn result(&self) -> Option<InteractiveResult> {
        match self.phase {
            Phase::Done(result) => Some(result),
            _ => None,
        }
    }
}
