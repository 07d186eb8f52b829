#![forbid(unsafe_code)]

//! Damped spring animation.
//!
//! Card layout changes and the drag snapshot's throw/spring-back all use a
//! damped harmonic oscillator:
//!
//!   a = -stiffness × (position - target) - damping × velocity
//!
//! Damping is usually given as a ratio of critical damping (`ζ`), the way
//! touch UI toolkits describe spring animations: `ζ = 1` settles without
//! overshoot, `ζ < 1` bounces slightly.
//!
//! # Invariants
//!
//! 1. [`value`](super::Animation::value) is the normalized progress from the
//!    initial position toward the target, clamped to [0.0, 1.0].
//! 2. A spring at rest stays at rest until [`Spring::set_target`] or
//!    [`super::Animation::reset`].
//! 3. Stiffness is always positive and damping never negative.
//!
//! # Failure Modes
//!
//! - Large `dt` is subdivided into 4ms steps so stiff springs stay stable.
//! - Zero damping never settles; callers that need completion must use
//!   `ζ > 0`.

use std::time::Duration;

use super::Animation;

/// Maximum dt per integration step.
const MAX_STEP_SECS: f64 = 0.004;

const DEFAULT_REST_THRESHOLD: f64 = 0.01;
const DEFAULT_VELOCITY_THRESHOLD: f64 = 0.05;
const MIN_STIFFNESS: f64 = 0.1;

/// A damped spring moving a scalar from `initial` toward `target`.
#[derive(Debug, Clone)]
pub struct Spring {
    position: f64,
    velocity: f64,
    target: f64,
    initial: f64,
    stiffness: f64,
    damping: f64,
    rest_threshold: f64,
    velocity_threshold: f64,
    at_rest: bool,
}

impl Spring {
    /// Create a spring starting at `initial` and targeting `target`.
    ///
    /// Defaults: stiffness 300, damping ratio 0.9.
    #[must_use]
    pub fn new(initial: f64, target: f64) -> Self {
        let stiffness = 300.0;
        Self {
            position: initial,
            velocity: 0.0,
            target,
            initial,
            stiffness,
            damping: 0.9 * 2.0 * stiffness.sqrt(),
            rest_threshold: DEFAULT_REST_THRESHOLD,
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            at_rest: (initial - target).abs() < DEFAULT_REST_THRESHOLD,
        }
    }

    /// Set stiffness (builder pattern). Keeps the current damping ratio.
    #[must_use]
    pub fn with_stiffness(mut self, k: f64) -> Self {
        let ratio = self.damping_ratio();
        self.stiffness = k.max(MIN_STIFFNESS);
        self.damping = ratio * self.critical_damping();
        self
    }

    /// Set damping as a fraction of critical damping (builder pattern).
    #[must_use]
    pub fn with_damping_ratio(mut self, ratio: f64) -> Self {
        self.damping = ratio.max(0.0) * self.critical_damping();
        self
    }

    /// Set an initial velocity in units per second (builder pattern).
    #[must_use]
    pub fn with_initial_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        if velocity.abs() >= self.velocity_threshold {
            self.at_rest = false;
        }
        self
    }

    /// Set the rest threshold (builder pattern).
    #[must_use]
    pub fn with_rest_threshold(mut self, threshold: f64) -> Self {
        self.rest_threshold = threshold.abs();
        self
    }

    /// Current position (unclamped; may overshoot the target).
    #[inline]
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current velocity.
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Current target.
    #[inline]
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Stiffness parameter.
    #[inline]
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Damping as a fraction of critical damping.
    #[must_use]
    pub fn damping_ratio(&self) -> f64 {
        self.damping / self.critical_damping()
    }

    /// Critical damping coefficient for the current stiffness.
    #[must_use]
    pub fn critical_damping(&self) -> f64 {
        2.0 * self.stiffness.sqrt()
    }

    /// Whether the spring has settled at its target.
    #[inline]
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Retarget from the current position, keeping velocity.
    ///
    /// Progress is re-based so `value()` measures from where the spring is
    /// now. A target within the rest threshold of the current one is ignored.
    pub fn set_target(&mut self, target: f64) {
        if (self.target - target).abs() > self.rest_threshold {
            self.initial = self.position;
            self.target = target;
            self.at_rest = false;
        }
    }

    /// Snap to the target immediately.
    pub fn finish(&mut self) {
        self.position = self.target;
        self.velocity = 0.0;
        self.at_rest = true;
    }

    fn step(&mut self, dt: f64) {
        let displacement = self.position - self.target;
        let acceleration = -self.stiffness * displacement - self.damping * self.velocity;
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
    }

    /// Advance by `dt`, subdividing for stability.
    pub fn advance(&mut self, dt: Duration) {
        if self.at_rest {
            return;
        }
        let mut remaining = dt.as_secs_f64();
        while remaining > 0.0 {
            let step_dt = remaining.min(MAX_STEP_SECS);
            self.step(step_dt);
            remaining -= step_dt;
        }
        if (self.position - self.target).abs() < self.rest_threshold
            && self.velocity.abs() < self.velocity_threshold
        {
            self.finish();
        }
    }
}

impl Animation for Spring {
    fn tick(&mut self, dt: Duration) {
        self.advance(dt);
    }

    fn is_complete(&self) -> bool {
        self.at_rest
    }

    fn value(&self) -> f64 {
        let span = self.target - self.initial;
        if span.abs() < f64::EPSILON {
            return 1.0;
        }
        ((self.position - self.initial) / span).clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.position = self.initial;
        self.velocity = 0.0;
        self.at_rest = (self.initial - self.target).abs() < self.rest_threshold;
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Spring configurations used by cards and the drag snapshot.
pub mod presets {
    use super::Spring;

    /// Stiffness for card layout moves.
    pub const CARD_SETTLE_STIFFNESS: f64 = 180.0;
    /// Damping ratio for card layout moves.
    pub const CARD_SETTLE_DAMPING_RATIO: f64 = 0.9;
    /// Stiffness for throwing the drag snapshot off-screen (≈0.5s).
    pub const THROW_STIFFNESS: f64 = 160.0;
    /// Stiffness for springing the drag snapshot back (≈0.2s).
    pub const SNAP_BACK_STIFFNESS: f64 = 900.0;
    /// Damping ratio shared by snapshot throw and snap-back.
    pub const OVERLAY_DAMPING_RATIO: f64 = 0.8;

    /// Card moving between minimized/stack/expanded.
    #[must_use]
    pub fn card_settle(from: f64, to: f64) -> Spring {
        Spring::new(from, to)
            .with_stiffness(CARD_SETTLE_STIFFNESS)
            .with_damping_ratio(CARD_SETTLE_DAMPING_RATIO)
    }

    /// Snapshot springing back to its resting place.
    #[must_use]
    pub fn snap_back(from: f64, to: f64) -> Spring {
        Spring::new(from, to)
            .with_stiffness(SNAP_BACK_STIFFNESS)
            .with_damping_ratio(OVERLAY_DAMPING_RATIO)
    }

    /// Snapshot thrown off-screen.
    #[must_use]
    pub fn throw(from: f64, to: f64) -> Spring {
        Spring::new(from, to)
            .with_stiffness(THROW_STIFFNESS)
            .with_damping_ratio(OVERLAY_DAMPING_RATIO)
    }
}
