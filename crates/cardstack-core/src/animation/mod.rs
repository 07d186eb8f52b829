#![forbid(unsafe_code)]

//! Animation primitives.
//!
//! Everything that moves in cardstack is driven by explicit time steps:
//! the host calls `tick(dt)` once per frame and reads `value()`. Nothing
//! here owns a clock, which keeps every transition deterministic under test.
//!
//! # Invariants
//!
//! 1. [`Animation::value`] of a [`Tween`] is always in [0.0, 1.0].
//! 2. A completed animation stays complete until [`Animation::reset`].
//! 3. `tick(Duration::ZERO)` never changes state.

pub mod spring;

use std::time::Duration;

pub use spring::Spring;

/// A time-stepped animation producing a progress value.
pub trait Animation {
    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end state.
    fn is_complete(&self) -> bool;

    /// Current value, normalized to [0.0, 1.0] for bounded animations.
    fn value(&self) -> f64;

    /// Return to the initial state.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// Easing curve applied to linear progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Linear interpolation.
    Linear,
    /// Decelerating cubic, good for things arriving on screen.
    #[default]
    EaseOut,
    /// Accelerating cubic, good for things leaving.
    EaseIn,
    /// Cubic S-curve.
    EaseInOut,
}

impl Easing {
    /// Apply the curve to `t`, clamped to [0.0, 1.0].
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseIn => t * t * t,
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Fixed-duration progression from 0.0 to 1.0 with an easing curve.
#[derive(Debug, Clone)]
pub struct Tween {
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl Tween {
    /// Create a tween. Zero durations are clamped to 1ns so the first
    /// non-zero tick completes it.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: duration.max(Duration::from_nanos(1)),
            elapsed: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    /// Set the easing curve (builder pattern).
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Total duration.
    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Linear (un-eased) progress in [0.0, 1.0].
    #[must_use]
    pub fn linear_progress(&self) -> f64 {
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Jump straight to the end.
    pub fn complete(&mut self) {
        self.elapsed = self.duration;
    }
}

impl Animation for Tween {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f64 {
        self.easing.apply(self.linear_progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseOut,
            Easing::EaseIn,
            Easing::EaseInOut,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-12, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12, "{easing:?} at 1");
        }
    }

    #[test]
    fn easing_clamps_input() {
        assert_eq!(Easing::Linear.apply(-1.0), 0.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn ease_out_leads_linear() {
        assert!(Easing::EaseOut.apply(0.3) > 0.3);
        assert!(Easing::EaseIn.apply(0.3) < 0.3);
    }

    #[test]
    fn tween_completes_after_duration() {
        let mut tw = Tween::new(MS_100).easing(Easing::Linear);
        tw.tick(Duration::from_millis(40));
        assert!(!tw.is_complete());
        assert!((tw.value() - 0.4).abs() < 1e-9);
        tw.tick(Duration::from_millis(60));
        assert!(tw.is_complete());
        assert_eq!(tw.value(), 1.0);
    }

    #[test]
    fn tween_overshoot_tick_clamps() {
        let mut tw = Tween::new(MS_100);
        tw.tick(Duration::from_secs(5));
        assert_eq!(tw.linear_progress(), 1.0);
    }

    #[test]
    fn zero_duration_tween_completes_on_first_tick() {
        let mut tw = Tween::new(Duration::ZERO);
        assert!(!tw.is_complete());
        tw.tick(Duration::from_nanos(1));
        assert!(tw.is_complete());
    }

    #[test]
    fn zero_tick_is_noop() {
        let mut tw = Tween::new(MS_100);
        tw.tick(Duration::ZERO);
        assert_eq!(tw.linear_progress(), 0.0);
    }

    #[test]
    fn reset_and_complete() {
        let mut tw = Tween::new(MS_100);
        tw.complete();
        assert!(tw.is_complete());
        tw.reset();
        assert!(!tw.is_complete());
        assert_eq!(tw.value(), 0.0);
    }
}
