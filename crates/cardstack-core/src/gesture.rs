#![forbid(unsafe_code)]

//! Pan recognition: transforms raw touches into pan phases.
//!
//! [`PanRecognizer`] is a stateful processor that converts a touch
//! down → move → up sequence into [`PanEvent`]s carrying the cumulative
//! translation and an instantaneous velocity. [`PanDirection`] classifies a
//! drag vector into its dominant cardinal direction.
//!
//! # State Machine
//!
//! ```text
//! Idle ──down──▶ Tracking ──move ≥ min_distance──▶ Panning ──up──▶ Idle
//!                   │                                 │
//!                   └──up (no pan)──▶ Idle             └──cancel──▶ Idle
//! ```
//!
//! # Invariants
//!
//! 1. Every pan is well-formed: `Began` → zero or more `Changed` →
//!    exactly one of `Ended` or `Cancelled`.
//! 2. Translation is always measured from the touch-down location, so the
//!    first `Began` already carries the distance that crossed the threshold.
//! 3. After [`reset`](PanRecognizer::reset), the current touch is dropped:
//!    no further events are produced until the next touch-down.
//!
//! # Failure Modes
//!
//! - A `Move` or `Up` without a preceding `Down` is ignored.
//! - Two samples with the same timestamp produce zero velocity rather than a
//!   division by zero.

use std::time::Duration;

use web_time::Instant;

use crate::geometry::Point;

// ---------------------------------------------------------------------------
// PanDirection
// ---------------------------------------------------------------------------

/// Cardinal direction of a pan or swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

impl PanDirection {
    /// Classify a drag vector by its dominant axis.
    ///
    /// Ties (including the zero vector) classify as vertical, so a
    /// perfectly diagonal drag never starts a horizontal swipe.
    #[must_use]
    pub fn classify(vector: Point) -> Self {
        if is_horizontal(vector) {
            if vector.x > 0.0 { Self::Right } else { Self::Left }
        } else if vector.y > 0.0 {
            Self::Down
        } else {
            Self::Up
        }
    }

    /// Horizontal direction from the sign of `dx` alone.
    ///
    /// Used once a pan is already known to be horizontal: a drag that
    /// reverses past its origin flips sides.
    #[must_use]
    pub fn horizontal_from(dx: f64) -> Self {
        if dx > 0.0 { Self::Right } else { Self::Left }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Returns true for vertical directions.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Returns true for horizontal directions.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Sign of the direction along its own axis: `+1.0` for right/down.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Right | Self::Down => 1.0,
            Self::Left | Self::Up => -1.0,
        }
    }
}

/// `|dx| > |dy|`.
#[inline]
#[must_use]
pub fn is_horizontal(vector: Point) -> bool {
    vector.x.abs() > vector.y.abs()
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Raw touch input for a single finger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    /// The platform took the touch away (incoming call, system gesture).
    Cancel,
}

/// Phase of a recognized pan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanPhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

impl PanPhase {
    /// `Ended` or `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }
}

/// A recognized pan sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanEvent {
    pub phase: PanPhase,
    /// Cumulative translation from the touch-down location.
    pub translation: Point,
    /// Instantaneous velocity in points per second.
    pub velocity: Point,
}

impl PanEvent {
    /// Create a pan event.
    #[must_use]
    pub const fn new(phase: PanPhase, translation: Point, velocity: Point) -> Self {
        Self {
            phase,
            translation,
            velocity,
        }
    }

    /// Whether the pan is horizontal.
    ///
    /// Velocity is the better signal at the start of a drag; translation is
    /// used when the finger has stopped.
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        if self.velocity.length() > f64::EPSILON {
            is_horizontal(self.velocity)
        } else {
            is_horizontal(self.translation)
        }
    }

    /// Dominant direction using the same signal as [`is_horizontal`](Self::is_horizontal).
    #[must_use]
    pub fn direction(&self) -> PanDirection {
        if self.velocity.length() > f64::EPSILON {
            PanDirection::classify(self.velocity)
        } else {
            PanDirection::classify(self.translation)
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for pan recognition.
#[derive(Debug, Clone)]
pub struct PanRecognizerConfig {
    /// Minimum distance (points) from touch-down before a pan begins (default: 10).
    pub min_distance: f64,
    /// Samples older than this are not used for velocity (default: 100ms).
    pub velocity_window: Duration,
}

impl Default for PanRecognizerConfig {
    fn default() -> Self {
        Self {
            min_distance: 10.0,
            velocity_window: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// PanRecognizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct TouchTracker {
    start: Point,
    last: Point,
    last_time: Instant,
    velocity: Point,
    panning: bool,
}

/// Stateful pan recognizer.
///
/// Call [`process`](PanRecognizer::process) for each [`TouchEvent`].
#[derive(Debug, Clone, Default)]
pub struct PanRecognizer {
    config: PanRecognizerConfig,
    touch: Option<TouchTracker>,
}

impl PanRecognizer {
    /// Create a recognizer with the given configuration.
    #[must_use]
    pub fn new(config: PanRecognizerConfig) -> Self {
        Self {
            config,
            touch: None,
        }
    }

    /// Process a raw touch, returning the pan event it produced, if any.
    pub fn process(&mut self, touch: TouchEvent, now: Instant) -> Option<PanEvent> {
        match touch {
            TouchEvent::Down(pos) => {
                self.touch = Some(TouchTracker {
                    start: pos,
                    last: pos,
                    last_time: now,
                    velocity: Point::ZERO,
                    panning: false,
                });
                None
            }
            TouchEvent::Move(pos) => self.on_move(pos, now),
            TouchEvent::Up(pos) => {
                let mut tracker = self.touch.take()?;
                if !tracker.panning {
                    return None;
                }
                tracker.sample(pos, now, self.config.velocity_window);
                Some(PanEvent::new(
                    PanPhase::Ended,
                    pos - tracker.start,
                    tracker.velocity,
                ))
            }
            TouchEvent::Cancel => {
                let tracker = self.touch.take()?;
                tracker.panning.then(|| {
                    PanEvent::new(
                        PanPhase::Cancelled,
                        tracker.last - tracker.start,
                        Point::ZERO,
                    )
                })
            }
        }
    }

    /// Whether a pan is currently in progress.
    #[inline]
    #[must_use]
    pub fn is_panning(&self) -> bool {
        self.touch.is_some_and(|t| t.panning)
    }

    /// Drop the current touch without emitting anything.
    ///
    /// Equivalent to disabling and re-enabling a platform recognizer: the
    /// finger that is down now is ignored, the next touch-down re-arms.
    pub fn reset(&mut self) {
        if self.touch.take().is_some() {
            tracing::trace!(target: "cardstack.gesture", "pan recognizer reset");
        }
    }

    /// Get a reference to the current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PanRecognizerConfig {
        &self.config
    }

    fn on_move(&mut self, pos: Point, now: Instant) -> Option<PanEvent> {
        let window = self.config.velocity_window;
        let min_distance = self.config.min_distance;
        let tracker = self.touch.as_mut()?;
        tracker.sample(pos, now, window);

        let translation = pos - tracker.start;
        if tracker.panning {
            return Some(PanEvent::new(PanPhase::Changed, translation, tracker.velocity));
        }
        if translation.length() >= min_distance {
            tracker.panning = true;
            return Some(PanEvent::new(PanPhase::Began, translation, tracker.velocity));
        }
        None
    }
}

impl TouchTracker {
    fn sample(&mut self, pos: Point, now: Instant, window: Duration) {
        let dt = now.saturating_duration_since(self.last_time);
        if dt > window {
            self.velocity = Point::ZERO;
        } else if !dt.is_zero() {
            self.velocity = (pos - self.last).scaled(1.0 / dt.as_secs_f64());
        }
        self.last = pos;
        self.last_time = now;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_16: Duration = Duration::from_millis(16);

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    // --- Classification ---

    #[test]
    fn classify_dominant_axis() {
        assert_eq!(PanDirection::classify(p(10.0, 2.0)), PanDirection::Right);
        assert_eq!(PanDirection::classify(p(-10.0, 2.0)), PanDirection::Left);
        assert_eq!(PanDirection::classify(p(1.0, 5.0)), PanDirection::Down);
        assert_eq!(PanDirection::classify(p(1.0, -5.0)), PanDirection::Up);
    }

    #[test]
    fn diagonal_is_not_horizontal() {
        assert!(!is_horizontal(p(5.0, 5.0)));
        assert!(!is_horizontal(p(-5.0, 5.0)));
        assert!(PanDirection::classify(p(5.0, 5.0)).is_vertical());
    }

    #[test]
    fn opposite_and_axes() {
        assert_eq!(PanDirection::Left.opposite(), PanDirection::Right);
        assert_eq!(PanDirection::Up.opposite(), PanDirection::Down);
        assert!(PanDirection::Left.is_horizontal());
        assert!(PanDirection::Down.is_vertical());
        assert_eq!(PanDirection::Left.sign(), -1.0);
        assert_eq!(PanDirection::Right.sign(), 1.0);
    }

    #[test]
    fn event_prefers_velocity_for_direction() {
        let ev = PanEvent::new(PanPhase::Began, p(0.0, 20.0), p(300.0, 10.0));
        assert!(ev.is_horizontal());
        assert_eq!(ev.direction(), PanDirection::Right);

        let still = PanEvent::new(PanPhase::Ended, p(-40.0, 5.0), Point::ZERO);
        assert!(still.is_horizontal());
        assert_eq!(still.direction(), PanDirection::Left);
    }

    // --- Recognizer ---

    #[test]
    fn small_move_does_not_begin() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        assert!(pr.process(TouchEvent::Down(p(100.0, 100.0)), t).is_none());
        assert!(pr.process(TouchEvent::Move(p(104.0, 100.0)), t + MS_16).is_none());
        assert!(!pr.is_panning());
        assert!(pr.process(TouchEvent::Up(p(104.0, 100.0)), t + MS_16 * 2).is_none());
    }

    #[test]
    fn full_pan_sequence() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        pr.process(TouchEvent::Down(p(100.0, 100.0)), t);

        let began = pr
            .process(TouchEvent::Move(p(115.0, 101.0)), t + MS_16)
            .expect("began");
        assert_eq!(began.phase, PanPhase::Began);
        assert_eq!(began.translation, p(15.0, 1.0));
        assert!(began.velocity.x > 0.0);

        let changed = pr
            .process(TouchEvent::Move(p(160.0, 104.0)), t + MS_16 * 2)
            .expect("changed");
        assert_eq!(changed.phase, PanPhase::Changed);
        assert_eq!(changed.translation, p(60.0, 4.0));

        let ended = pr
            .process(TouchEvent::Up(p(170.0, 104.0)), t + MS_16 * 3)
            .expect("ended");
        assert_eq!(ended.phase, PanPhase::Ended);
        assert_eq!(ended.translation, p(70.0, 4.0));
        assert!(!pr.is_panning());
    }

    #[test]
    fn cancel_during_pan_emits_cancelled() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        pr.process(TouchEvent::Down(p(0.0, 0.0)), t);
        pr.process(TouchEvent::Move(p(30.0, 0.0)), t + MS_16);
        let ev = pr.process(TouchEvent::Cancel, t + MS_16 * 2).expect("cancelled");
        assert_eq!(ev.phase, PanPhase::Cancelled);
        assert_eq!(ev.translation, p(30.0, 0.0));
    }

    #[test]
    fn cancel_without_pan_is_silent() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        pr.process(TouchEvent::Down(p(0.0, 0.0)), t);
        assert!(pr.process(TouchEvent::Cancel, t + MS_16).is_none());
    }

    #[test]
    fn reset_drops_current_touch_until_next_down() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        pr.process(TouchEvent::Down(p(0.0, 0.0)), t);
        pr.process(TouchEvent::Move(p(0.0, 40.0)), t + MS_16);
        assert!(pr.is_panning());

        pr.reset();
        assert!(!pr.is_panning());
        assert!(pr.process(TouchEvent::Move(p(0.0, 80.0)), t + MS_16 * 2).is_none());
        assert!(pr.process(TouchEvent::Up(p(0.0, 80.0)), t + MS_16 * 3).is_none());

        // Re-armed by the next touch.
        pr.process(TouchEvent::Down(p(0.0, 0.0)), t + MS_16 * 4);
        let ev = pr.process(TouchEvent::Move(p(50.0, 0.0)), t + MS_16 * 5);
        assert_eq!(ev.map(|e| e.phase), Some(PanPhase::Began));
    }

    #[test]
    fn stale_sample_zeroes_velocity() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        pr.process(TouchEvent::Down(p(0.0, 0.0)), t);
        pr.process(TouchEvent::Move(p(30.0, 0.0)), t + MS_16);
        let ended = pr
            .process(TouchEvent::Up(p(31.0, 0.0)), t + Duration::from_millis(500))
            .expect("ended");
        assert_eq!(ended.velocity, Point::ZERO);
    }

    #[test]
    fn move_without_down_is_ignored() {
        let mut pr = PanRecognizer::default();
        let t = Instant::now();
        assert!(pr.process(TouchEvent::Move(p(100.0, 0.0)), t).is_none());
        assert!(pr.process(TouchEvent::Up(p(100.0, 0.0)), t).is_none());
    }

    #[test]
    fn terminal_phases() {
        assert!(PanPhase::Ended.is_terminal());
        assert!(PanPhase::Cancelled.is_terminal());
        assert!(!PanPhase::Began.is_terminal());
        assert!(!PanPhase::Changed.is_terminal());
    }
}
