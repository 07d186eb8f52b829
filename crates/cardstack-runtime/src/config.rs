#![forbid(unsafe_code)]

//! Tunable parameters for the navigation engine.
//!
//! [`StackConfig`] groups every constant the engine uses so hosts can tune
//! them without code changes. With the `config-file` feature it loads from
//! TOML or JSON:
//!
//! ```toml
//! [gesture]
//! commit_threshold = 0.25
//!
//! [group]
//! prefetch_buffer = 3
//!
//! [queue]
//! stall_timeout_ms = 10000
//! ```
//!
//! ```rust,ignore
//! let config = StackConfig::from_toml_file("cardstack.toml")?.validated()?;
//! ```
//!
//! # Defaults
//!
//! Every field defaults to the canonical value, so `StackConfig::default()`
//! is the stock behaviour: commit at 25% of half the viewport width,
//! prefetch when fewer than 3 cards remain.

use std::f64::consts::PI;
use std::time::Duration;

#[cfg(feature = "config-file")]
use std::path::Path;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use cardstack_core::animation::spring::{Spring, presets};
use cardstack_core::{PanRecognizerConfig, Rect};

use crate::card::CardState;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// StackConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for a [`CardStack`](crate::stack::CardStack).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct StackConfig {
    /// Drag-to-pop parameters.
    pub gesture: GestureConfig,
    /// Group pagination parameters.
    pub group: GroupConfig,
    /// Card frame geometry.
    pub layout: LayoutConfig,
    /// Transition durations.
    pub timings: TransitionTimings,
    /// Navigation queue parameters.
    pub queue: QueueConfig,
}

impl StackConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let g = &self.gesture;
        if g.commit_threshold <= 0.0 || g.commit_threshold >= 1.0 {
            errors.push(format!(
                "gesture.commit_threshold must be in (0, 1), got {}",
                g.commit_threshold
            ));
        }
        if g.max_rotation < 0.0 {
            errors.push(format!(
                "gesture.max_rotation must be >= 0, got {}",
                g.max_rotation
            ));
        }
        if g.min_pan_distance < 0.0 {
            errors.push(format!(
                "gesture.min_pan_distance must be >= 0, got {}",
                g.min_pan_distance
            ));
        }
        if g.throw_stiffness <= 0.0 || g.snap_back_stiffness <= 0.0 {
            errors.push("gesture spring stiffness must be > 0".into());
        }
        if g.overlay_damping_ratio <= 0.0 {
            errors.push(format!(
                "gesture.overlay_damping_ratio must be > 0, got {}",
                g.overlay_damping_ratio
            ));
        }

        if self.group.prefetch_buffer == 0 {
            errors.push("group.prefetch_buffer must be > 0".into());
        }

        let l = &self.layout;
        if l.inset < 0.0 {
            errors.push(format!("layout.inset must be >= 0, got {}", l.inset));
        }
        for (name, value) in [
            ("layout.height_fraction", l.height_fraction),
            ("layout.stack_fraction", l.stack_fraction),
            ("layout.expanded_fraction", l.expanded_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        if l.expanded_fraction >= l.stack_fraction {
            errors.push("layout.expanded_fraction must be below layout.stack_fraction".into());
        }
        if l.hysteresis_buffer < 0.0 {
            errors.push(format!(
                "layout.hysteresis_buffer must be >= 0, got {}",
                l.hysteresis_buffer
            ));
        }

        let t = &self.timings;
        for (name, value) in [
            ("timings.push_ms", t.push_ms),
            ("timings.pop_ms", t.pop_ms),
            ("timings.pop_group_ms", t.pop_group_ms),
            ("timings.undo_ms", t.undo_ms),
            ("timings.loading_reveal_ms", t.loading_reveal_ms),
            ("timings.show_loading_ms", t.show_loading_ms),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }
        if t.completion_speed <= 0.0 {
            errors.push(format!(
                "timings.completion_speed must be > 0, got {}",
                t.completion_speed
            ));
        }

        errors
    }

    /// Consume and return `self` if valid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Drag-to-pop gesture parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct GestureConfig {
    /// Fraction of half the viewport width past which a release commits. Default: 0.25.
    pub commit_threshold: f64,
    /// Snapshot rotation at full progress, radians. Default: π/10.
    pub max_rotation: f64,
    /// Touch travel before a pan begins, points. Default: 10.
    pub min_pan_distance: f64,
    /// Stiffness of the off-screen throw. Default: 160.
    pub throw_stiffness: f64,
    /// Stiffness of the spring-back. Default: 900.
    pub snap_back_stiffness: f64,
    /// Damping ratio for both overlay springs. Default: 0.8.
    pub overlay_damping_ratio: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            commit_threshold: 0.25,
            max_rotation: PI / 10.0,
            min_pan_distance: 10.0,
            throw_stiffness: presets::THROW_STIFFNESS,
            snap_back_stiffness: presets::SNAP_BACK_STIFFNESS,
            overlay_damping_ratio: presets::OVERLAY_DAMPING_RATIO,
        }
    }
}

impl GestureConfig {
    /// Progress spring (0 → 1) for throwing the snapshot away.
    #[must_use]
    pub fn throw_spring(&self) -> Spring {
        Spring::new(0.0, 1.0)
            .with_stiffness(self.throw_stiffness)
            .with_damping_ratio(self.overlay_damping_ratio)
    }

    /// Progress spring (0 → 1) for returning the snapshot to rest.
    #[must_use]
    pub fn snap_back_spring(&self) -> Spring {
        Spring::new(0.0, 1.0)
            .with_stiffness(self.snap_back_stiffness)
            .with_damping_ratio(self.overlay_damping_ratio)
    }

    /// Recognizer thresholds derived from this config.
    #[must_use]
    pub fn recognizer_config(&self) -> PanRecognizerConfig {
        PanRecognizerConfig {
            min_distance: self.min_pan_distance,
            ..PanRecognizerConfig::default()
        }
    }
}

/// Group pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct GroupConfig {
    /// Prefetch when fewer than this many cards remain from the cursor. Default: 3.
    pub prefetch_buffer: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self { prefetch_buffer: 3 }
    }
}

/// Card frame geometry relative to the container bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct LayoutConfig {
    /// Horizontal inset on each side, points. Default: 10.
    pub inset: f64,
    /// Card height as a fraction of container height. Default: 0.9.
    pub height_fraction: f64,
    /// Visible strip when minimized, points from the bottom. Default: 110.
    pub minimized_peek: f64,
    /// Top of a stacked card as a fraction of container height. Default: 0.4.
    pub stack_fraction: f64,
    /// Top of an expanded card as a fraction of container height. Default: 0.1.
    pub expanded_fraction: f64,
    /// Slack around each origin when picking a state on scroll release. Default: 25.
    pub hysteresis_buffer: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            inset: 10.0,
            height_fraction: 0.9,
            minimized_peek: 110.0,
            stack_fraction: 0.4,
            expanded_fraction: 0.1,
            hysteresis_buffer: 25.0,
        }
    }
}

impl LayoutConfig {
    /// Top edge of a card in `state`.
    #[must_use]
    pub fn origin(&self, state: CardState, bounds: Rect) -> f64 {
        let y = match state {
            CardState::Minimized => bounds.height - self.minimized_peek,
            CardState::Stack => bounds.height * self.stack_fraction,
            CardState::Expanded => bounds.height * self.expanded_fraction,
        };
        bounds.y + y
    }

    /// Card frame in `state`.
    #[must_use]
    pub fn frame(&self, state: CardState, bounds: Rect) -> Rect {
        Rect::new(
            bounds.x + self.inset,
            self.origin(state, bounds),
            (bounds.width - 2.0 * self.inset).max(0.0),
            bounds.height * self.height_fraction,
        )
    }

    /// Height of the captured snapshot: the part of a stacked card on screen.
    #[must_use]
    pub fn snapshot_height(&self, bounds: Rect) -> f64 {
        (bounds.max_y() - self.origin(CardState::Stack, bounds)).max(0.0)
    }
}

/// Per-animator transition durations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct TransitionTimings {
    /// Group push. Default: 350ms.
    pub push_ms: u64,
    /// Card pop. Default: 200ms.
    pub pop_ms: u64,
    /// Group pop. Default: 350ms.
    pub pop_group_ms: u64,
    /// Undo of a swipe. Default: 300ms.
    pub undo_ms: u64,
    /// Loading placeholder giving way to a loaded card. Default: 250ms.
    pub loading_reveal_ms: u64,
    /// Loading placeholder appearing. Default: 250ms.
    pub show_loading_ms: u64,
    /// Speed multiplier when an interactive transition plays out after
    /// release. Default: 1.0.
    pub completion_speed: f64,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            push_ms: 350,
            pop_ms: 200,
            pop_group_ms: 350,
            undo_ms: 300,
            loading_reveal_ms: 250,
            show_loading_ms: 250,
            completion_speed: 1.0,
        }
    }
}

/// Navigation queue parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct QueueConfig {
    /// Cancel an interactive transition that gets no input for this long.
    /// Zero disables the watchdog. Default: 10000ms.
    pub stall_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            stall_timeout_ms: 10_000,
        }
    }
}

impl QueueConfig {
    /// Stall timeout, or `None` when the watchdog is disabled.
    #[must_use]
    pub fn stall_timeout(&self) -> Option<Duration> {
        (self.stall_timeout_ms > 0).then(|| Duration::from_millis(self.stall_timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
