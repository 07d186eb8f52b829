#![forbid(unsafe_code)]

//! Transition animators: progress in, visuals out.
//!
//! An animator maps progress `p ∈ [0, 1]` to the visuals of the outgoing
//! (`from`) and incoming (`to`) cards. It holds no state; the driver owns
//! time. At `p = 1` every animator leaves `to` at [`Visual::IDENTITY`].

use std::f64::consts::PI;
use std::time::Duration;

use cardstack_core::{PanDirection, Rect, Transform};

use crate::config::TransitionTimings;
use crate::scene::Visual;
use crate::transition::NavigationKind;

/// Inputs fixed when a transition starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionContext {
    /// Container bounds.
    pub bounds: Rect,
    /// Side the outgoing card leaves by (pop) or the incoming card returns
    /// from (undo).
    pub swipe_direction: Option<PanDirection>,
}

/// Visuals for both endpoints at one progress value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionFrame {
    pub from: Visual,
    pub to: Visual,
}

/// An animation strategy.
pub trait TransitionAnimator {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Full-length duration.
    fn duration(&self) -> Duration;

    /// Visuals at `progress`.
    fn frame(&self, ctx: &TransitionContext, progress: f64) -> TransitionFrame;

    /// Whether `to` is attached above `from`.
    fn places_to_above(&self) -> bool {
        true
    }
}

/// Animator for an operation kind.
#[must_use]
pub fn animator_for(kind: NavigationKind, timings: &TransitionTimings) -> Box<dyn TransitionAnimator> {
    let ms = Duration::from_millis;
    match kind {
        NavigationKind::Push(_) | NavigationKind::Revisit(_) => Box::new(Push(ms(timings.push_ms))),
        NavigationKind::Pop => Box::new(Pop(ms(timings.pop_ms))),
        NavigationKind::PopGroup => Box::new(PopGroup(ms(timings.pop_group_ms))),
        NavigationKind::Undo => Box::new(Undo(ms(timings.undo_ms))),
        NavigationKind::HideLoading => Box::new(LoadingReveal(ms(timings.loading_reveal_ms))),
        NavigationKind::ShowLoading => Box::new(ShowLoading(ms(timings.show_loading_ms))),
    }
}

const REVEAL_SCALE: f64 = 0.9;
const REVEAL_ALPHA: f64 = 0.9;
const REVEAL_DROP: f64 = 10.0;
const OFFSCREEN_FACTOR: f64 = 1.2;

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// The card underneath growing into place.
fn reveal(p: f64) -> Visual {
    Visual::transformed(Transform::translation(0.0, lerp(REVEAL_DROP, 0.0, p)).scaled(lerp(
        REVEAL_SCALE,
        1.0,
        p,
    )))
    .with_alpha(lerp(REVEAL_ALPHA, 1.0, p))
}

fn side(ctx: &TransitionContext) -> f64 {
    ctx.swipe_direction
        .filter(|d| d.is_horizontal())
        .map_or(0.0, PanDirection::sign)
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// New group slides up from below.
#[derive(Debug, Clone, Copy)]
pub struct Push(pub Duration);

impl TransitionAnimator for Push {
    fn name(&self) -> &'static str {
        "push"
    }

    fn duration(&self) -> Duration {
        self.0
    }

    fn frame(&self, ctx: &TransitionContext, p: f64) -> TransitionFrame {
        TransitionFrame {
            from: Visual::IDENTITY,
            to: Visual::transformed(Transform::translation(0.0, (1.0 - p) * ctx.bounds.height)),
        }
    }
}

/// Top card leaves sideways, the next one rises from underneath.
#[derive(Debug, Clone, Copy)]
pub struct Pop(pub Duration);

impl TransitionAnimator for Pop {
    fn name(&self) -> &'static str {
        "pop"
    }

    fn duration(&self) -> Duration {
        self.0
    }

    fn frame(&self, ctx: &TransitionContext, p: f64) -> TransitionFrame {
        let dx = side(ctx) * ctx.bounds.width * OFFSCREEN_FACTOR * p;
        TransitionFrame {
            from: Visual::transformed(Transform::translation(dx, 0.0)),
            to: reveal(p),
        }
    }

    fn places_to_above(&self) -> bool {
        false
    }
}

/// Whole group slides down off screen.
#[derive(Debug, Clone, Copy)]
pub struct PopGroup(pub Duration);

impl TransitionAnimator for PopGroup {
    fn name(&self) -> &'static str {
        "pop-group"
    }

    fn duration(&self) -> Duration {
        self.0
    }

    fn frame(&self, ctx: &TransitionContext, p: f64) -> TransitionFrame {
        TransitionFrame {
            from: Visual::transformed(Transform::translation(0.0, p * ctx.bounds.height)),
            to: reveal(p),
        }
    }

    fn places_to_above(&self) -> bool {
        false
    }
}

/// Previous card flies back in from the side it was swiped to.
#[derive(Debug, Clone, Copy)]
pub struct Undo(pub Duration);

impl TransitionAnimator for Undo {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn duration(&self) -> Duration {
        self.0
    }

    fn frame(&self, ctx: &TransitionContext, p: f64) -> TransitionFrame {
        let sign = side(ctx);
        let rest = 1.0 - p;
        TransitionFrame {
            from: Visual::IDENTITY,
            to: Visual::transformed(
                Transform::translation(sign * ctx.bounds.width * OFFSCREEN_FACTOR * rest, 0.0)
                    .rotated(sign * PI / 10.0 * rest),
            ),
        }
    }
}

/// Loading placeholder fades out over the card that replaced it.
#[derive(Debug, Clone, Copy)]
pub struct LoadingReveal(pub Duration);

impl TransitionAnimator for LoadingReveal {
    fn name(&self) -> &'static str {
        "loading-reveal"
    }

    fn duration(&self) -> Duration {
        self.0
    }

    fn frame(&self, _ctx: &TransitionContext, p: f64) -> TransitionFrame {
        TransitionFrame {
            from: Visual::IDENTITY.with_alpha(1.0 - p),
            to: Visual::IDENTITY,
        }
    }

    fn places_to_above(&self) -> bool {
        false
    }
}

/// Loading placeholder fades in on top.
#[derive(Debug, Clone, Copy)]
pub struct ShowLoading(pub Duration);

impl TransitionAnimator for ShowLoading {
    fn name(&self) -> &'static str {
        "show-loading"
    }

    fn duration(&self) -> Duration {
        self.0
    }

    fn frame(&self, _ctx: &TransitionContext, p: f64) -> TransitionFrame {
        TransitionFrame {
            from: Visual::IDENTITY,
            to: Visual::IDENTITY.with_alpha(p),
        }
    }
}
