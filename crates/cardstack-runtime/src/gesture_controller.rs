#![forbid(unsafe_code)]

//! Drag-to-pop gesture controller.
//!
//! Turns pan phases into an interactive pop on the navigation queue and
//! drives the snapshot overlay that follows the finger.
//!
//! # State Machine
//!
//! ```text
//! Idle ──Began (guards pass)──▶ Dragging ──Changed──▶ Dragging
//!   ▲                              │
//!   │                              └──Ended/Cancelled──▶ Settling ──spring done──▶ Idle
//!   └──Began (guard fails): recognizer reset
//! ```
//!
//! # Invariants
//!
//! 1. While dragging, the dragged card is hidden and the overlay shows its
//!    snapshot; after settling the overlay is gone and the card, if still
//!    attached, is visible.
//! 2. Release past the commit threshold finishes the transition unless the
//!    stall watchdog already cancelled it; anything else cancels it. The
//!    reported [`Release`] always matches what the transition does.
//! 3. A new drag finalizes any settle still in flight before it starts.

use std::time::Duration;

use cardstack_core::animation::Animation;
use cardstack_core::animation::spring::Spring;
use cardstack_core::{PanDirection, PanEvent, PanPhase, PanRecognizer, Transform, TouchEvent};
use web_time::Instant;

use crate::card::Card;
use crate::config::{GestureConfig, TransitionTimings};
use crate::error::NavigationError;
use crate::navigation::NavigationState;
use crate::queue::NavigationQueue;
use crate::scene::SnapshotOverlay;
use crate::transition::{
    AnimationStrategy, Endpoint, NavigationKind, OperationId, TransitionOperation, animator_for,
};

#[derive(Debug)]
struct ActivePan {
    card: Card,
    op: OperationId,
    half_width: f64,
}

#[derive(Debug)]
struct Settle {
    card: Card,
    spring: Spring,
    from: Transform,
    to: Transform,
    committed: bool,
}

/// What a release did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Past the threshold: thrown off toward `direction`.
    Thrown(PanDirection),
    /// Under the threshold: springing back.
    SnappedBack,
}

/// Pan input to interactive pop.
#[derive(Debug)]
pub struct GestureController {
    recognizer: PanRecognizer,
    config: GestureConfig,
    timings: TransitionTimings,
    active: Option<ActivePan>,
    settle: Option<Settle>,
}

impl GestureController {
    #[must_use]
    pub fn new(config: GestureConfig, timings: TransitionTimings) -> Self {
        Self {
            recognizer: PanRecognizer::new(config.recognizer_config()),
            config,
            timings,
            active: None,
            settle: None,
        }
    }

    /// A drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// The overlay is still springing after release.
    #[must_use]
    pub fn is_settling(&self) -> bool {
        self.settle.is_some()
    }

    /// Feed a raw touch through the recognizer.
    pub fn handle_touch(
        &mut self,
        touch: TouchEvent,
        now: Instant,
        nav: &mut NavigationState,
        queue: &mut NavigationQueue,
    ) -> Result<Option<Release>, NavigationError> {
        match self.recognizer.process(touch, now) {
            Some(event) => self.handle_pan(event, nav, queue),
            None => Ok(None),
        }
    }

    /// Handle one pan phase.
    pub fn handle_pan(
        &mut self,
        event: PanEvent,
        nav: &mut NavigationState,
        queue: &mut NavigationQueue,
    ) -> Result<Option<Release>, NavigationError> {
        match event.phase {
            PanPhase::Began => self.began(event, nav, queue).map(|()| None),
            PanPhase::Changed => self.changed(event, nav, queue).map(|()| None),
            PanPhase::Ended | PanPhase::Cancelled => self.ended(event, nav, queue).map(Some),
        }
    }

    fn began(
        &mut self,
        event: PanEvent,
        nav: &mut NavigationState,
        queue: &mut NavigationQueue,
    ) -> Result<(), NavigationError> {
        if let Err(err) = Self::check_began(&event, nav, queue) {
            tracing::debug!(target: "cardstack.gesture", %err, "drag rejected");
            self.recognizer.reset();
            return Err(err);
        }
        self.finalize_settle(nav);
        let Some(card) = nav.displayed().cloned() else {
            self.recognizer.reset();
            return Err(NavigationError::NothingDisplayed);
        };

        if let Some(group) = nav.top_group_mut() {
            group.will_begin_swiping();
        }
        card.refresh_snapshot();
        let Some(snapshot) = card.snapshot() else {
            tracing::warn!(target: "cardstack.gesture", card = %card.id(), "no snapshot; drag rejected");
            self.recognizer.reset();
            return Err(NavigationError::NoSnapshot);
        };
        nav.scene.set_overlay(SnapshotOverlay {
            card: card.id(),
            rest: snapshot.screen_rect(),
            snapshot,
            transform: Transform::IDENTITY,
        });
        nav.scene.set_hidden(&card, true);

        let op = TransitionOperation::new(
            NavigationKind::Pop,
            Endpoint::Displayed,
            Endpoint::SwipeTarget,
            AnimationStrategy::interactive(animator_for(NavigationKind::Pop, &self.timings)),
        );
        let id = queue.enqueue(op, nav);
        if queue.running_id() != Some(id) {
            // Nothing to swipe to; the pop aborted on start.
            nav.scene.take_overlay();
            nav.scene.set_hidden(&card, false);
            self.recognizer.reset();
            tracing::debug!(target: "cardstack.gesture", card = %card.id(), "drag ignored: nothing to pop to");
            return Ok(());
        }

        tracing::debug!(target: "cardstack.gesture", card = %card.id(), op = %id, "drag began");
        self.active = Some(ActivePan {
            card,
            op: id,
            half_width: (nav.bounds.width / 2.0).max(f64::EPSILON),
        });
        self.changed(event, nav, queue)
    }

    fn check_began(
        event: &PanEvent,
        nav: &NavigationState,
        queue: &NavigationQueue,
    ) -> Result<(), NavigationError> {
        if !event.is_horizontal() {
            return Err(NavigationError::NotHorizontal);
        }
        if !queue.is_idle() {
            return Err(NavigationError::Busy);
        }
        let card = nav.displayed().ok_or(NavigationError::NothingDisplayed)?;
        if nav.is_top_loading_card(card) {
            return Err(NavigationError::LoadingCardDisplayed);
        }
        Ok(())
    }

    fn changed(
        &mut self,
        event: PanEvent,
        nav: &mut NavigationState,
        queue: &mut NavigationQueue,
    ) -> Result<(), NavigationError> {
        let active = self.active.as_ref().ok_or(NavigationError::NoActivePan)?;
        let percent = self.percent(active, event.translation.x);
        queue.update_interactive(percent, nav);
        let sign = PanDirection::horizontal_from(event.translation.x).sign();
        let transform = Transform::translation(event.translation.x, event.translation.y)
            .rotated(sign * self.config.max_rotation * percent);
        if let Some(overlay) = nav.scene.overlay_mut() {
            overlay.transform = transform;
        }
        Ok(())
    }

    fn ended(
        &mut self,
        event: PanEvent,
        nav: &mut NavigationState,
        queue: &mut NavigationQueue,
    ) -> Result<Release, NavigationError> {
        self.changed(event, nav, queue)?;
        let active = self.active.take().ok_or(NavigationError::NoActivePan)?;
        let dx = event.translation.x;
        let percent = self.percent(&active, dx);
        let from = nav
            .scene
            .overlay()
            .map_or(Transform::IDENTITY, |o| o.transform);

        // The watchdog may already be rolling the transition back; then the
        // release can only snap back.
        let direction = PanDirection::horizontal_from(dx);
        let thrown = percent > self.config.commit_threshold
            && queue.finish_interactive(Some(direction));
        let (release, to, spring) = if thrown {
            let width = nav.scene.overlay().map_or(0.0, |o| o.rest.width);
            let mut to = from;
            to.translation.x += direction.sign() * width;
            (Release::Thrown(direction), to, self.config.throw_spring())
        } else {
            queue.cancel_interactive();
            (Release::SnappedBack, Transform::IDENTITY, self.config.snap_back_spring())
        };

        tracing::debug!(
            target: "cardstack.gesture",
            card = %active.card.id(),
            op = %active.op,
            percent,
            ?release,
            "drag ended"
        );
        self.settle = Some(Settle {
            card: active.card,
            spring,
            from,
            to,
            committed: matches!(release, Release::Thrown(_)),
        });
        Ok(release)
    }

    fn percent(&self, active: &ActivePan, dx: f64) -> f64 {
        (dx.abs() / active.half_width).clamp(0.0, 1.0)
    }

    /// Drop a drag whose transition ended without a release (stall
    /// watchdog). The overlay springs back and the rest of the touch is
    /// ignored.
    pub fn reconcile(&mut self, nav: &NavigationState, queue: &NavigationQueue) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if queue.running_id() == Some(active.op) {
            return;
        }
        let Some(active) = self.active.take() else {
            return;
        };
        tracing::debug!(target: "cardstack.gesture", card = %active.card.id(), op = %active.op, "drag abandoned");
        self.recognizer.reset();
        let from = nav
            .scene
            .overlay()
            .map_or(Transform::IDENTITY, |o| o.transform);
        self.settle = Some(Settle {
            card: active.card,
            spring: self.config.snap_back_spring(),
            from,
            to: Transform::IDENTITY,
            committed: false,
        });
    }

    /// Advance the release spring.
    pub fn tick(&mut self, dt: Duration, nav: &mut NavigationState) {
        let Some(settle) = self.settle.as_mut() else {
            return;
        };
        settle.spring.tick(dt);
        let transform = settle.from.lerp(settle.to, settle.spring.value());
        if let Some(overlay) = nav.scene.overlay_mut() {
            overlay.transform = transform;
        }
        if settle.spring.is_complete() {
            self.finalize_settle(nav);
        }
    }

    fn finalize_settle(&mut self, nav: &mut NavigationState) {
        let Some(settle) = self.settle.take() else {
            return;
        };
        nav.scene.take_overlay();
        nav.scene.set_hidden(&settle.card, false);
        tracing::trace!(
            target: "cardstack.gesture",
            card = %settle.card.id(),
            committed = settle.committed,
            "overlay settled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Bitmap, CardContent, CardState, ChangeListener};
    use crate::config::{LayoutConfig, StackConfig};
    use crate::group::CardGroup;
    use cardstack_core::{Point, Rect};
    use std::rc::Rc;

    const PHONE: Rect = Rect::from_size(375.0, 812.0);

    struct Blank;

    impl CardContent for Blank {
        fn capture(&self, region: Rect) -> Option<Bitmap> {
            Some(Bitmap::new(region.width, region.height, Vec::new()))
        }

        fn set_change_listener(&self, _listener: Option<ChangeListener>) {}
    }

    struct Fixture {
        gesture: GestureController,
        nav: NavigationState,
        queue: NavigationQueue,
        cards: Vec<Card>,
    }

    fn fixture(n: usize) -> Fixture {
        let cards: Vec<Card> = (0..n)
            .map(|_| Card::new(Rc::new(Blank), CardState::Stack, LayoutConfig::default()))
            .collect();
        let config = StackConfig::default();
        Fixture {
            gesture: GestureController::new(config.gesture.clone(), config.timings.clone()),
            queue: NavigationQueue::new(&config.queue, config.timings.clone()),
            nav: NavigationState::new(CardGroup::with_cards(cards.clone()), config, PHONE),
            cards,
        }
    }

    fn pan(phase: PanPhase, dx: f64, dy: f64) -> PanEvent {
        PanEvent::new(phase, Point::new(dx, dy), Point::new(dx, dy))
    }

    impl Fixture {
        fn send(&mut self, event: PanEvent) -> Result<Option<Release>, NavigationError> {
            self.gesture.handle_pan(event, &mut self.nav, &mut self.queue)
        }

        fn settle(&mut self) {
            for _ in 0..1000 {
                if self.queue.is_idle() && !self.gesture.is_settling() {
                    return;
                }
                let dt = Duration::from_millis(16);
                self.queue.tick(dt, &mut self.nav);
                self.gesture.tick(dt, &mut self.nav);
            }
            panic!("never settled");
        }
    }

    #[test]
    fn vertical_pan_is_rejected() {
        let mut f = fixture(2);
        assert_eq!(f.send(pan(PanPhase::Began, 2.0, 20.0)), Err(NavigationError::NotHorizontal));
        assert!(f.queue.is_idle());
        assert!(f.nav.scene().overlay().is_none());
    }

    #[test]
    fn drag_hides_card_and_shows_overlay() {
        let mut f = fixture(2);
        f.send(pan(PanPhase::Began, 20.0, 0.0)).expect("began");
        assert!(f.gesture.is_dragging());
        assert!(f.nav.scene().is_hidden(&f.cards[0]));
        let overlay = f.nav.scene().overlay().expect("overlay");
        assert_eq!(overlay.card, f.cards[0].id());
        assert_eq!(overlay.rest.y, f.cards[0].frame().y);

        f.send(pan(PanPhase::Changed, 93.75, 4.0)).expect("changed");
        let overlay = f.nav.scene().overlay().expect("overlay");
        assert_eq!(overlay.transform.translation, Point::new(93.75, 4.0));
        let expected = f.nav.config().gesture.max_rotation * 0.5;
        assert!((overlay.transform.rotation - expected).abs() < 1e-12);
        let progress = f.queue.running().and_then(TransitionOperation::progress);
        assert_eq!(progress, Some(0.5));
    }

    #[test]
    fn release_past_threshold_throws_and_commits() {
        let mut f = fixture(2);
        f.send(pan(PanPhase::Began, -20.0, 0.0)).expect("began");
        let release = f.send(pan(PanPhase::Ended, -112.5, 0.0)).expect("ended");
        assert_eq!(release, Some(Release::Thrown(PanDirection::Left)));
        f.settle();
        assert!(f.nav.scene().overlay().is_none());
        assert_eq!(f.nav.displayed(), Some(&f.cards[1]));
        let top = f.nav.top_group().expect("group");
        assert_eq!(top.swipe_history(), &[PanDirection::Left]);
    }

    #[test]
    fn release_under_threshold_snaps_back() {
        let mut f = fixture(2);
        f.send(pan(PanPhase::Began, 15.0, 0.0)).expect("began");
        let release = f.send(pan(PanPhase::Cancelled, 15.0, 0.0)).expect("cancelled");
        assert_eq!(release, Some(Release::SnappedBack));
        f.settle();
        assert!(f.nav.scene().is_visible(&f.cards[0]));
        assert!(!f.nav.scene().contains(&f.cards[1]));
        assert!(f.nav.scene().overlay().is_none());
    }

    #[test]
    fn drag_with_nothing_to_pop_leaves_card_visible() {
        let mut f = fixture(1);
        assert_eq!(f.send(pan(PanPhase::Began, 20.0, 0.0)), Ok(None));
        assert!(!f.gesture.is_dragging());
        assert!(f.nav.scene().is_visible(&f.cards[0]));
        assert!(f.nav.scene().overlay().is_none());
        assert_eq!(f.send(pan(PanPhase::Changed, 40.0, 0.0)), Err(NavigationError::NoActivePan));
    }

    #[test]
    fn busy_queue_rejects_new_drag() {
        let mut f = fixture(3);
        f.send(pan(PanPhase::Began, 20.0, 0.0)).expect("began");
        f.send(pan(PanPhase::Ended, 150.0, 0.0)).expect("ended");
        assert_eq!(f.send(pan(PanPhase::Began, 20.0, 0.0)), Err(NavigationError::Busy));
    }
}
