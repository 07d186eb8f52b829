#![forbid(unsafe_code)]

//! Root controller: groups, history, and every navigation action.
//!
//! [`CardStack`] owns the navigation state, the queue, and the gesture
//! controller, and is the only type hosts talk to. Time advances only
//! through [`CardStack::tick`].
//!
//! # Tick order
//!
//! 1. Pump every group's loader; delivered batches are spliced in.
//! 2. If the loading card is displayed with no card under the cursor and no
//!    page in flight, request the next page (an empty page that was not the
//!    last one leaves the group in this state).
//! 3. If the loading card is displayed, no page is in flight, and a real
//!    card is ready, queue a `HideLoading` (at most one outstanding).
//! 4. Advance the running transition.
//! 5. Release a drag whose transition was cancelled under it, then advance
//!    the gesture release spring.
//! 6. Advance card layout springs.
//!
//! # Failure Modes
//!
//! - Actions that cannot run still return an [`OperationId`]; the outcome
//!   arrives as an aborted [`TransitionOutcome`] and a
//!   [`StackFeedback::Rejected`] event.

use std::time::Duration;

use cardstack_core::{PanDirection, PanEvent, Rect, TouchEvent};
use web_time::Instant;

use crate::card::{Card, CardState};
use crate::config::StackConfig;
use crate::error::NavigationError;
use crate::gesture_controller::{GestureController, Release};
use crate::group::CardGroup;
use crate::history::History;
use crate::loader::PaginatedLoader;
use crate::navigation::{NavigationState, StackFeedback};
use crate::queue::NavigationQueue;
use crate::scene::Scene;
use crate::signal::Signal;
use crate::transition::{
    AnimationStrategy, Endpoint, NavigationKind, OperationId, TransitionOperation,
    TransitionOutcome, animator_for,
};

/// The card-stack navigation engine.
#[derive(Debug)]
pub struct CardStack {
    nav: NavigationState,
    queue: NavigationQueue,
    gesture: GestureController,
}

impl CardStack {
    /// A stack showing `root`.
    #[must_use]
    pub fn new(root: CardGroup, config: StackConfig, bounds: Rect) -> Self {
        let queue = NavigationQueue::new(&config.queue, config.timings.clone());
        let gesture = GestureController::new(config.gesture.clone(), config.timings.clone());
        let nav = NavigationState::new(root, config, bounds);
        tracing::info!(
            target: "cardstack.stack",
            width = bounds.width,
            height = bounds.height,
            "card stack created"
        );
        Self { nav, queue, gesture }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &StackConfig {
        self.nav.config()
    }

    #[must_use]
    pub fn displayed(&self) -> Option<&Card> {
        self.nav.displayed()
    }

    #[must_use]
    pub fn groups(&self) -> &[CardGroup] {
        self.nav.groups()
    }

    #[must_use]
    pub fn top_group(&self) -> Option<&CardGroup> {
        self.nav.top_group()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        self.nav.history()
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.nav.scene()
    }

    #[must_use]
    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    #[must_use]
    pub fn queue(&self) -> &NavigationQueue {
        &self.queue
    }

    /// Haptic-style feedback events.
    #[must_use]
    pub fn feedback(&self) -> &Signal<StackFeedback> {
        &self.nav.feedback
    }

    /// Every transition outcome, in completion order.
    #[must_use]
    pub fn transitions(&self) -> &Signal<TransitionOutcome> {
        self.queue.outcomes()
    }

    /// Nothing queued, running, settling, or animating.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.queue.is_idle()
            && !self.gesture.is_dragging()
            && !self.gesture.is_settling()
            && self.nav.scene.nodes().iter().all(|n| !n.card.is_animating())
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Feed a raw touch.
    pub fn handle_touch(&mut self, touch: TouchEvent, now: Instant) -> Result<Option<Release>, NavigationError> {
        self.gesture
            .handle_touch(touch, now, &mut self.nav, &mut self.queue)
    }

    /// Feed a recognized pan phase.
    pub fn handle_pan(&mut self, event: PanEvent) -> Result<Option<Release>, NavigationError> {
        self.gesture.handle_pan(event, &mut self.nav, &mut self.queue)
    }

    /// Advance time by `dt`. See the module docs for the order.
    pub fn tick(&mut self, dt: Duration) {
        for group in self.nav.groups.iter_mut().chain(self.nav.staged.iter_mut()) {
            group.pump(dt);
        }
        self.refetch_under_loading_card();
        self.reveal_loaded_card();
        self.queue.tick(dt, &mut self.nav);
        self.gesture.reconcile(&self.nav, &self.queue);
        self.gesture.tick(dt, &mut self.nav);
        for node in self.nav.scene.nodes() {
            node.card.tick(dt);
        }
    }

    fn refetch_under_loading_card(&mut self) {
        let waiting = self.nav.displayed().is_some_and(|d| self.nav.is_top_loading_card(d));
        let Some(group) = self.nav.top_group_mut() else {
            return;
        };
        let idle = group
            .loader()
            .is_some_and(|l| !l.is_loading() && !l.has_loaded_all());
        if !waiting || group.current_card().is_some() || !idle {
            return;
        }
        tracing::debug!(target: "cardstack.stack", group = %group.id(), "loading card has nothing under it; fetching");
        if let Err(err) = group.fetch_next() {
            tracing::warn!(target: "cardstack.stack", %err, "refetch under loading card failed");
        }
    }

    fn reveal_loaded_card(&mut self) {
        let ready = self.nav.displayed().is_some_and(|d| self.nav.is_top_loading_card(d))
            && self.nav.top_group().is_some_and(|g| {
                g.current_card().is_some() && !g.loader().is_some_and(PaginatedLoader::is_loading)
            });
        if ready && !self.queue.contains_kind(|k| k == NavigationKind::HideLoading) {
            tracing::debug!(target: "cardstack.stack", "batch landed under loading card");
            self.enqueue(
                NavigationKind::HideLoading,
                Endpoint::Displayed,
                Endpoint::CurrentOfTopGroup,
                true,
            );
        }
    }

    /// Relayout for new container bounds.
    pub fn set_bounds(&mut self, bounds: Rect) {
        tracing::debug!(target: "cardstack.stack", width = bounds.width, height = bounds.height, "bounds changed");
        self.nav.set_bounds(bounds);
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    fn enqueue(&mut self, kind: NavigationKind, from: Endpoint, to: Endpoint, animated: bool) -> OperationId {
        self.enqueue_op(self.build(kind, from, to, animated))
    }

    fn build(&self, kind: NavigationKind, from: Endpoint, to: Endpoint, animated: bool) -> TransitionOperation {
        let animator = animator_for(kind, &self.nav.config.timings);
        let strategy = if animated {
            AnimationStrategy::animated(animator)
        } else {
            AnimationStrategy::instant(animator)
        };
        TransitionOperation::new(kind, from, to, strategy)
    }

    /// Queue a custom operation.
    pub fn enqueue_op(&mut self, op: TransitionOperation) -> OperationId {
        self.queue.enqueue(op, &mut self.nav)
    }

    /// Push `group` on top.
    pub fn push_group(&mut self, group: CardGroup) -> OperationId {
        let id = self.nav.stage(group);
        self.enqueue(
            NavigationKind::Push(id),
            Endpoint::Displayed,
            Endpoint::CurrentOfStagedGroup(id),
            true,
        )
    }

    /// Remove the top group. Aborts when it is the only one.
    pub fn pop_group(&mut self) -> OperationId {
        self.enqueue(
            NavigationKind::PopGroup,
            Endpoint::Displayed,
            Endpoint::CurrentOfGroupBelowTop,
            true,
        )
    }

    /// Swipe the displayed card away to the left. On the last card the
    /// whole group goes.
    pub fn pop(&mut self, animated: bool) -> OperationId {
        if let Some(group) = self.nav.top_group_mut() {
            group.will_begin_swiping();
        }
        let op = self
            .build(NavigationKind::Pop, Endpoint::Displayed, Endpoint::SwipeTarget, animated)
            .with_swipe_direction(PanDirection::Left);
        self.enqueue_op(op)
    }

    /// Bring back the previously swiped card of the top group.
    pub fn undo(&mut self) -> OperationId {
        self.enqueue(
            NavigationKind::Undo,
            Endpoint::Displayed,
            Endpoint::PreviousInTopGroup,
            true,
        )
    }

    /// Show the top group's loading card while a page is in flight.
    pub fn show_loading(&mut self) -> OperationId {
        self.enqueue(
            NavigationKind::ShowLoading,
            Endpoint::Displayed,
            Endpoint::LoadingCardOfTop,
            true,
        )
    }

    /// Revisit a card from history by pushing a group holding only it.
    pub fn select(&mut self, card: &Card) -> Result<OperationId, NavigationError> {
        if !self.nav.history.contains(card) {
            return Err(NavigationError::NotInHistory(card.id()));
        }
        card.navigate(CardState::Stack, false);
        let id = self
            .nav
            .stage(CardGroup::with_cards(vec![card.clone()]).title("History"));
        Ok(self.enqueue(
            NavigationKind::Revisit(id),
            Endpoint::Displayed,
            Endpoint::CurrentOfStagedGroup(id),
            true,
        ))
    }

    /// Empty the history list.
    pub fn clear_history(&mut self) {
        self.nav.history.clear();
    }

    /// Move the displayed card between layout states.
    pub fn navigate_top(&mut self, state: CardState, animated: bool) -> Result<(), NavigationError> {
        let card = self.nav.displayed().ok_or(NavigationError::NothingDisplayed)?;
        card.navigate(state, animated);
        Ok(())
    }
}
