#![forbid(unsafe_code)]

//! Transition operations: deferred endpoints, a driver, and commit
//! bookkeeping.
//!
//! # State Machine
//!
//! ```text
//! Created ──enqueue──▶ Queued ──start──▶ Running ──▶ Committed
//!                        │                  │
//!                        │                  └──────▶ RolledBack
//!                        └──endpoints unresolved or equal──▶ Aborted
//! ```
//!
//! # Invariants
//!
//! 1. Terminal states are final; illegal transitions are logged and ignored.
//! 2. Endpoints resolve once, when the operation starts, against the
//!    navigation state at that moment.
//! 3. The completion runs exactly once, on reaching a terminal state, with
//!    `resolved_to` set only on commit.
//! 4. Only commit writes the displayed card.
//!
//! # Failure Modes
//!
//! - Commit bookkeeping that no longer matches the group (the card moved
//!   while the transition ran) is logged at `warn` and skipped; the scene
//!   and displayed card still update.

pub mod animator;
pub mod interactive;

use std::time::Duration;

use cardstack_core::PanDirection;
use cardstack_core::animation::{Animation, Easing, Tween};

use crate::card::Card;
use crate::config::TransitionTimings;
use crate::group::GroupId;
use crate::navigation::{NavigationState, StackFeedback};
use crate::scene::Visual;

pub use animator::{TransitionAnimator, TransitionContext, TransitionFrame, animator_for};
pub use interactive::{InteractiveResult, PercentDrivenTransition};

// ---------------------------------------------------------------------------
// Identity, kind, state
// ---------------------------------------------------------------------------

/// Queue-assigned operation identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct OperationId(u64);

impl OperationId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// What an operation does to the navigation state on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationKind {
    /// Install a staged group on top.
    Push(GroupId),
    /// Swipe the displayed card away.
    Pop,
    /// Remove the top group.
    PopGroup,
    /// Step back to the previous card of the top group.
    Undo,
    /// Show the top group's loading card.
    ShowLoading,
    /// Replace the loading card with the loaded current card.
    HideLoading,
    /// Push a single-card group holding a card from history.
    Revisit(GroupId),
}

impl NavigationKind {
    fn staged_group(self) -> Option<GroupId> {
        match self {
            Self::Push(id) | Self::Revisit(id) => Some(id),
            _ => None,
        }
    }
}

/// Why an operation never ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// An endpoint resolved to nothing.
    MissingEndpoint,
    /// Both endpoints resolved to the same card.
    SameEndpoint,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::MissingEndpoint => "endpoint did not resolve",
            Self::SameEndpoint => "endpoints resolved to the same card",
        })
    }
}

/// Lifecycle state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationState {
    #[default]
    Created,
    Queued,
    Running,
    Committed,
    RolledBack,
    Aborted(AbortReason),
}

impl OperationState {
    /// Committed, rolled back, or aborted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Aborted(_))
    }

    /// Whether moving to `next` is legal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Queued)
                | (Self::Queued, Self::Running)
                | (Self::Queued, Self::Aborted(_))
                | (Self::Running, Self::Committed)
                | (Self::Running, Self::RolledBack)
        )
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// A transition endpoint resolved when the operation starts.
pub enum Endpoint {
    /// The card on screen.
    Displayed,
    /// Top group's current card. Never the loading card.
    CurrentOfTopGroup,
    /// Where a swipe lands: the next card, else the loading card while a
    /// page is in flight, else what the group below shows. Swiping a
    /// loading card that was shown over a ready card lands on that card.
    SwipeTarget,
    /// Top group's card before the cursor.
    PreviousInTopGroup,
    /// What a staged group shows.
    CurrentOfStagedGroup(GroupId),
    /// What the group below the top shows.
    CurrentOfGroupBelowTop,
    /// Top group's loading card, only while it is loading.
    LoadingCardOfTop,
    /// A fixed card.
    Card(Card),
    /// Caller-supplied resolver.
    Custom(Box<dyn Fn(&NavigationState) -> Option<Card>>),
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Displayed => f.write_str("Displayed"),
            Self::CurrentOfTopGroup => f.write_str("CurrentOfTopGroup"),
            Self::SwipeTarget => f.write_str("SwipeTarget"),
            Self::PreviousInTopGroup => f.write_str("PreviousInTopGroup"),
            Self::CurrentOfStagedGroup(id) => f.debug_tuple("CurrentOfStagedGroup").field(id).finish(),
            Self::CurrentOfGroupBelowTop => f.write_str("CurrentOfGroupBelowTop"),
            Self::LoadingCardOfTop => f.write_str("LoadingCardOfTop"),
            Self::Card(card) => f.debug_tuple("Card").field(&card.id()).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Endpoint {
    /// Resolve against `nav`.
    #[must_use]
    pub fn resolve(&self, nav: &NavigationState) -> Option<Card> {
        match self {
            Self::Displayed => nav.displayed().cloned(),
            Self::CurrentOfTopGroup => nav.top_group()?.current_card().cloned(),
            Self::SwipeTarget => {
                let top = nav.top_group()?;
                let on_loading_card = nav.displayed().is_some_and(|d| top.is_loading_card(d));
                if on_loading_card {
                    if let Some(current) = top.current_card() {
                        return Some(current.clone());
                    }
                }
                top.next_card()
                    .cloned()
                    .or_else(|| Self::LoadingCardOfTop.resolve(nav))
                    .or_else(|| Self::CurrentOfGroupBelowTop.resolve(nav))
            }
            Self::PreviousInTopGroup => nav.top_group()?.previous_card().cloned(),
            Self::CurrentOfStagedGroup(id) => nav.staged_group(*id)?.display_card().cloned(),
            Self::CurrentOfGroupBelowTop => nav.group_below_top()?.display_card().cloned(),
            Self::LoadingCardOfTop => {
                let top = nav.top_group()?;
                if top.loader()?.is_loading() {
                    top.loading_card().cloned()
                } else {
                    None
                }
            }
            Self::Card(card) => Some(card.clone()),
            Self::Custom(resolve) => resolve(nav),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy and outcome
// ---------------------------------------------------------------------------

/// Which animator, and how it is driven.
pub struct AnimationStrategy {
    animator: Box<dyn TransitionAnimator>,
    animated: bool,
    interactive: bool,
}

impl std::fmt::Debug for AnimationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationStrategy")
            .field("animator", &self.animator.name())
            .field("animated", &self.animated)
            .field("interactive", &self.interactive)
            .finish()
    }
}

impl AnimationStrategy {
    /// Timed animation over the animator's duration.
    #[must_use]
    pub fn animated(animator: Box<dyn TransitionAnimator>) -> Self {
        Self {
            animator,
            animated: true,
            interactive: false,
        }
    }

    /// Progress driven by a gesture.
    #[must_use]
    pub fn interactive(animator: Box<dyn TransitionAnimator>) -> Self {
        Self {
            animator,
            animated: true,
            interactive: true,
        }
    }

    /// Commit synchronously on start.
    #[must_use]
    pub fn instant(animator: Box<dyn TransitionAnimator>) -> Self {
        Self {
            animator,
            animated: false,
            interactive: false,
        }
    }

    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.animated
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub id: OperationId,
    pub kind: NavigationKind,
    pub state: OperationState,
    /// The card now displayed, on commit.
    pub resolved_to: Option<Card>,
}

impl TransitionOutcome {
    #[must_use]
    pub fn did_complete(&self) -> bool {
        self.state == OperationState::Committed
    }
}

/// Called once when the operation reaches a terminal state.
pub type Completion = Box<dyn FnOnce(&TransitionOutcome)>;

/// Called with `(from, to)` after resolution, before anything moves.
pub type PreAction = Box<dyn FnOnce(&Card, &Card)>;

// ---------------------------------------------------------------------------
// TransitionOperation
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Driver {
    Instant,
    Timed(Tween),
    Interactive(PercentDrivenTransition),
}

#[derive(Debug)]
struct ActiveTransition {
    from: Card,
    to: Card,
    driver: Driver,
    context: TransitionContext,
}

/// A queued navigation step.
pub struct TransitionOperation {
    id: OperationId,
    kind: NavigationKind,
    from: Endpoint,
    to: Endpoint,
    strategy: AnimationStrategy,
    pre_action: Option<PreAction>,
    completion: Option<Completion>,
    swipe_direction: Option<PanDirection>,
    state: OperationState,
    active: Option<ActiveTransition>,
    outcome: Option<TransitionOutcome>,
}

impl std::fmt::Debug for TransitionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionOperation")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl TransitionOperation {
    /// Create an operation in the `Created` state.
    #[must_use]
    pub fn new(kind: NavigationKind, from: Endpoint, to: Endpoint, strategy: AnimationStrategy) -> Self {
        Self {
            id: OperationId::default(),
            kind,
            from,
            to,
            strategy,
            pre_action: None,
            completion: None,
            swipe_direction: None,
            state: OperationState::Created,
            active: None,
            outcome: None,
        }
    }

    /// Run `action(from, to)` after resolution (builder pattern).
    #[must_use]
    pub fn pre_action(mut self, action: impl FnOnce(&Card, &Card) + 'static) -> Self {
        self.pre_action = Some(Box::new(action));
        self
    }

    /// Run `completion` on the terminal state (builder pattern).
    #[must_use]
    pub fn on_complete(mut self, completion: impl FnOnce(&TransitionOutcome) + 'static) -> Self {
        self.completion = Some(Box::new(completion));
        self
    }

    /// Preset the swipe direction (builder pattern).
    #[must_use]
    pub fn with_swipe_direction(mut self, direction: PanDirection) -> Self {
        self.swipe_direction = Some(direction);
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NavigationKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.strategy.interactive
    }

    /// The terminal outcome, once reached.
    #[must_use]
    pub fn outcome(&self) -> Option<&TransitionOutcome> {
        self.outcome.as_ref()
    }

    /// Current progress of a running operation.
    #[must_use]
    pub fn progress(&self) -> Option<f64> {
        match &self.active.as_ref()?.driver {
            Driver::Instant => Some(0.0),
            Driver::Timed(tween) => Some(tween.value()),
            Driver::Interactive(pct) => Some(pct.percent()),
        }
    }

    /// Interactive and still following input, not yet finishing or
    /// cancelling.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| matches!(&a.driver, Driver::Interactive(pct) if pct.is_tracking()))
    }

    pub(crate) fn interactive_mut(&mut self) -> Option<&mut PercentDrivenTransition> {
        match &mut self.active.as_mut()?.driver {
            Driver::Interactive(pct) => Some(pct),
            _ => None,
        }
    }

    pub(crate) fn set_swipe_direction(&mut self, direction: PanDirection) {
        self.swipe_direction = Some(direction);
        if let Some(active) = self.active.as_mut() {
            active.context.swipe_direction = Some(direction);
        }
    }

    pub(crate) fn mark_queued(&mut self, id: OperationId) {
        self.id = id;
        self.advance(OperationState::Queued);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Resolve endpoints and begin. Instant operations commit before
    /// returning; unresolvable ones abort.
    pub(crate) fn start(&mut self, nav: &mut NavigationState, timings: &TransitionTimings) {
        let (from, to) = match (self.from.resolve(nav), self.to.resolve(nav)) {
            (Some(from), Some(to)) if from != to => (from, to),
            (Some(_), Some(_)) => return self.abort(nav, AbortReason::SameEndpoint),
            _ => return self.abort(nav, AbortReason::MissingEndpoint),
        };

        from.refresh_snapshot();
        to.refresh_snapshot();
        if let Some(action) = self.pre_action.take() {
            action(&from, &to);
        }

        let swipe_direction = match self.kind {
            NavigationKind::Undo => nav.top_group().and_then(|g| g.swipe_direction(&to)),
            _ => self.swipe_direction,
        };
        let context = TransitionContext {
            bounds: nav.bounds,
            swipe_direction,
        };

        if self.strategy.animator.places_to_above() {
            nav.scene.attach(&to);
        } else {
            nav.scene.attach_below(&to, &from);
        }
        nav.scene.set_hidden(&to, false);

        let duration = self.strategy.animator.duration();
        let driver = if self.strategy.interactive {
            Driver::Interactive(PercentDrivenTransition::start(duration, timings.completion_speed))
        } else if self.strategy.animated {
            Driver::Timed(Tween::new(duration).easing(Easing::EaseOut))
        } else {
            Driver::Instant
        };
        let instant = matches!(driver, Driver::Instant);

        tracing::debug!(
            target: "cardstack.queue",
            op = %self.id,
            kind = ?self.kind,
            from = %from.id(),
            to = %to.id(),
            animator = self.strategy.animator.name(),
            interactive = self.strategy.interactive,
            "transition running"
        );
        self.active = Some(ActiveTransition {
            from,
            to,
            driver,
            context,
        });
        self.advance(OperationState::Running);

        if instant {
            self.commit(nav);
        } else {
            self.apply_frame(nav, 0.0);
        }
    }

    /// Advance the driver by `dt`, committing or rolling back at the end.
    pub(crate) fn tick(&mut self, dt: Duration, nav: &mut NavigationState) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let (progress, result) = match &mut active.driver {
            Driver::Instant => return,
            Driver::Timed(tween) => {
                tween.tick(dt);
                (
                    tween.value(),
                    tween.is_complete().then_some(InteractiveResult::Finished),
                )
            }
            Driver::Interactive(pct) => {
                let result = pct.tick(dt);
                (pct.percent(), result)
            }
        };
        self.apply_frame(nav, progress);
        match result {
            Some(InteractiveResult::Finished) => self.commit(nav),
            Some(InteractiveResult::Cancelled) => self.rollback(nav),
            None => {}
        }
    }

    /// Push current progress into the scene.
    pub(crate) fn apply_frame(&self, nav: &mut NavigationState, progress: f64) {
        let Some(active) = &self.active else {
            return;
        };
        let frame = self.strategy.animator.frame(&active.context, progress);
        nav.scene.set_visual(&active.from, frame.from);
        nav.scene.set_visual(&active.to, frame.to);
    }

    fn commit(&mut self, nav: &mut NavigationState) {
        let Some(ActiveTransition { from, to, context, .. }) = self.active.take() else {
            return;
        };

        match self.kind {
            NavigationKind::Pop => {
                let direction = context.swipe_direction.unwrap_or(PanDirection::Left);
                let was_loading = nav.is_top_loading_card(&from);
                let stays_in_group = nav
                    .top_group()
                    .is_some_and(|g| g.contains(&to) || g.is_loading_card(&to));
                if !stays_in_group {
                    pop_group(nav);
                } else if !was_loading {
                    let swiped = nav
                        .top_group_mut()
                        .map(|group| group.did_swipe(&from, direction));
                    if let Some(Err(err)) = swiped {
                        tracing::warn!(target: "cardstack.queue", op = %self.id, %err, "pop bookkeeping skipped");
                    }
                }
                if !was_loading {
                    nav.history.push(from.clone());
                    nav.feedback.emit(&StackFeedback::CardSwiped { direction });
                }
            }
            NavigationKind::PopGroup => pop_group(nav),
            NavigationKind::Undo => {
                let undone = nav.top_group_mut().map(|group| group.did_undo_swipe(&to));
                if let Some(Err(err)) = undone {
                    tracing::warn!(target: "cardstack.queue", op = %self.id, %err, "undo bookkeeping skipped");
                }
            }
            NavigationKind::Push(id) | NavigationKind::Revisit(id) => {
                if let Some(group) = nav.unstage(id) {
                    nav.groups.push(group);
                    tracing::info!(target: "cardstack.stack", group = %id, depth = nav.groups.len(), "group pushed");
                    nav.feedback.emit(&StackFeedback::GroupPushed(id));
                }
            }
            NavigationKind::ShowLoading | NavigationKind::HideLoading => {}
        }

        nav.scene.detach(&from);
        nav.scene.set_visual(&to, Visual::IDENTITY);
        nav.scene.set_hidden(&to, false);
        nav.displayed = Some(to.clone());
        self.finish(OperationState::Committed, Some(to));
    }

    fn rollback(&mut self, nav: &mut NavigationState) {
        let Some(active) = self.active.take() else {
            return;
        };
        nav.scene.detach(&active.to);
        nav.scene.set_visual(&active.from, Visual::IDENTITY);
        self.discard_staged(nav);
        self.finish(OperationState::RolledBack, None);
    }

    fn abort(&mut self, nav: &mut NavigationState, reason: AbortReason) {
        tracing::debug!(target: "cardstack.queue", op = %self.id, kind = ?self.kind, %reason, "transition aborted");
        self.discard_staged(nav);
        nav.feedback.emit(&StackFeedback::Rejected {
            kind: self.kind,
            reason,
        });
        self.finish(OperationState::Aborted(reason), None);
    }

    fn discard_staged(&self, nav: &mut NavigationState) {
        if let Some(id) = self.kind.staged_group() {
            nav.unstage(id);
        }
    }

    fn finish(&mut self, state: OperationState, resolved_to: Option<Card>) {
        self.advance(state);
        let outcome = TransitionOutcome {
            id: self.id,
            kind: self.kind,
            state: self.state,
            resolved_to,
        };
        if let Some(completion) = self.completion.take() {
            completion(&outcome);
        }
        self.outcome = Some(outcome);
    }

    fn advance(&mut self, next: OperationState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                target: "cardstack.queue",
                op = %self.id,
                from = ?self.state,
                to = ?next,
                "illegal operation state transition ignored"
            );
            return;
        }
        tracing::trace!(target: "cardstack.queue", op = %self.id, from = ?self.state, to = ?next, "state");
        self.state = next;
    }
}

fn pop_group(nav: &mut NavigationState) {
    if nav.groups.len() < 2 {
        return;
    }
    if let Some(group) = nav.groups.pop() {
        tracing::info!(target: "cardstack.stack", group = %group.id(), depth = nav.groups.len(), "group popped");
        nav.feedback.emit(&StackFeedback::GroupPopped(group.id()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Bitmap, CardContent, CardState, ChangeListener};
    use crate::config::{LayoutConfig, StackConfig};
    use crate::group::CardGroup;
    use cardstack_core::Rect;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PHONE: Rect = Rect::from_size(375.0, 812.0);

    struct Blank;

    impl CardContent for Blank {
        fn capture(&self, region: Rect) -> Option<Bitmap> {
            Some(Bitmap::new(region.width, region.height, Vec::new()))
        }

        fn set_change_listener(&self, _listener: Option<ChangeListener>) {}
    }

    fn card() -> Card {
        Card::new(Rc::new(Blank), CardState::Stack, LayoutConfig::default())
    }

    fn nav_with(n: usize) -> (NavigationState, Vec<Card>) {
        let cards: Vec<Card> = (0..n).map(|_| card()).collect();
        let nav = NavigationState::new(
            CardGroup::with_cards(cards.clone()),
            StackConfig::default(),
            PHONE,
        );
        (nav, cards)
    }

    fn op(kind: NavigationKind, from: Endpoint, to: Endpoint, animated: bool) -> TransitionOperation {
        let animator = animator_for(kind, &TransitionTimings::default());
        let strategy = if animated {
            AnimationStrategy::animated(animator)
        } else {
            AnimationStrategy::instant(animator)
        };
        let mut op = TransitionOperation::new(kind, from, to, strategy);
        op.mark_queued(OperationId::new(1));
        op
    }

    fn record(log: &Rc<RefCell<Vec<(bool, Option<Card>)>>>) -> impl FnOnce(&TransitionOutcome) + 'static {
        let log = Rc::clone(log);
        move |o: &TransitionOutcome| log.borrow_mut().push((o.did_complete(), o.resolved_to.clone()))
    }

    #[test]
    fn state_machine_edges() {
        use OperationState::*;
        assert!(Created.can_transition_to(Queued));
        assert!(Queued.can_transition_to(Aborted(AbortReason::SameEndpoint)));
        assert!(Running.can_transition_to(RolledBack));
        assert!(!Committed.can_transition_to(Running));
        assert!(!Aborted(AbortReason::MissingEndpoint).can_transition_to(Running));
        assert!(!Created.can_transition_to(Running));
        assert!(Committed.is_terminal() && !Queued.is_terminal());
    }

    #[test]
    fn equal_endpoints_abort_with_reason() {
        let (mut nav, _) = nav_with(2);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut op = op(NavigationKind::Pop, Endpoint::Displayed, Endpoint::CurrentOfTopGroup, false)
            .on_complete(record(&log));
        op.start(&mut nav, &TransitionTimings::default());
        assert_eq!(op.state(), OperationState::Aborted(AbortReason::SameEndpoint));
        assert_eq!(*log.borrow(), vec![(false, None)]);
    }

    #[test]
    fn missing_endpoint_aborts_without_touching_state() {
        let (mut nav, cards) = nav_with(1);
        let mut op = op(NavigationKind::PopGroup, Endpoint::Displayed, Endpoint::CurrentOfGroupBelowTop, true);
        op.start(&mut nav, &TransitionTimings::default());
        assert_eq!(op.state(), OperationState::Aborted(AbortReason::MissingEndpoint));
        assert_eq!(nav.groups().len(), 1);
        assert_eq!(nav.displayed(), Some(&cards[0]));
    }

    #[test]
    fn instant_pop_commits_on_start() {
        let (mut nav, cards) = nav_with(3);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut op = op(NavigationKind::Pop, Endpoint::Displayed, Endpoint::SwipeTarget, false)
            .with_swipe_direction(PanDirection::Right)
            .on_complete(record(&log));
        op.start(&mut nav, &TransitionTimings::default());
        assert_eq!(op.state(), OperationState::Committed);
        assert_eq!(*log.borrow(), vec![(true, Some(cards[1].clone()))]);
        let top = nav.top_group().expect("group");
        assert_eq!(top.current_index(), 1);
        assert_eq!(top.swipe_history(), &[PanDirection::Right]);
        assert_eq!(nav.displayed(), Some(&cards[1]));
        assert_eq!(nav.history().newest(), Some(&cards[0]));
        assert!(!nav.scene().contains(&cards[0]));
        assert!(nav.scene().is_visible(&cards[1]));
    }

    #[test]
    fn timed_transition_runs_to_commit() {
        let (mut nav, cards) = nav_with(2);
        let mut op = op(NavigationKind::Pop, Endpoint::Displayed, Endpoint::SwipeTarget, true);
        let timings = TransitionTimings::default();
        op.start(&mut nav, &timings);
        assert_eq!(op.state(), OperationState::Running);
        let order: Vec<_> = nav.scene().nodes().iter().map(|n| n.card.id()).collect();
        assert_eq!(order, vec![cards[1].id(), cards[0].id()]);
        assert_eq!(nav.scene().visual(&cards[1]).map(|v| v.alpha), Some(0.9));

        op.tick(Duration::from_millis(100), &mut nav);
        assert_eq!(op.state(), OperationState::Running);
        assert_eq!(nav.displayed(), Some(&cards[0]));
        op.tick(Duration::from_millis(100), &mut nav);
        assert_eq!(op.state(), OperationState::Committed);
        assert_eq!(nav.scene().visual(&cards[1]), Some(Visual::IDENTITY));
    }

    #[test]
    fn interactive_cancel_rolls_back() {
        let (mut nav, cards) = nav_with(2);
        let animator = animator_for(NavigationKind::Pop, &TransitionTimings::default());
        let mut op = TransitionOperation::new(
            NavigationKind::Pop,
            Endpoint::Displayed,
            Endpoint::SwipeTarget,
            AnimationStrategy::interactive(animator),
        );
        op.mark_queued(OperationId::new(7));
        op.start(&mut nav, &TransitionTimings::default());
        let pct = op.interactive_mut().expect("interactive");
        pct.update(0.4);
        pct.cancel();
        for _ in 0..100 {
            op.tick(Duration::from_millis(16), &mut nav);
        }
        assert_eq!(op.state(), OperationState::RolledBack);
        assert_eq!(op.outcome().map(TransitionOutcome::did_complete), Some(false));
        assert!(!nav.scene().contains(&cards[1]));
        assert_eq!(nav.top_group().map(CardGroup::current_index), Some(0));
        assert_eq!(nav.displayed(), Some(&cards[0]));
    }

    #[test]
    fn undo_steps_back_and_pre_action_sees_endpoints() {
        let (mut nav, cards) = nav_with(3);
        let timings = TransitionTimings::default();
        op(NavigationKind::Pop, Endpoint::Displayed, Endpoint::SwipeTarget, false)
            .start(&mut nav, &timings);

        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        let mut undo = op(NavigationKind::Undo, Endpoint::Displayed, Endpoint::PreviousInTopGroup, false)
            .pre_action(move |from, to| *s.borrow_mut() = Some((from.id(), to.id())));
        undo.start(&mut nav, &timings);
        assert_eq!(undo.state(), OperationState::Committed);
        assert_eq!(*seen.borrow(), Some((cards[1].id(), cards[0].id())));
        assert_eq!(nav.top_group().map(CardGroup::current_index), Some(0));
        assert!(nav.top_group().is_some_and(|g| g.swipe_history().is_empty()));
        assert_eq!(nav.history().len(), 1);
    }

    #[test]
    fn aborted_push_drops_staged_group() {
        let (mut nav, _) = nav_with(1);
        let id = nav.stage(CardGroup::with_cards(Vec::new()));
        let mut push = op(
            NavigationKind::Push(id),
            Endpoint::Displayed,
            Endpoint::CurrentOfStagedGroup(id),
            true,
        );
        push.start(&mut nav, &TransitionTimings::default());
        assert_eq!(push.state(), OperationState::Aborted(AbortReason::MissingEndpoint));
        assert!(nav.staged_group(id).is_none());
    }

    #[test]
    fn custom_endpoint_resolves_lazily() {
        let (mut nav, cards) = nav_with(3);
        let target = cards[2].clone();
        let mut jump = op(
            NavigationKind::ShowLoading,
            Endpoint::Displayed,
            Endpoint::Custom(Box::new(move |nav| {
                nav.top_group().and_then(|g| g.cards().last().cloned())
            })),
            false,
        );
        jump.start(&mut nav, &TransitionTimings::default());
        assert_eq!(nav.displayed(), Some(&target));
    }
}
