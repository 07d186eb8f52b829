#![forbid(unsafe_code)]

//! Drag-to-pop end to end: pan phases in, committed or rolled-back
//! navigation out.
//!
//! Run:
//!   cargo test -p cardstack-runtime --test drag_to_pop

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cardstack_core::{PanDirection, PanEvent, PanPhase, Point};
use cardstack_harness::{
    BlankContent, DragDriver, FRAME, PHONE, endless_loader, loading_card, settle, solid_cards,
    with_captured_logs,
};
use cardstack_runtime::{
    Card, CardGroup, CardStack, CardState, LayoutConfig, NavigationError, NavigationKind,
    OperationState, Release, StackConfig, StackFeedback, TransitionOutcome,
};
use web_time::Instant;

fn stack_of(n: u32) -> (CardStack, Vec<Card>) {
    let cards = solid_cards(n);
    let stack = CardStack::new(
        CardGroup::with_cards(cards.clone()),
        StackConfig::default(),
        PHONE,
    );
    (stack, cards)
}

fn pan(phase: PanPhase, dx: f64) -> PanEvent {
    PanEvent::new(phase, Point::new(dx, 0.0), Point::ZERO)
}

#[test]
fn drag_past_threshold_commits_swipe() {
    let (mut stack, cards) = stack_of(3);
    let feedback = Rc::new(RefCell::new(Vec::new()));
    let f = Rc::clone(&feedback);
    let _sub = stack.feedback().subscribe(move |e| f.borrow_mut().push(e.clone()));

    let release = DragDriver::default().swipe(&mut stack, 0.3);
    assert_eq!(release, Ok(Some(Release::Thrown(PanDirection::Right))));

    let top = stack.top_group().expect("top group");
    assert_eq!(top.current_index(), 1);
    assert_eq!(top.swipe_history(), &[PanDirection::Right]);
    assert_eq!(stack.displayed(), Some(&cards[1]));
    assert_eq!(stack.history().newest(), Some(&cards[0]));
    assert!(stack.scene().overlay().is_none());
    assert!(!stack.scene().contains(&cards[0]));
    assert!(stack.scene().is_visible(&cards[1]));
    assert_eq!(
        *feedback.borrow(),
        vec![StackFeedback::CardSwiped {
            direction: PanDirection::Right
        }]
    );
}

#[test]
fn drag_under_threshold_snaps_back() {
    let (mut stack, cards) = stack_of(3);
    let release = DragDriver::default().swipe(&mut stack, -0.05);
    assert_eq!(release, Ok(Some(Release::SnappedBack)));

    let top = stack.top_group().expect("top group");
    assert_eq!(top.current_index(), 0);
    assert!(top.swipe_history().is_empty());
    assert_eq!(stack.displayed(), Some(&cards[0]));
    assert!(stack.history().is_empty());
    assert!(stack.scene().overlay().is_none());
    assert!(stack.scene().is_visible(&cards[0]));
    assert!(!stack.scene().contains(&cards[1]));
    assert!(stack.is_settled());
}

#[test]
fn overlay_follows_finger_while_dragging() {
    let (mut stack, cards) = stack_of(2);
    stack.handle_pan(pan(PanPhase::Began, 20.0)).expect("began");
    stack.handle_pan(pan(PanPhase::Changed, 93.75)).expect("changed");

    assert!(stack.scene().is_hidden(&cards[0]));
    assert!(stack.scene().contains(&cards[1]));
    let overlay = stack.scene().overlay().expect("overlay");
    assert_eq!(overlay.card, cards[0].id());
    assert_eq!(overlay.transform.translation.x, 93.75);
    assert!(overlay.transform.rotation > 0.0);
    let progress = stack.queue().running().and_then(|op| op.progress());
    assert_eq!(progress, Some(0.5));
}

#[test]
fn touch_drag_goes_through_recognizer() {
    let (mut stack, cards) = stack_of(3);
    let release = DragDriver::default().touch_drag(&mut stack, -0.4, Instant::now());
    assert_eq!(release, Ok(Some(Release::Thrown(PanDirection::Left))));
    assert!(settle(&mut stack, 2_000).is_some());
    assert_eq!(stack.displayed(), Some(&cards[1]));
    assert_eq!(
        stack.top_group().map(|g| g.swipe_history().to_vec()),
        Some(vec![PanDirection::Left])
    );
}

#[test]
fn vertical_drag_is_ignored() {
    let (mut stack, cards) = stack_of(2);
    let driver = DragDriver {
        drift: 400.0,
        ..DragDriver::default()
    };
    assert_eq!(driver.drag(&mut stack, 0.3), Err(NavigationError::NotHorizontal));
    assert!(stack.is_settled());
    assert_eq!(stack.displayed(), Some(&cards[0]));
}

#[test]
fn drag_while_transition_runs_is_busy() {
    let (mut stack, _) = stack_of(2);
    stack.push_group(CardGroup::with_cards(solid_cards(1)));
    assert!(!stack.queue().is_idle());
    assert_eq!(
        DragDriver::default().drag(&mut stack, 0.3),
        Err(NavigationError::Busy)
    );
}

#[test]
fn drag_on_loading_card_is_rejected() {
    let loading = loading_card();
    let group = CardGroup::with_loader(endless_loader(Duration::from_secs(5), 3), loading.clone());
    let mut stack = CardStack::new(group, StackConfig::default(), PHONE);
    assert_eq!(stack.displayed(), Some(&loading));
    assert_eq!(
        DragDriver::default().drag(&mut stack, 0.5),
        Err(NavigationError::LoadingCardDisplayed)
    );
}

#[test]
fn drag_without_snapshot_is_rejected() {
    let blank = Card::new(Rc::new(BlankContent), CardState::Stack, LayoutConfig::default());
    let mut stack = CardStack::new(
        CardGroup::with_cards(vec![blank.clone(), blank.clone()]),
        StackConfig::default(),
        PHONE,
    );
    assert_eq!(
        DragDriver::default().drag(&mut stack, 0.5),
        Err(NavigationError::NoSnapshot)
    );
    assert!(stack.scene().overlay().is_none());
}

#[test]
fn drag_with_nowhere_to_go_stays_put() {
    let (mut stack, cards) = stack_of(1);
    assert_eq!(DragDriver::default().drag(&mut stack, 0.5), Ok(None));
    assert!(stack.scene().overlay().is_none());
    assert!(stack.scene().is_visible(&cards[0]));
    assert!(stack.queue().is_idle());
}

#[test]
fn swiping_last_card_pops_group() {
    let base = solid_cards(2);
    let top = solid_cards(1);
    let mut stack = CardStack::new(
        CardGroup::with_cards(base.clone()),
        StackConfig::default(),
        PHONE,
    );
    let pushed = CardGroup::with_cards(top.clone());
    let pushed_id = pushed.id();
    stack.push_group(pushed);
    assert!(settle(&mut stack, 2_000).is_some());

    let feedback = Rc::new(RefCell::new(Vec::new()));
    let f = Rc::clone(&feedback);
    let _sub = stack.feedback().subscribe(move |e| f.borrow_mut().push(e.clone()));

    let release = DragDriver::default().swipe(&mut stack, -0.6);
    assert_eq!(release, Ok(Some(Release::Thrown(PanDirection::Left))));
    assert_eq!(stack.groups().len(), 1);
    assert_eq!(stack.displayed(), Some(&base[0]));
    assert_eq!(stack.history().newest(), Some(&top[0]));
    assert_eq!(
        *feedback.borrow(),
        vec![
            StackFeedback::GroupPopped(pushed_id),
            StackFeedback::CardSwiped {
                direction: PanDirection::Left
            },
        ]
    );
}

#[test]
fn stalled_drag_is_cancelled_by_watchdog() {
    let mut config = StackConfig::default();
    config.queue.stall_timeout_ms = 200;
    let cards = solid_cards(2);
    let mut stack = CardStack::new(CardGroup::with_cards(cards.clone()), config, PHONE);

    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let o = Rc::clone(&outcomes);
    let _sub = stack
        .transitions()
        .subscribe(move |out: &TransitionOutcome| o.borrow_mut().push(out.state));

    let (settled, logs) = with_captured_logs(|| {
        stack.handle_pan(pan(PanPhase::Began, 30.0)).expect("began");
        stack.handle_pan(pan(PanPhase::Changed, 80.0)).expect("changed");
        settle(&mut stack, 2_000)
    });

    assert!(settled.is_some());
    assert_eq!(*outcomes.borrow(), vec![OperationState::RolledBack]);
    assert_eq!(stack.displayed(), Some(&cards[0]));
    assert!(stack.scene().overlay().is_none());
    assert!(stack.scene().is_visible(&cards[0]));
    assert!(logs.iter().any(|e| {
        e.level == tracing::Level::WARN
            && e.target == "cardstack.queue"
            && e.message.as_deref() == Some("interactive transition stalled; cancelling")
    }));

    assert_eq!(
        stack.handle_pan(pan(PanPhase::Ended, 80.0)),
        Err(NavigationError::NoActivePan)
    );
}

#[test]
fn release_after_stall_snaps_back() {
    let mut config = StackConfig::default();
    config.queue.stall_timeout_ms = 100;
    let cards = solid_cards(2);
    let mut stack = CardStack::new(CardGroup::with_cards(cards.clone()), config, PHONE);

    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let o = Rc::clone(&outcomes);
    let _sub = stack
        .transitions()
        .subscribe(move |out: &TransitionOutcome| o.borrow_mut().push(out.state));

    stack.handle_pan(pan(PanPhase::Began, 20.0)).expect("began");
    stack.handle_pan(pan(PanPhase::Changed, 180.0)).expect("changed");
    // Stop as soon as the watchdog starts rolling back.
    for _ in 0..30 {
        stack.tick(FRAME);
        if stack.queue().running().is_some_and(|op| !op.is_tracking()) {
            break;
        }
    }
    assert!(stack.queue().running().is_some_and(|op| !op.is_tracking()));

    let release = stack.handle_pan(pan(PanPhase::Ended, 180.0));
    assert_eq!(release, Ok(Some(Release::SnappedBack)));
    assert!(settle(&mut stack, 2_000).is_some());
    assert_eq!(*outcomes.borrow(), vec![OperationState::RolledBack]);
    assert_eq!(stack.displayed(), Some(&cards[0]));
    assert_eq!(stack.top_group().map(CardGroup::current_index), Some(0));
    assert!(stack.history().is_empty());
    assert!(stack.scene().overlay().is_none());
    assert!(stack.scene().is_visible(&cards[0]));
}

#[test]
fn push_during_drag_waits_for_release() {
    let (mut stack, cards) = stack_of(3);
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let k = Rc::clone(&kinds);
    let _sub = stack
        .transitions()
        .subscribe(move |out: &TransitionOutcome| k.borrow_mut().push((out.kind, out.state)));

    stack.handle_pan(pan(PanPhase::Began, 20.0)).expect("began");
    stack.handle_pan(pan(PanPhase::Changed, 120.0)).expect("changed");
    let pushed = CardGroup::with_cards(solid_cards(1));
    let pushed_id = pushed.id();
    stack.push_group(pushed);
    assert_eq!(stack.queue().pending_len(), 1);
    assert_eq!(stack.queue().running().map(|op| op.kind()), Some(NavigationKind::Pop));
    assert!(kinds.borrow().is_empty());

    let release = stack.handle_pan(pan(PanPhase::Ended, 120.0));
    assert_eq!(release, Ok(Some(Release::Thrown(PanDirection::Right))));
    assert!(settle(&mut stack, 2_000).is_some());

    assert_eq!(
        *kinds.borrow(),
        vec![
            (NavigationKind::Pop, OperationState::Committed),
            (NavigationKind::Push(pushed_id), OperationState::Committed),
        ]
    );
    assert_eq!(stack.groups().len(), 2);
    assert_eq!(stack.groups()[0].current_index(), 1);
    assert_eq!(stack.history().newest(), Some(&cards[0]));
}
