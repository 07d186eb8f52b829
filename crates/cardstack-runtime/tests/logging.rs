#![forbid(unsafe_code)]

//! Structured log output: targets, levels, and fields hosts filter on.
//!
//! Run:
//!   cargo test -p cardstack-runtime --test logging

use std::time::Duration;

use cardstack_harness::{
    DragDriver, PHONE, endless_loader, loading_card, scripted_loader, settle, solid_cards,
    with_captured_logs,
};
use cardstack_runtime::{CardGroup, CardStack, LoaderError, PaginatedLoader, StackConfig};
use tracing::Level;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn group_push_and_pop_log_at_info() {
    let mut stack = CardStack::new(
        CardGroup::with_cards(solid_cards(2)),
        StackConfig::default(),
        PHONE,
    );
    stack.push_group(CardGroup::with_cards(solid_cards(1)).title("Inbox"));
    settle(&mut stack, 2_000);
    stack.pop_group();
    settle(&mut stack, 2_000);

    assert!(logs_contain("card stack created"));
    assert!(logs_contain("group pushed"));
    assert!(logs_contain("group popped"));
    assert!(logs_contain("depth=1"));
}

#[traced_test]
#[test]
fn double_load_is_warned_and_rejected() {
    let mut loader = endless_loader(Duration::from_secs(1), 1);
    assert_eq!(loader.load(), Ok(()));
    assert_eq!(loader.load(), Err(LoaderError::AlreadyLoading));
    assert!(logs_contain("load requested while already loading"));
}

#[traced_test]
#[test]
fn rejected_pop_is_logged() {
    let mut stack = CardStack::new(
        CardGroup::with_cards(solid_cards(1)),
        StackConfig::default(),
        PHONE,
    );
    stack.pop_group();
    assert!(logs_contain("transition aborted"));
    assert!(logs_contain("endpoint did not resolve"));
}

#[test]
fn queue_events_carry_operation_ids() {
    let ((), events) = with_captured_logs(|| {
        let mut stack = CardStack::new(
            CardGroup::with_cards(solid_cards(3)),
            StackConfig::default(),
            PHONE,
        );
        stack.pop(true);
        stack.pop(true);
        settle(&mut stack, 2_000);
    });

    let finished: Vec<_> = events
        .iter()
        .filter(|e| e.target == "cardstack.queue" && e.message.as_deref() == Some("transition finished"))
        .collect();
    assert_eq!(finished.len(), 2);
    assert_eq!(finished[0].field("op"), Some("op#1"));
    assert_eq!(finished[1].field("op"), Some("op#2"));
    assert!(finished.iter().all(|e| e.level == Level::DEBUG));
    assert!(finished.iter().all(|e| e.field("state") == Some("Committed")));
}

#[test]
fn loader_and_gesture_targets() {
    let ((), events) = with_captured_logs(|| {
        let group = CardGroup::with_loader(scripted_loader(&[&[1, 2], &[3]]), loading_card());
        let mut stack = CardStack::new(group, StackConfig::default(), PHONE);
        settle(&mut stack, 2_000);
        let _ = DragDriver::default().swipe(&mut stack, 0.5);
    });

    let batch = events
        .iter()
        .find(|e| e.target == "cardstack.loader" && e.message.as_deref() == Some("batch loaded"))
        .expect("batch loaded event");
    assert_eq!(batch.field("count"), Some("2"));
    assert_eq!(batch.field("page"), Some("0"));

    assert!(events.iter().any(|e| {
        e.target == "cardstack.loader" && e.message.as_deref() == Some("prefetch")
    }));
    assert!(events.iter().any(|e| {
        e.target == "cardstack.gesture" && e.message.as_deref() == Some("drag began")
    }));
    assert!(events.iter().any(|e| {
        e.target == "cardstack.gesture" && e.message.as_deref() == Some("drag ended")
    }));
    assert!(events.iter().all(|e| e.level != Level::WARN && e.level != Level::ERROR));
}

#[test]
fn exhausted_loader_is_silent() {
    let ((), events) = with_captured_logs(|| {
        let mut loader: PaginatedLoader = scripted_loader(&[&[1]]);
        assert_eq!(loader.load(), Ok(()));
        loader.pump(Duration::from_millis(16), drop);
        assert_eq!(loader.load(), Err(LoaderError::Exhausted));
    });
    assert!(events.iter().all(|e| e.level != Level::WARN));
}
